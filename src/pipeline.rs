//! End-to-end feature pipelines.
//!
//! Both pipelines take materialized input frames (or a directory holding the
//! dataset's CSV files) and produce a [`FeatureTable`](crate::assemble::FeatureTable)
//! sorted by entity and date.

pub mod grid;
pub mod order_log;

use polars::frame::DataFrame;

use crate::{
    error::FeatureResult,
    frame::{DataFrameExt, polars_err},
};

/// Selects `names` from `df`, reporting the first missing column against `table`.
fn project(df: &DataFrame, table: &str, names: &[&str]) -> FeatureResult<DataFrame> {
    df.require_columns(table, names)?;
    df.select(names.iter().copied())
        .map_err(|e| polars_err(&format!("select columns of {table}"), e))
}
