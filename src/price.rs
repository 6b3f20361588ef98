//! Price relative to the entity's mean price.
//!
//! The mean covers every price observation of the entity in the table, not only
//! those before a given date, so it is a static summary rather than a causal feature.

use itertools::izip;
use polars::frame::DataFrame;
use tracing::debug;

use crate::{
    aggregate::{AggSpec, aggregate},
    error::FeatureResult,
    frame::{DataFrameExt, f64_column, polars_err},
    join::{JoinSpec, join},
};

/// Output column names of [`normalize_prices`].
#[derive(Debug, Clone, Copy)]
pub struct PriceColumns<'a> {
    pub price: &'a str,
    pub mean: &'a str,
    pub relative: &'a str,
}

/// Adds `cols.mean` (per-entity mean of `cols.price`, missing prices excluded)
/// and `cols.relative` (`price / mean`). Rows without a price get a missing
/// relative price; the mean is still attached to them.
#[tracing::instrument(skip_all, fields(rows = df.height()))]
pub fn normalize_prices(
    df: &DataFrame,
    table: &str,
    entity_cols: &[&str],
    cols: PriceColumns,
) -> FeatureResult<DataFrame> {
    let means = aggregate(
        df,
        table,
        entity_cols,
        &[AggSpec::mean(cols.price, cols.mean)],
    )?;
    let mut out = join(df, &means, &JoinSpec::unique("price_means", entity_cols))?;

    let prices = out.f64_values(table, cols.price)?;
    let mean = out.f64_values(table, cols.mean)?;
    let relative = izip!(&prices, &mean)
        .map(|(p, m)| match (p, m) {
            (Some(p), Some(m)) => Some(p / m),
            _ => None,
        })
        .collect();

    out.with_column(f64_column(cols.relative, relative))
        .map_err(|e| polars_err("attach relative price", e))?;

    debug!(entities = means.height(), "Normalized prices");
    Ok(out)
}
