//! Turning source tables into one row per (entity, day).

use std::collections::BTreeMap;

use polars::{
    frame::DataFrame,
    prelude::{Column, DataType, IdxSize, NamedFrom, PlSmallStr},
};
use tracing::debug;

use crate::{
    error::FeatureResult,
    frame::{DataFrameExt, f64_column, idx_ca, polars_err, to_idx},
};

/// Wide-to-long transform.
///
/// Every column not listed in `id_cols` is treated as one day of measurements.
/// The output holds the identifier columns, a `var_name` column carrying the
/// original column name, and a `Float64` `value_name` column. Rows are
/// day-major: all source rows for the first day column, then the next day.
///
/// Row count is `height × day columns`; every non-identifier cell appears
/// exactly once. A day cell that is present but not numeric is an error, so
/// only cells that were already missing come out as missing values.
#[tracing::instrument(skip_all, fields(rows = wide.height(), width = wide.width()))]
pub fn melt(
    wide: &DataFrame,
    table: &str,
    id_cols: &[&str],
    var_name: &str,
    value_name: &str,
) -> FeatureResult<DataFrame> {
    wide.require_columns(table, id_cols)?;

    let day_cols: Vec<String> = wide
        .get_column_names()
        .into_iter()
        .filter(|name| !id_cols.contains(&name.as_str()))
        .map(|name| name.to_string())
        .collect();

    let height = wide.height();
    let total = height * day_cols.len();

    let mut repeat = Vec::with_capacity(total);
    let mut day_codes: Vec<&str> = Vec::with_capacity(total);
    let mut values: Vec<Option<f64>> = Vec::with_capacity(total);

    for day in &day_cols {
        for row in 0..height {
            repeat.push(Some(to_idx(row)?));
        }
        day_codes.extend(std::iter::repeat_n(day.as_str(), height));
        values.extend(day_values(wide, table, day)?);
    }

    let ids = wide
        .select(id_cols.iter().copied())
        .map_err(|e| polars_err("melt: select identifiers", e))?
        .take(&idx_ca("melt_idx", &repeat))
        .map_err(|e| polars_err("melt: repeat identifiers", e))?;

    let long = ids
        .hstack(&[
            Column::new(PlSmallStr::from(var_name), day_codes),
            f64_column(value_name, values),
        ])
        .map_err(|e| polars_err("melt: attach day columns", e))?;

    debug!(
        day_columns = day_cols.len(),
        rows_out = long.height(),
        "Reshaped wide table to long format"
    );
    Ok(long)
}

fn day_values(wide: &DataFrame, table: &str, day: &str) -> FeatureResult<Vec<Option<f64>>> {
    let stage = format!("melt: {table}.{day} as Float64");
    let c = wide
        .column(day)
        .and_then(|c| c.strict_cast(&DataType::Float64))
        .map_err(|e| polars_err(&stage, e))?;
    let ca = c.f64().map_err(|e| polars_err(&stage, e))?;
    Ok(ca.into_iter().collect())
}

/// Counts rows per (entity, day) and returns them sorted by entity, then day.
///
/// `date_col` must be a `Date` column. Rows with a missing entity or date are
/// not counted. The output carries `entity_col` (String), `date_col` (Date)
/// and `count_col` (Float64).
#[tracing::instrument(skip_all, fields(rows = df.height()))]
pub fn daily_counts(
    df: &DataFrame,
    table: &str,
    entity_col: &str,
    date_col: &str,
    count_col: &str,
) -> FeatureResult<DataFrame> {
    let entities = df.key_values(table, entity_col)?;
    let days = df.date_days(table, date_col)?;

    let mut counts: BTreeMap<(String, i32), IdxSize> = BTreeMap::new();
    let mut skipped = 0usize;
    for (entity, day) in entities.into_iter().zip(days) {
        match (entity, day) {
            (Some(entity), Some(day)) => *counts.entry((entity, day)).or_default() += 1,
            _ => skipped += 1,
        }
    }

    let mut out_entity = Vec::with_capacity(counts.len());
    let mut out_day = Vec::with_capacity(counts.len());
    let mut out_count = Vec::with_capacity(counts.len());
    for ((entity, day), n) in counts {
        out_entity.push(entity);
        out_day.push(day);
        out_count.push(Some(f64::from(n)));
    }

    let day_column = Column::new(PlSmallStr::from(date_col), out_day)
        .cast(&DataType::Date)
        .map_err(|e| polars_err("daily_counts: build date column", e))?;

    let out = DataFrame::new(vec![
        Column::new(PlSmallStr::from(entity_col), out_entity),
        day_column,
        f64_column(count_col, out_count),
    ])
    .map_err(|e| polars_err("daily_counts: assemble", e))?;

    debug!(
        rows_out = out.height(),
        skipped, "Aggregated rows into daily counts"
    );
    Ok(out)
}
