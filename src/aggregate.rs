//! Static per-entity summaries over the full available history.
//!
//! Each summary is one value per entity, later repeated on every row of that
//! entity. Because they see the whole table, these features include values
//! from after any given observation.

use polars::{
    frame::DataFrame,
    prelude::{DataType, Expr, IntoLazy, col},
};
use tracing::debug;

use crate::{
    error::{ConfigError, FeatureResult},
    frame::{DataFrameExt, polars_err},
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Aggregation {
    /// Arithmetic mean of non-missing values (Float64). Missing when the
    /// entity has no value at all.
    Mean,
    /// Number of distinct non-missing values (UInt32).
    NUnique,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AggSpec<'a> {
    pub source: &'a str,
    pub output: &'a str,
    pub agg: Aggregation,
}

impl<'a> AggSpec<'a> {
    pub fn mean(source: &'a str, output: &'a str) -> Self {
        Self {
            source,
            output,
            agg: Aggregation::Mean,
        }
    }

    pub fn n_unique(source: &'a str, output: &'a str) -> Self {
        Self {
            source,
            output,
            agg: Aggregation::NUnique,
        }
    }

    /// Missing values never count: the mean skips them and the distinct count
    /// drops them first.
    fn as_expr(&self) -> Expr {
        let source = col(self.source);
        match self.agg {
            Aggregation::Mean => source.cast(DataType::Float64).mean(),
            Aggregation::NUnique => source.drop_nulls().n_unique().cast(DataType::UInt32),
        }
        .alias(self.output)
    }
}

/// Computes one row per entity: the entity columns followed by one column per spec.
///
/// Entities appear in order of first appearance. Rows with a missing entity key
/// are ignored.
#[tracing::instrument(skip_all, fields(rows = df.height(), specs = specs.len()))]
pub fn aggregate(
    df: &DataFrame,
    table: &str,
    entity_cols: &[&str],
    specs: &[AggSpec],
) -> FeatureResult<DataFrame> {
    if let Some(spec) = specs.iter().find(|s| entity_cols.contains(&s.source)) {
        return Err(ConfigError::InvalidAggregate(format!(
            "'{}' is the grouping column and cannot be aggregated",
            spec.source
        ))
        .into());
    }

    df.require_columns(table, entity_cols)?;
    df.require_columns(table, &specs.iter().map(|s| s.source).collect::<Vec<_>>())?;

    let keys: Vec<Expr> = entity_cols.iter().map(|c| col(*c)).collect();
    let has_key = entity_cols
        .iter()
        .map(|c| col(*c).is_not_null())
        .reduce(|a, b| a.and(b));
    let aggs: Vec<Expr> = specs.iter().map(AggSpec::as_expr).collect();

    let mut lf = df.clone().lazy();
    if let Some(has_key) = has_key {
        lf = lf.filter(has_key);
    }
    let out = lf
        .group_by_stable(keys)
        .agg(aggs)
        .collect()
        .map_err(|e| polars_err(&format!("aggregate {table}"), e))?;

    debug!(entities = out.height(), "Computed per-entity aggregates");
    Ok(out)
}
