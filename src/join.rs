//! Hash joins with declared cardinality.
//!
//! Every join site states its key columns, whether the right table is expected
//! to hold at most one row per key, and whether unmatched left rows are kept.
//! Joins only ever add columns: a right-hand column that already exists on the
//! left is rejected instead of overwritten.

use std::collections::HashMap;

use polars::{frame::DataFrame, prelude::IdxSize};
use tracing::{debug, warn};

use crate::{
    error::{DataError, FeatureResult, SystemError},
    frame::{DataFrameExt, idx_ca, polars_err, to_idx},
};

/// Expected number of right-hand rows per key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cardinality {
    /// At most one right row per key. Duplicates are an error, and a left join
    /// never changes the left row count.
    UniqueRight,

    /// Any number of right rows per key. Each left row is repeated once per match.
    FanOut,
}

/// Treatment of left rows without a match.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum JoinKind {
    /// Keep the row; right-hand columns are missing.
    #[default]
    Left,
    /// Drop the row.
    Inner,
}

/// Declaration of one join site.
#[derive(Debug, Clone)]
pub struct JoinSpec<'a> {
    /// Name of the right-hand table, used in errors and logs.
    pub table: &'a str,
    pub on: &'a [&'a str],
    pub cardinality: Cardinality,
    pub kind: JoinKind,
}

impl<'a> JoinSpec<'a> {
    /// Left join against a table keyed uniquely on `on`.
    pub fn unique(table: &'a str, on: &'a [&'a str]) -> Self {
        Self {
            table,
            on,
            cardinality: Cardinality::UniqueRight,
            kind: JoinKind::Left,
        }
    }

    /// Left join that may repeat left rows, once per matching right row.
    pub fn fan_out(table: &'a str, on: &'a [&'a str]) -> Self {
        Self {
            table,
            on,
            cardinality: Cardinality::FanOut,
            kind: JoinKind::Left,
        }
    }

    pub fn inner(mut self) -> Self {
        self.kind = JoinKind::Inner;
        self
    }
}

/// Joins `right` onto `left`.
///
/// Output rows follow left row order; the rows produced by one left row are
/// adjacent and follow right row order. Right key columns are dropped. A key
/// with any missing component never matches.
#[tracing::instrument(skip_all, fields(table = spec.table, left = left.height(), right = right.height()))]
pub fn join(left: &DataFrame, right: &DataFrame, spec: &JoinSpec) -> FeatureResult<DataFrame> {
    left.require_columns("left", spec.on)?;
    right.require_columns(spec.table, spec.on)?;

    let payload: Vec<String> = right
        .get_column_names()
        .into_iter()
        .filter(|name| !spec.on.contains(&name.as_str()))
        .map(|name| name.to_string())
        .collect();

    if let Some(clash) = payload.iter().find(|name| left.has_column(name)) {
        return Err(DataError::ColumnCollision {
            table: spec.table.to_string(),
            column: clash.clone(),
        }
        .into());
    }

    let left_keys = RowKeys::new(left, "left", spec.on)?;
    let right_keys = RowKeys::new(right, spec.table, spec.on)?;

    let mut lookup: HashMap<Vec<&str>, Vec<IdxSize>> = HashMap::with_capacity(right.height());
    for row in 0..right.height() {
        let Some(key) = right_keys.key(row) else {
            continue;
        };
        let matches = lookup.entry(key).or_default();
        if spec.cardinality == Cardinality::UniqueRight && !matches.is_empty() {
            return Err(DataError::CardinalityViolation {
                table: spec.table.to_string(),
                key: right_keys
                    .key(row)
                    .unwrap_or_default()
                    .into_iter()
                    .map(str::to_string)
                    .collect(),
            }
            .into());
        }
        matches.push(to_idx(row)?);
    }

    let mut left_idx: Vec<Option<IdxSize>> = Vec::with_capacity(left.height());
    let mut right_idx: Vec<Option<IdxSize>> = Vec::with_capacity(left.height());
    let mut unmatched = 0usize;

    for row in 0..left.height() {
        let matches = left_keys.key(row).and_then(|k| lookup.get(&k));
        match matches {
            Some(matches) => {
                let l = to_idx(row)?;
                for r in matches {
                    left_idx.push(Some(l));
                    right_idx.push(Some(*r));
                }
            }
            None => {
                unmatched += 1;
                if spec.kind == JoinKind::Left {
                    left_idx.push(Some(to_idx(row)?));
                    right_idx.push(None);
                }
            }
        }
    }

    let left_part = left
        .take(&idx_ca("left_idx", &left_idx))
        .map_err(|e| polars_err("join: gather left rows", e))?;
    let right_part = right
        .select(payload.iter().map(String::as_str))
        .map_err(|e| polars_err("join: select right payload", e))?
        .take(&idx_ca("right_idx", &right_idx))
        .map_err(|e| polars_err("join: gather right rows", e))?;

    let out = left_part
        .hstack(right_part.get_columns())
        .map_err(|e| polars_err("join: attach right columns", e))?;

    if spec.cardinality == Cardinality::UniqueRight
        && spec.kind == JoinKind::Left
        && out.height() != left.height()
    {
        return Err(SystemError::InvariantViolation(format!(
            "unique join with '{}' changed row count from {} to {}",
            spec.table,
            left.height(),
            out.height()
        ))
        .into());
    }

    if unmatched > 0 {
        match (spec.cardinality, spec.kind) {
            (Cardinality::UniqueRight, JoinKind::Left) => warn!(
                table = spec.table,
                unmatched, "Left rows without a reference match; joined columns left missing"
            ),
            (_, JoinKind::Inner) => debug!(
                table = spec.table,
                dropped = unmatched,
                "Inner join dropped unmatched left rows"
            ),
            (Cardinality::FanOut, JoinKind::Left) => debug!(
                table = spec.table,
                unmatched, "Left rows without a fan-out match"
            ),
        }
    }
    if spec.cardinality == Cardinality::FanOut {
        debug!(
            table = spec.table,
            rows_in = left.height(),
            rows_out = out.height(),
            "Fan-out join"
        );
    }

    Ok(out)
}

/// Composite key values per row, rendered as strings.
struct RowKeys {
    cols: Vec<Vec<Option<String>>>,
}

impl RowKeys {
    fn new(df: &DataFrame, table: &str, on: &[&str]) -> FeatureResult<Self> {
        let cols = on
            .iter()
            .map(|c| df.key_values(table, c))
            .collect::<FeatureResult<Vec<_>>>()?;
        Ok(Self { cols })
    }

    fn key(&self, row: usize) -> Option<Vec<&str>> {
        self.cols.iter().map(|c| c[row].as_deref()).collect()
    }
}
