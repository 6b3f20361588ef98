//! Per-entity row arena.
//!
//! Rows of a table are grouped by their entity key into one flat buffer of row
//! indices, one contiguous slice per entity. Entities are numbered in order of
//! first appearance. When built with a time column, each slice is sorted
//! ascending by time (stable on ties, missing times last), so consumers can walk
//! a slice front to back and only ever see an entity's own past.

use std::collections::HashMap;

use polars::{frame::DataFrame, prelude::DataType};

use crate::{
    error::FeatureResult,
    frame::{DataFrameExt, polars_err},
};

#[derive(Debug, Clone, Default)]
pub struct EntityIndex {
    keys: Vec<String>,
    /// Row indices grouped by entity.
    rows: Vec<usize>,
    /// `rows[offsets[e]..offsets[e + 1]]` belongs to entity `e`.
    offsets: Vec<usize>,
    /// Rows whose entity key is missing; they belong to no group.
    orphans: usize,
}

impl EntityIndex {
    /// Groups rows by entity, keeping each group's rows in table order.
    pub fn build(df: &DataFrame, table: &str, entity_cols: &[&str]) -> FeatureResult<Self> {
        let assignment = assign_groups(df, table, entity_cols)?;
        Ok(Self::from_assignment(assignment))
    }

    /// Groups rows by entity and sorts each group ascending by `time_col`.
    ///
    /// The time column may be any type that casts to `Int64` (dates, integers).
    pub fn build_time_ordered(
        df: &DataFrame,
        table: &str,
        entity_cols: &[&str],
        time_col: &str,
    ) -> FeatureResult<Self> {
        let assignment = assign_groups(df, table, entity_cols)?;
        let times = df.col_as(table, time_col, &DataType::Int64)?;
        let times: Vec<Option<i64>> = times
            .i64()
            .map_err(|e| polars_err(&format!("{table}.{time_col} as Int64"), e))?
            .into_iter()
            .collect();

        let mut index = Self::from_assignment(assignment);
        for e in 0..index.len() {
            let (start, end) = (index.offsets[e], index.offsets[e + 1]);
            // Stable: equal times keep table order.
            index.rows[start..end].sort_by_key(|&r| (times[r].is_none(), times[r]));
        }
        Ok(index)
    }

    fn from_assignment(assignment: GroupAssignment) -> Self {
        let GroupAssignment {
            keys,
            group_of_row,
        } = assignment;

        let mut offsets = vec![0usize; keys.len() + 1];
        for g in group_of_row.iter().flatten() {
            offsets[g + 1] += 1;
        }
        for e in 0..keys.len() {
            offsets[e + 1] += offsets[e];
        }

        let mut cursor = offsets.clone();
        let mut rows = vec![0usize; offsets[keys.len()]];
        let mut orphans = 0;
        for (row, g) in group_of_row.iter().enumerate() {
            match g {
                Some(g) => {
                    rows[cursor[*g]] = row;
                    cursor[*g] += 1;
                }
                None => orphans += 1,
            }
        }

        Self {
            keys,
            rows,
            offsets,
            orphans,
        }
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn orphans(&self) -> usize {
        self.orphans
    }

    pub fn key(&self, entity: usize) -> &str {
        &self.keys[entity]
    }

    /// Row indices of one entity.
    pub fn rows(&self, entity: usize) -> &[usize] {
        &self.rows[self.offsets[entity]..self.offsets[entity + 1]]
    }

    /// Iterates `(entity key, rows)` in order of first appearance.
    pub fn groups(&self) -> impl Iterator<Item = (&str, &[usize])> {
        (0..self.len()).map(|e| (self.key(e), self.rows(e)))
    }

    /// Collected slices, ready for a parallel iterator.
    pub fn slices(&self) -> Vec<&[usize]> {
        (0..self.len()).map(|e| self.rows(e)).collect()
    }
}

struct GroupAssignment {
    keys: Vec<String>,
    group_of_row: Vec<Option<usize>>,
}

fn assign_groups(
    df: &DataFrame,
    table: &str,
    entity_cols: &[&str],
) -> FeatureResult<GroupAssignment> {
    df.require_columns(table, entity_cols)?;
    let key_cols = entity_cols
        .iter()
        .map(|c| df.key_values(table, c))
        .collect::<FeatureResult<Vec<_>>>()?;

    let mut lookup: HashMap<String, usize> = HashMap::new();
    let mut keys = Vec::new();
    let mut group_of_row = Vec::with_capacity(df.height());

    for row in 0..df.height() {
        let parts = key_cols
            .iter()
            .map(|c| c[row].as_deref())
            .collect::<Option<Vec<_>>>();
        let Some(parts) = parts else {
            group_of_row.push(None);
            continue;
        };
        // Unit separator keeps composite keys unambiguous.
        let key = parts.join("\u{1f}");
        let g = match lookup.get(&key) {
            Some(g) => *g,
            None => {
                let g = keys.len();
                lookup.insert(key.clone(), g);
                keys.push(key);
                g
            }
        };
        group_of_row.push(Some(g));
    }

    Ok(GroupAssignment { keys, group_of_row })
}
