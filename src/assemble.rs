use std::{fs, path::Path};

use polars::{
    frame::DataFrame,
    prelude::{CsvWriter, SerWriter, SortMultipleOptions},
};
use tracing::debug;

use crate::{
    error::{FeatureResult, IoError, SystemError},
    frame::{DataFrameExt, polars_err},
    join::{JoinSpec, join},
};

/// Final feature table: one row per (entity, date), sorted by entity then date.
#[derive(Debug, Clone)]
pub struct FeatureTable {
    df: DataFrame,
    entity_cols: Vec<String>,
    time_col: String,
}

impl FeatureTable {
    fn new(df: DataFrame, entity_cols: &[&str], time_col: &str) -> FeatureResult<Self> {
        let mut by: Vec<&str> = entity_cols.to_vec();
        by.push(time_col);
        let df = df
            .sort(
                by,
                SortMultipleOptions::default()
                    .with_maintain_order(true)
                    .with_nulls_last(true),
            )
            .map_err(|e| polars_err("sort feature table", e))?;

        Ok(Self {
            df,
            entity_cols: entity_cols.iter().map(|c| c.to_string()).collect(),
            time_col: time_col.to_string(),
        })
    }

    pub fn as_df(&self) -> &DataFrame {
        &self.df
    }

    pub fn into_df(self) -> DataFrame {
        self.df
    }

    pub fn height(&self) -> usize {
        self.df.height()
    }

    /// First entity key column; the only one for both built-in pipelines.
    pub fn entity_col(&self) -> &str {
        self.entity_cols.first().map(String::as_str).unwrap_or_default()
    }

    pub fn entity_cols(&self) -> &[String] {
        &self.entity_cols
    }

    pub fn time_col(&self) -> &str {
        &self.time_col
    }

    /// Writes the table as CSV with a header row. Creates parent directories
    /// and overwrites an existing file.
    pub fn to_csv(&self, path: impl AsRef<Path>) -> FeatureResult<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| {
                IoError::WriteFailed(format!("create {}: {e}", parent.display()))
            })?;
        }
        let mut file = fs::File::create(path)
            .map_err(|e| IoError::WriteFailed(format!("create {}: {e}", path.display())))?;

        let mut df = self.df.clone();
        CsvWriter::new(&mut file)
            .include_header(true)
            .finish(&mut df)
            .map_err(|e| IoError::WriteFailed(format!("write {}: {e}", path.display())))?;
        Ok(())
    }
}

/// Attaches per-entity statics to the per-(entity, date) table and sorts the result.
///
/// `statics` must hold at most one row per entity; rows of entities without a
/// static row keep missing static columns. The row count of `base` is preserved.
#[tracing::instrument(skip_all, fields(rows = base.height()))]
pub fn assemble(
    base: DataFrame,
    statics: Option<&DataFrame>,
    entity_cols: &[&str],
    time_col: &str,
) -> FeatureResult<FeatureTable> {
    base.require_columns("features", entity_cols)?;
    base.require_columns("features", &[time_col])?;

    let rows = base.height();
    let df = match statics {
        Some(statics) => join(&base, statics, &JoinSpec::unique("statics", entity_cols))?,
        None => base,
    };
    if df.height() != rows {
        return Err(SystemError::InvariantViolation(format!(
            "assembly changed row count from {rows} to {}",
            df.height()
        ))
        .into());
    }

    debug!(rows, columns = df.width(), "Assembled feature table");
    FeatureTable::new(df, entity_cols, time_col)
}
