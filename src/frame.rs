//! Typed access to polars frames and conversion of polars errors.

use polars::{
    frame::DataFrame,
    prelude::{Column, DataType, IdxCa, IdxSize, NamedFrom, PlSmallStr, PolarsError},
};

use crate::error::{DataError, FeatureError, FeatureResult, SystemError};

pub(crate) fn polars_err(stage: &str, e: PolarsError) -> FeatureError {
    FeatureError::Data(DataError::DataFrame(format!("{stage}: {e}")))
}

pub(crate) fn to_idx(i: usize) -> FeatureResult<IdxSize> {
    IdxSize::try_from(i).map_err(|_| {
        SystemError::IndexOutOfBounds(format!("row {i} exceeds the polars index range")).into()
    })
}

pub(crate) fn idx_ca(name: &str, rows: &[Option<IdxSize>]) -> IdxCa {
    IdxCa::new(name.into(), rows)
}

pub(crate) fn f64_column(name: &str, values: Vec<Option<f64>>) -> Column {
    Column::new(PlSmallStr::from(name), values)
}

/// Read helpers used by every stage. All of them cast to a canonical dtype first,
/// so callers do not depend on what the CSV reader inferred.
pub trait DataFrameExt {
    /// Fails with [`DataError::MissingColumn`] unless every name is present.
    fn require_columns(&self, table: &str, names: &[&str]) -> FeatureResult<()>;

    fn col_as(&self, table: &str, name: &str, dtype: &DataType) -> FeatureResult<Column>;

    fn f64_values(&self, table: &str, name: &str) -> FeatureResult<Vec<Option<f64>>>;

    /// Values rendered as strings; used for join and grouping keys.
    fn key_values(&self, table: &str, name: &str) -> FeatureResult<Vec<Option<String>>>;

    /// Days since the Unix epoch for a `Date` column.
    fn date_days(&self, table: &str, name: &str) -> FeatureResult<Vec<Option<i32>>>;

    fn has_column(&self, name: &str) -> bool;
}

impl DataFrameExt for DataFrame {
    fn require_columns(&self, table: &str, names: &[&str]) -> FeatureResult<()> {
        match names.iter().find(|n| !self.has_column(n)) {
            Some(missing) => Err(DataError::MissingColumn {
                column: missing.to_string(),
                table: table.to_string(),
            }
            .into()),
            None => Ok(()),
        }
    }

    fn col_as(&self, table: &str, name: &str, dtype: &DataType) -> FeatureResult<Column> {
        let c = self.column(name).map_err(|_| DataError::MissingColumn {
            column: name.to_string(),
            table: table.to_string(),
        })?;
        c.cast(dtype)
            .map_err(|e| polars_err(&format!("cast {table}.{name} to {dtype}"), e))
    }

    fn f64_values(&self, table: &str, name: &str) -> FeatureResult<Vec<Option<f64>>> {
        let c = self.col_as(table, name, &DataType::Float64)?;
        let ca = c
            .f64()
            .map_err(|e| polars_err(&format!("{table}.{name} as Float64"), e))?;
        Ok(ca.into_iter().collect())
    }

    fn key_values(&self, table: &str, name: &str) -> FeatureResult<Vec<Option<String>>> {
        let c = self.col_as(table, name, &DataType::String)?;
        let ca = c
            .str()
            .map_err(|e| polars_err(&format!("{table}.{name} as String"), e))?;
        Ok(ca.into_iter().map(|v| v.map(str::to_string)).collect())
    }

    fn date_days(&self, table: &str, name: &str) -> FeatureResult<Vec<Option<i32>>> {
        let c = self.col_as(table, name, &DataType::Int32)?;
        let ca = c
            .i32()
            .map_err(|e| polars_err(&format!("{table}.{name} as Int32"), e))?;
        Ok(ca.into_iter().collect())
    }

    fn has_column(&self, name: &str) -> bool {
        self.column(name).is_ok()
    }
}
