//! Lagged values and trailing rolling statistics per entity.
//!
//! Each entity's rows are first ordered by time through an [`EntityIndex`];
//! the operators below then only read positions strictly before the one they
//! fill. Table row order is left untouched: results are written back to the
//! row each value belongs to.

use polars::frame::DataFrame;
use rayon::iter::{IntoParallelIterator, ParallelIterator};
use tracing::debug;

use crate::{
    config::{Ddof, Lag, LagConfig, Window, WindowConfig},
    entity::EntityIndex,
    error::FeatureResult,
    frame::{DataFrameExt, f64_column, polars_err},
    schema::{lag_col, rolling_mean_col, rolling_std_col},
};

/// Value at position `t - lag` of the same sequence, missing when that position
/// precedes the start.
pub fn lag(seq: &[Option<f64>], lag: Lag) -> Vec<Option<f64>> {
    let l = lag.0 as usize;
    (0..seq.len())
        .map(|t| if t >= l { seq[t - l] } else { None })
        .collect()
}

/// Trailing mean and standard deviation over the `window` values before each
/// position.
///
/// The value at `t` is never part of its own window: the window for `t` covers
/// positions `t - window ..= t - 1`. A window with fewer than `min_periods`
/// non-missing values yields missing, as does a standard deviation with no
/// degrees of freedom left.
pub fn rolling(
    seq: &[Option<f64>],
    window: Window,
    min_periods: usize,
    ddof: Ddof,
) -> (Vec<Option<f64>>, Vec<Option<f64>>) {
    let w = window.0 as usize;
    let mut means = Vec::with_capacity(seq.len());
    let mut stds = Vec::with_capacity(seq.len());

    for t in 0..seq.len() {
        let prior = &seq[t.saturating_sub(w)..t];
        let (sum, n) = prior
            .iter()
            .flatten()
            .fold((0.0, 0usize), |(sum, n), v| (sum + v, n + 1));
        if n == 0 || n < min_periods {
            means.push(None);
            stds.push(None);
            continue;
        }

        let mean = sum / n as f64;
        means.push(Some(mean));

        let dof = n.checked_sub(ddof.value()).filter(|d| *d > 0);
        stds.push(dof.map(|dof| {
            let ss: f64 = prior.iter().flatten().map(|v| (v - mean).powi(2)).sum();
            (ss / dof as f64).sqrt()
        }));
    }

    (means, stds)
}

/// Computes lag and rolling-window columns for one measurement, grouped by entity.
#[derive(Debug, Clone, Copy)]
pub struct LagWindowEngine<'a> {
    lags: &'a LagConfig,
    windows: Option<&'a WindowConfig>,
}

impl<'a> LagWindowEngine<'a> {
    pub fn new(lags: &'a LagConfig) -> Self {
        Self {
            lags,
            windows: None,
        }
    }

    pub fn with_windows(mut self, windows: &'a WindowConfig) -> Self {
        self.windows = Some(windows);
        self
    }

    /// Names of the columns [`Self::compute`] adds, in order: lags ascending,
    /// then `rolling_mean_W`, `rolling_std_W` per window ascending.
    pub fn output_columns(&self) -> Vec<String> {
        let mut names: Vec<String> = self.lags.lags.iter().map(|l| lag_col(*l)).collect();
        if let Some(windows) = self.windows {
            for w in &windows.windows {
                names.push(rolling_mean_col(*w));
                names.push(rolling_std_col(*w));
            }
        }
        names
    }

    /// Appends the feature columns to `df`.
    ///
    /// Observations of each entity (keyed by `entity_cols`) are sorted ascending
    /// by `time_col` before any value is computed; rows with a missing entity
    /// get missing features.
    #[tracing::instrument(skip_all, fields(rows = df.height(), value = value_col))]
    pub fn compute(
        &self,
        df: &DataFrame,
        table: &str,
        entity_cols: &[&str],
        time_col: &str,
        value_col: &str,
    ) -> FeatureResult<DataFrame> {
        self.lags.validate()?;
        if let Some(windows) = self.windows {
            windows.validate()?;
        }

        let index = EntityIndex::build_time_ordered(df, table, entity_cols, time_col)?;
        let values = df.f64_values(table, value_col)?;
        let names = self.output_columns();

        // One entity per task; each task only reads its own slice.
        let per_entity: Vec<Vec<Vec<Option<f64>>>> = index
            .slices()
            .into_par_iter()
            .map(|rows| {
                let seq: Vec<Option<f64>> = rows.iter().map(|&r| values[r]).collect();
                self.features_for(&seq)
            })
            .collect();

        let mut columns = vec![vec![None; df.height()]; names.len()];
        for (rows, features) in index.slices().into_iter().zip(per_entity) {
            for (column, feature) in columns.iter_mut().zip(features) {
                for (&row, value) in rows.iter().zip(feature) {
                    column[row] = value;
                }
            }
        }

        let new_columns: Vec<_> = names
            .iter()
            .zip(columns)
            .map(|(name, values)| f64_column(name, values))
            .collect();

        debug!(
            entities = index.len(),
            features = new_columns.len(),
            "Computed lag/window features"
        );

        df.hstack(&new_columns)
            .map_err(|e| polars_err("attach lag/window features", e))
    }

    /// Feature vectors for one time-ordered sequence, in [`Self::output_columns`] order.
    fn features_for(&self, seq: &[Option<f64>]) -> Vec<Vec<Option<f64>>> {
        let mut out: Vec<Vec<Option<f64>>> = self.lags.lags.iter().map(|l| lag(seq, *l)).collect();
        if let Some(windows) = self.windows {
            for w in &windows.windows {
                let (mean, std) = rolling(seq, *w, windows.min_periods.resolve(*w), windows.ddof);
                out.push(mean);
                out.push(std);
            }
        }
        out
    }
}
