use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::{
    error::{ConfigError, FeatureResult},
    impl_from_primitive,
};

// ================================================================================================
// Domain Strong Types (NewTypes)
// ================================================================================================

/// Number of positions to look back within one entity's ordered series.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Lag(pub u32);

/// Number of prior observations covered by a rolling statistic.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Window(pub u32);

impl_from_primitive!(Lag, u32);
impl_from_primitive!(Window, u32);

/// How many prior observations a rolling window needs before it yields a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum MinPeriods {
    /// A window emits a value only once all `W` prior observations exist.
    /// Partial windows yield missing.
    #[default]
    FullWindow,

    /// A window emits a value once at least `n` non-missing prior observations exist.
    AtLeast(u32),
}

impl MinPeriods {
    /// Resolves the policy to a concrete count for a given window.
    pub fn resolve(&self, window: Window) -> usize {
        match self {
            MinPeriods::FullWindow => window.0 as usize,
            MinPeriods::AtLeast(n) => *n as usize,
        }
    }
}

/// Delta degrees of freedom used by the rolling standard deviation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Ddof {
    /// `N - 1` denominator.
    #[default]
    Sample,
    /// `N` denominator.
    Population,
}

impl Ddof {
    pub fn value(&self) -> usize {
        match self {
            Ddof::Sample => 1,
            Ddof::Population => 0,
        }
    }
}

// ================================================================================================
// Engine Configurations
// ================================================================================================

/// Ordered set of lag offsets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LagConfig {
    pub lags: BTreeSet<Lag>,
}

impl LagConfig {
    pub fn new(lags: impl IntoIterator<Item = u32>) -> Self {
        Self {
            lags: lags.into_iter().map(Lag).collect(),
        }
    }

    pub fn validate(&self) -> FeatureResult<()> {
        if self.lags.contains(&Lag(0)) {
            return Err(ConfigError::InvalidLag(
                "lag 0 would expose the current observation".to_string(),
            )
            .into());
        }
        Ok(())
    }
}

/// Ordered set of trailing window sizes plus the policies applied to every window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowConfig {
    pub windows: BTreeSet<Window>,
    #[serde(default)]
    pub min_periods: MinPeriods,
    #[serde(default)]
    pub ddof: Ddof,
}

impl WindowConfig {
    pub fn new(windows: impl IntoIterator<Item = u32>) -> Self {
        Self {
            windows: windows.into_iter().map(Window).collect(),
            min_periods: MinPeriods::default(),
            ddof: Ddof::default(),
        }
    }

    pub fn with_min_periods(mut self, min_periods: MinPeriods) -> Self {
        self.min_periods = min_periods;
        self
    }

    pub fn with_ddof(mut self, ddof: Ddof) -> Self {
        self.ddof = ddof;
        self
    }

    pub fn validate(&self) -> FeatureResult<()> {
        for w in &self.windows {
            if w.0 == 0 {
                return Err(ConfigError::InvalidWindow("window size must be positive".into()).into());
            }
            if let MinPeriods::AtLeast(n) = self.min_periods {
                if n == 0 || n > w.0 {
                    return Err(ConfigError::InvalidWindow(format!(
                        "min_periods {n} must lie in 1..={} for window {}",
                        w.0, w.0
                    ))
                    .into());
                }
            }
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.windows.is_empty()
    }
}

// ================================================================================================
// Pipeline Configurations
// ================================================================================================

/// Configuration of the sales-grid pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridPipelineConfig {
    pub lags: LagConfig,
    pub windows: WindowConfig,

    /// Caps the number of sales rows (one row per series) taken from the wide grid.
    ///
    /// Every feature is computed per series, so the rows that are included carry
    /// exactly the values an uncapped run would give them.
    #[serde(default)]
    pub max_sales_rows: Option<usize>,
}

impl Default for GridPipelineConfig {
    fn default() -> Self {
        Self {
            lags: LagConfig::new([7, 28, 56, 365]),
            windows: WindowConfig::new([7, 28, 56]),
            max_sales_rows: None,
        }
    }
}

impl GridPipelineConfig {
    pub fn with_max_sales_rows(mut self, n: usize) -> Self {
        self.max_sales_rows = Some(n);
        self
    }

    pub fn with_lags(mut self, lags: LagConfig) -> Self {
        self.lags = lags;
        self
    }

    pub fn with_windows(mut self, windows: WindowConfig) -> Self {
        self.windows = windows;
        self
    }

    pub fn validate(&self) -> FeatureResult<()> {
        self.lags.validate()?;
        self.windows.validate()
    }

    pub fn from_json(s: &str) -> FeatureResult<Self> {
        let cfg: Self = serde_json::from_str(s).map_err(ConfigError::Json)?;
        cfg.validate()?;
        Ok(cfg)
    }
}

/// Configuration of the order-log pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderLogPipelineConfig {
    pub lags: LagConfig,
}

impl Default for OrderLogPipelineConfig {
    fn default() -> Self {
        Self {
            lags: LagConfig::new([7, 14, 28]),
        }
    }
}

impl OrderLogPipelineConfig {
    pub fn with_lags(mut self, lags: LagConfig) -> Self {
        self.lags = lags;
        self
    }

    pub fn validate(&self) -> FeatureResult<()> {
        self.lags.validate()
    }

    pub fn from_json(s: &str) -> FeatureResult<Self> {
        let cfg: Self = serde_json::from_str(s).map_err(ConfigError::Json)?;
        cfg.validate()?;
        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FeatureError;

    #[test]
    fn test_defaults_mirror_dataset_conventions() {
        let grid = GridPipelineConfig::default();
        let lags: Vec<u32> = grid.lags.lags.iter().map(|l| l.0).collect();
        let windows: Vec<u32> = grid.windows.windows.iter().map(|w| w.0).collect();
        assert_eq!(lags, vec![7, 28, 56, 365]);
        assert_eq!(windows, vec![7, 28, 56]);
        assert_eq!(grid.windows.min_periods, MinPeriods::FullWindow);
        assert_eq!(grid.windows.ddof, Ddof::Sample);
        assert!(grid.max_sales_rows.is_none());

        let orders = OrderLogPipelineConfig::default();
        let lags: Vec<u32> = orders.lags.lags.iter().map(|l| l.0).collect();
        assert_eq!(lags, vec![7, 14, 28]);
    }

    #[test]
    fn test_lags_are_ordered_and_deduplicated() {
        let cfg = LagConfig::new([28, 7, 14, 7]);
        let lags: Vec<u32> = cfg.lags.iter().map(|l| l.0).collect();
        assert_eq!(lags, vec![7, 14, 28]);
    }

    #[test]
    fn test_zero_lag_rejected() {
        let err = LagConfig::new([0, 7]).validate().unwrap_err();
        assert!(matches!(err, FeatureError::Config(ConfigError::InvalidLag(_))));
    }

    #[test]
    fn test_window_validation() {
        assert!(WindowConfig::new([0]).validate().is_err());
        assert!(
            WindowConfig::new([7])
                .with_min_periods(MinPeriods::AtLeast(8))
                .validate()
                .is_err()
        );
        assert!(
            WindowConfig::new([7])
                .with_min_periods(MinPeriods::AtLeast(3))
                .validate()
                .is_ok()
        );
    }

    #[test]
    fn test_empty_window_set_is_valid() {
        let cfg = WindowConfig::new([]);
        assert!(cfg.is_empty());
        assert!(cfg.validate().is_ok());
        assert!(!WindowConfig::new([7]).is_empty());
    }

    #[test]
    fn test_min_periods_resolution() {
        assert_eq!(MinPeriods::FullWindow.resolve(Window(28)), 28);
        assert_eq!(MinPeriods::AtLeast(2).resolve(Window(28)), 2);
    }

    #[test]
    fn test_grid_config_from_json() {
        let json = r#"{
            "lags": { "lags": [1, 2] },
            "windows": { "windows": [3], "min_periods": { "AtLeast": 2 } },
            "max_sales_rows": 10
        }"#;
        let cfg = GridPipelineConfig::from_json(json).expect("valid config");
        assert_eq!(cfg.lags, LagConfig::new([1, 2]));
        assert_eq!(cfg.windows.min_periods, MinPeriods::AtLeast(2));
        assert_eq!(cfg.windows.ddof, Ddof::Sample);
        assert_eq!(cfg.max_sales_rows, Some(10));
    }

    #[test]
    fn test_invalid_json_config_rejected() {
        let err = OrderLogPipelineConfig::from_json(r#"{ "lags": { "lags": [0] } }"#).unwrap_err();
        assert!(matches!(err, FeatureError::Config(ConfigError::InvalidLag(_))));

        let err = OrderLogPipelineConfig::from_json("not json").unwrap_err();
        assert!(matches!(err, FeatureError::Config(ConfigError::Json(_))));
    }
}
