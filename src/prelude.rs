// 1. Traits
pub use crate::frame::DataFrameExt;

// 2. Pipelines
pub use crate::pipeline::{
    grid::{self, GridInputs},
    order_log::{self, OrderLogInputs},
};

// 3. Output
pub use crate::assemble::FeatureTable;

// 4. Configurations
pub use crate::config::{
    Ddof, GridPipelineConfig, Lag, LagConfig, MinPeriods, OrderLogPipelineConfig, Window,
    WindowConfig,
};

// 5. Column Vocabularies
pub use crate::io::{GridSource, OrderLogSource};
pub use crate::schema::{
    CalendarCol, FeatureCol, OrderCol, PriceCol, SalesCol, lag_col, rolling_mean_col,
    rolling_std_col,
};

// 6. Building Blocks
pub use crate::aggregate::{AggSpec, Aggregation};
pub use crate::join::{Cardinality, JoinKind, JoinSpec};
pub use crate::window::LagWindowEngine;

// 7. Errors
pub use crate::error::{
    ConfigError, DataError, FeatureError, FeatureResult, IoError, SystemError,
};
