use thiserror::Error;

pub type FeatureResult<T> = Result<T, FeatureError>;

#[derive(Debug, Error)]
pub enum FeatureError {
    #[error(transparent)]
    Data(#[from] DataError),

    #[error(transparent)]
    Io(#[from] IoError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    System(#[from] SystemError),
}

/// Errors raised while reshaping, joining, or deriving features from tables.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("Data frame error: {0}")]
    DataFrame(String),

    #[error("Missing column '{column}' in table '{table}'")]
    MissingColumn { column: String, table: String },

    #[error("Failed to parse date in column '{column}': '{value}'")]
    DateParse { column: String, value: String },

    #[error(
        "Cardinality violation joining '{table}': key {key:?} appears more than once on the right side"
    )]
    CardinalityViolation { table: String, key: Vec<String> },

    #[error("Join with '{table}' would overwrite existing column '{column}'")]
    ColumnCollision { table: String, column: String },
}

/// Errors related to locating and reading input tables.
#[derive(Debug, Error)]
pub enum IoError {
    #[error("Resource not found: '{resource}' (expected at {path})")]
    ResourceNotFound { resource: String, path: String },

    #[error("Failed to read data: {0}")]
    ReadFailed(String),

    #[error("Failed to write data: {0}")]
    WriteFailed(String),
}

/// Errors related to invalid pipeline configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid lag configuration: {0}")]
    InvalidLag(String),

    #[error("Invalid window configuration: {0}")]
    InvalidWindow(String),

    #[error("Invalid aggregate definition: {0}")]
    InvalidAggregate(String),

    #[error("Failed to decode configuration")]
    Json(#[from] serde_json::Error),
}

/// Errors related to internal invariants.
#[derive(Debug, Error)]
pub enum SystemError {
    #[error("Index out of bounds: {0}")]
    IndexOutOfBounds(String),

    #[error("Invariant violation: {0}")]
    InvariantViolation(String),
}
