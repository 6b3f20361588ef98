#![allow(dead_code)]

use std::path::PathBuf;

use demand_features::prelude::*;
use polars::frame::DataFrame;

pub fn fixture_dir(dataset: &str) -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests/fixtures")
        .join(dataset)
}

/// Installs a test subscriber honouring `RUST_LOG`; repeated calls are ignored.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// Values of `col` for the rows of `entity`, in table order.
pub fn entity_values(df: &DataFrame, entity_col: &str, entity: &str, col: &str) -> Vec<Option<f64>> {
    let keys = df.key_values("features", entity_col).expect("entity column");
    let values = df.f64_values("features", col).expect("value column");
    keys.into_iter()
        .zip(values)
        .filter(|(k, _)| k.as_deref() == Some(entity))
        .map(|(_, v)| v)
        .collect()
}

pub fn assert_close(actual: Option<f64>, expected: f64) {
    let actual = actual.expect("expected a value, found missing");
    assert!(
        (actual - expected).abs() < 1e-9,
        "expected {expected}, found {actual}"
    );
}
