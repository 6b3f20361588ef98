use anyhow::Result;
use demand_features::prelude::*;
use polars::prelude::{Column, DataFrame, NamedFrom, PlSmallStr};

mod common;
use common::{assert_close, entity_values, fixture_dir, init_tracing};

const ITEM_1: &str = "FOODS_1_001_CA_1_validation";
const ITEM_2: &str = "FOODS_1_002_CA_1_validation";

fn run_fixture(cfg: &GridPipelineConfig) -> Result<FeatureTable> {
    init_tracing();
    Ok(grid::run_from_dir(fixture_dir("grid"), cfg)?)
}

#[test]
fn test_output_grain_and_columns() -> Result<()> {
    let table = run_fixture(&GridPipelineConfig::default())?;
    let df = table.as_df();

    // 2 series x 10 day columns.
    assert_eq!(table.height(), 20);
    assert_eq!(table.entity_col(), "id");

    for name in [
        "id", "d", "sales", "date", "wm_yr_wk", "weekday", "wday", "month", "year",
        "event_name_1", "event_type_1", "snap_CA", "snap_TX", "snap_WI", "dayofweek",
        "weekofyear", "is_weekend", "sell_price", "avg_sell_price", "rel_price", "lag_7",
        "lag_28", "lag_56", "lag_365", "rolling_mean_7", "rolling_std_7", "rolling_mean_28",
        "rolling_std_28", "rolling_mean_56", "rolling_std_56",
    ] {
        assert!(df.has_column(name), "missing output column {name}");
    }
    Ok(())
}

#[test]
fn test_reshape_conserves_sales() -> Result<()> {
    let table = run_fixture(&GridPipelineConfig::default())?;
    let sales = table.as_df().f64_values("features", "sales")?;

    assert_eq!(sales.iter().flatten().count(), 20);
    assert_eq!(sales.iter().flatten().sum::<f64>(), 110.0);
    Ok(())
}

#[test]
fn test_lag_and_rolling_on_toy_series() -> Result<()> {
    let table = run_fixture(&GridPipelineConfig::default())?;
    let df = table.as_df();

    let lag_1 = entity_values(df, "id", ITEM_1, "lag_7");
    let lag_2 = entity_values(df, "id", ITEM_2, "lag_7");
    assert!(lag_1[..7].iter().all(Option::is_none));
    assert_eq!(lag_1[9], Some(3.0));
    assert_eq!(lag_2[9], Some(8.0));

    // Window for day index 9 covers day indices 2..=8.
    let mean_1 = entity_values(df, "id", ITEM_1, "rolling_mean_7");
    let mean_2 = entity_values(df, "id", ITEM_2, "rolling_mean_7");
    assert!(mean_1[..7].iter().all(Option::is_none));
    assert_close(mean_1[7], 4.0);
    assert_close(mean_1[9], 6.0);
    assert_close(mean_2[9], 5.0);

    let std_1 = entity_values(df, "id", ITEM_1, "rolling_std_7");
    assert_close(std_1[9], (56.0f64 / 12.0).sqrt());

    // Ten days of history never fill the longer lags and windows.
    for col in ["lag_28", "lag_365", "rolling_mean_28", "rolling_std_56"] {
        assert_eq!(df.column(col)?.null_count(), 20, "{col} should be all missing");
    }
    Ok(())
}

#[test]
fn test_calendar_features() -> Result<()> {
    let table = run_fixture(&GridPipelineConfig::default())?;
    let df = table.as_df();

    // d_1 = 2011-01-29 (Saturday), d_3 = 2011-01-31 (Monday).
    let dow = entity_values(df, "id", ITEM_1, "dayofweek");
    let woy = entity_values(df, "id", ITEM_1, "weekofyear");
    assert_eq!(&dow[..3], &[Some(5.0), Some(6.0), Some(0.0)]);
    assert_eq!(&woy[..3], &[Some(4.0), Some(4.0), Some(5.0)]);

    let weekend: Vec<Option<bool>> = df.column("is_weekend")?.bool()?.into_iter().take(3).collect();
    assert_eq!(weekend, vec![Some(true), Some(true), Some(false)]);

    let events = df.key_values("features", "event_name_1")?;
    assert_eq!(events[8].as_deref(), Some("SuperBowl"));
    assert_eq!(events[7], None);
    Ok(())
}

#[test]
fn test_price_features_and_unmatched_weeks() -> Result<()> {
    let table = run_fixture(&GridPipelineConfig::default())?;
    let df = table.as_df();

    let price_1 = entity_values(df, "id", ITEM_1, "sell_price");
    assert_eq!(price_1[0], Some(2.0));
    assert_eq!(price_1[9], Some(2.5));

    // Mean over all ten days: (7 * 2.0 + 3 * 2.5) / 10.
    let avg_1 = entity_values(df, "id", ITEM_1, "avg_sell_price");
    assert!(avg_1.iter().all(|v| *v == avg_1[0]));
    assert_close(avg_1[0], 2.15);
    let rel_1 = entity_values(df, "id", ITEM_1, "rel_price");
    assert_close(rel_1[0], 2.0 / 2.15);

    // The second item has no price for the first week: joined as missing, not dropped.
    let price_2 = entity_values(df, "id", ITEM_2, "sell_price");
    assert_eq!(price_2.len(), 10);
    assert!(price_2[..7].iter().all(Option::is_none));
    let avg_2 = entity_values(df, "id", ITEM_2, "avg_sell_price");
    assert!(avg_2.iter().all(|v| *v == Some(4.0)));
    let rel_2 = entity_values(df, "id", ITEM_2, "rel_price");
    assert_eq!(rel_2[0], None);
    assert_eq!(rel_2[9], Some(1.0));
    Ok(())
}

#[test]
fn test_rows_sorted_by_entity_then_date() -> Result<()> {
    let table = run_fixture(&GridPipelineConfig::default())?;
    let df = table.as_df();

    let ids = df.key_values("features", "id")?;
    let days = df.date_days("features", "date")?;
    let keys: Vec<_> = ids.into_iter().zip(days).collect();
    let mut sorted = keys.clone();
    sorted.sort();
    assert_eq!(keys, sorted);
    Ok(())
}

#[test]
fn test_runs_are_deterministic() -> Result<()> {
    let a = run_fixture(&GridPipelineConfig::default())?;
    let b = run_fixture(&GridPipelineConfig::default())?;
    assert!(a.as_df().equals_missing(b.as_df()));
    Ok(())
}

#[test]
fn test_row_cap_does_not_change_included_rows() -> Result<()> {
    let full = run_fixture(&GridPipelineConfig::default())?;
    let capped = run_fixture(&GridPipelineConfig::default().with_max_sales_rows(1))?;

    assert_eq!(capped.height(), 10);
    assert!(capped.as_df().equals_missing(&full.as_df().slice(0, 10)));
    Ok(())
}

/// Sales table with `series` rows over the fixture's ten days; series `i` sells `i + 1` a day.
fn wide_sales(series: usize) -> Result<DataFrame> {
    let items: Vec<String> = (0..series).map(|i| format!("FOODS_1_{:03}", i + 1)).collect();
    let ids: Vec<String> = items.iter().map(|item| format!("{item}_CA_1_validation")).collect();
    let mut columns = vec![
        Column::new(PlSmallStr::from("id"), ids),
        Column::new(PlSmallStr::from("item_id"), items),
        Column::new(PlSmallStr::from("dept_id"), vec!["FOODS_1"; series]),
        Column::new(PlSmallStr::from("cat_id"), vec!["FOODS"; series]),
        Column::new(PlSmallStr::from("store_id"), vec!["CA_1"; series]),
        Column::new(PlSmallStr::from("state_id"), vec!["CA"; series]),
    ];
    for day in 1..=10 {
        let units: Vec<i64> = (1..=series as i64).collect();
        columns.push(Column::new(PlSmallStr::from(format!("d_{day}")), units));
    }
    Ok(DataFrame::new(columns)?)
}

#[test]
fn test_uncapped_run_keeps_every_series() -> Result<()> {
    init_tracing();
    let mut inputs = GridInputs::load(fixture_dir("grid"), None)?;
    inputs.sales = wide_sales(12)?;

    let table = grid::run(&inputs, &GridPipelineConfig::default())?;
    assert_eq!(table.height(), 12 * 10);

    let ids = table.as_df().key_values("features", "id")?;
    let distinct: std::collections::BTreeSet<_> = ids.into_iter().flatten().collect();
    assert_eq!(distinct.len(), 12);

    // Each series i contributes 10 * (i + 1) units.
    let sales = table.as_df().f64_values("features", "sales")?;
    assert_eq!(sales.iter().flatten().sum::<f64>(), 10.0 * 78.0);
    Ok(())
}

#[test]
fn test_explicit_cap_above_ten_series() -> Result<()> {
    init_tracing();
    let mut inputs = GridInputs::load(fixture_dir("grid"), None)?;
    inputs.sales = wide_sales(12)?;

    let cfg = GridPipelineConfig::default().with_max_sales_rows(11);
    let table = grid::run(&inputs, &cfg)?;
    assert_eq!(table.height(), 11 * 10);
    Ok(())
}

#[test]
fn test_day_column_order_does_not_matter() -> Result<()> {
    init_tracing();
    let cfg = GridPipelineConfig::default();
    let mut inputs = GridInputs::load(fixture_dir("grid"), None)?;
    let expected = grid::run(&inputs, &cfg)?;

    // Reverse the day columns so the long table arrives newest-first.
    let mut names: Vec<String> = inputs
        .sales
        .get_column_names()
        .into_iter()
        .map(|n| n.to_string())
        .collect();
    names[6..].reverse();
    inputs.sales = inputs.sales.select(names)?;

    let shuffled = grid::run(&inputs, &cfg)?;
    assert!(shuffled.as_df().equals_missing(expected.as_df()));
    Ok(())
}

#[test]
fn test_custom_window_policy() -> Result<()> {
    let cfg = GridPipelineConfig::default()
        .with_lags(LagConfig::new([1]))
        .with_windows(WindowConfig::new([3]).with_min_periods(MinPeriods::AtLeast(1)));
    let table = run_fixture(&cfg)?;
    let df = table.as_df();

    assert!(!df.has_column("lag_7"));
    let mean = entity_values(df, "id", ITEM_1, "rolling_mean_3");
    assert_eq!(mean[0], None);
    assert_close(mean[1], 1.0);
    assert_close(mean[2], 1.5);
    assert_close(mean[3], 2.0);
    Ok(())
}

#[test]
fn test_missing_input_file_is_reported() {
    let dir = std::env::temp_dir().join("demand-features-empty-grid");
    let err = grid::run_from_dir(&dir, &GridPipelineConfig::default()).unwrap_err();
    match err {
        FeatureError::Io(IoError::ResourceNotFound { resource, .. }) => {
            assert_eq!(resource, "sales_train_validation.csv");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_malformed_calendar_date_fails() -> Result<()> {
    let mut inputs = GridInputs::load(fixture_dir("grid"), None)?;
    let mut dates: Vec<&str> = vec!["2011-01-29"; inputs.calendar.height()];
    dates[4] = "2011-02-30";
    inputs
        .calendar
        .with_column(Column::new(PlSmallStr::from("date"), dates))?;

    let err = grid::run(&inputs, &GridPipelineConfig::default()).unwrap_err();
    assert!(matches!(err, FeatureError::Data(DataError::DateParse { .. })));
    Ok(())
}

#[test]
fn test_invalid_config_is_rejected() -> Result<()> {
    let inputs = GridInputs::load(fixture_dir("grid"), None)?;
    let cfg = GridPipelineConfig::default().with_lags(LagConfig::new([0]));
    let err = grid::run(&inputs, &cfg).unwrap_err();
    assert!(matches!(err, FeatureError::Config(ConfigError::InvalidLag(_))));
    Ok(())
}
