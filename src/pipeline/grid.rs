use std::path::Path;

use polars::frame::DataFrame;
use tracing::info;

use crate::{
    assemble::{FeatureTable, assemble},
    config::GridPipelineConfig,
    error::FeatureResult,
    io::{GridSource, load_csv},
    join::{JoinSpec, join},
    pipeline::project,
    price::{PriceColumns, normalize_prices},
    reshape::melt,
    schema::{CalendarCol, FeatureCol, PriceCol, SalesCol},
    temporal::{add_calendar_features, with_date_column},
    window::LagWindowEngine,
};

const TABLE: &str = "sales_long";

/// Raw tables of the daily sales-grid dataset.
#[derive(Debug, Clone)]
pub struct GridInputs {
    /// Wide table: one row per series, one column per day code.
    pub sales: DataFrame,
    pub calendar: DataFrame,
    pub prices: DataFrame,
}

impl GridInputs {
    /// Loads the three grid files from `dir`, reading at most `max_sales_rows`
    /// series from the sales table.
    pub fn load(dir: impl AsRef<Path>, max_sales_rows: Option<usize>) -> FeatureResult<Self> {
        let dir = dir.as_ref();
        Ok(Self {
            sales: load_csv(dir, GridSource::Sales.into(), max_sales_rows)?,
            calendar: load_csv(dir, GridSource::Calendar.into(), None)?,
            prices: load_csv(dir, GridSource::Prices.into(), None)?,
        })
    }
}

pub fn run_from_dir(dir: impl AsRef<Path>, cfg: &GridPipelineConfig) -> FeatureResult<FeatureTable> {
    cfg.validate()?;
    let inputs = GridInputs::load(dir, cfg.max_sales_rows)?;
    run(&inputs, cfg)
}

/// Builds one row per (series, day) with calendar, price, lag and rolling features.
#[tracing::instrument(skip_all)]
pub fn run(inputs: &GridInputs, cfg: &GridPipelineConfig) -> FeatureResult<FeatureTable> {
    cfg.validate()?;
    // `DataFrame::head(None)` keeps ten rows, so only an explicit cap slices.
    let sales = match cfg.max_sales_rows {
        Some(n) => inputs.sales.head(Some(n)),
        None => inputs.sales.clone(),
    };
    info!(series = sales.height(), "Starting grid feature pipeline");

    let id = SalesCol::Id.as_str();
    let date = CalendarCol::Date.as_str();
    let ids = SalesCol::identifiers().map(|c| c.as_str());

    let long = melt(&sales, "sales", &ids, SalesCol::D.as_str(), SalesCol::Sales.as_str())?;

    let calendar = project(&inputs.calendar, "calendar", &CalendarCol::all_names())?;
    let df = join(&long, &calendar, &JoinSpec::unique("calendar", &[CalendarCol::D.as_str()]))?;

    let prices = project(&inputs.prices, "prices", &PriceCol::all_names())?;
    let df = join(&df, &prices, &JoinSpec::unique("prices", &PriceCol::keys()))?;

    let df = with_date_column(df, TABLE, date, date)?;
    let df = add_calendar_features(&df, TABLE, date)?;
    let df = normalize_prices(
        &df,
        TABLE,
        &[id],
        PriceColumns {
            price: PriceCol::SellPrice.as_str(),
            mean: FeatureCol::AvgSellPrice.as_str(),
            relative: FeatureCol::RelPrice.as_str(),
        },
    )?;

    let df = LagWindowEngine::new(&cfg.lags)
        .with_windows(&cfg.windows)
        .compute(&df, TABLE, &[id], date, SalesCol::Sales.as_str())?;

    let table = assemble(df, None, &[id], date)?;
    info!(
        rows = table.height(),
        columns = table.as_df().width(),
        "Finished grid feature pipeline"
    );
    Ok(table)
}
