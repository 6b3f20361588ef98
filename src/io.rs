//! CSV ingestion of the raw input tables.

use std::path::Path;

use polars::{
    frame::DataFrame,
    prelude::{LazyCsvReader, LazyFileListReader, PlPath},
};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};
use tracing::debug;

use crate::error::{FeatureResult, IoError};

/// Rows inspected by the CSV reader before fixing column types.
const INFER_SCHEMA_ROWS: usize = 10_000;

/// Input files of the daily sales-grid dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr, EnumIter)]
pub enum GridSource {
    #[strum(serialize = "sales_train_validation.csv")]
    Sales,
    #[strum(serialize = "calendar.csv")]
    Calendar,
    #[strum(serialize = "sell_prices.csv")]
    Prices,
}

/// Input files of the order-log dataset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr, EnumIter)]
pub enum OrderLogSource {
    #[strum(serialize = "olist_orders_dataset.csv")]
    Orders,
    #[strum(serialize = "olist_order_items_dataset.csv")]
    Items,
    #[strum(serialize = "olist_order_payments_dataset.csv")]
    Payments,
    #[strum(serialize = "olist_order_reviews_dataset.csv")]
    Reviews,
    #[strum(serialize = "olist_customers_dataset.csv")]
    Customers,
    #[strum(serialize = "olist_products_dataset.csv")]
    Products,
    #[strum(serialize = "product_category_name_translation.csv")]
    Translations,
}

/// Reads `dir/file` with a header row, up to `n_rows` data rows.
///
/// Fails with [`IoError::ResourceNotFound`] before any parsing when the file
/// does not exist. Column types are inferred; date columns stay strings.
pub fn load_csv(dir: &Path, file: &str, n_rows: Option<usize>) -> FeatureResult<DataFrame> {
    let path = dir.join(file);
    if !path.is_file() {
        return Err(IoError::ResourceNotFound {
            resource: file.to_string(),
            path: path.display().to_string(),
        }
        .into());
    }

    let df = LazyCsvReader::new(PlPath::new(&path_str(&path)?))
        .with_has_header(true)
        .with_n_rows(n_rows)
        .with_infer_schema_length(Some(INFER_SCHEMA_ROWS))
        .finish()
        .and_then(|lf| lf.collect())
        .map_err(|e| IoError::ReadFailed(format!("{}: {e}", path.display())))?;

    debug!(file, rows = df.height(), columns = df.width(), "Loaded CSV");
    Ok(df)
}

fn path_str(path: &Path) -> FeatureResult<String> {
    path.to_str().map(str::to_string).ok_or_else(|| {
        IoError::ReadFailed(format!("non UTF-8 path: {}", path.display())).into()
    })
}
