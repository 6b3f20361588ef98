use std::path::Path;

use polars::{frame::DataFrame, prelude::PlSmallStr};
use tracing::info;

use crate::{
    aggregate::{AggSpec, aggregate},
    assemble::{FeatureTable, assemble},
    config::OrderLogPipelineConfig,
    error::FeatureResult,
    frame::polars_err,
    io::{OrderLogSource, load_csv},
    join::{JoinSpec, join},
    pipeline::project,
    reshape::daily_counts,
    schema::{FeatureCol, OrderCol},
    temporal::with_date_column,
    window::LagWindowEngine,
};

/// Raw tables of the order-log dataset.
#[derive(Debug, Clone)]
pub struct OrderLogInputs {
    pub orders: DataFrame,
    /// One row per item of an order; the grain demand is counted at.
    pub items: DataFrame,
    pub payments: DataFrame,
    pub reviews: DataFrame,
    pub customers: DataFrame,
    pub products: DataFrame,
    /// Category names in the source language mapped to English.
    pub translations: DataFrame,
}

impl OrderLogInputs {
    pub fn load(dir: impl AsRef<Path>) -> FeatureResult<Self> {
        let dir = dir.as_ref();
        let load = |source: OrderLogSource| load_csv(dir, source.into(), None);
        Ok(Self {
            orders: load(OrderLogSource::Orders)?,
            items: load(OrderLogSource::Items)?,
            payments: load(OrderLogSource::Payments)?,
            reviews: load(OrderLogSource::Reviews)?,
            customers: load(OrderLogSource::Customers)?,
            products: load(OrderLogSource::Products)?,
            translations: load(OrderLogSource::Translations)?,
        })
    }
}

pub fn run_from_dir(
    dir: impl AsRef<Path>,
    cfg: &OrderLogPipelineConfig,
) -> FeatureResult<FeatureTable> {
    cfg.validate()?;
    let inputs = OrderLogInputs::load(dir)?;
    run(&inputs, cfg)
}

/// Builds one row per (product, order date) with daily units, lags of units and
/// per-product statics.
///
/// Units count item rows per day before payments and reviews are attached, so a
/// split payment does not inflate demand. The statics are computed over the fully
/// joined rows, where an item is repeated once per payment and review of its order.
#[tracing::instrument(skip_all)]
pub fn run(inputs: &OrderLogInputs, cfg: &OrderLogPipelineConfig) -> FeatureResult<FeatureTable> {
    cfg.validate()?;
    info!(items = inputs.items.height(), "Starting order-log feature pipeline");

    let order_id = OrderCol::OrderId.as_str();
    let customer_id = OrderCol::CustomerId.as_str();
    let product_id = OrderCol::ProductId.as_str();
    let order_date = FeatureCol::OrderDate.as_str();
    let units = FeatureCol::Units.as_str();

    let products = products_with_category(inputs)?;

    let orders = project(
        &inputs.orders,
        "orders",
        &[
            order_id,
            customer_id,
            OrderCol::OrderPurchaseTimestamp.as_str(),
        ],
    )?;
    let customers = project(
        &inputs.customers,
        "customers",
        &[
            customer_id,
            OrderCol::CustomerUniqueId.as_str(),
            OrderCol::CustomerZipCodePrefix.as_str(),
        ],
    )?;

    // Items without a known order or customer have no purchase date and are dropped.
    let items = join(
        &inputs.items,
        &orders,
        &JoinSpec::unique("orders", &[order_id]).inner(),
    )?;
    let items = join(
        &items,
        &customers,
        &JoinSpec::unique("customers", &[customer_id]).inner(),
    )?;
    let items = join(&items, &products, &JoinSpec::unique("products", &[product_id]))?;
    let items = with_date_column(
        items,
        "order_items",
        OrderCol::OrderPurchaseTimestamp.as_str(),
        order_date,
    )?;

    let demand = daily_counts(&items, "order_items", product_id, order_date, units)?;
    let demand = LagWindowEngine::new(&cfg.lags).compute(
        &demand,
        "demand",
        &[product_id],
        order_date,
        units,
    )?;

    let payments = project(
        &inputs.payments,
        "payments",
        &[
            order_id,
            OrderCol::PaymentType.as_str(),
            OrderCol::PaymentInstallments.as_str(),
            OrderCol::PaymentValue.as_str(),
        ],
    )?;
    let reviews = project(
        &inputs.reviews,
        "reviews",
        &[order_id, OrderCol::ReviewScore.as_str()],
    )?;
    let order_rows = join(&items, &payments, &JoinSpec::fan_out("payments", &[order_id]))?;
    let order_rows = join(&order_rows, &reviews, &JoinSpec::fan_out("reviews", &[order_id]))?;

    let statics = aggregate(
        &order_rows,
        "order_rows",
        &[product_id],
        &[
            AggSpec::mean(OrderCol::PaymentValue.as_str(), FeatureCol::AvgPrice.as_str()),
            AggSpec::mean(OrderCol::ReviewScore.as_str(), FeatureCol::AvgReview.as_str()),
            AggSpec::mean(OrderCol::ProductWeightG.as_str(), FeatureCol::AvgWeight.as_str()),
            AggSpec::mean(OrderCol::ProductLengthCm.as_str(), FeatureCol::AvgLength.as_str()),
            AggSpec::mean(OrderCol::ProductHeightCm.as_str(), FeatureCol::AvgHeight.as_str()),
            AggSpec::mean(OrderCol::ProductWidthCm.as_str(), FeatureCol::AvgWidth.as_str()),
            AggSpec::n_unique(order_id, FeatureCol::NOrders.as_str()),
        ],
    )?;

    let table = assemble(demand, Some(&statics), &[product_id], order_date)?;
    info!(
        rows = table.height(),
        products = statics.height(),
        "Finished order-log feature pipeline"
    );
    Ok(table)
}

/// Product attributes with the English category name as `category_en`.
fn products_with_category(inputs: &OrderLogInputs) -> FeatureResult<DataFrame> {
    let category = OrderCol::ProductCategoryName.as_str();
    let english = OrderCol::ProductCategoryNameEnglish.as_str();

    let translations = project(&inputs.translations, "translations", &[category, english])?;
    let mut products = join(
        &inputs.products,
        &translations,
        &JoinSpec::unique("translations", &[category]),
    )?;

    let category_en = products
        .column(english)
        .map_err(|e| polars_err("products: read english category", e))?
        .clone()
        .with_name(PlSmallStr::from(FeatureCol::CategoryEn.as_str()));
    products
        .with_column(category_en)
        .map_err(|e| polars_err("products: attach category_en", e))?;

    project(
        &products,
        "products",
        &[
            OrderCol::ProductId.as_str(),
            FeatureCol::CategoryEn.as_str(),
            OrderCol::ProductWeightG.as_str(),
            OrderCol::ProductLengthCm.as_str(),
            OrderCol::ProductHeightCm.as_str(),
            OrderCol::ProductWidthCm.as_str(),
        ],
    )
}
