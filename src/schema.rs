//! Column vocabularies for the raw inputs and the produced feature tables.

use strum::{Display, EnumIter, EnumString, IntoEnumIterator, IntoStaticStr};

use crate::config::{Lag, Window};

// ================================================================================================
// Grid Inputs
// ================================================================================================

/// Columns of the wide daily sales grid and of its long reshape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum SalesCol {
    // === Identifiers ===
    /// Series identifier, unique per (item, store) pair.
    Id,
    ItemId,
    DeptId,
    CatId,
    StoreId,
    StateId,

    // === Long format ===
    /// Opaque day code (`d_1`, `d_2`, ...) resolved against the calendar.
    D,
    /// Units sold for the series on that day.
    Sales,
}

crate::impl_column_name!(SalesCol);

impl SalesCol {
    /// Identifier columns kept fixed by the wide-to-long reshape.
    pub fn identifiers() -> [SalesCol; 6] {
        [
            SalesCol::Id,
            SalesCol::ItemId,
            SalesCol::DeptId,
            SalesCol::CatId,
            SalesCol::StoreId,
            SalesCol::StateId,
        ]
    }
}

/// Columns taken from the calendar reference table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr, EnumIter)]
pub enum CalendarCol {
    #[strum(serialize = "d")]
    D,
    #[strum(serialize = "date")]
    Date,
    /// Retailer week identifier, the join key into the price table.
    #[strum(serialize = "wm_yr_wk")]
    WmYrWk,
    #[strum(serialize = "weekday")]
    Weekday,
    #[strum(serialize = "wday")]
    Wday,
    #[strum(serialize = "month")]
    Month,
    #[strum(serialize = "year")]
    Year,
    #[strum(serialize = "event_name_1")]
    EventName1,
    #[strum(serialize = "event_type_1")]
    EventType1,
    #[strum(serialize = "snap_CA")]
    SnapCa,
    #[strum(serialize = "snap_TX")]
    SnapTx,
    #[strum(serialize = "snap_WI")]
    SnapWi,
}

crate::impl_column_name!(CalendarCol);

impl CalendarCol {
    pub fn all_names() -> Vec<&'static str> {
        CalendarCol::iter().map(|c| c.as_str()).collect()
    }
}

/// Columns of the weekly price table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum PriceCol {
    StoreId,
    ItemId,
    WmYrWk,
    SellPrice,
}

crate::impl_column_name!(PriceCol);

impl PriceCol {
    pub fn all_names() -> Vec<&'static str> {
        PriceCol::iter().map(|c| c.as_str()).collect()
    }

    /// Composite key of a price record.
    pub fn keys() -> [&'static str; 3] {
        [
            PriceCol::StoreId.as_str(),
            PriceCol::ItemId.as_str(),
            PriceCol::WmYrWk.as_str(),
        ]
    }
}

// ================================================================================================
// Order-Log Inputs
// ================================================================================================

/// Columns referenced from the normalized order-log tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum OrderCol {
    // === Keys ===
    OrderId,
    CustomerId,
    ProductId,

    // === Orders ===
    OrderPurchaseTimestamp,

    // === Customers ===
    CustomerUniqueId,
    CustomerZipCodePrefix,

    // === Payments ===
    PaymentType,
    PaymentInstallments,
    PaymentValue,

    // === Reviews ===
    ReviewScore,

    // === Products ===
    ProductCategoryName,
    ProductCategoryNameEnglish,
    ProductWeightG,
    ProductLengthCm,
    ProductHeightCm,
    ProductWidthCm,
}

crate::impl_column_name!(OrderCol);

// ================================================================================================
// Derived Features
// ================================================================================================

/// Derived columns with fixed names. Lag and rolling columns are named by
/// [`lag_col`], [`rolling_mean_col`] and [`rolling_std_col`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr, EnumIter)]
#[strum(serialize_all = "snake_case")]
pub enum FeatureCol {
    // === Calendar ===
    /// 0 = Monday .. 6 = Sunday.
    #[strum(serialize = "dayofweek")]
    DayOfWeek,
    /// ISO-8601 week number (1..=53).
    #[strum(serialize = "weekofyear")]
    WeekOfYear,
    IsWeekend,

    // === Price ===
    AvgSellPrice,
    RelPrice,

    // === Order-log demand ===
    OrderDate,
    Units,
    CategoryEn,

    // === Per-product statics ===
    AvgPrice,
    AvgReview,
    AvgWeight,
    AvgLength,
    AvgHeight,
    AvgWidth,
    NOrders,
}

crate::impl_column_name!(FeatureCol);

pub fn lag_col(lag: Lag) -> String {
    format!("lag_{}", lag.0)
}

pub fn rolling_mean_col(window: Window) -> String {
    format!("rolling_mean_{}", window.0)
}

pub fn rolling_std_col(window: Window) -> String {
    format!("rolling_std_{}", window.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_calendar_names_match_source_headers() {
        assert_eq!(
            CalendarCol::all_names(),
            vec![
                "d",
                "date",
                "wm_yr_wk",
                "weekday",
                "wday",
                "month",
                "year",
                "event_name_1",
                "event_type_1",
                "snap_CA",
                "snap_TX",
                "snap_WI",
            ]
        );
    }

    #[test]
    fn test_feature_names() {
        assert_eq!(FeatureCol::DayOfWeek.as_str(), "dayofweek");
        assert_eq!(FeatureCol::WeekOfYear.as_str(), "weekofyear");
        assert_eq!(FeatureCol::IsWeekend.as_str(), "is_weekend");
        assert_eq!(FeatureCol::NOrders.as_str(), "n_orders");
        assert_eq!(OrderCol::ProductWeightG.as_str(), "product_weight_g");
        assert_eq!(lag_col(Lag(365)), "lag_365");
        assert_eq!(rolling_std_col(Window(28)), "rolling_std_28");
    }
}
