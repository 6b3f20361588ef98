//! Calendar features derived from a date, and date parsing.
//!
//! Weekday convention: 0 = Monday .. 6 = Sunday. Weekend = Saturday or Sunday.
//! Week of year follows ISO-8601 (week 1 holds the year's first Thursday).

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, TimeDelta, Utc};
use polars::{
    frame::DataFrame,
    prelude::{Column, DataType, NamedFrom, PlSmallStr},
};

use crate::{
    error::{DataError, FeatureResult},
    frame::{DataFrameExt, polars_err},
    schema::FeatureCol,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CalendarFeatures {
    pub day_of_week: u32,
    pub is_weekend: bool,
    pub week_of_year: u32,
}

pub fn calendar_features(date: NaiveDate) -> CalendarFeatures {
    let day_of_week = date.weekday().num_days_from_monday();
    CalendarFeatures {
        day_of_week,
        is_weekend: day_of_week >= 5,
        week_of_year: date.iso_week().week(),
    }
}

/// Parses `YYYY-MM-DD`, optionally followed by a time of day
/// (`YYYY-MM-DD HH:MM:SS` or `YYYY-MM-DDTHH:MM:SS`); the time is discarded.
pub fn parse_date(column: &str, raw: &str) -> FeatureResult<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|t| t.date()))
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S").map(|t| t.date()))
        .map_err(|_| {
            DataError::DateParse {
                column: column.to_string(),
                value: raw.to_string(),
            }
            .into()
        })
}

pub(crate) fn epoch_days(date: NaiveDate) -> i32 {
    // Dates representable by chrono span well inside i32 days.
    (date - DateTime::<Utc>::UNIX_EPOCH.date_naive()).num_days() as i32
}

pub(crate) fn from_epoch_days(days: i32) -> Option<NaiveDate> {
    DateTime::<Utc>::UNIX_EPOCH
        .date_naive()
        .checked_add_signed(TimeDelta::days(i64::from(days)))
}

/// Writes `target` as a `Date` column derived from `source`.
///
/// String sources are parsed with [`parse_date`]; a malformed value fails the
/// whole call. `Date` sources are copied, `Datetime` sources truncated to the day.
/// Missing values stay missing.
pub fn with_date_column(
    mut df: DataFrame,
    table: &str,
    source: &str,
    target: &str,
) -> FeatureResult<DataFrame> {
    let src = df.column(source).map_err(|_| DataError::MissingColumn {
        column: source.to_string(),
        table: table.to_string(),
    })?;

    let dates = match src.dtype() {
        DataType::Date | DataType::Datetime(_, _) => src
            .cast(&DataType::Date)
            .map_err(|e| polars_err(&format!("cast {table}.{source} to Date"), e))?
            .with_name(PlSmallStr::from(target)),
        _ => {
            let raw = df.key_values(table, source)?;
            let days = raw
                .iter()
                .map(|v| {
                    v.as_deref()
                        .map(|s| parse_date(source, s).map(epoch_days))
                        .transpose()
                })
                .collect::<FeatureResult<Vec<Option<i32>>>>()?;
            Column::new(PlSmallStr::from(target), days)
                .cast(&DataType::Date)
                .map_err(|e| polars_err("build Date column", e))?
        }
    };

    df.with_column(dates)
        .map_err(|e| polars_err(&format!("attach {target} to {table}"), e))?;
    Ok(df)
}

/// Adds `dayofweek` (Int32), `weekofyear` (Int32) and `is_weekend` (Boolean)
/// computed from the `Date` column `date_col`. Rows without a date get missing
/// features.
#[tracing::instrument(skip_all, fields(rows = df.height()))]
pub fn add_calendar_features(
    df: &DataFrame,
    table: &str,
    date_col: &str,
) -> FeatureResult<DataFrame> {
    let days = df.date_days(table, date_col)?;

    let mut dow = Vec::with_capacity(days.len());
    let mut woy = Vec::with_capacity(days.len());
    let mut weekend = Vec::with_capacity(days.len());
    for d in days {
        let f = d.and_then(from_epoch_days).map(calendar_features);
        dow.push(f.map(|f| f.day_of_week as i32));
        woy.push(f.map(|f| f.week_of_year as i32));
        weekend.push(f.map(|f| f.is_weekend));
    }

    df.hstack(&[
        Column::new(FeatureCol::DayOfWeek.name(), dow),
        Column::new(FeatureCol::WeekOfYear.name(), woy),
        Column::new(FeatureCol::IsWeekend.name(), weekend),
    ])
    .map_err(|e| polars_err("attach calendar features", e))
}
