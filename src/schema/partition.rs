use super::platform::Platform;
use crate::error::{MigCheckError, Result};
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

static COMPACT_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{8}$").expect("compact date regex is valid"));
static DASHED_DATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^\d{4}-\d{2}-\d{2}( \d{2}:\d{2}:\d{2})?$").expect("dashed date regex is valid")
});
static SLASHED_DATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}/\d{2}/\d{2}$").expect("slashed date regex is valid"));

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Day,
    Week,
    Month,
    Whole,
    Snapshot,
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Granularity::Day => "day",
            Granularity::Week => "week",
            Granularity::Month => "month",
            Granularity::Whole => "whole",
            Granularity::Snapshot => "snapshot",
        };
        f.write_str(s)
    }
}

impl FromStr for Granularity {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "day" | "daily" => Ok(Granularity::Day),
            "week" | "weekly" => Ok(Granularity::Week),
            "month" | "monthly" => Ok(Granularity::Month),
            "whole" | "all" => Ok(Granularity::Whole),
            "snapshot" | "none" => Ok(Granularity::Snapshot),
            other => Err(format!("Unknown granularity: {}", other)),
        }
    }
}

/// Sortable text layouts a string-typed partition column may use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateFormat {
    /// `%Y%m%d`
    Compact,
    /// `%Y-%m-%d`
    Dashed,
    /// `%Y/%m/%d`
    Slashed,
}

impl DateFormat {
    pub fn pattern(&self) -> &'static str {
        match self {
            DateFormat::Compact => "%Y%m%d",
            DateFormat::Dashed => "%Y-%m-%d",
            DateFormat::Slashed => "%Y/%m/%d",
        }
    }

    pub fn render(&self, date: NaiveDate) -> String {
        date.format(self.pattern()).to_string()
    }

    pub fn parse(&self, value: &str) -> Option<NaiveDate> {
        let value = value.trim();
        // Dashed values sometimes arrive with a midnight time part.
        let value = match self {
            DateFormat::Dashed => value.get(..10).unwrap_or(value),
            _ => value,
        };
        NaiveDate::parse_from_str(value, self.pattern()).ok()
    }

    /// Infers the layout from the first non-empty sample value.
    pub fn detect<'a>(samples: impl IntoIterator<Item = &'a str>) -> Option<DateFormat> {
        let first = samples.into_iter().map(str::trim).find(|s| !s.is_empty())?;
        if COMPACT_DATE.is_match(first) {
            Some(DateFormat::Compact)
        } else if DASHED_DATE.is_match(first) {
            Some(DateFormat::Dashed)
        } else if SLASHED_DATE.is_match(first) {
            Some(DateFormat::Slashed)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "format")]
pub enum DateStorage {
    Date,
    Timestamp,
    Text(DateFormat),
}

impl DateStorage {
    /// Derives storage from a platform type string, detecting the text layout
    /// from samples when the column is not natively temporal.
    pub fn infer<'a>(
        data_type: &str,
        samples: impl IntoIterator<Item = &'a str>,
    ) -> Result<DateStorage> {
        let dt = data_type.to_lowercase();
        if dt.contains("timestamp") {
            return Ok(DateStorage::Timestamp);
        }
        if dt.starts_with("date") {
            return Ok(DateStorage::Date);
        }
        DateFormat::detect(samples)
            .map(DateStorage::Text)
            .ok_or_else(|| {
                MigCheckError::InvalidDate(format!(
                    "Cannot detect date layout for partition column of type '{}'",
                    data_type
                ))
            })
    }
}

/// The column a table is partitioned on, as stored on one platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartitionColumn {
    pub name: String,
    pub storage: DateStorage,
}

impl PartitionColumn {
    pub fn new(name: impl Into<String>, storage: DateStorage) -> Self {
        Self {
            name: name.into(),
            storage,
        }
    }

    pub fn identifier(&self, platform: Platform) -> String {
        platform.identifier(&self.name)
    }

    /// Literal for `date` in the column's own storage, in the platform's syntax.
    pub fn literal(&self, platform: Platform, date: NaiveDate) -> String {
        match self.storage {
            DateStorage::Date | DateStorage::Timestamp => platform.date_literal(date),
            DateStorage::Text(fmt) => format!("'{}'", fmt.render(date)),
        }
    }

    /// Expression yielding the calendar day of the column, comparable to
    /// [`PartitionColumn::literal`]. Legacy `DATE` values carry a time part.
    pub fn day_expr(&self, platform: Platform) -> String {
        let ident = self.identifier(platform);
        match (self.storage, platform) {
            (DateStorage::Timestamp, _) | (DateStorage::Date, Platform::Legacy) => {
                platform.truncate_to_day(&ident)
            }
            (DateStorage::Date, Platform::Cloud) | (DateStorage::Text(_), _) => ident,
        }
    }

    /// Expression rendering the column as `YYYY-MM-DD` for grouping output.
    pub fn standard_expr(&self, platform: Platform) -> String {
        let ident = self.identifier(platform);
        match self.storage {
            DateStorage::Date | DateStorage::Timestamp => platform.format_day(&ident),
            DateStorage::Text(DateFormat::Dashed) => ident,
            DateStorage::Text(DateFormat::Compact) => format!(
                "SUBSTR({c}, 1, 4) || '-' || SUBSTR({c}, 5, 2) || '-' || SUBSTR({c}, 7, 2)",
                c = ident
            ),
            DateStorage::Text(DateFormat::Slashed) => format!("REPLACE({}, '/', '-')", ident),
        }
    }

    pub fn parse_value(&self, value: &str) -> Option<NaiveDate> {
        match self.storage {
            DateStorage::Text(fmt) => fmt.parse(value),
            DateStorage::Date | DateStorage::Timestamp => DateFormat::Dashed.parse(value),
        }
    }
}
