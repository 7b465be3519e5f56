use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One side of a migration: the legacy relational store or the cloud replica.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Legacy,
    Cloud,
}

impl Platform {
    pub const ALL: [Platform; 2] = [Platform::Legacy, Platform::Cloud];

    pub fn name(&self) -> &'static str {
        match self {
            Platform::Legacy => "legacy",
            Platform::Cloud => "cloud",
        }
    }

    pub fn other(&self) -> Platform {
        match self {
            Platform::Legacy => Platform::Cloud,
            Platform::Cloud => Platform::Legacy,
        }
    }

    /// Unquoted identifiers fold to upper case on the legacy side and lower
    /// case on the cloud side.
    pub fn identifier(&self, name: &str) -> String {
        match self {
            Platform::Legacy => name.trim().to_uppercase(),
            Platform::Cloud => name.trim().to_lowercase(),
        }
    }

    pub fn date_literal(&self, date: NaiveDate) -> String {
        match self {
            Platform::Legacy => format!("DATE '{}'", date.format("%Y-%m-%d")),
            Platform::Cloud => format!("from_iso8601_date('{}')", date.format("%Y-%m-%d")),
        }
    }

    /// Expression truncating a temporal column to its calendar day.
    pub fn truncate_to_day(&self, column: &str) -> String {
        match self {
            Platform::Legacy => format!("TRUNC({})", column),
            Platform::Cloud => format!("date_trunc('day', {})", column),
        }
    }

    /// Expression rendering a temporal value as `YYYY-MM-DD`.
    pub fn format_day(&self, expr: &str) -> String {
        match self {
            Platform::Legacy => format!("TO_CHAR({}, 'YYYY-MM-DD')", expr),
            Platform::Cloud => format!("date_format({}, '%Y-%m-%d')", expr),
        }
    }

    /// Null-safe cast of an expression to text.
    pub fn to_text(&self, expr: &str) -> String {
        match self {
            Platform::Legacy => format!("TO_CHAR({})", expr),
            Platform::Cloud => format!("CAST({} AS VARCHAR)", expr),
        }
    }

    pub fn coalesce(&self, expr: &str, fallback: &str) -> String {
        match self {
            Platform::Legacy => format!("NVL({}, {})", expr, fallback),
            Platform::Cloud => format!("COALESCE({}, {})", expr, fallback),
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Platform {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "legacy" | "pcds" | "oracle" => Ok(Platform::Legacy),
            "cloud" | "aws" | "athena" => Ok(Platform::Cloud),
            other => Err(format!("Unknown platform: {}", other)),
        }
    }
}
