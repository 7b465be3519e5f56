use super::kinds::ComparisonKind;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Statistics compared between platforms, in reporting order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatField {
    Count,
    Distinct,
    Min,
    Max,
    Mean,
    Std,
    Sum,
    SumSq,
    Missing,
    Frequency,
}

impl StatField {
    pub const ALL: [StatField; 10] = [
        StatField::Count,
        StatField::Distinct,
        StatField::Min,
        StatField::Max,
        StatField::Mean,
        StatField::Std,
        StatField::Sum,
        StatField::SumSq,
        StatField::Missing,
        StatField::Frequency,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            StatField::Count => "count",
            StatField::Distinct => "distinct",
            StatField::Min => "min",
            StatField::Max => "max",
            StatField::Mean => "mean",
            StatField::Std => "std",
            StatField::Sum => "sum",
            StatField::SumSq => "sum_sq",
            StatField::Missing => "missing",
            StatField::Frequency => "frequency",
        }
    }

    /// Result field carrying this statistic.
    pub fn alias(&self) -> &'static str {
        match self {
            StatField::Count => "col_count",
            StatField::Distinct => "col_distinct",
            StatField::Min => "col_min",
            StatField::Max => "col_max",
            StatField::Mean => "col_avg",
            StatField::Std => "col_std",
            StatField::Sum => "col_sum",
            StatField::SumSq => "col_sum_sq",
            StatField::Missing => "col_missing",
            StatField::Frequency => "col_freq",
        }
    }

    pub fn is_frequency(&self) -> bool {
        matches!(self, StatField::Frequency)
    }

    pub fn default_kind(&self) -> ComparisonKind {
        match self {
            StatField::Count | StatField::Distinct | StatField::Missing => {
                ComparisonKind::ExactWithZeroAsNull
            }
            StatField::Min | StatField::Max => ComparisonKind::flexible_string(),
            StatField::Mean | StatField::Std | StatField::Sum | StatField::SumSq => {
                ComparisonKind::numeric_tolerance()
            }
            StatField::Frequency => ComparisonKind::frequency_list(),
        }
    }
}

impl fmt::Display for StatField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Ordered `field -> kind` table plus schema-wide policies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatSchema {
    pub fields: BTreeMap<StatField, ComparisonKind>,
    /// Legacy zero and cloud NULL are treated as equal for every numeric
    /// statistic, not only for the missing count.
    pub zero_as_null_numeric: bool,
}

impl Default for StatSchema {
    fn default() -> Self {
        Self {
            fields: StatField::ALL.iter().map(|f| (*f, f.default_kind())).collect(),
            zero_as_null_numeric: true,
        }
    }
}

impl StatSchema {
    /// Every statistic gets a kind; unlisted ones fall back to their default.
    pub fn kind_for(&self, field: StatField) -> ComparisonKind {
        self.fields
            .get(&field)
            .copied()
            .unwrap_or_else(|| field.default_kind())
    }

    pub fn with_kind(mut self, field: StatField, kind: ComparisonKind) -> Self {
        self.fields.insert(field, kind);
        self
    }

    /// Sets atol/rtol on every tolerance-bearing kind.
    pub fn with_tolerance(mut self, atol: f64, rtol: f64) -> Self {
        for field in StatField::ALL {
            let kind = match self.kind_for(field) {
                ComparisonKind::NumericTolerance { .. } => {
                    ComparisonKind::NumericTolerance { atol, rtol }
                }
                ComparisonKind::FlexibleString {
                    try_date,
                    try_numeric,
                    ..
                } => ComparisonKind::FlexibleString {
                    try_date,
                    try_numeric,
                    atol,
                    rtol,
                },
                ComparisonKind::FrequencyList { .. } => {
                    ComparisonKind::FrequencyList { atol, rtol }
                }
                other => other,
            };
            self.fields.insert(field, kind);
        }
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (StatField, ComparisonKind)> + '_ {
        StatField::ALL.into_iter().map(move |f| (f, self.kind_for(f)))
    }
}
