use super::frequency::{parse_frequency, render_frequency, FrequencyEntry};
use super::value::Scalar;
use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;

pub const DEFAULT_ATOL: f64 = 1e-6;
pub const DEFAULT_RTOL: f64 = 1e-6;

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y/%m/%d", "%d-%m-%Y", "%d/%m/%Y", "%Y%m%d"];
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y/%m/%d %H:%M:%S",
];
const LEGACY_DEFAULT_DATE: &str = "%d-%b-%y";

/// How two values of one statistic are judged equal.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum ComparisonKind {
    Exact,
    ExactWithZeroAsNull,
    NumericTolerance {
        #[serde(default = "default_atol")]
        atol: f64,
        #[serde(default = "default_rtol")]
        rtol: f64,
    },
    FlexibleString {
        #[serde(default = "default_true")]
        try_date: bool,
        #[serde(default = "default_true")]
        try_numeric: bool,
        #[serde(default = "default_atol")]
        atol: f64,
        #[serde(default = "default_rtol")]
        rtol: f64,
    },
    FrequencyList {
        #[serde(default = "default_atol")]
        atol: f64,
        #[serde(default = "default_rtol")]
        rtol: f64,
    },
}

fn default_atol() -> f64 {
    DEFAULT_ATOL
}

fn default_rtol() -> f64 {
    DEFAULT_RTOL
}

fn default_true() -> bool {
    true
}

impl ComparisonKind {
    pub fn numeric_tolerance() -> Self {
        ComparisonKind::NumericTolerance {
            atol: DEFAULT_ATOL,
            rtol: DEFAULT_RTOL,
        }
    }

    pub fn flexible_string() -> Self {
        ComparisonKind::FlexibleString {
            try_date: true,
            try_numeric: true,
            atol: DEFAULT_ATOL,
            rtol: DEFAULT_RTOL,
        }
    }

    pub fn frequency_list() -> Self {
        ComparisonKind::FrequencyList {
            atol: DEFAULT_ATOL,
            rtol: DEFAULT_RTOL,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ComparisonKind::Exact => "exact",
            ComparisonKind::ExactWithZeroAsNull => "exact_with_zero_as_null",
            ComparisonKind::NumericTolerance { .. } => "numeric_tolerance",
            ComparisonKind::FlexibleString { .. } => "flexible_string",
            ComparisonKind::FrequencyList { .. } => "frequency_list",
        }
    }

    /// `(atol, rtol)` for tolerance-bearing kinds.
    pub fn tolerances(&self) -> Option<(f64, f64)> {
        match *self {
            ComparisonKind::NumericTolerance { atol, rtol }
            | ComparisonKind::FlexibleString { atol, rtol, .. }
            | ComparisonKind::FrequencyList { atol, rtol } => Some((atol, rtol)),
            ComparisonKind::Exact | ComparisonKind::ExactWithZeroAsNull => None,
        }
    }

    /// Whether the kind reads its operands as numbers.
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            ComparisonKind::ExactWithZeroAsNull | ComparisonKind::NumericTolerance { .. }
        )
    }

    pub fn matches(&self, left: StatValue<'_>, right: StatValue<'_>) -> bool {
        match self {
            ComparisonKind::Exact => {
                compare_exact(left.as_scalar().as_deref(), right.as_scalar().as_deref())
            }
            ComparisonKind::ExactWithZeroAsNull => compare_exact_zero_as_null(
                left.as_scalar().as_deref(),
                right.as_scalar().as_deref(),
            ),
            ComparisonKind::NumericTolerance { atol, rtol } => compare_numeric(
                left.as_scalar().as_deref(),
                right.as_scalar().as_deref(),
                *atol,
                *rtol,
            ),
            ComparisonKind::FlexibleString {
                try_date,
                try_numeric,
                atol,
                rtol,
            } => compare_flexible(
                left.as_scalar().as_deref(),
                right.as_scalar().as_deref(),
                *try_date,
                *try_numeric,
                *atol,
                *rtol,
            ),
            ComparisonKind::FrequencyList { atol, rtol } => compare_frequency(
                left.as_frequency().as_deref(),
                right.as_frequency().as_deref(),
                *atol,
                *rtol,
            ),
        }
    }
}

/// A statistic as seen by a comparison kind.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StatValue<'a> {
    Scalar(Option<&'a Scalar>),
    Frequency(Option<&'a [FrequencyEntry]>),
}

impl<'a> StatValue<'a> {
    pub fn as_scalar(&self) -> Option<Cow<'a, Scalar>> {
        match *self {
            StatValue::Scalar(s) => s.map(Cow::Borrowed),
            StatValue::Frequency(f) => {
                f.map(|entries| Cow::Owned(Scalar::Text(render_frequency(entries))))
            }
        }
    }

    pub fn as_frequency(&self) -> Option<Cow<'a, [FrequencyEntry]>> {
        match *self {
            StatValue::Frequency(f) => f.map(Cow::Borrowed),
            StatValue::Scalar(s) => s.map(|v| Cow::Owned(parse_frequency(&v.to_string()))),
        }
    }

    pub fn render(&self) -> Option<String> {
        self.as_scalar().map(|s| s.to_string())
    }
}

pub fn compare_exact(left: Option<&Scalar>, right: Option<&Scalar>) -> bool {
    match (left, right) {
        (None, None) => true,
        (Some(l), Some(r)) => l.exact_eq(r),
        _ => false,
    }
}

/// Exact comparison that also treats zero on one side and NULL on the other
/// as equal.
pub fn compare_exact_zero_as_null(left: Option<&Scalar>, right: Option<&Scalar>) -> bool {
    match (left, right) {
        (Some(v), None) | (None, Some(v)) if v.is_zero() => true,
        _ => compare_exact(left, right),
    }
}

/// `|a - b| <= atol + rtol * |b|`; unparseable operands are unequal.
pub fn within_tolerance(a: f64, b: f64, atol: f64, rtol: f64) -> bool {
    (a - b).abs() <= atol + rtol * b.abs()
}

pub fn compare_numeric(
    left: Option<&Scalar>,
    right: Option<&Scalar>,
    atol: f64,
    rtol: f64,
) -> bool {
    match (left, right) {
        (None, None) => true,
        (Some(l), Some(r)) => match (l.as_f64(), r.as_f64()) {
            (Some(a), Some(b)) => within_tolerance(a, b, atol, rtol),
            _ => false,
        },
        _ => false,
    }
}

pub fn parse_calendar_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
                .map(|dt| dt.date())
        })
        .or_else(|| NaiveDate::parse_from_str(value, LEGACY_DEFAULT_DATE).ok())
}

/// Dates compare as calendar days, then numbers within tolerance, then text
/// case-sensitively.
pub fn compare_flexible(
    left: Option<&Scalar>,
    right: Option<&Scalar>,
    try_date: bool,
    try_numeric: bool,
    atol: f64,
    rtol: f64,
) -> bool {
    let (l, r) = match (left, right) {
        (None, None) => return true,
        (Some(l), Some(r)) => (l, r),
        _ => return false,
    };

    let (ls, rs) = (l.to_string(), r.to_string());
    if try_date {
        if let (Some(a), Some(b)) = (parse_calendar_date(&ls), parse_calendar_date(&rs)) {
            return a == b;
        }
    }
    if try_numeric {
        if let (Some(a), Some(b)) = (l.as_f64(), r.as_f64()) {
            return within_tolerance(a, b, atol, rtol);
        }
    }
    ls == rs
}

/// Order-sensitive elementwise comparison. A missing list and an empty list
/// both mean "no distribution".
pub fn compare_frequency(
    left: Option<&[FrequencyEntry]>,
    right: Option<&[FrequencyEntry]>,
    atol: f64,
    rtol: f64,
) -> bool {
    let left = left.unwrap_or_default();
    let right = right.unwrap_or_default();
    if left.len() != right.len() {
        return false;
    }
    left.iter().zip(right).all(|(l, r)| {
        let value_eq = compare_flexible(
            Some(&Scalar::Text(l.value.clone())),
            Some(&Scalar::Text(r.value.clone())),
            true,
            true,
            atol,
            rtol,
        );
        let count_eq = match (l.count, r.count) {
            (Some(a), Some(b)) => within_tolerance(a as f64, b as f64, atol, rtol),
            _ => false,
        };
        value_eq && count_eq
    })
}
