//! Tiered comparison of per-column statistics between the two platforms.

mod frequency;
mod kinds;
mod quality;
mod schema;
mod stats;
mod value;

pub use frequency::{parse_frequency, render_frequency, FrequencyEntry};
pub use kinds::{
    compare_exact, compare_exact_zero_as_null, compare_flexible, compare_frequency,
    compare_numeric, parse_calendar_date, within_tolerance, ComparisonKind, StatValue,
    DEFAULT_ATOL, DEFAULT_RTOL,
};
pub use quality::{ColumnQuality, ColumnSummary, DEFAULT_KEY_COLUMNS};
pub use schema::{StatField, StatSchema};
pub use stats::{
    ColumnOutcome, ColumnStats, ComparisonResult, StatMismatch, StatRow, StatsComparator, Verdict,
};
pub use value::Scalar;
