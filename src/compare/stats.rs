use super::frequency::{parse_frequency, FrequencyEntry};
use super::kinds::{ComparisonKind, StatValue};
use super::schema::{StatField, StatSchema};
use super::value::Scalar;
use crate::error::{MigCheckError, Result};
use crate::schema::Platform;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, warn};

/// One column's summary statistics on one platform.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatRow {
    pub col_type: Option<String>,
    pub count: Option<Scalar>,
    pub distinct: Option<Scalar>,
    pub min: Option<Scalar>,
    pub max: Option<Scalar>,
    pub mean: Option<Scalar>,
    pub std: Option<Scalar>,
    pub sum: Option<Scalar>,
    pub sum_sq: Option<Scalar>,
    pub missing: Option<Scalar>,
    pub frequency: Option<Vec<FrequencyEntry>>,
}

impl StatRow {
    /// Builds a row from a lower-cased result record. Every statistic alias
    /// must be present; its value may be NULL.
    pub fn from_record(record: &BTreeMap<String, Option<Scalar>>) -> Result<StatRow> {
        let take = |alias: &str| -> Result<Option<Scalar>> {
            record.get(alias).cloned().ok_or_else(|| {
                MigCheckError::MalformedResult(format!("statistics record is missing '{}'", alias))
            })
        };
        let count_like = |alias: &str| -> Result<Option<Scalar>> {
            Ok(take(alias)?.map(Scalar::coerce_int))
        };

        let frequency = match take(StatField::Frequency.alias())? {
            None => None,
            Some(v) => Some(parse_frequency(&v.to_string())),
        };

        Ok(StatRow {
            col_type: take("col_type")?.map(|v| v.to_string()),
            count: count_like(StatField::Count.alias())?,
            distinct: count_like(StatField::Distinct.alias())?,
            min: take(StatField::Min.alias())?,
            max: take(StatField::Max.alias())?,
            mean: take(StatField::Mean.alias())?,
            std: take(StatField::Std.alias())?,
            sum: take(StatField::Sum.alias())?,
            sum_sq: take(StatField::SumSq.alias())?,
            missing: count_like(StatField::Missing.alias())?,
            frequency,
        })
    }

    pub fn get(&self, field: StatField) -> StatValue<'_> {
        match field {
            StatField::Count => StatValue::Scalar(self.count.as_ref()),
            StatField::Distinct => StatValue::Scalar(self.distinct.as_ref()),
            StatField::Min => StatValue::Scalar(self.min.as_ref()),
            StatField::Max => StatValue::Scalar(self.max.as_ref()),
            StatField::Mean => StatValue::Scalar(self.mean.as_ref()),
            StatField::Std => StatValue::Scalar(self.std.as_ref()),
            StatField::Sum => StatValue::Scalar(self.sum.as_ref()),
            StatField::SumSq => StatValue::Scalar(self.sum_sq.as_ref()),
            StatField::Missing => StatValue::Scalar(self.missing.as_ref()),
            StatField::Frequency => StatValue::Frequency(self.frequency.as_deref()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verdict {
    Pass,
    Partial,
    Fail,
}

impl Verdict {
    /// PASS when everything matches, PARTIAL when only the frequency list
    /// differs, FAIL as soon as any other statistic differs.
    pub fn from_buckets(non_frequency_match: bool, frequency_match: bool) -> Self {
        match (non_frequency_match, frequency_match) {
            (true, true) => Verdict::Pass,
            (true, false) => Verdict::Partial,
            (false, _) => Verdict::Fail,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Verdict::Pass => "PASS",
            Verdict::Partial => "PARTIAL",
            Verdict::Fail => "FAIL",
        }
    }
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatMismatch {
    pub statistic: StatField,
    pub left: Option<String>,
    pub right: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparisonResult {
    pub column: String,
    pub per_statistic_match: BTreeMap<StatField, bool>,
    pub mismatches: Vec<StatMismatch>,
    pub verdict: Verdict,
    pub left_type: Option<String>,
    pub right_type: Option<String>,
    pub left_stats: StatRow,
    pub right_stats: StatRow,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum ColumnOutcome {
    Compared(ComparisonResult),
    NotComparable {
        column: String,
        missing_on: Vec<Platform>,
    },
}

impl ColumnOutcome {
    pub fn column(&self) -> &str {
        match self {
            ColumnOutcome::Compared(r) => &r.column,
            ColumnOutcome::NotComparable { column, .. } => column,
        }
    }

    pub fn verdict(&self) -> Option<Verdict> {
        match self {
            ColumnOutcome::Compared(r) => Some(r.verdict),
            ColumnOutcome::NotComparable { .. } => None,
        }
    }
}

/// Statistics for one column on both platforms; `None` where the query
/// failed or returned nothing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnStats {
    pub column: String,
    pub legacy: Option<StatRow>,
    pub cloud: Option<StatRow>,
}

/// Stateless rule engine comparing legacy (left) against cloud (right).
#[derive(Debug, Clone, Default)]
pub struct StatsComparator {
    schema: StatSchema,
}

impl StatsComparator {
    pub fn new(schema: StatSchema) -> Self {
        Self { schema }
    }

    pub fn schema(&self) -> &StatSchema {
        &self.schema
    }

    fn field_matches(
        &self,
        kind: ComparisonKind,
        left: StatValue<'_>,
        right: StatValue<'_>,
    ) -> bool {
        if kind.matches(left, right) {
            return true;
        }
        if self.schema.zero_as_null_numeric && kind.is_numeric() {
            if let (StatValue::Scalar(l), StatValue::Scalar(r)) = (left, right) {
                return match (l, r) {
                    (Some(v), None) | (None, Some(v)) => v.is_zero(),
                    _ => false,
                };
            }
        }
        false
    }

    pub fn compare(
        &self,
        column: &str,
        left: Option<&StatRow>,
        right: Option<&StatRow>,
    ) -> ColumnOutcome {
        let (left, right) = match (left, right) {
            (Some(l), Some(r)) => (l, r),
            _ => {
                let missing_on: Vec<Platform> = [(Platform::Legacy, left), (Platform::Cloud, right)]
                    .into_iter()
                    .filter(|(_, row)| row.is_none())
                    .map(|(p, _)| p)
                    .collect();
                debug!(
                    column = %column,
                    missing = ?missing_on,
                    "Statistics missing, not comparable"
                );
                return ColumnOutcome::NotComparable {
                    column: column.to_string(),
                    missing_on,
                };
            }
        };

        let mut per_statistic_match = BTreeMap::new();
        let mut mismatches = Vec::new();
        for (field, kind) in self.schema.iter() {
            let (l, r) = (left.get(field), right.get(field));
            let matched = self.field_matches(kind, l, r);
            if !matched {
                mismatches.push(StatMismatch {
                    statistic: field,
                    left: l.render(),
                    right: r.render(),
                });
            }
            per_statistic_match.insert(field, matched);
        }

        let non_frequency_match = per_statistic_match
            .iter()
            .filter(|(f, _)| !f.is_frequency())
            .all(|(_, m)| *m);
        let frequency_match = per_statistic_match
            .get(&StatField::Frequency)
            .copied()
            .unwrap_or(true);
        let verdict = Verdict::from_buckets(non_frequency_match, frequency_match);

        if verdict == Verdict::Fail {
            warn!(
                column = %column,
                mismatched = mismatches.len(),
                "Column statistics mismatch"
            );
        }

        ColumnOutcome::Compared(ComparisonResult {
            column: column.to_string(),
            per_statistic_match,
            mismatches,
            verdict,
            left_type: left.col_type.clone(),
            right_type: right.col_type.clone(),
            left_stats: left.clone(),
            right_stats: right.clone(),
        })
    }

    /// Compares many columns in parallel, preserving input order.
    pub fn compare_all(&self, columns: &[ColumnStats]) -> Vec<ColumnOutcome> {
        columns
            .par_iter()
            .map(|c| self.compare(&c.column, c.legacy.as_ref(), c.cloud.as_ref()))
            .collect()
    }
}
