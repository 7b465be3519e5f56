use super::stats::{ColumnOutcome, Verdict};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeMap;

pub const DEFAULT_KEY_COLUMNS: usize = 5;

/// How one column fared across every vintage examined.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumnSummary {
    pub vintages: usize,
    pub passed: usize,
    pub partial: usize,
    pub failed: usize,
    pub not_comparable: usize,
    /// Highest legacy-side distinct count observed.
    pub max_distinct: Option<f64>,
}

impl ColumnSummary {
    pub fn is_clean(&self, total_vintages: usize) -> bool {
        total_vintages > 0 && self.vintages == total_vintages && self.passed == total_vintages
    }
}

/// Column quality over all vintages of a table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ColumnQuality {
    pub total_vintages: usize,
    pub clean_columns: Vec<String>,
    pub mismatched_columns: Vec<String>,
    pub key_columns: Vec<String>,
    pub columns: BTreeMap<String, ColumnSummary>,
}

fn summarize(column: &str, vintages: &BTreeMap<String, Vec<ColumnOutcome>>) -> ColumnSummary {
    let mut summary = ColumnSummary::default();
    for outcomes in vintages.values() {
        let Some(outcome) = outcomes.iter().find(|o| o.column() == column) else {
            continue;
        };
        summary.vintages += 1;
        match outcome {
            ColumnOutcome::Compared(result) => {
                match result.verdict {
                    Verdict::Pass => summary.passed += 1,
                    Verdict::Partial => summary.partial += 1,
                    Verdict::Fail => summary.failed += 1,
                }
                if let Some(d) = result.left_stats.distinct.as_ref().and_then(|d| d.as_f64()) {
                    summary.max_distinct = Some(summary.max_distinct.map_or(d, |m| m.max(d)));
                }
            }
            ColumnOutcome::NotComparable { .. } => summary.not_comparable += 1,
        }
    }
    summary
}

impl ColumnQuality {
    /// A column is clean when it was compared in every vintage and passed
    /// each time. Key columns are the clean columns with the most distinct
    /// values, ties broken by name.
    pub fn analyze(
        columns: &[String],
        vintages: &BTreeMap<String, Vec<ColumnOutcome>>,
        key_count: usize,
    ) -> Self {
        let total_vintages = vintages.len();
        let summaries: BTreeMap<String, ColumnSummary> = columns
            .par_iter()
            .map(|c| (c.clone(), summarize(c, vintages)))
            .collect();

        let (clean, mismatched): (Vec<_>, Vec<_>) = summaries
            .iter()
            .partition(|(_, s)| s.is_clean(total_vintages));
        let clean_columns: Vec<String> = clean.iter().map(|(c, _)| (*c).clone()).collect();
        let mismatched_columns: Vec<String> =
            mismatched.iter().map(|(c, _)| (*c).clone()).collect();

        let mut ranked: Vec<(&String, &ColumnSummary)> = clean;
        ranked.sort_by(|(a_name, a), (b_name, b)| {
            let a_d = a.max_distinct.unwrap_or(f64::MIN);
            let b_d = b.max_distinct.unwrap_or(f64::MIN);
            b_d.partial_cmp(&a_d)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a_name.cmp(b_name))
        });
        let key_columns = ranked
            .into_iter()
            .take(key_count)
            .map(|(c, _)| c.clone())
            .collect();

        Self {
            total_vintages,
            clean_columns,
            mismatched_columns,
            key_columns,
            columns: summaries,
        }
    }
}
