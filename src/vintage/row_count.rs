use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateMismatch {
    pub date: NaiveDate,
    pub legacy_count: u64,
    pub cloud_count: u64,
}

/// Per-date row counts of both platforms compared over the union of dates.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowCountComparison {
    pub total_days: usize,
    pub matched_days: usize,
    pub legacy_total: u64,
    pub cloud_total: u64,
    pub mismatches: Vec<DateMismatch>,
    pub row_match_all: bool,
}

impl RowCountComparison {
    /// A date missing on one side counts as zero rows there.
    pub fn compare(legacy: &BTreeMap<NaiveDate, u64>, cloud: &BTreeMap<NaiveDate, u64>) -> Self {
        let all_dates: BTreeSet<NaiveDate> = legacy.keys().chain(cloud.keys()).copied().collect();

        let mismatches: Vec<DateMismatch> = all_dates
            .iter()
            .filter_map(|date| {
                let legacy_count = legacy.get(date).copied().unwrap_or(0);
                let cloud_count = cloud.get(date).copied().unwrap_or(0);
                (legacy_count != cloud_count).then_some(DateMismatch {
                    date: *date,
                    legacy_count,
                    cloud_count,
                })
            })
            .collect();

        let total_days = all_dates.len();
        let matched_days = total_days - mismatches.len();
        Self {
            total_days,
            matched_days,
            legacy_total: legacy.values().sum(),
            cloud_total: cloud.values().sum(),
            row_match_all: total_days > 0 && matched_days == total_days,
            mismatches,
        }
    }

    /// Unpartitioned tables compare a single total.
    pub fn compare_totals(legacy_total: u64, cloud_total: u64) -> Self {
        let matched = legacy_total == cloud_total;
        Self {
            total_days: 0,
            matched_days: 0,
            legacy_total,
            cloud_total,
            mismatches: Vec::new(),
            row_match_all: matched,
        }
    }

    pub fn mismatched_dates(&self) -> BTreeSet<NaiveDate> {
        self.mismatches.iter().map(|m| m.date).collect()
    }

    pub fn mismatch_rate(&self) -> f64 {
        if self.total_days == 0 {
            0.0
        } else {
            self.mismatches.len() as f64 / self.total_days as f64
        }
    }
}
