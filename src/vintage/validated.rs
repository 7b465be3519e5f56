use super::row_count::RowCountComparison;
use super::window::{align_windows, exclusion_predicate, Vintage, VintageBuilder, Window};
use crate::compiler::and_predicates;
use crate::schema::{Granularity, PartitionColumn, Platform};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use tracing::{debug, info, warn};

/// What one platform knows about a table before vintages are validated.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSide {
    pub accessible: bool,
    pub partition: Option<PartitionColumn>,
    pub base_filter: Option<String>,
    #[serde(default)]
    pub row_counts: BTreeMap<NaiveDate, u64>,
    /// Set for unpartitioned tables.
    #[serde(default)]
    pub total_rows: Option<u64>,
}

impl TableSide {
    pub fn partitioned(partition: PartitionColumn, row_counts: BTreeMap<NaiveDate, u64>) -> Self {
        Self {
            accessible: true,
            partition: Some(partition),
            base_filter: None,
            row_counts,
            total_rows: None,
        }
    }

    pub fn unpartitioned(total_rows: u64) -> Self {
        Self {
            accessible: true,
            total_rows: Some(total_rows),
            ..Default::default()
        }
    }

    pub fn inaccessible() -> Self {
        Self::default()
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.base_filter = Some(filter.into());
        self
    }
}

/// A vintage ready for statistics and hash queries: window, base filter and
/// mismatched-date exclusion composed per platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatedVintage {
    pub label: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub legacy_filter: String,
    pub cloud_filter: String,
    pub excluded_dates: Vec<NaiveDate>,
    pub fingerprint: String,
}

impl ValidatedVintage {
    pub fn filter(&self, platform: Platform) -> &str {
        match platform {
            Platform::Legacy => &self.legacy_filter,
            Platform::Cloud => &self.cloud_filter,
        }
    }

    fn window(&self) -> Window {
        Window {
            label: self.label.clone(),
            start: self.start_date,
            end: self.end_date,
        }
    }

    /// True once the mismatched dates inside this window differ from the set
    /// the filters were composed with.
    pub fn is_stale(&self, current: &RowCountComparison) -> bool {
        let window = self.window();
        let in_window: Vec<NaiveDate> = current
            .mismatched_dates()
            .into_iter()
            .filter(|d| window.contains(*d))
            .collect();
        fingerprint(&in_window) != self.fingerprint
    }
}

/// sha256 over the sorted, de-duplicated `YYYY-MM-DD` dates.
pub fn fingerprint(dates: &[NaiveDate]) -> String {
    let sorted: BTreeSet<&NaiveDate> = dates.iter().collect();
    let mut hasher = Sha256::new();
    for date in sorted {
        hasher.update(date.format("%Y-%m-%d").to_string().as_bytes());
        hasher.update(b"\n");
    }
    format!("{:x}", hasher.finalize())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum ExclusionReason {
    NotAccessible { platform: Platform },
    NoOverlap,
    /// A partition date too close to the calendar limit to bound a window.
    OutOfRange,
}

impl fmt::Display for ExclusionReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExclusionReason::NotAccessible { platform } => {
                write!(f, "not accessible on {}", platform)
            }
            ExclusionReason::NoOverlap => f.write_str("no overlapping vintage"),
            ExclusionReason::OutOfRange => f.write_str("vintage bounds out of range"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableValidation {
    pub table: String,
    pub granularity: Granularity,
    pub row_counts: RowCountComparison,
    pub vintages: Vec<ValidatedVintage>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum TableOutcome {
    Validated(TableValidation),
    Excluded {
        table: String,
        reason: ExclusionReason,
    },
}

impl TableOutcome {
    pub fn table(&self) -> &str {
        match self {
            TableOutcome::Validated(v) => &v.table,
            TableOutcome::Excluded { table, .. } => table,
        }
    }

    pub fn vintages(&self) -> &[ValidatedVintage] {
        match self {
            TableOutcome::Validated(v) => &v.vintages,
            TableOutcome::Excluded { .. } => &[],
        }
    }
}

fn compose_filter(
    platform: Platform,
    vintage: &Vintage,
    side: &TableSide,
    excluded: &[NaiveDate],
) -> String {
    let exclusion = side
        .partition
        .as_ref()
        .and_then(|col| exclusion_predicate(platform, col, excluded))
        .unwrap_or_default();
    and_predicates([
        vintage.predicate(platform),
        side.base_filter.as_deref().unwrap_or_default(),
        exclusion.as_str(),
    ])
}

/// Aligns both platforms' vintages and composes their filters, excluding
/// the table when it cannot be compared at all.
pub fn validate_table(
    table: &str,
    granularity: Granularity,
    legacy: &TableSide,
    cloud: &TableSide,
) -> TableOutcome {
    for (platform, side) in [(Platform::Legacy, legacy), (Platform::Cloud, cloud)] {
        if !side.accessible {
            warn!(table = %table, platform = %platform, "Table not accessible, excluding");
            return TableOutcome::Excluded {
                table: table.to_string(),
                reason: ExclusionReason::NotAccessible { platform },
            };
        }
    }

    let partitioned = legacy.partition.is_some() && cloud.partition.is_some();
    let row_counts = match (partitioned, legacy.total_rows, cloud.total_rows) {
        (false, Some(l), Some(c)) => RowCountComparison::compare_totals(l, c),
        _ => RowCountComparison::compare(&legacy.row_counts, &cloud.row_counts),
    };

    let windows = if granularity == Granularity::Snapshot || !partitioned {
        if granularity != Granularity::Snapshot {
            debug!(
                table = %table,
                granularity = %granularity,
                "No partition column on both sides, using snapshot"
            );
        }
        vec![Window::snapshot()]
    } else {
        let builder = VintageBuilder::new(granularity);
        let built = builder.build_from_dates(legacy.row_counts.keys()).and_then(|l| {
            Ok((l, builder.build_from_dates(cloud.row_counts.keys())?))
        });
        match built {
            Ok((l, c)) => align_windows(&l, &c),
            Err(e) => {
                warn!(table = %table, error = %e, "Vintage bounds out of range, excluding table");
                return TableOutcome::Excluded {
                    table: table.to_string(),
                    reason: ExclusionReason::OutOfRange,
                };
            }
        }
    };

    if windows.is_empty() {
        warn!(table = %table, "No overlapping vintage, excluding table");
        return TableOutcome::Excluded {
            table: table.to_string(),
            reason: ExclusionReason::NoOverlap,
        };
    }

    let mismatched = row_counts.mismatched_dates();
    let vintages: Vec<ValidatedVintage> = windows
        .iter()
        .map(|window| {
            let excluded: Vec<NaiveDate> = if window.is_snapshot() {
                Vec::new()
            } else {
                mismatched.iter().copied().filter(|d| window.contains(*d)).collect()
            };
            let vintage =
                Vintage::from_window(window, legacy.partition.as_ref(), cloud.partition.as_ref());
            ValidatedVintage {
                legacy_filter: compose_filter(Platform::Legacy, &vintage, legacy, &excluded),
                cloud_filter: compose_filter(Platform::Cloud, &vintage, cloud, &excluded),
                fingerprint: fingerprint(&excluded),
                label: vintage.label,
                start_date: vintage.start_date,
                end_date: vintage.end_date,
                excluded_dates: excluded,
            }
        })
        .collect();

    info!(
        table = %table,
        vintages = vintages.len(),
        matched_days = row_counts.matched_days,
        total_days = row_counts.total_days,
        "Vintages validated"
    );

    TableOutcome::Validated(TableValidation {
        table: table.to_string(),
        granularity,
        row_counts,
        vintages,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{DateFormat, DateStorage};

    fn d(m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, m, day).unwrap()
    }

    fn legacy_side(counts: &[(NaiveDate, u64)]) -> TableSide {
        TableSide::partitioned(
            PartitionColumn::new("as_of_dt", DateStorage::Date),
            counts.iter().copied().collect(),
        )
    }

    fn cloud_side(counts: &[(NaiveDate, u64)]) -> TableSide {
        TableSide::partitioned(
            PartitionColumn::new("as_of_dt", DateStorage::Text(DateFormat::Compact)),
            counts.iter().copied().collect(),
        )
    }

    #[test]
    fn test_vintages_exclude_only_in_window_mismatches() {
        let legacy = legacy_side(&[(d(1, 5), 10), (d(1, 9), 4), (d(2, 3), 8)]);
        let cloud = cloud_side(&[(d(1, 5), 10), (d(1, 9), 3), (d(2, 3), 8)]);

        let outcome = validate_table("dpst.acct", Granularity::Month, &legacy, &cloud);
        let TableOutcome::Validated(v) = outcome else {
            panic!("expected validated outcome");
        };
        assert_eq!(v.vintages.len(), 2);

        let jan = &v.vintages[0];
        assert_eq!(jan.label, "2024-01");
        assert_eq!(jan.excluded_dates, vec![d(1, 9)]);
        assert_eq!(
            jan.legacy_filter,
            "(AS_OF_DT >= DATE '2024-01-01' AND AS_OF_DT < DATE '2024-02-01') \
             AND (TRUNC(AS_OF_DT) NOT IN (DATE '2024-01-09'))"
        );
        assert_eq!(
            jan.cloud_filter,
            "(as_of_dt >= '20240101' AND as_of_dt < '20240201') \
             AND (as_of_dt NOT IN ('20240109'))"
        );

        let feb = &v.vintages[1];
        assert!(feb.excluded_dates.is_empty());
        assert!(!feb.legacy_filter.contains("NOT IN"));
        assert_ne!(jan.fingerprint, feb.fingerprint);
    }

    #[test]
    fn test_base_filter_is_composed() {
        let legacy = legacy_side(&[(d(1, 5), 1)]).with_filter("BRANCH = 'X'");
        let cloud = cloud_side(&[(d(1, 5), 1)]);
        let outcome = validate_table("t", Granularity::Day, &legacy, &cloud);
        let vintage = &outcome.vintages()[0];
        assert!(vintage.legacy_filter.ends_with("AND (BRANCH = 'X')"));
        assert!(!vintage.cloud_filter.contains("BRANCH"));
    }

    #[test]
    fn test_no_overlap_excludes_table() {
        let legacy = legacy_side(&[(d(1, 5), 10)]);
        let cloud = cloud_side(&[(d(3, 5), 10)]);
        let outcome = validate_table("dpst.acct", Granularity::Month, &legacy, &cloud);
        assert_eq!(
            outcome,
            TableOutcome::Excluded {
                table: "dpst.acct".to_string(),
                reason: ExclusionReason::NoOverlap,
            }
        );
        assert!(outcome.vintages().is_empty());
    }

    #[test]
    fn test_date_at_calendar_limit_excludes_table() {
        let legacy = legacy_side(&[(NaiveDate::MAX, 1)]);
        let cloud = cloud_side(&[(NaiveDate::MAX, 1)]);
        let outcome = validate_table("t", Granularity::Day, &legacy, &cloud);
        assert_eq!(
            outcome,
            TableOutcome::Excluded {
                table: "t".to_string(),
                reason: ExclusionReason::OutOfRange,
            }
        );
    }

    #[test]
    fn test_inaccessible_side_excludes_table() {
        let outcome = validate_table(
            "t",
            Granularity::Day,
            &TableSide::inaccessible(),
            &cloud_side(&[(d(1, 1), 1)]),
        );
        assert!(matches!(
            outcome,
            TableOutcome::Excluded {
                reason: ExclusionReason::NotAccessible {
                    platform: Platform::Legacy
                },
                ..
            }
        ));
    }

    #[test]
    fn test_unpartitioned_table_gets_snapshot() {
        let outcome = validate_table(
            "t",
            Granularity::Day,
            &TableSide::unpartitioned(7),
            &TableSide::unpartitioned(7).with_filter("active = 1"),
        );
        let TableOutcome::Validated(v) = outcome else {
            panic!("expected validated outcome");
        };
        assert!(v.row_counts.row_match_all);
        assert_eq!(v.vintages.len(), 1);
        assert_eq!(v.vintages[0].label, "snapshot");
        assert_eq!(v.vintages[0].legacy_filter, "1=1");
        assert_eq!(v.vintages[0].cloud_filter, "(active = 1)");
    }

    #[test]
    fn test_fingerprint_tracks_excluded_dates() {
        assert_eq!(fingerprint(&[d(1, 2), d(1, 1)]), fingerprint(&[d(1, 1), d(1, 2)]));
        assert_ne!(fingerprint(&[d(1, 1)]), fingerprint(&[d(1, 1), d(1, 2)]));
        assert_eq!(fingerprint(&[]).len(), 64);
    }

    #[test]
    fn test_vintage_goes_stale_when_mismatches_change() {
        let legacy = legacy_side(&[(d(1, 5), 10), (d(1, 9), 4)]);
        let cloud = cloud_side(&[(d(1, 5), 10), (d(1, 9), 3)]);
        let outcome = validate_table("t", Granularity::Month, &legacy, &cloud);
        let vintage = outcome.vintages()[0].clone();
        let TableOutcome::Validated(v) = outcome else {
            panic!("expected validated outcome");
        };
        assert!(!vintage.is_stale(&v.row_counts));

        let fixed = RowCountComparison::compare(&legacy.row_counts, &legacy.row_counts);
        assert!(vintage.is_stale(&fixed));
    }

    #[test]
    fn test_outcome_serializes_with_status_tag() {
        let outcome = TableOutcome::Excluded {
            table: "t".to_string(),
            reason: ExclusionReason::NoOverlap,
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["status"], "excluded");
        assert_eq!(json["reason"]["kind"], "no_overlap");
    }
}
