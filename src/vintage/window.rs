use crate::compiler::TableRef;
use crate::error::{MigCheckError, Result};
use crate::schema::{Granularity, PartitionColumn, Platform};
use chrono::{Datelike, Days, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const ALWAYS_TRUE: &str = "1=1";

/// A calendar window `[start, end)`. Snapshot windows carry no bounds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Window {
    pub label: String,
    pub start: Option<NaiveDate>,
    pub end: Option<NaiveDate>,
}

impl Window {
    pub fn bounded(label: impl Into<String>, start: NaiveDate, end: NaiveDate) -> Self {
        Self {
            label: label.into(),
            start: Some(start),
            end: Some(end),
        }
    }

    pub fn snapshot() -> Self {
        Self {
            label: "snapshot".to_string(),
            start: None,
            end: None,
        }
    }

    pub fn is_snapshot(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start.map_or(true, |s| date >= s) && self.end.map_or(true, |e| date < e)
    }

    /// Range predicate over the partition column, in the platform's syntax.
    pub fn predicate(&self, platform: Platform, column: Option<&PartitionColumn>) -> String {
        let Some(col) = column else {
            return ALWAYS_TRUE.to_string();
        };
        let ident = col.identifier(platform);
        let mut parts = Vec::new();
        if let Some(start) = self.start {
            parts.push(format!("{} >= {}", ident, col.literal(platform, start)));
        }
        if let Some(end) = self.end {
            parts.push(format!("{} < {}", ident, col.literal(platform, end)));
        }
        if parts.is_empty() {
            ALWAYS_TRUE.to_string()
        } else {
            parts.join(" AND ")
        }
    }
}

fn add_days(date: NaiveDate, days: u64) -> Result<NaiveDate> {
    date.checked_add_days(Days::new(days)).ok_or_else(|| {
        MigCheckError::InvalidDate(format!("{} + {} days is out of range", date, days))
    })
}

fn first_of_next_month(date: NaiveDate) -> Result<NaiveDate> {
    date.with_day(1)
        .and_then(|d| d.checked_add_months(Months::new(1)))
        .ok_or_else(|| {
            MigCheckError::InvalidDate(format!("month after {} is out of range", date))
        })
}

fn window_for(granularity: Granularity, date: NaiveDate) -> Result<Option<Window>> {
    let window = match granularity {
        Granularity::Day => {
            Window::bounded(date.format("%Y-%m-%d").to_string(), date, add_days(date, 1)?)
        }
        Granularity::Week => {
            let back = Days::new(u64::from(date.weekday().num_days_from_monday()));
            let start = date.checked_sub_days(back).ok_or_else(|| {
                MigCheckError::InvalidDate(format!("week start of {} is out of range", date))
            })?;
            let iso = start.iso_week();
            Window::bounded(
                format!("{}-W{:02}", iso.year(), iso.week()),
                start,
                add_days(start, 7)?,
            )
        }
        Granularity::Month => {
            let start = first_of_month(date);
            Window::bounded(
                start.format("%Y-%m").to_string(),
                start,
                first_of_next_month(start)?,
            )
        }
        Granularity::Whole | Granularity::Snapshot => return Ok(None),
    };
    Ok(Some(window))
}

fn first_of_month(date: NaiveDate) -> NaiveDate {
    date - Days::new(u64::from(date.day0()))
}

/// Splits a date range into non-overlapping calendar windows.
#[derive(Debug, Clone, Copy)]
pub struct VintageBuilder {
    granularity: Granularity,
}

impl VintageBuilder {
    pub fn new(granularity: Granularity) -> Self {
        Self { granularity }
    }

    pub fn granularity(&self) -> Granularity {
        self.granularity
    }

    /// Windows covering every date in `[min, max]`, ordered by start. Fails
    /// with `InvalidDate` when a window bound falls outside chrono's range.
    pub fn build(&self, min: NaiveDate, max: NaiveDate) -> Result<Vec<Window>> {
        let (min, max) = if min <= max { (min, max) } else { (max, min) };
        match self.granularity {
            Granularity::Snapshot => Ok(vec![Window::snapshot()]),
            Granularity::Whole => Ok(vec![Window::bounded("all", min, add_days(max, 1)?)]),
            g => {
                let mut windows = Vec::new();
                let mut cursor = min;
                while cursor <= max {
                    let Some(window) = window_for(g, cursor)? else {
                        break;
                    };
                    let Some(next) = window.end else {
                        break;
                    };
                    windows.push(window);
                    cursor = next;
                }
                Ok(windows)
            }
        }
    }

    /// Windows spanning the dates actually observed.
    pub fn build_from_dates<'a>(
        &self,
        dates: impl IntoIterator<Item = &'a NaiveDate>,
    ) -> Result<Vec<Window>> {
        if self.granularity == Granularity::Snapshot {
            return Ok(vec![Window::snapshot()]);
        }
        let mut iter = dates.into_iter().copied();
        let Some(first) = iter.next() else {
            return Ok(Vec::new());
        };
        let (min, max) = iter.fold((first, first), |(lo, hi), d| (lo.min(d), hi.max(d)));
        self.build(min, max)
    }
}

/// Keeps the windows present on both sides. Bounds are unioned, which only
/// changes anything for the whole-range window.
pub fn align_windows(legacy: &[Window], cloud: &[Window]) -> Vec<Window> {
    let cloud_by_label: BTreeMap<&str, &Window> =
        cloud.iter().map(|w| (w.label.as_str(), w)).collect();

    let mut aligned: Vec<Window> = legacy
        .iter()
        .filter_map(|l| {
            let c = cloud_by_label.get(l.label.as_str())?;
            Some(Window {
                label: l.label.clone(),
                start: union_bound(l.start, c.start, std::cmp::min),
                end: union_bound(l.end, c.end, std::cmp::max),
            })
        })
        .collect();
    aligned.sort_by(|a, b| a.start.cmp(&b.start).then_with(|| a.label.cmp(&b.label)));
    aligned
}

fn union_bound(
    a: Option<NaiveDate>,
    b: Option<NaiveDate>,
    pick: fn(NaiveDate, NaiveDate) -> NaiveDate,
) -> Option<NaiveDate> {
    match (a, b) {
        (Some(a), Some(b)) => Some(pick(a, b)),
        _ => None,
    }
}

/// One aligned window with its predicate on each platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vintage {
    pub label: String,
    pub start_date: Option<NaiveDate>,
    /// Exclusive.
    pub end_date: Option<NaiveDate>,
    pub legacy_predicate: String,
    pub cloud_predicate: String,
}

impl Vintage {
    pub fn from_window(
        window: &Window,
        legacy_partition: Option<&PartitionColumn>,
        cloud_partition: Option<&PartitionColumn>,
    ) -> Self {
        Self {
            label: window.label.clone(),
            start_date: window.start,
            end_date: window.end,
            legacy_predicate: window.predicate(Platform::Legacy, legacy_partition),
            cloud_predicate: window.predicate(Platform::Cloud, cloud_partition),
        }
    }

    pub fn predicate(&self, platform: Platform) -> &str {
        match platform {
            Platform::Legacy => &self.legacy_predicate,
            Platform::Cloud => &self.cloud_predicate,
        }
    }

    pub fn window(&self) -> Window {
        Window {
            label: self.label.clone(),
            start: self.start_date,
            end: self.end_date,
        }
    }
}

/// `NOT IN` predicate dropping dates known to disagree. Returns `None` when
/// there is nothing to exclude.
pub fn exclusion_predicate(
    platform: Platform,
    column: &PartitionColumn,
    dates: &[NaiveDate],
) -> Option<String> {
    if dates.is_empty() {
        return None;
    }
    let literals: Vec<String> = dates.iter().map(|d| column.literal(platform, *d)).collect();
    Some(format!(
        "{} NOT IN ({})",
        column.day_expr(platform),
        literals.join(", ")
    ))
}

/// Human-readable scope of a vintage, used in log lines.
pub fn describe(table: &TableRef, vintage: &Vintage) -> String {
    match (vintage.start_date, vintage.end_date) {
        (Some(s), Some(e)) => format!("{}[{} {}..{})", table, vintage.label, s, e),
        _ => format!("{}[{}]", table, vintage.label),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{DateFormat, DateStorage};
    use chrono::Duration;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_single_month_window() {
        let windows = VintageBuilder::new(Granularity::Month)
            .build(d(2024, 1, 1), d(2024, 1, 31))
            .unwrap();
        assert_eq!(windows.len(), 1);
        assert_eq!(windows[0].label, "2024-01");
        assert_eq!(windows[0].start, Some(d(2024, 1, 1)));
        assert_eq!(windows[0].end, Some(d(2024, 2, 1)));
    }

    #[test]
    fn test_month_windows_cross_year() {
        let windows = VintageBuilder::new(Granularity::Month)
            .build(d(2023, 11, 15), d(2024, 1, 3))
            .unwrap();
        let labels: Vec<&str> = windows.iter().map(|w| w.label.as_str()).collect();
        assert_eq!(labels, vec!["2023-11", "2023-12", "2024-01"]);
        assert_eq!(windows[1].end, Some(d(2024, 1, 1)));
    }

    #[test]
    fn test_iso_week_labels_start_monday() {
        // 2024-12-31 is a Tuesday in ISO week 2025-W01.
        let windows = VintageBuilder::new(Granularity::Week)
            .build(d(2024, 12, 31), d(2025, 1, 7))
            .unwrap();
        assert_eq!(windows.len(), 2);
        assert_eq!(windows[0].label, "2025-W01");
        assert_eq!(windows[0].start, Some(d(2024, 12, 30)));
        assert_eq!(windows[1].label, "2025-W02");
        assert_eq!(windows[1].start, Some(d(2025, 1, 6)));
    }

    #[test]
    fn test_windows_cover_every_date_without_overlap() {
        let (min, max) = (d(2024, 1, 17), d(2024, 4, 2));
        for g in [Granularity::Day, Granularity::Week, Granularity::Month, Granularity::Whole] {
            let windows = VintageBuilder::new(g).build(min, max).unwrap();
            let mut day = min;
            while day <= max {
                let hits = windows.iter().filter(|w| w.contains(day)).count();
                assert_eq!(hits, 1, "{:?} covered {} times under {}", day, hits, g);
                day += Duration::days(1);
            }
        }
    }

    #[test]
    fn test_whole_and_snapshot() {
        let whole = VintageBuilder::new(Granularity::Whole)
            .build(d(2024, 3, 1), d(2024, 3, 9))
            .unwrap();
        assert_eq!(whole, vec![Window::bounded("all", d(2024, 3, 1), d(2024, 3, 10))]);

        let snap = VintageBuilder::new(Granularity::Snapshot)
            .build_from_dates(std::iter::empty::<&NaiveDate>())
            .unwrap();
        assert_eq!(snap.len(), 1);
        assert!(snap[0].is_snapshot());
        assert_eq!(snap[0].predicate(Platform::Legacy, None), "1=1");
    }

    #[test]
    fn test_build_from_no_dates_is_empty() {
        let windows = VintageBuilder::new(Granularity::Day)
            .build_from_dates(std::iter::empty::<&NaiveDate>())
            .unwrap();
        assert!(windows.is_empty());
    }

    #[test]
    fn test_predicates_use_platform_literals() {
        let legacy = PartitionColumn::new("as_of_dt", DateStorage::Date);
        let cloud = PartitionColumn::new("as_of_dt", DateStorage::Text(DateFormat::Compact));
        let window = Window::bounded("2024-01", d(2024, 1, 1), d(2024, 2, 1));
        let v = Vintage::from_window(&window, Some(&legacy), Some(&cloud));
        assert_eq!(
            v.legacy_predicate,
            "AS_OF_DT >= DATE '2024-01-01' AND AS_OF_DT < DATE '2024-02-01'"
        );
        assert_eq!(v.cloud_predicate, "as_of_dt >= '20240101' AND as_of_dt < '20240201'");
    }

    #[test]
    fn test_align_keeps_common_labels_and_unions_whole() {
        let legacy = vec![
            Window::bounded("2024-01", d(2024, 1, 1), d(2024, 2, 1)),
            Window::bounded("2024-02", d(2024, 2, 1), d(2024, 3, 1)),
        ];
        let cloud = vec![
            Window::bounded("2024-02", d(2024, 2, 1), d(2024, 3, 1)),
            Window::bounded("2024-03", d(2024, 3, 1), d(2024, 4, 1)),
        ];
        let aligned = align_windows(&legacy, &cloud);
        assert_eq!(aligned.len(), 1);
        assert_eq!(aligned[0].label, "2024-02");

        let l = vec![Window::bounded("all", d(2024, 1, 3), d(2024, 1, 20))];
        let c = vec![Window::bounded("all", d(2024, 1, 1), d(2024, 1, 15))];
        let aligned = align_windows(&l, &c);
        assert_eq!(aligned[0].start, Some(d(2024, 1, 1)));
        assert_eq!(aligned[0].end, Some(d(2024, 1, 20)));
    }

    #[test]
    fn test_exclusion_predicate_truncates_timestamps() {
        let ts = PartitionColumn::new("load_ts", DateStorage::Timestamp);
        assert_eq!(exclusion_predicate(Platform::Legacy, &ts, &[]), None);
        assert_eq!(
            exclusion_predicate(Platform::Legacy, &ts, &[d(2024, 1, 2), d(2024, 1, 5)]).unwrap(),
            "TRUNC(LOAD_TS) NOT IN (DATE '2024-01-02', DATE '2024-01-05')"
        );
        assert_eq!(
            exclusion_predicate(Platform::Cloud, &ts, &[d(2024, 1, 2)]).unwrap(),
            "date_trunc('day', load_ts) NOT IN (from_iso8601_date('2024-01-02'))"
        );
    }

    #[test]
    fn test_exclusion_truncates_legacy_dates() {
        // Legacy DATE values carry a time part; row counts group by day.
        let native = PartitionColumn::new("as_of_dt", DateStorage::Date);
        assert_eq!(
            exclusion_predicate(Platform::Legacy, &native, &[d(2024, 1, 2)]).unwrap(),
            "TRUNC(AS_OF_DT) NOT IN (DATE '2024-01-02')"
        );
        assert_eq!(
            exclusion_predicate(Platform::Cloud, &native, &[d(2024, 1, 2)]).unwrap(),
            "as_of_dt NOT IN (from_iso8601_date('2024-01-02'))"
        );
    }

    #[test]
    fn test_windows_at_calendar_limit_are_errors() {
        let last = NaiveDate::MAX;
        for g in [Granularity::Day, Granularity::Week, Granularity::Month, Granularity::Whole] {
            let err = VintageBuilder::new(g).build(last, last).unwrap_err();
            assert!(matches!(err, MigCheckError::InvalidDate(_)), "{} gave {}", g, err);
        }
        assert_eq!(
            VintageBuilder::new(Granularity::Snapshot).build(last, last).unwrap(),
            vec![Window::snapshot()]
        );
    }
}
