use super::query::{QueryExecutor, QueryResult, Record};
use crate::compare::{ColumnOutcome, ColumnStats, Scalar, StatRow, StatsComparator};
use crate::compiler::{
    build_catalog_sql, build_hash_pair, build_partition_sample_sql, build_row_count_sql,
    build_stats_sql, key_alias, HashOptions, TableRef, PARTITION_DATE_ALIAS, ROW_COUNT_ALIAS,
};
use crate::error::{MigCheckError, Result};
use crate::hash::{reconcile_hashes, HashOutcome, HashRow};
use crate::schema::{
    ColumnMapping, ColumnPair, ColumnSpec, Crosswalk, DateFormat, DateStorage, Granularity,
    PartitionColumn, Platform,
};
use crate::vintage::{validate_table, TableOutcome, TableSide, ValidatedVintage};
use chrono::NaiveDate;
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const DEFAULT_LEGACY_PARALLELISM: usize = 3;
pub const DEFAULT_CLOUD_PARALLELISM: usize = 5;

const PARTITION_SAMPLE_SIZE: usize = 10;

/// A unit of work that failed on one platform. Siblings keep running.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitFailure {
    pub platform: Platform,
    pub unit: String,
    pub message: String,
}

/// One table as seen from one platform.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableScope {
    pub table: TableRef,
    pub partition: Option<PartitionColumn>,
    pub base_filter: Option<String>,
}

impl TableScope {
    pub fn new(table: TableRef) -> Self {
        Self {
            table,
            partition: None,
            base_filter: None,
        }
    }

    pub fn with_partition(mut self, partition: PartitionColumn) -> Self {
        self.partition = Some(partition);
        self
    }

    pub fn with_filter(mut self, filter: impl Into<String>) -> Self {
        self.base_filter = Some(filter.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsReport {
    pub vintage: String,
    pub outcomes: Vec<ColumnOutcome>,
    pub failures: Vec<UnitFailure>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HashReport {
    pub vintage: String,
    pub outcome: HashOutcome,
    pub failures: Vec<UnitFailure>,
}

pub struct ReconRunner {
    legacy: Arc<dyn QueryExecutor>,
    cloud: Arc<dyn QueryExecutor>,
    legacy_parallelism: usize,
    cloud_parallelism: usize,
}

impl ReconRunner {
    pub fn new(legacy: Arc<dyn QueryExecutor>, cloud: Arc<dyn QueryExecutor>) -> Result<Self> {
        for (expected, executor) in [(Platform::Legacy, &legacy), (Platform::Cloud, &cloud)] {
            if executor.platform() != expected {
                return Err(MigCheckError::Config(format!(
                    "Executor for {} reports platform {}",
                    expected,
                    executor.platform()
                )));
            }
        }
        Ok(Self {
            legacy,
            cloud,
            legacy_parallelism: DEFAULT_LEGACY_PARALLELISM,
            cloud_parallelism: DEFAULT_CLOUD_PARALLELISM,
        })
    }

    pub fn with_parallelism(mut self, legacy: usize, cloud: usize) -> Self {
        self.legacy_parallelism = legacy.max(1);
        self.cloud_parallelism = cloud.max(1);
        self
    }

    pub fn parallelism(&self, platform: Platform) -> usize {
        match platform {
            Platform::Legacy => self.legacy_parallelism,
            Platform::Cloud => self.cloud_parallelism,
        }
    }

    fn executor(&self, platform: Platform) -> &Arc<dyn QueryExecutor> {
        match platform {
            Platform::Legacy => &self.legacy,
            Platform::Cloud => &self.cloud,
        }
    }

    /// Runs `(unit, sql)` pairs on one platform with bounded concurrency and
    /// parses each result. Failures are collected, never propagated.
    async fn fan_out<T, F>(
        &self,
        platform: Platform,
        units: Vec<(String, String)>,
        parse: F,
    ) -> (BTreeMap<String, T>, Vec<UnitFailure>)
    where
        F: Fn(&QueryResult) -> Result<T>,
    {
        let executor = self.executor(platform);
        let results: Vec<_> = stream::iter(units)
            .map(|(unit, sql)| async move {
                let result = executor.query(&sql).await;
                (unit, result)
            })
            .buffer_unordered(self.parallelism(platform))
            .collect()
            .await;

        let mut parsed = BTreeMap::new();
        let mut failures = Vec::new();

        for (unit, result) in results {
            match result.and_then(|r| parse(&r)) {
                Ok(value) => {
                    parsed.insert(unit, value);
                }
                Err(e) => {
                    warn!(platform = %platform, unit = %unit, error = %e, "Unit failed");
                    failures.push(UnitFailure {
                        platform,
                        unit,
                        message: e.to_string(),
                    });
                }
            }
        }
        failures.sort_by(|a, b| a.unit.cmp(&b.unit));

        (parsed, failures)
    }

    pub async fn fetch_catalog(
        &self,
        platform: Platform,
        table: &TableRef,
    ) -> Result<Vec<ColumnSpec>> {
        let result = self
            .executor(platform)
            .query(&build_catalog_sql(platform, table))
            .await?;
        result
            .records()
            .iter()
            .map(|r| {
                Ok(ColumnSpec::new(
                    platform,
                    required_text(r, "column_name")?,
                    required_text(r, "data_type")?,
                ))
            })
            .collect()
    }

    /// Reads both catalogs concurrently and builds the crosswalk.
    pub async fn crosswalk(
        &self,
        legacy: &TableRef,
        cloud: &TableRef,
        mappings: &[ColumnMapping],
    ) -> Result<Crosswalk> {
        let (legacy_catalog, cloud_catalog) = tokio::join!(
            self.fetch_catalog(Platform::Legacy, legacy),
            self.fetch_catalog(Platform::Cloud, cloud)
        );
        Ok(Crosswalk::build(&legacy_catalog?, &cloud_catalog?, mappings))
    }

    /// Resolves how a partition column is stored, sampling values when the
    /// declared type is not a date.
    pub async fn detect_partition(
        &self,
        platform: Platform,
        table: &TableRef,
        column: &ColumnSpec,
    ) -> Result<PartitionColumn> {
        let family = column.family();
        let storage = if family.is_temporal() {
            DateStorage::infer(&column.data_type, std::iter::empty())?
        } else {
            let sql =
                build_partition_sample_sql(platform, table, &column.name, PARTITION_SAMPLE_SIZE);
            let samples: Vec<String> = self
                .executor(platform)
                .query(&sql)
                .await?
                .records()
                .iter()
                .filter_map(|r| r.get("sample_value").cloned().flatten())
                .map(|v| v.to_string())
                .collect();
            DateStorage::infer(&column.data_type, samples.iter().map(String::as_str))?
        };
        debug!(
            platform = %platform,
            column = %column.name,
            storage = ?storage,
            "Partition storage resolved"
        );
        Ok(PartitionColumn::new(column.name.clone(), storage))
    }

    /// Row counts for one side. An execution error or unreadable result marks
    /// the side inaccessible.
    pub async fn table_side(&self, platform: Platform, scope: &TableScope) -> TableSide {
        let sql = build_row_count_sql(
            platform,
            &scope.table,
            scope.partition.as_ref(),
            scope.base_filter.as_deref(),
        );
        let side = match self.executor(platform).query(&sql).await {
            Ok(result) => read_table_side(scope.partition.as_ref(), &result),
            Err(e) => Err(e),
        };
        match side {
            Ok(side) => match &scope.base_filter {
                Some(filter) => side.with_filter(filter.clone()),
                None => side,
            },
            Err(e) => {
                warn!(
                    platform = %platform,
                    table = %scope.table,
                    error = %e,
                    "Row counts unavailable"
                );
                TableSide::inaccessible()
            }
        }
    }

    pub async fn validate(
        &self,
        table: &str,
        granularity: Granularity,
        legacy: &TableScope,
        cloud: &TableScope,
    ) -> TableOutcome {
        let (legacy_side, cloud_side) = tokio::join!(
            self.table_side(Platform::Legacy, legacy),
            self.table_side(Platform::Cloud, cloud)
        );
        validate_table(table, granularity, &legacy_side, &cloud_side)
    }

    /// Statistics for every column pair within one vintage, compared once both
    /// platforms finish. Compilation errors fail the whole call.
    pub async fn run_stats(
        &self,
        legacy: &TableRef,
        cloud: &TableRef,
        columns: &[ColumnPair],
        vintage: &ValidatedVintage,
        top_n: usize,
        comparator: &StatsComparator,
    ) -> Result<StatsReport> {
        let mut legacy_units = Vec::with_capacity(columns.len());
        let mut cloud_units = Vec::with_capacity(columns.len());
        for pair in columns {
            let unit = pair.name().to_string();
            legacy_units.push((
                unit.clone(),
                build_stats_sql(
                    Platform::Legacy,
                    legacy,
                    &pair.legacy,
                    Some(vintage.filter(Platform::Legacy)),
                    top_n,
                )?,
            ));
            cloud_units.push((
                unit,
                build_stats_sql(
                    Platform::Cloud,
                    cloud,
                    &pair.cloud,
                    Some(vintage.filter(Platform::Cloud)),
                    top_n,
                )?,
            ));
        }

        let parse = |r: &QueryResult| -> Result<StatRow> {
            let record = r.first_record().ok_or_else(|| {
                MigCheckError::MalformedResult("statistics query returned no rows".to_string())
            })?;
            StatRow::from_record(&record)
        };
        let ((mut legacy_rows, legacy_failures), (mut cloud_rows, cloud_failures)) = tokio::join!(
            self.fan_out(Platform::Legacy, legacy_units, parse),
            self.fan_out(Platform::Cloud, cloud_units, parse)
        );

        let stats: Vec<ColumnStats> = columns
            .iter()
            .map(|pair| ColumnStats {
                column: pair.name().to_string(),
                legacy: legacy_rows.remove(pair.name()),
                cloud: cloud_rows.remove(pair.name()),
            })
            .collect();
        let outcomes = comparator.compare_all(&stats);

        let mut failures = legacy_failures;
        failures.extend(cloud_failures);

        info!(
            vintage = %vintage.label,
            columns = outcomes.len(),
            failures = failures.len(),
            "Statistics compared"
        );

        Ok(StatsReport {
            vintage: vintage.label.clone(),
            outcomes,
            failures,
        })
    }

    /// Row hashes for one vintage on both platforms, joined on the key columns.
    #[allow(clippy::too_many_arguments)]
    pub async fn run_hashes(
        &self,
        legacy: &TableRef,
        cloud: &TableRef,
        columns: &[ColumnPair],
        keys: &[ColumnPair],
        vintage: &ValidatedVintage,
        opts: &HashOptions,
        sample_limit: usize,
    ) -> Result<HashReport> {
        let queries = build_hash_pair(
            legacy,
            cloud,
            columns,
            keys,
            (
                Some(vintage.filter(Platform::Legacy)),
                Some(vintage.filter(Platform::Cloud)),
            ),
            opts,
        )?;

        let aliases: Vec<String> = keys.iter().map(key_alias).collect();
        let parse = |r: &QueryResult| -> Result<Vec<HashRow>> {
            r.records()
                .iter()
                .map(|record| HashRow::from_record(record, &aliases))
                .collect()
        };
        let unit = format!("row hash {}", vintage.label);
        let ((mut legacy_rows, legacy_failures), (mut cloud_rows, cloud_failures)) = tokio::join!(
            self.fan_out(Platform::Legacy, vec![(unit.clone(), queries.legacy)], parse),
            self.fan_out(Platform::Cloud, vec![(unit.clone(), queries.cloud)], parse)
        );

        let left = legacy_rows.remove(&unit);
        let right = cloud_rows.remove(&unit);
        let outcome =
            reconcile_hashes(&vintage.label, left.as_deref(), right.as_deref(), sample_limit);

        let mut failures = legacy_failures;
        failures.extend(cloud_failures);

        Ok(HashReport {
            vintage: vintage.label.clone(),
            outcome,
            failures,
        })
    }
}

fn required_text(record: &Record, field: &str) -> Result<String> {
    record
        .get(field)
        .cloned()
        .flatten()
        .map(|v| v.to_string())
        .ok_or_else(|| MigCheckError::MalformedResult(format!("catalog record has no '{}'", field)))
}

fn row_count(record: &Record) -> Result<u64> {
    match record.get(ROW_COUNT_ALIAS).cloned().flatten().map(Scalar::coerce_int) {
        Some(Scalar::Int(n)) if n >= 0 => Ok(n as u64),
        other => Err(MigCheckError::MalformedResult(format!(
            "row count is not a non-negative integer: {:?}",
            other
        ))),
    }
}

fn read_table_side(partition: Option<&PartitionColumn>, result: &QueryResult) -> Result<TableSide> {
    let records = result.records();
    let Some(col) = partition else {
        let total = match records.first() {
            Some(r) => row_count(r)?,
            None => 0,
        };
        return Ok(TableSide::unpartitioned(total));
    };

    let mut counts: BTreeMap<NaiveDate, u64> = BTreeMap::new();
    for record in &records {
        let raw = record
            .get(PARTITION_DATE_ALIAS)
            .cloned()
            .flatten()
            .map(|v| v.to_string());
        let Some(raw) = raw else {
            debug!(column = %col.name, "Skipping NULL partition value");
            continue;
        };
        let date = DateFormat::Dashed.parse(&raw).ok_or_else(|| {
            MigCheckError::InvalidDate(format!("partition value '{}' of {}", raw, col.name))
        })?;
        *counts.entry(date).or_insert(0) += row_count(record)?;
    }
    Ok(TableSide::partitioned(col.clone(), counts))
}
