use chrono::NaiveDate;
use migcheck::compare::{ColumnQuality, StatsComparator, Verdict};
use migcheck::compiler::{TableRef, STAT_ALIASES};
use migcheck::executor::{MockExecutor, QueryResult, ReconRunner, TableScope};
use migcheck::hash::HashOutcome;
use migcheck::schema::{ColumnMapping, DateStorage, Granularity, PartitionColumn, Platform};
use migcheck::vintage::TableOutcome;
use migcheck::{ReconConfig, Scalar};
use std::collections::BTreeMap;
use std::sync::Arc;

fn stats(col_type: &str, distinct: i64, mean: Option<f64>, freq: Option<&str>) -> QueryResult {
    QueryResult::new(STAT_ALIASES).with_row(vec![
        Some(Scalar::from(col_type)),
        Some(Scalar::Int(3)),
        Some(Scalar::Int(distinct)),
        None,
        None,
        mean.map(Scalar::Float),
        None,
        None,
        None,
        Some(Scalar::Int(0)),
        freq.map(Scalar::from),
    ])
}

fn catalog(rows: &[(&str, &str)]) -> QueryResult {
    rows.iter().fold(QueryResult::new(["COLUMN_NAME", "DATA_TYPE"]), |acc, (n, t)| {
        acc.with_row(vec![Some(Scalar::from(*n)), Some(Scalar::from(*t))])
    })
}

fn row_counts(rows: &[(&str, i64)]) -> QueryResult {
    rows.iter().fold(QueryResult::new(["PARTITION_DATE", "ROW_COUNT"]), |acc, (d, n)| {
        acc.with_row(vec![Some(Scalar::from(*d)), Some(Scalar::Int(*n))])
    })
}

fn hashes(rows: &[(&str, &str)]) -> QueryResult {
    rows.iter().fold(QueryResult::new(["ACCT_ID", "HASH_VALUE"]), |acc, (k, h)| {
        acc.with_row(vec![Some(Scalar::from(*k)), Some(Scalar::from(*h))])
    })
}

#[tokio::test]
async fn test_catalog_to_row_hash_flow() {
    // Hash and row-count queries mention column names too, so they are
    // registered ahead of the per-column statistics patterns.
    let legacy = Arc::new(
        MockExecutor::new(Platform::Legacy)
            .with_result(
                "all_tab_cols",
                catalog(&[
                    ("ACCT_ID", "NUMBER"),
                    ("BALANCE", "NUMBER(12,2)"),
                    ("STATUS", "VARCHAR2(10)"),
                    ("SSN", "VARCHAR2(11)"),
                ]),
            )
            .with_result("hash_value", hashes(&[("1", "aa"), ("2", "bb")]))
            .with_result("row_count", row_counts(&[("2024-01-01", 2), ("2024-01-02", 1)]))
            .with_result("ACCT_ID", stats("NUMBER", 100, Some(50.5), None))
            .with_result("BALANCE", stats("NUMBER", 80, Some(10.0), None))
            .with_result("STATUS", stats("VARCHAR2", 3, None, Some("A::2||B::1"))),
    );
    let cloud = Arc::new(
        MockExecutor::new(Platform::Cloud)
            .with_result(
                "information_schema",
                catalog(&[
                    ("acct_id", "bigint"),
                    ("balance", "decimal(12,2)"),
                    ("status", "varchar"),
                    ("ssn", "varchar"),
                ]),
            )
            .with_result("hash_value", hashes(&[("1", "aa"), ("3", "cc")]))
            .with_result("row_count", row_counts(&[("2024-01-01", 2), ("2024-01-02", 2)]))
            .with_result("acct_id", stats("bigint", 100, Some(50.5), None))
            .with_result("balance", stats("decimal", 80, Some(11.0), None))
            .with_result("status", stats("varchar", 3, None, Some("A::2||B::1"))),
    );

    let config = ReconConfig::default();
    let runner = ReconRunner::new(legacy.clone(), cloud.clone())
        .unwrap()
        .with_parallelism(config.parallelism.legacy, config.parallelism.cloud);
    let legacy_table = TableRef::new("core", "accounts").unwrap();
    let cloud_table = TableRef::new("lake", "accounts").unwrap();

    let crosswalk = runner
        .crosswalk(
            &legacy_table,
            &cloud_table,
            &[
                ColumnMapping::new("acct_id", "acct_id"),
                ColumnMapping::new("balance", "balance"),
                ColumnMapping::new("status", "status"),
                ColumnMapping::new("ssn", "ssn").excluded(),
            ],
        )
        .await
        .unwrap();
    assert_eq!(crosswalk.comparable_names(), vec!["ACCT_ID", "BALANCE", "STATUS"]);
    assert_eq!(crosswalk.tokenized, vec!["SSN"]);

    let partition = PartitionColumn::new("business_date", DateStorage::Date);
    let outcome = runner
        .validate(
            "accounts",
            Granularity::Month,
            &TableScope::new(legacy_table.clone()).with_partition(partition.clone()),
            &TableScope::new(cloud_table.clone()).with_partition(partition),
        )
        .await;
    let TableOutcome::Validated(validation) = outcome else {
        panic!("table should validate");
    };
    assert_eq!(validation.vintages.len(), 1);
    let vintage = &validation.vintages[0];
    assert_eq!(vintage.label, "2024-01");
    assert_eq!(
        vintage.excluded_dates,
        vec![NaiveDate::from_ymd_opt(2024, 1, 2).unwrap()]
    );
    assert!(vintage.legacy_filter.contains("NOT IN"));
    assert!(!vintage.is_stale(&validation.row_counts));

    let comparator = StatsComparator::new(config.stats.schema.clone());
    let report = runner
        .run_stats(
            &legacy_table,
            &cloud_table,
            &crosswalk.comparable,
            vintage,
            config.stats.top_n,
            &comparator,
        )
        .await
        .unwrap();
    assert!(report.failures.is_empty());
    let verdicts: Vec<_> = report
        .outcomes
        .iter()
        .map(|o| (o.column().to_string(), o.verdict()))
        .collect();
    assert_eq!(
        verdicts,
        vec![
            ("ACCT_ID".to_string(), Some(Verdict::Pass)),
            ("BALANCE".to_string(), Some(Verdict::Fail)),
            ("STATUS".to_string(), Some(Verdict::Pass)),
        ]
    );

    let mut by_vintage = BTreeMap::new();
    by_vintage.insert(report.vintage.clone(), report.outcomes.clone());
    let names: Vec<String> = crosswalk
        .comparable_names()
        .into_iter()
        .map(String::from)
        .collect();
    let quality = ColumnQuality::analyze(&names, &by_vintage, 1);
    assert_eq!(quality.clean_columns, vec!["ACCT_ID", "STATUS"]);
    assert_eq!(quality.key_columns, vec!["ACCT_ID"]);

    let hashed: Vec<_> = quality
        .clean_columns
        .iter()
        .filter_map(|c| crosswalk.pair(c).cloned())
        .collect();
    let keys: Vec<_> = quality
        .key_columns
        .iter()
        .filter_map(|c| crosswalk.pair(c).cloned())
        .collect();
    let hash_report = runner
        .run_hashes(
            &legacy_table,
            &cloud_table,
            &hashed,
            &keys,
            vintage,
            &config.hash.options,
            config.hash.sample_limit,
        )
        .await
        .unwrap();

    let HashOutcome::Compared(cmp) = hash_report.outcome else {
        panic!("both hash sets should be present");
    };
    assert_eq!(cmp.matched, 1);
    assert_eq!(cmp.hash_mismatch, 0);
    assert_eq!(cmp.left_only, 1);
    assert_eq!(cmp.right_only, 1);
    assert_eq!(cmp.sample_left_only, vec![vec![Some("2".to_string())]]);

    let hash_sql = legacy
        .executed()
        .into_iter()
        .find(|q| q.contains("hash_value"))
        .unwrap();
    assert!(hash_sql.contains("NOT IN"));
    assert!(cloud.executed().iter().any(|q| q.contains("sha256")));
}
