use super::table::{quote_literal, where_clause, TableRef};
use crate::schema::{PartitionColumn, Platform};

pub const PARTITION_DATE_ALIAS: &str = "partition_date";
pub const ROW_COUNT_ALIAS: &str = "row_count";

/// Rows per partition date, the date rendered `YYYY-MM-DD`. Without a
/// partition column the query yields a single total.
pub fn build_row_count_sql(
    platform: Platform,
    table: &TableRef,
    partition: Option<&PartitionColumn>,
    filter: Option<&str>,
) -> String {
    let table_sql = table.render(platform);
    let filter = where_clause(filter);
    match partition {
        Some(col) => {
            let date_expr = col.standard_expr(platform);
            format!(
                r#"SELECT {date_expr} AS {date_alias}, COUNT(*) AS {count_alias}
FROM {table}
WHERE {filter}
GROUP BY {date_expr}
ORDER BY {date_expr}"#,
                date_expr = date_expr,
                date_alias = PARTITION_DATE_ALIAS,
                count_alias = ROW_COUNT_ALIAS,
                table = table_sql,
                filter = filter,
            )
        }
        None => format!(
            "SELECT COUNT(*) AS {}\nFROM {}\nWHERE {}",
            ROW_COUNT_ALIAS, table_sql, filter
        ),
    }
}

/// Column names and types as recorded in the platform's catalog.
pub fn build_catalog_sql(platform: Platform, table: &TableRef) -> String {
    match platform {
        Platform::Legacy => format!(
            r#"SELECT column_name, data_type
FROM all_tab_cols
WHERE owner = {owner}
  AND table_name = {table}
  AND hidden_column = 'NO'
ORDER BY column_id"#,
            owner = quote_literal(&Platform::Legacy.identifier(&table.qualifier)),
            table = quote_literal(&Platform::Legacy.identifier(&table.table)),
        ),
        Platform::Cloud => format!(
            r#"SELECT column_name, data_type
FROM information_schema.columns
WHERE table_schema = {schema}
  AND table_name = {table}
ORDER BY ordinal_position"#,
            schema = quote_literal(&Platform::Cloud.identifier(&table.qualifier)),
            table = quote_literal(&Platform::Cloud.identifier(&table.table)),
        ),
    }
}

/// A small sample of raw partition values, used to detect text date layouts.
pub fn build_partition_sample_sql(
    platform: Platform,
    table: &TableRef,
    partition_column: &str,
    limit: usize,
) -> String {
    let col = platform.identifier(partition_column);
    let table_sql = table.render(platform);
    match platform {
        Platform::Legacy => format!(
            "SELECT {col} AS sample_value FROM {table} \
             WHERE {col} IS NOT NULL AND ROWNUM <= {limit}",
            col = col,
            table = table_sql,
            limit = limit,
        ),
        Platform::Cloud => format!(
            "SELECT CAST({col} AS VARCHAR) AS sample_value FROM {table} \
             WHERE {col} IS NOT NULL LIMIT {limit}",
            col = col,
            table = table_sql,
            limit = limit,
        ),
    }
}
