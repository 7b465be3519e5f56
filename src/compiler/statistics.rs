use super::table::{quote_literal, where_clause, TableRef};
use crate::error::{MigCheckError, Result};
use crate::schema::{ColumnSpec, Platform, TypeFamily};

pub const DEFAULT_TOP_N: usize = 20;

/// Field names every statistics query projects, in order.
pub const STAT_ALIASES: [&str; 11] = [
    "col_type",
    "col_count",
    "col_distinct",
    "col_min",
    "col_max",
    "col_avg",
    "col_std",
    "col_sum",
    "col_sum_sq",
    "col_missing",
    "col_freq",
];

/// Compiles the single-row statistics query for one column.
///
/// Continuous columns aggregate the raw values. Categorical columns aggregate
/// the per-value frequency counts and additionally report the top-N
/// `value::count` list.
pub fn build_stats_sql(
    platform: Platform,
    table: &TableRef,
    column: &ColumnSpec,
    filter: Option<&str>,
    top_n: usize,
) -> Result<String> {
    if column.platform != platform {
        return Err(MigCheckError::Compilation(format!(
            "Column '{}' belongs to {} but was compiled for {}",
            column.name, column.platform, platform
        )));
    }
    if column.name.trim().is_empty() {
        return Err(MigCheckError::Compilation(format!(
            "Empty column name for table {}",
            table
        )));
    }
    if top_n == 0 {
        return Err(MigCheckError::Compilation(
            "Frequency list size must be at least 1".to_string(),
        ));
    }

    let table_sql = table.render(platform);
    let filter = where_clause(filter);
    let sql = if column.is_continuous() {
        continuous_sql(platform, column, &table_sql, &filter)
    } else {
        categorical_sql(platform, column, &table_sql, &filter, top_n)
    };
    Ok(sql)
}

fn continuous_sql(platform: Platform, column: &ColumnSpec, table: &str, filter: &str) -> String {
    let c = column.identifier();
    let col_type = quote_literal(&column.data_type);
    match platform {
        Platform::Legacy => format!(
            r#"SELECT
    {col_type} AS col_type,
    COUNT({c}) AS col_count,
    COUNT(DISTINCT {c}) AS col_distinct,
    TO_CHAR(MIN({c})) AS col_min,
    TO_CHAR(MAX({c})) AS col_max,
    TO_CHAR(AVG({c})) AS col_avg,
    TO_CHAR(STDDEV_SAMP({c})) AS col_std,
    TO_CHAR(SUM({c})) AS col_sum,
    TO_CHAR(SUM({c} * {c})) AS col_sum_sq,
    COUNT(*) - COUNT({c}) AS col_missing,
    CAST(NULL AS VARCHAR2(1)) AS col_freq
FROM {table}
WHERE {filter}"#,
            col_type = col_type,
            c = c,
            table = table,
            filter = filter,
        ),
        Platform::Cloud => format!(
            r#"SELECT
    {col_type} AS col_type,
    COUNT({c}) AS col_count,
    COUNT(DISTINCT {c}) AS col_distinct,
    CAST(MIN({c}) AS VARCHAR) AS col_min,
    CAST(MAX({c}) AS VARCHAR) AS col_max,
    CAST(AVG(CAST({c} AS DOUBLE)) AS VARCHAR) AS col_avg,
    CAST(STDDEV_SAMP(CAST({c} AS DOUBLE)) AS VARCHAR) AS col_std,
    CAST(SUM(CAST({c} AS DOUBLE)) AS VARCHAR) AS col_sum,
    CAST(SUM(CAST({c} AS DOUBLE) * CAST({c} AS DOUBLE)) AS VARCHAR) AS col_sum_sq,
    COUNT(*) - COUNT({c}) AS col_missing,
    CAST(NULL AS VARCHAR) AS col_freq
FROM {table}
WHERE {filter}"#,
            col_type = col_type,
            c = c,
            table = table,
            filter = filter,
        ),
    }
}

fn categorical_sql(
    platform: Platform,
    column: &ColumnSpec,
    table: &str,
    filter: &str,
    top_n: usize,
) -> String {
    let ident = column.identifier();
    let family = column.family();
    // Legacy DATE carries a time part, so it is truncated like a timestamp.
    let grouped = match platform {
        Platform::Legacy if family.is_temporal() => platform.truncate_to_day(&ident),
        Platform::Cloud if family == TypeFamily::Timestamp => platform.truncate_to_day(&ident),
        _ => ident,
    };
    let label = if family.is_temporal() {
        platform.coalesce(&platform.format_day("p_col"), "''")
    } else {
        platform.coalesce(&platform.to_text("p_col"), "''")
    };
    let col_type = quote_literal(&column.data_type);

    match platform {
        Platform::Legacy => format!(
            r#"WITH freq_raw AS (
    SELECT {grouped} AS p_col, COUNT(*) AS value_freq
    FROM {table}
    WHERE {filter}
    GROUP BY {grouped}
),
freq_table AS (
    SELECT p_col, value_freq,
           ROW_NUMBER() OVER (ORDER BY value_freq DESC, p_col ASC NULLS LAST) AS rn
    FROM freq_raw
),
agg_stats AS (
    SELECT
        SUM(value_freq) AS col_count,
        COUNT(value_freq) AS col_distinct,
        TO_CHAR(MIN(value_freq)) AS col_min,
        TO_CHAR(MAX(value_freq)) AS col_max,
        TO_CHAR(AVG(value_freq)) AS col_avg,
        TO_CHAR(STDDEV_SAMP(value_freq)) AS col_std,
        TO_CHAR(SUM(value_freq)) AS col_sum,
        TO_CHAR(SUM(value_freq * value_freq)) AS col_sum_sq
    FROM freq_table
)
SELECT
    {col_type} AS col_type,
    a.col_count, a.col_distinct, a.col_min, a.col_max,
    a.col_avg, a.col_std, a.col_sum, a.col_sum_sq,
    NVL((SELECT value_freq FROM freq_table WHERE p_col IS NULL), 0) AS col_missing,
    (SELECT LISTAGG({label} || '::' || value_freq, '||')
            WITHIN GROUP (ORDER BY value_freq DESC, p_col ASC NULLS LAST)
       FROM freq_table
      WHERE rn <= {top_n}) AS col_freq
FROM agg_stats a"#,
            grouped = grouped,
            table = table,
            filter = filter,
            col_type = col_type,
            label = label,
            top_n = top_n,
        ),
        Platform::Cloud => format!(
            r#"WITH freq_raw AS (
    SELECT {grouped} AS p_col, COUNT(*) AS value_freq
    FROM {table}
    WHERE {filter}
    GROUP BY {grouped}
),
freq_table AS (
    SELECT p_col, value_freq,
           ROW_NUMBER() OVER (ORDER BY value_freq DESC, p_col ASC NULLS LAST) AS rn
    FROM freq_raw
),
agg_stats AS (
    SELECT
        SUM(value_freq) AS col_count,
        COUNT(value_freq) AS col_distinct,
        CAST(MIN(value_freq) AS VARCHAR) AS col_min,
        CAST(MAX(value_freq) AS VARCHAR) AS col_max,
        CAST(AVG(CAST(value_freq AS DOUBLE)) AS VARCHAR) AS col_avg,
        CAST(STDDEV_SAMP(CAST(value_freq AS DOUBLE)) AS VARCHAR) AS col_std,
        CAST(SUM(CAST(value_freq AS DOUBLE)) AS VARCHAR) AS col_sum,
        CAST(SUM(CAST(value_freq AS DOUBLE) * CAST(value_freq AS DOUBLE)) AS VARCHAR) AS col_sum_sq
    FROM freq_table
)
SELECT
    {col_type} AS col_type,
    a.col_count, a.col_distinct, a.col_min, a.col_max,
    a.col_avg, a.col_std, a.col_sum, a.col_sum_sq,
    COALESCE((SELECT value_freq FROM freq_table WHERE p_col IS NULL), 0) AS col_missing,
    (SELECT array_join(
                array_agg({label} || '::' || CAST(value_freq AS VARCHAR)
                          ORDER BY value_freq DESC, p_col ASC NULLS LAST),
                '||')
       FROM freq_table
      WHERE rn <= {top_n}) AS col_freq
FROM agg_stats a"#,
            grouped = grouped,
            table = table,
            filter = filter,
            col_type = col_type,
            label = label,
            top_n = top_n,
        ),
    }
}
