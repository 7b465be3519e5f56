use super::normalize::{normalize_expr, shared_family, NormalizeOptions};
use super::table::{where_clause, TableRef};
use crate::error::{MigCheckError, Result};
use crate::schema::{ColumnPair, Platform};
use serde::{Deserialize, Serialize};

pub const HASH_ALIAS: &str = "hash_value";
const HASH_INPUT_ALIAS: &str = "hash_input";
pub const DEFAULT_SEPARATOR: &str = "|";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HashOptions {
    pub separator: String,
    #[serde(flatten)]
    pub normalize: NormalizeOptions,
}

impl Default for HashOptions {
    fn default() -> Self {
        Self {
            separator: DEFAULT_SEPARATOR.to_string(),
            normalize: NormalizeOptions::default(),
        }
    }
}

/// The same logical row-hash query rendered for both platforms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DualQuery {
    pub legacy: String,
    pub cloud: String,
}

impl DualQuery {
    pub fn get(&self, platform: Platform) -> &str {
        match platform {
            Platform::Legacy => &self.legacy,
            Platform::Cloud => &self.cloud,
        }
    }
}

/// Key column alias shared by both dialects once results are lower-cased.
pub fn key_alias(pair: &ColumnPair) -> String {
    pair.name().to_lowercase()
}

fn validate(columns: &[ColumnPair], keys: &[ColumnPair]) -> Result<()> {
    if columns.is_empty() {
        return Err(MigCheckError::Compilation(
            "Row hash requires at least one hashed column".to_string(),
        ));
    }
    if keys.is_empty() {
        return Err(MigCheckError::Compilation(
            "Row hash requires at least one key column".to_string(),
        ));
    }
    if let Some(key) = keys
        .iter()
        .find(|k| [HASH_ALIAS, HASH_INPUT_ALIAS].contains(&key_alias(k).as_str()))
    {
        return Err(MigCheckError::Compilation(format!(
            "Key column '{}' collides with a row hash output column",
            key.name()
        )));
    }
    Ok(())
}

fn normalized(platform: Platform, pair: &ColumnPair, opts: &NormalizeOptions) -> String {
    let family = shared_family(pair.legacy.family(), pair.cloud.family());
    normalize_expr(pair.side(platform), family, opts)
}

fn concat_expr(platform: Platform, columns: &[ColumnPair], opts: &HashOptions) -> String {
    let sep = format!(" || '{}' || ", opts.separator.replace('\'', "''"));
    columns
        .iter()
        .map(|pair| {
            let expr = normalized(platform, pair, &opts.normalize);
            match platform {
                // Concatenation already treats NULL as empty on the legacy side.
                Platform::Legacy => expr,
                Platform::Cloud => platform.coalesce(&expr, "''"),
            }
        })
        .collect::<Vec<_>>()
        .join(&sep)
}

fn digest_expr(platform: Platform, concat: &str) -> String {
    match platform {
        Platform::Legacy => format!("LOWER(RAWTOHEX(STANDARD_HASH({}, 'SHA256')))", concat),
        Platform::Cloud => format!("lower(to_hex(sha256(to_utf8({}))))", concat),
    }
}

/// Compiles the row-hash query for one platform.
///
/// Hashed columns keep the caller's order so both platforms digest the same
/// logical tuple. Keys are projected normalized and the result is ordered by
/// the key list.
pub fn build_hash_sql(
    platform: Platform,
    table: &TableRef,
    columns: &[ColumnPair],
    keys: &[ColumnPair],
    filter: Option<&str>,
    opts: &HashOptions,
) -> Result<String> {
    validate(columns, keys)?;

    let key_select: Vec<String> = keys
        .iter()
        .map(|k| format!("{} AS {}", normalized(platform, k, &opts.normalize), key_alias(k)))
        .collect();
    let order_by: Vec<String> = keys.iter().map(key_alias).collect();
    let hash = digest_expr(platform, &concat_expr(platform, columns, opts));

    Ok(format!(
        r#"SELECT
    {keys},
    {hash} AS {hash_alias}
FROM {table}
WHERE {filter}
ORDER BY {order_by}"#,
        keys = key_select.join(",\n    "),
        hash = hash,
        hash_alias = HASH_ALIAS,
        table = table.render(platform),
        filter = where_clause(filter),
        order_by = order_by.join(", "),
    ))
}

/// Both dialects of the row-hash query, each with its own filter.
pub fn build_hash_pair(
    table_legacy: &TableRef,
    table_cloud: &TableRef,
    columns: &[ColumnPair],
    keys: &[ColumnPair],
    filters: (Option<&str>, Option<&str>),
    opts: &HashOptions,
) -> Result<DualQuery> {
    Ok(DualQuery {
        legacy: build_hash_sql(Platform::Legacy, table_legacy, columns, keys, filters.0, opts)?,
        cloud: build_hash_sql(Platform::Cloud, table_cloud, columns, keys, filters.1, opts)?,
    })
}

/// Projects every normalized column next to the concatenated payload and its
/// digest, for diagnosing individual mismatching rows.
pub fn build_hash_debug_sql(
    platform: Platform,
    table: &TableRef,
    columns: &[ColumnPair],
    keys: &[ColumnPair],
    filter: Option<&str>,
    opts: &HashOptions,
) -> Result<String> {
    validate(columns, keys)?;

    let mut select: Vec<String> = keys
        .iter()
        .map(|k| format!("{} AS {}", normalized(platform, k, &opts.normalize), key_alias(k)))
        .collect();
    select.extend(columns.iter().map(|c| {
        format!(
            "{} AS n_{}",
            normalized(platform, c, &opts.normalize),
            c.name().to_lowercase()
        )
    }));
    let concat = concat_expr(platform, columns, opts);
    select.push(format!("{} AS {}", concat, HASH_INPUT_ALIAS));
    select.push(format!("{} AS {}", digest_expr(platform, &concat), HASH_ALIAS));

    Ok(format!(
        "SELECT\n    {}\nFROM {}\nWHERE {}",
        select.join(",\n    "),
        table.render(platform),
        where_clause(filter)
    ))
}
