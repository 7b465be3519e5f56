//! Fixed-template SQL for both dialects. Nothing here executes a query.

mod catalog;
mod hash;
mod normalize;
mod statistics;
mod table;

pub use catalog::{
    build_catalog_sql, build_partition_sample_sql, build_row_count_sql, PARTITION_DATE_ALIAS,
    ROW_COUNT_ALIAS,
};
pub use hash::{
    build_hash_debug_sql, build_hash_pair, build_hash_sql, key_alias, DualQuery, HashOptions,
    DEFAULT_SEPARATOR, HASH_ALIAS,
};
pub use normalize::{
    normalize_expr, shared_family, NormalizeOptions, DEFAULT_DECIMALS, PSEUDO_NULL_TOKENS,
};
pub use statistics::{build_stats_sql, DEFAULT_TOP_N, STAT_ALIASES};
pub use table::{and_predicates, TableRef};
