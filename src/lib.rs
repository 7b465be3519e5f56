pub mod compare;
pub mod compiler;
pub mod config;
pub mod error;
pub mod executor;
pub mod hash;
pub mod schema;
pub mod vintage;

pub use compare::{
    ColumnOutcome, ColumnQuality, ComparisonKind, ComparisonResult, Scalar, StatField, StatRow,
    StatSchema, StatsComparator, Verdict,
};
pub use compiler::{
    build_hash_pair, build_hash_sql, build_row_count_sql, build_stats_sql, DualQuery, HashOptions,
    NormalizeOptions, TableRef,
};
pub use config::ReconConfig;
pub use error::{MigCheckError, Result};
pub use executor::{
    MockExecutor, QueryExecutor, QueryResult, ReconRunner, TableScope, UnitFailure,
};
pub use hash::{reconcile_hashes, HashOutcome, HashRow, RowHashComparison};
pub use schema::{
    ColumnMapping, ColumnPair, ColumnSpec, Crosswalk, DateStorage, Granularity, PartitionColumn,
    Platform,
};
pub use vintage::{
    validate_table, RowCountComparison, TableOutcome, TableSide, ValidatedVintage, Vintage,
    VintageBuilder,
};
