mod mock;
mod query;
mod runner;

pub use mock::MockExecutor;
pub use query::{QueryExecutor, QueryResult, Record};
pub use runner::{
    HashReport, ReconRunner, StatsReport, TableScope, UnitFailure, DEFAULT_CLOUD_PARALLELISM,
    DEFAULT_LEGACY_PARALLELISM,
};
