mod reconcile;

pub use reconcile::{
    reconcile_hashes, HashMismatch, HashOutcome, HashRow, RowHashComparison, RowKey,
    DEFAULT_SAMPLE_LIMIT,
};
