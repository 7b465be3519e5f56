mod row_count;
mod validated;
mod window;

pub use row_count::{DateMismatch, RowCountComparison};
pub use validated::{
    fingerprint, validate_table, ExclusionReason, TableOutcome, TableSide, TableValidation,
    ValidatedVintage,
};
pub use window::{align_windows, describe, exclusion_predicate, Vintage, VintageBuilder, Window};
