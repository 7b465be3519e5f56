mod column;
mod mapping;
mod partition;
mod platform;

pub use column::{classify, type_family, types_compatible, ColumnCategory, ColumnSpec, TypeFamily};
pub use mapping::{ColumnMapping, ColumnPair, Crosswalk, TypeMismatch};
pub use partition::{DateFormat, DateStorage, Granularity, PartitionColumn};
pub use platform::Platform;
