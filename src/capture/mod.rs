//! Edit capture: admission, exclusion and per-resource aggregation

pub mod admission;
pub mod aggregate;
pub mod exclusion;
pub mod table;

pub use admission::is_meaningful;
pub use aggregate::AggregatedEdit;
pub use exclusion::{PathExclusions, ResourceFilter};
pub use table::{AggregationTable, FlushHandler};
