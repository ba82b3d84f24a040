//! Convenient re-exports for common pgdiff usage.

pub use crate::api::{compare, compare_blocking, compare_snapshots};
pub use crate::api::{CompareRequest, CompareResult, Error};

pub use crate::config::{load_config, CompareOptions, Configuration};
pub use crate::diff::{compare_database_objects, ProgressReporter};
pub use crate::model::SchemaSnapshot;
