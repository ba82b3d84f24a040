//! pgdiff - PostgreSQL schema comparison and patch script generator.
//!
//! Collects the catalog of a source and a target database, compares them
//! object by object and renders the SQL script that brings the target in
//! line with the source.
//!
//! ```no_run
//! use pgdiff::prelude::*;
//!
//! let source = SchemaSnapshot::new();
//! let target = SchemaSnapshot::new();
//! let script = compare_snapshots(&source, &target, &CompareOptions::default().idempotent());
//! assert!(script.is_empty());
//! ```
//!
//! # Modules
//!
//! - [`api`] - High-level compare entry points
//! - [`diff`] - Diff engine
//! - [`pg`] - Collector and SQL rendering
//! - [`model`] - Catalog snapshot types

pub mod api;
pub mod config;
pub mod diff;
pub mod model;
pub mod pg;
pub mod prelude;
pub mod script;
pub mod util;
