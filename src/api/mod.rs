//! High-level API for embedding pgdiff in other applications.
//!
//! # Example
//!
//! ```no_run
//! use pgdiff::api::{compare_blocking, CompareRequest};
//! use std::path::Path;
//!
//! let request = CompareRequest::from_config_file(
//!     Path::new("pg-diff-config.json"),
//!     "development",
//!     "add-orders",
//! ).unwrap();
//!
//! let result = compare_blocking(request).unwrap();
//! println!("patch written to {}", result.script_path.display());
//! ```
//!
//! Blocking variants create a new tokio runtime per call.

mod error;
mod options;
mod results;

pub use error::Error;
pub use options::CompareRequest;
pub use results::CompareResult;

use crate::config::{CompareOptions, ConnectionConfig};
use crate::diff::{
    compare_database_objects, compare_database_objects_with_progress, TracingProgress,
};
use crate::model::SchemaSnapshot;
use crate::pg::{introspect_snapshot, PgConnection};
use crate::script::{endpoint_label, script_file_name, write_script, ScriptHeader};
use chrono::Utc;
use std::path::Path;

async fn connect_and_introspect(
    config: &ConnectionConfig,
    namespaces: &[String],
) -> Result<SchemaSnapshot, Error> {
    let connection = PgConnection::connect(config)
        .await
        .map_err(|e| Error::connection(e.to_string()))?;

    introspect_snapshot(&connection, namespaces)
        .await
        .map_err(|e| Error::introspection(e.to_string()))
}

/// Collects both databases, compares them and writes the patch file.
///
/// The file is written even when the databases already match; it then only
/// carries the header.
pub async fn compare(request: CompareRequest) -> Result<CompareResult, Error> {
    let configuration = &request.configuration;
    let compare_options = &configuration.options.schema_compare;
    let namespaces = &compare_options.namespaces;

    let source = connect_and_introspect(&configuration.source, namespaces).await?;
    let target = connect_and_introspect(&configuration.target, namespaces).await?;

    let statements = compare_database_objects_with_progress(
        &source,
        &target,
        compare_options,
        &mut TracingProgress,
    );

    let now = Utc::now();
    let header = ScriptHeader {
        author: configuration.options.author.clone(),
        created_on: now,
        source: endpoint_label(&configuration.source.display_name(), &source),
        target: endpoint_label(&configuration.target.display_name(), &target),
    };

    let script_path = write_script(
        Path::new(&configuration.options.output_directory),
        &script_file_name(now, &request.script_name),
        &header,
        &statements,
    )
    .map_err(|e| Error::io(e.to_string()))?;

    let is_empty = statements.is_empty();
    Ok(CompareResult {
        statements,
        script_path,
        is_empty,
    })
}

/// Compares two already collected snapshots without touching a database.
pub fn compare_snapshots(
    source: &SchemaSnapshot,
    target: &SchemaSnapshot,
    options: &CompareOptions,
) -> Vec<String> {
    compare_database_objects(source, target, options)
}

fn create_runtime() -> Result<tokio::runtime::Runtime, Error> {
    tokio::runtime::Runtime::new().map_err(|e| Error::runtime(e.to_string()))
}

/// Blocking variant of [`compare`].
pub fn compare_blocking(request: CompareRequest) -> Result<CompareResult, Error> {
    create_runtime()?.block_on(compare(request))
}
