//! Schema diff engine.
//!
//! Walks a source and a target [`SchemaSnapshot`] category by category
//! (schemas, tables, views, materialized views, functions, sequences) and
//! returns the script fragments that bring the target in line with the
//! source. Fragments of one object are framed by `--- BEGIN` / `--- END`
//! markers; objects without changes contribute nothing.

mod grants;
mod objects;
pub mod progress;
mod tables;
mod views;

pub use progress::{NoProgress, ProgressReporter, TracingProgress};

use crate::config::CompareOptions;
use crate::model::{IdentityKind, SchemaSnapshot};
use crate::pg::sqlgen::ScriptGenerator;
use std::collections::HashSet;

/// Share of the progress bar given to each of the six categories.
const CATEGORY_PROGRESS: f64 = 0.1665;

/// Field-level changes of a column present on both sides.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnChanges {
    pub nullable: Option<bool>,
    /// New type, precision and scale included.
    pub data_type: Option<String>,
    pub default: Option<Option<String>>,
    pub identity: Option<IdentityChange>,
}

impl ColumnChanges {
    pub fn is_empty(&self) -> bool {
        self.nullable.is_none()
            && self.data_type.is_none()
            && self.default.is_none()
            && self.identity.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityChange {
    Add(IdentityKind),
    Set(IdentityKind),
    Drop,
}

/// Working state of one comparison.
pub(crate) struct DiffContext<'a> {
    source: &'a SchemaSnapshot,
    target: &'a SchemaSnapshot,
    options: &'a CompareOptions,
    sql: ScriptGenerator,
    progress: &'a mut dyn ProgressReporter,
    progress_value: f64,
    final_script: Vec<String>,
    /// Table-scoped: cleared before each table.
    dropped_constraints: HashSet<String>,
    /// Table-scoped: cleared before each table.
    dropped_indexes: HashSet<String>,
    dropped_views: HashSet<String>,
}

impl<'a> DiffContext<'a> {
    fn new(
        source: &'a SchemaSnapshot,
        target: &'a SchemaSnapshot,
        options: &'a CompareOptions,
        progress: &'a mut dyn ProgressReporter,
    ) -> Self {
        Self {
            source,
            target,
            options,
            sql: ScriptGenerator::new(options.clone()),
            progress,
            progress_value: 0.0,
            final_script: Vec::new(),
            dropped_constraints: HashSet::new(),
            dropped_indexes: HashSet::new(),
            dropped_views: HashSet::new(),
        }
    }

    /// Appends the fragments of one object between BEGIN/END markers.
    /// Blank fragments (disabled statements) are skipped.
    fn append_object_script(&mut self, label: &str, mut scripts: Vec<String>) {
        scripts.retain(|script| !script.trim().is_empty());
        if scripts.is_empty() {
            return;
        }
        tracing::trace!(object = label, fragments = scripts.len(), "changes detected");
        self.final_script.push(format!("\n--- BEGIN {label} ---\n"));
        self.final_script.extend(scripts);
        self.final_script.push(format!("\n--- END {label} ---\n"));
    }

    fn start_category(&mut self, label: &str) {
        tracing::debug!(category = label, "comparing");
        self.step_progress(0.0001, label);
    }

    fn step_progress(&mut self, increment: f64, label: &str) {
        self.progress_value = (self.progress_value + increment).min(1.0);
        self.progress.update(self.progress_value, label);
    }

    /// Progress increment per object of a category holding `count` objects.
    fn category_step(count: usize) -> f64 {
        if count == 0 {
            0.0
        } else {
            CATEGORY_PROGRESS / count as f64
        }
    }

    fn run(mut self) -> Vec<String> {
        self.compare_schemas();
        self.compare_tables();
        self.compare_views();
        self.compare_materialized_views();
        self.compare_procedures();
        self.compare_sequences();

        self.progress_value = 1.0;
        self.progress.update(1.0, "Database objects compared!");
        self.final_script
    }
}

/// Compares `source` against `target` and returns the ordered script
/// fragments that reconcile the target toward the source.
pub fn compare_database_objects(
    source: &SchemaSnapshot,
    target: &SchemaSnapshot,
    options: &CompareOptions,
) -> Vec<String> {
    compare_database_objects_with_progress(source, target, options, &mut NoProgress)
}

pub fn compare_database_objects_with_progress(
    source: &SchemaSnapshot,
    target: &SchemaSnapshot,
    options: &CompareOptions,
    progress: &mut dyn ProgressReporter,
) -> Vec<String> {
    DiffContext::new(source, target, options, progress).run()
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::model::{Column, Table, TableOptions};
    use indexmap::IndexMap;
    use std::collections::BTreeMap;

    pub fn column(datatype: &str, nullable: bool) -> Column {
        Column {
            datatype: datatype.to_string(),
            data_type_id: 0,
            data_type_category: 'X',
            precision: None,
            scale: None,
            nullable,
            default: None,
            identity: None,
        }
    }

    pub fn table(columns: &[(&str, Column)]) -> Table {
        Table {
            owner: "postgres".to_string(),
            options: TableOptions::default(),
            columns: columns
                .iter()
                .map(|(name, column)| (name.to_string(), column.clone()))
                .collect::<IndexMap<_, _>>(),
            constraints: BTreeMap::new(),
            indexes: BTreeMap::new(),
            privileges: BTreeMap::new(),
        }
    }
}
