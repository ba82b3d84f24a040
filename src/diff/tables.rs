use std::collections::{BTreeMap, HashSet};

use tracing::warn;

use super::grants::{diff_owner, diff_privileges};
use super::{ColumnChanges, DiffContext, IdentityChange};
use crate::model::{Column, Index, Table};
use crate::pg::sqlgen::ObjectKind;
use crate::util::unquote_ident;

impl DiffContext<'_> {
    pub(super) fn compare_tables(&mut self) {
        self.start_category("Comparing tables");
        let (source, target) = (self.source, self.target);
        let step = Self::category_step(source.tables.len());

        for (name, source_table) in &source.tables {
            self.dropped_constraints.clear();
            self.dropped_indexes.clear();

            let mut scripts = Vec::new();
            let action = match target.tables.get(name) {
                Some(target_table) => {
                    self.compare_table(name, source_table, target_table, &mut scripts);
                    "ALTER"
                }
                None => {
                    scripts.push(self.sql.generate_create_table_script(name, source_table));
                    "CREATE"
                }
            };
            self.append_object_script(&format!("{action} TABLE {name}"), scripts);
            self.step_progress(step, &format!("Table {name} compared"));
        }

        if self.options.drop_missing_table {
            for name in target.tables.keys() {
                if source.tables.contains_key(name) {
                    continue;
                }
                let scripts = vec![self.sql.generate_drop_table_script(name)];
                self.append_object_script(&format!("DROP TABLE {name}"), scripts);
            }
        }
    }

    fn compare_table(
        &mut self,
        name: &str,
        source: &Table,
        target: &Table,
        scripts: &mut Vec<String>,
    ) {
        if source.options != target.options {
            scripts.push(
                self.sql
                    .generate_change_table_options_script(name, &source.options),
            );
        }
        self.compare_table_columns(name, source, target, scripts);
        self.compare_table_constraints(name, source, target, scripts);
        scripts.extend(self.diff_indexes(&source.indexes, &target.indexes, &self.dropped_indexes));
        scripts.extend(diff_privileges(
            &self.sql,
            ObjectKind::Table,
            name,
            &source.privileges,
            &target.privileges,
        ));
        scripts.extend(diff_owner(
            &self.sql,
            ObjectKind::Table,
            name,
            &source.owner,
            &target.owner,
        ));
    }

    fn compare_table_columns(
        &mut self,
        table: &str,
        source: &Table,
        target: &Table,
        scripts: &mut Vec<String>,
    ) {
        for (column, source_column) in &source.columns {
            match target.columns.get(column) {
                Some(target_column) => {
                    let changes = column_changes(source_column, target_column);
                    if changes.is_empty() {
                        continue;
                    }
                    self.invalidate_column_dependents(table, column, target, scripts);
                    scripts.push(
                        self.sql
                            .generate_change_table_column_script(table, column, &changes),
                    );
                }
                None => scripts.push(self.sql.generate_add_table_column_script(
                    table,
                    column,
                    source_column,
                )),
            }
        }

        for column in target.columns.keys() {
            if !source.columns.contains_key(column) {
                scripts.push(self.sql.generate_drop_table_column_script(table, column));
            }
        }
    }

    /// Drops the target constraints, indexes, views and materialized views
    /// that read `column`, recording them so they are neither dropped twice
    /// nor forgotten when the later passes find them unchanged.
    fn invalidate_column_dependents(
        &mut self,
        table: &str,
        column: &str,
        target: &Table,
        scripts: &mut Vec<String>,
    ) {
        let raw = unquote_ident(column);

        for (name, constraint) in &target.constraints {
            if self.dropped_constraints.contains(name)
                || !definition_references_column(&constraint.definition, raw, column)
            {
                continue;
            }
            warn!(table, column, constraint = %name, "dropping constraint depending on changed column");
            scripts.push(self.sql.generate_drop_table_constraint_script(table, name));
            self.dropped_constraints.insert(name.clone());
        }

        for (name, index) in &target.indexes {
            if self.dropped_indexes.contains(name)
                || !definition_references_column(&index.definition, raw, column)
            {
                continue;
            }
            warn!(table, column, index = %name, "dropping index depending on changed column");
            scripts.push(self.sql.generate_drop_index_script(name));
            self.dropped_indexes.insert(name.clone());
        }

        let snapshot = self.target;
        for (name, view) in &snapshot.views {
            if self.dropped_views.contains(name)
                || !view.dependencies.iter().any(|d| d.references(table, column))
            {
                continue;
            }
            warn!(table, column, view = %name, "dropping view depending on changed column");
            scripts.push(self.sql.generate_drop_view_script(name));
            self.dropped_views.insert(name.clone());
        }

        for (name, view) in &snapshot.materialized_views {
            if self.dropped_views.contains(name)
                || !view.dependencies.iter().any(|d| d.references(table, column))
            {
                continue;
            }
            warn!(table, column, view = %name, "dropping materialized view depending on changed column");
            scripts.push(self.sql.generate_drop_materialized_view_script(name));
            self.dropped_views.insert(name.clone());
        }
    }

    fn compare_table_constraints(
        &mut self,
        table: &str,
        source: &Table,
        target: &Table,
        scripts: &mut Vec<String>,
    ) {
        for (name, source_constraint) in &source.constraints {
            let dropped = self.dropped_constraints.contains(name);
            match target.constraints.get(name) {
                Some(target_constraint)
                    if target_constraint.definition != source_constraint.definition =>
                {
                    if !dropped {
                        scripts.push(self.sql.generate_drop_table_constraint_script(table, name));
                    }
                    scripts.push(self.sql.generate_add_table_constraint_script(
                        table,
                        name,
                        source_constraint,
                    ));
                }
                Some(_) if !dropped => {}
                _ => scripts.push(self.sql.generate_add_table_constraint_script(
                    table,
                    name,
                    source_constraint,
                )),
            }
        }

        for name in target.constraints.keys() {
            if !source.constraints.contains_key(name) && !self.dropped_constraints.contains(name) {
                scripts.push(self.sql.generate_drop_table_constraint_script(table, name));
            }
        }
    }

    /// Three-way index diff shared by tables and materialized views.
    pub(super) fn diff_indexes(
        &self,
        source: &BTreeMap<String, Index>,
        target: &BTreeMap<String, Index>,
        dropped: &HashSet<String>,
    ) -> Vec<String> {
        let mut scripts = Vec::new();

        for (name, source_index) in source {
            match target.get(name) {
                Some(target_index) if target_index.definition != source_index.definition => {
                    if !dropped.contains(name) {
                        scripts.push(self.sql.generate_drop_index_script(name));
                    }
                    scripts.push(self.sql.generate_create_index_script(&source_index.definition));
                }
                Some(_) if !dropped.contains(name) => {}
                _ => scripts.push(self.sql.generate_create_index_script(&source_index.definition)),
            }
        }

        for name in target.keys() {
            if !source.contains_key(name) && !dropped.contains(name) {
                scripts.push(self.sql.generate_drop_index_script(name));
            }
        }

        scripts
    }
}

fn column_changes(source: &Column, target: &Column) -> ColumnChanges {
    let mut changes = ColumnChanges::default();

    if source.nullable != target.nullable {
        changes.nullable = Some(source.nullable);
    }
    if !source.same_data_type(target) {
        changes.data_type = Some(source.data_type_definition());
    }
    if source.default != target.default {
        changes.default = Some(source.default.clone());
    }
    changes.identity = match (source.identity, target.identity) {
        (Some(kind), None) => Some(IdentityChange::Add(kind)),
        (Some(kind), Some(current)) if kind != current => Some(IdentityChange::Set(kind)),
        (None, Some(_)) => Some(IdentityChange::Drop),
        _ => None,
    };

    changes
}

/// Textual dependency check: does `definition`, from its first parenthesis
/// on, mention the column as `name,`, `name)` or `"name"`?
///
/// This is a heuristic. `CHECK ((age > 0))` does not match `age`, while an
/// unrelated `page)` does.
pub(crate) fn definition_references_column(definition: &str, raw: &str, quoted: &str) -> bool {
    let body = definition
        .find('(')
        .map_or(definition, |start| &definition[start..]);
    body.contains(&format!("{raw},")) || body.contains(&format!("{raw})")) || body.contains(quoted)
}
