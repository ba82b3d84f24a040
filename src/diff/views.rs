use std::collections::HashSet;

use super::grants::{diff_owner, diff_privileges};
use super::DiffContext;
use crate::pg::sqlgen::ObjectKind;

impl DiffContext<'_> {
    pub(super) fn compare_views(&mut self) {
        self.start_category("Comparing views");
        let (source, target) = (self.source, self.target);
        let step = Self::category_step(source.views.len());

        for (name, source_view) in &source.views {
            let mut scripts = Vec::new();
            let action = match target.views.get(name) {
                Some(target_view) => {
                    let dropped = self.dropped_views.contains(name);
                    if source_view.definition != target_view.definition {
                        if !dropped {
                            scripts.push(self.sql.generate_drop_view_script(name));
                        }
                        scripts.push(self.sql.generate_create_view_script(name, source_view));
                    } else if dropped {
                        scripts.push(self.sql.generate_create_view_script(name, source_view));
                    } else {
                        scripts.extend(diff_privileges(
                            &self.sql,
                            ObjectKind::View,
                            name,
                            &source_view.privileges,
                            &target_view.privileges,
                        ));
                        scripts.extend(diff_owner(
                            &self.sql,
                            ObjectKind::View,
                            name,
                            &source_view.owner,
                            &target_view.owner,
                        ));
                    }
                    "ALTER"
                }
                None => {
                    scripts.push(self.sql.generate_create_view_script(name, source_view));
                    "CREATE"
                }
            };
            self.append_object_script(&format!("{action} VIEW {name}"), scripts);
            self.step_progress(step, &format!("View {name} compared"));
        }

        if self.options.drop_missing_view {
            for name in target.views.keys() {
                if source.views.contains_key(name) || self.dropped_views.contains(name) {
                    continue;
                }
                let scripts = vec![self.sql.generate_drop_view_script(name)];
                self.append_object_script(&format!("DROP VIEW {name}"), scripts);
            }
        }
    }

    pub(super) fn compare_materialized_views(&mut self) {
        self.start_category("Comparing materialized views");
        let (source, target) = (self.source, self.target);
        let step = Self::category_step(source.materialized_views.len());
        // column cascades only track table indexes
        let no_dropped_indexes = HashSet::new();

        for (name, source_view) in &source.materialized_views {
            let mut scripts = Vec::new();
            let action = match target.materialized_views.get(name) {
                Some(target_view) => {
                    let dropped = self.dropped_views.contains(name);
                    if source_view.definition != target_view.definition {
                        if !dropped {
                            scripts.push(self.sql.generate_drop_materialized_view_script(name));
                        }
                        scripts.push(
                            self.sql
                                .generate_create_materialized_view_script(name, source_view),
                        );
                    } else if dropped {
                        scripts.push(
                            self.sql
                                .generate_create_materialized_view_script(name, source_view),
                        );
                    } else {
                        scripts.extend(self.diff_indexes(
                            &source_view.indexes,
                            &target_view.indexes,
                            &no_dropped_indexes,
                        ));
                        scripts.extend(diff_privileges(
                            &self.sql,
                            ObjectKind::MaterializedView,
                            name,
                            &source_view.privileges,
                            &target_view.privileges,
                        ));
                        scripts.extend(diff_owner(
                            &self.sql,
                            ObjectKind::MaterializedView,
                            name,
                            &source_view.owner,
                            &target_view.owner,
                        ));
                    }
                    "ALTER"
                }
                None => {
                    scripts.push(
                        self.sql
                            .generate_create_materialized_view_script(name, source_view),
                    );
                    "CREATE"
                }
            };
            self.append_object_script(&format!("{action} MATERIALIZED VIEW {name}"), scripts);
            self.step_progress(step, &format!("Materialized view {name} compared"));
        }

        if self.options.drop_missing_view {
            for name in target.materialized_views.keys() {
                if source.materialized_views.contains_key(name) || self.dropped_views.contains(name)
                {
                    continue;
                }
                let scripts = vec![self.sql.generate_drop_materialized_view_script(name)];
                self.append_object_script(&format!("DROP MATERIALIZED VIEW {name}"), scripts);
            }
        }
    }
}
