use super::grants::{diff_owner, diff_privileges};
use super::DiffContext;
use crate::model::Sequence;
use crate::pg::sqlgen::{ObjectKind, SequenceProperty};

impl DiffContext<'_> {
    /// Creates schemas missing on the target. Schemas are never dropped.
    pub(super) fn compare_schemas(&mut self) {
        self.start_category("Comparing schemas");
        let (source, target) = (self.source, self.target);
        let step = Self::category_step(source.schemas.len());

        for (name, namespace) in &source.schemas {
            if !target.schemas.contains_key(name) {
                let scripts = vec![self.sql.generate_create_schema_script(name, &namespace.owner)];
                self.append_object_script(&format!("CREATE SCHEMA {name}"), scripts);
            }
            self.step_progress(step, &format!("Schema {name} compared"));
        }
    }

    pub(super) fn compare_procedures(&mut self) {
        self.start_category("Comparing functions");
        let (source, target) = (self.source, self.target);
        let step = Self::category_step(source.functions.len());

        for (key, source_function) in &source.functions {
            let mut scripts = Vec::new();
            let action = match target.functions.get(key) {
                // a changed body is recreated with its full owner and grants,
                // so no privilege diff is run for it
                Some(target_function) if target_function.definition != source_function.definition => {
                    scripts.push(self.sql.generate_change_procedure_script(source_function));
                    "ALTER"
                }
                Some(target_function) => {
                    let signature = source_function.signature();
                    scripts.extend(diff_privileges(
                        &self.sql,
                        ObjectKind::Function,
                        &signature,
                        &source_function.privileges,
                        &target_function.privileges,
                    ));
                    scripts.extend(diff_owner(
                        &self.sql,
                        ObjectKind::Function,
                        &signature,
                        &source_function.owner,
                        &target_function.owner,
                    ));
                    "ALTER"
                }
                None => {
                    scripts.push(self.sql.generate_create_procedure_script(source_function));
                    "CREATE"
                }
            };
            self.append_object_script(&format!("{action} FUNCTION {key}"), scripts);
            self.step_progress(step, &format!("Function {key} compared"));
        }

        if self.options.drop_missing_function {
            for (key, target_function) in &target.functions {
                if source.functions.contains_key(key) {
                    continue;
                }
                let scripts = vec![self.sql.generate_drop_procedure_script(target_function)];
                self.append_object_script(&format!("DROP FUNCTION {key}"), scripts);
            }
        }
    }

    pub(super) fn compare_sequences(&mut self) {
        self.start_category("Comparing sequences");
        let (source, target) = (self.source, self.target);
        let step = Self::category_step(source.sequences.len());

        for (key, source_sequence) in &source.sequences {
            let mut scripts = Vec::new();
            let action = if let Some((old_key, renamed)) =
                self.find_renamed_sequence(key, source_sequence)
            {
                tracing::debug!(from = %old_key, to = %key, "sequence rename detected");
                scripts.push(
                    self.sql
                        .generate_rename_sequence_script(old_key, &source_sequence.name),
                );
                scripts.extend(self.diff_sequence(key, source_sequence, renamed));
                "ALTER"
            } else if let Some(target_sequence) = target.sequences.get(key) {
                scripts.extend(self.diff_sequence(key, source_sequence, target_sequence));
                "ALTER"
            } else {
                scripts.push(self.sql.generate_create_sequence_script(key, source_sequence));
                "CREATE"
            };
            self.append_object_script(&format!("{action} SEQUENCE {key}"), scripts);
            self.step_progress(step, &format!("Sequence {key} compared"));
        }
    }

    /// A target sequence under another name feeding the same column.
    /// Sequences not owned by a column never match.
    fn find_renamed_sequence(&self, key: &str, sequence: &Sequence) -> Option<(&str, &Sequence)> {
        let owned_by = sequence.owned_by.as_deref()?;
        self.target
            .sequences
            .iter()
            .find(|(name, candidate)| {
                name.as_str() != key && candidate.owned_by.as_deref() == Some(owned_by)
            })
            .map(|(name, candidate)| (name.as_str(), candidate))
    }

    fn diff_sequence(&self, key: &str, source: &Sequence, target: &Sequence) -> Vec<String> {
        let properties = [
            (source.start_value != target.start_value).then_some(SequenceProperty::StartValue(source.start_value)),
            (source.min_value != target.min_value).then_some(SequenceProperty::MinValue(source.min_value)),
            (source.max_value != target.max_value).then_some(SequenceProperty::MaxValue(source.max_value)),
            (source.increment != target.increment).then_some(SequenceProperty::Increment(source.increment)),
            (source.cache_size != target.cache_size).then_some(SequenceProperty::CacheSize(source.cache_size)),
            (source.is_cycle != target.is_cycle).then_some(SequenceProperty::Cycle(source.is_cycle)),
        ];

        let mut scripts: Vec<String> = properties
            .into_iter()
            .flatten()
            .map(|property| self.sql.generate_change_sequence_property_script(key, property))
            .collect();
        scripts.extend(diff_owner(
            &self.sql,
            ObjectKind::Sequence,
            key,
            &source.owner,
            &target.owner,
        ));
        scripts.extend(diff_privileges(
            &self.sql,
            ObjectKind::Sequence,
            key,
            &source.privileges,
            &target.privileges,
        ));
        scripts
    }
}
