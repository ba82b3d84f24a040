//! Row-level DML rendering. Callers decide which rows differ; this module
//! only turns them into INSERT / UPDATE / DELETE / upsert statements.

use super::sqlgen::hints;
use super::values::{format_value, FieldType, FieldValue, TypeCatalog};
use crate::util::{quote_ident, Result, SchemaError};
use indexmap::IndexMap;

/// Field name to value, in column order.
pub type Record = IndexMap<String, FieldValue>;

/// How an upsert detects the conflicting row.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MergeOptions {
    pub constraint_name: Option<String>,
    pub unique_fields: Vec<String>,
}

impl MergeOptions {
    pub fn on_constraint(name: impl Into<String>) -> Self {
        Self {
            constraint_name: Some(name.into()),
            unique_fields: Vec::new(),
        }
    }

    pub fn on_fields<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            constraint_name: None,
            unique_fields: fields.into_iter().map(Into::into).collect(),
        }
    }
}

pub struct RecordScriptGenerator<'a> {
    catalog: &'a TypeCatalog,
}

impl<'a> RecordScriptGenerator<'a> {
    pub fn new(catalog: &'a TypeCatalog) -> Self {
        Self { catalog }
    }

    fn assignments(&self, fields: &[FieldType], record: &Record) -> Result<Vec<String>> {
        record
            .iter()
            .map(|(name, value)| {
                Ok(format!(
                    "{} = {}",
                    quote_ident(name),
                    format_value(name, fields, value, self.catalog)?
                ))
            })
            .collect()
    }

    fn values(&self, fields: &[FieldType], record: &Record) -> Result<Vec<String>> {
        record
            .iter()
            .map(|(name, value)| format_value(name, fields, value, self.catalog))
            .collect()
    }

    pub fn generate_update_table_record_script(
        &self,
        table: &str,
        fields: &[FieldType],
        filter: &Record,
        changes: &Record,
    ) -> Result<String> {
        Ok(format!(
            "\nUPDATE {} SET {} WHERE {};\n",
            table,
            self.assignments(fields, changes)?.join(", "),
            self.assignments(fields, filter)?.join(" AND ")
        ))
    }

    /// When explicit identity values are not allowed, the insert overrides
    /// the generated value and is annotated.
    pub fn generate_insert_table_record_script(
        &self,
        table: &str,
        record: &Record,
        fields: &[FieldType],
        identity_user_values_allowed: bool,
    ) -> Result<String> {
        let (overriding, hint) = if identity_user_values_allowed {
            ("", "")
        } else {
            (" OVERRIDING SYSTEM VALUE", hints::IDENTITY_COLUMN_DETECTED)
        };
        Ok(format!(
            "\nINSERT INTO {} ({}){} VALUES ({});{}\n",
            table,
            column_list(record),
            overriding,
            self.values(fields, record)?.join(", "),
            hint
        ))
    }

    pub fn generate_delete_table_record_script(
        &self,
        table: &str,
        fields: &[FieldType],
        key_fields: &Record,
    ) -> Result<String> {
        Ok(format!(
            "\nDELETE FROM {} WHERE {};\n",
            table,
            self.assignments(fields, key_fields)?.join(" AND ")
        ))
    }

    pub fn generate_merge_table_record_script(
        &self,
        table: &str,
        fields: &[FieldType],
        changes: &Record,
        options: &MergeOptions,
    ) -> Result<String> {
        let conflict = match (&options.constraint_name, options.unique_fields.is_empty()) {
            (Some(name), _) => format!("ON CONSTRAINT {name}"),
            (None, false) => format!(
                "({})",
                options
                    .unique_fields
                    .iter()
                    .map(|f| quote_ident(f))
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
            (None, true) => {
                return Err(SchemaError::MissingConflictDefinition {
                    table: table.to_string(),
                })
            }
        };

        Ok(format!(
            "\nINSERT INTO {} ({}) VALUES ({})\nON CONFLICT {}\nDO UPDATE SET {};\n",
            table,
            column_list(changes),
            self.values(fields, changes)?.join(", "),
            conflict,
            self.assignments(fields, changes)?.join(", ")
        ))
    }
}

/// Realigns the serial sequence of `column` with the current maximum value.
pub fn generate_set_sequence_value_script(table: &str, column: &str) -> String {
    format!(
        "\nSELECT setval(pg_get_serial_sequence('{table}', '{column}'), max({}), true) FROM {table};\n",
        quote_ident(column)
    )
}

fn column_list(record: &Record) -> String {
    record
        .keys()
        .map(|name| quote_ident(name))
        .collect::<Vec<_>>()
        .join(", ")
}
