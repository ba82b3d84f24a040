use crate::config::CompareOptions;
use crate::diff::{ColumnChanges, IdentityChange};
use crate::model::{
    Column, Constraint, Function, MaterializedView, Permission, PrivilegeSet, Sequence, Table,
    TableOptions, View,
};
use crate::util::quote_ident;
use std::collections::BTreeMap;

/// Advisory comments appended right after the statement they annotate.
pub mod hints {
    pub const ADD_COLUMN_NOT_NULLABLE_WITHOUT_DEFAULT: &str =
        " --WARN: Adding a NOT NULL column without a default value fails when the table already contains rows!";
    pub const CHANGE_COLUMN_DATA_TYPE: &str =
        " --WARN: Changing the column data type can fail on cast, the suggested USING expression is the default cast and may not fit your needs!";
    pub const DROP_COLUMN: &str = " --WARN: Dropping a column causes data loss!";
    pub const POTENTIAL_ROLE_MISSING: &str =
        " --WARN: Granting or revoking privileges fails when the role is missing on the target database!";
    pub const IDENTITY_COLUMN_DETECTED: &str =
        " --WARN: Identity column detected, explicit values can violate constraints on the target!";
    pub const DROP_TABLE: &str = " --WARN: Dropping a table causes data loss!";
}

/// Object kinds that carry an owner and privileges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectKind {
    Table,
    View,
    MaterializedView,
    Sequence,
    Function,
}

impl ObjectKind {
    pub fn as_sql_str(&self) -> &'static str {
        match self {
            ObjectKind::Table => "TABLE",
            ObjectKind::View => "VIEW",
            ObjectKind::MaterializedView => "MATERIALIZED VIEW",
            ObjectKind::Sequence => "SEQUENCE",
            ObjectKind::Function => "FUNCTION",
        }
    }

    /// Keyword used in `GRANT ... ON <keyword>`; views share the table form.
    fn grant_keyword(&self) -> &'static str {
        match self {
            ObjectKind::Table | ObjectKind::View | ObjectKind::MaterializedView => "TABLE",
            ObjectKind::Sequence => "SEQUENCE",
            ObjectKind::Function => "FUNCTION",
        }
    }
}

/// A single sequence attribute to alter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SequenceProperty {
    StartValue(i64),
    MinValue(i64),
    MaxValue(i64),
    Increment(i64),
    CacheSize(i64),
    Cycle(bool),
}

/// Renders DDL fragments. Every fragment is a complete statement (or an empty
/// string when the configuration suppresses it), framed by newlines so
/// fragments can be concatenated as-is.
#[derive(Debug, Clone)]
pub struct ScriptGenerator {
    options: CompareOptions,
}

impl ScriptGenerator {
    pub fn new(options: CompareOptions) -> Self {
        Self { options }
    }

    fn if_exists(&self, keyword: &str) -> String {
        if self.options.idempotent_script {
            format!("{keyword} IF EXISTS")
        } else {
            keyword.to_string()
        }
    }

    fn if_not_exists(&self, keyword: &str) -> String {
        if self.options.idempotent_script {
            format!("{keyword} IF NOT EXISTS")
        } else {
            keyword.to_string()
        }
    }

    pub fn generate_create_schema_script(&self, schema: &str, owner: &str) -> String {
        format!(
            "\nCREATE {} {} AUTHORIZATION {};\n",
            self.if_not_exists("SCHEMA"),
            schema,
            owner
        )
    }

    pub fn generate_drop_table_script(&self, table: &str) -> String {
        format!(
            "\nDROP {} {};{}\n",
            self.if_exists("TABLE"),
            table,
            hints::DROP_TABLE
        )
    }

    pub fn generate_create_table_script(&self, table: &str, schema: &Table) -> String {
        let mut definitions: Vec<String> = schema
            .columns
            .iter()
            .map(|(name, column)| column_definition(name, column))
            .collect();
        definitions.extend(
            schema
                .constraints
                .iter()
                .map(|(name, constraint)| format!("CONSTRAINT {} {}", name, constraint.definition)),
        );

        let indexes: Vec<String> = if self.options.indexes {
            schema
                .indexes
                .values()
                .map(|index| format!("\n{};\n", self.index_definition(&index.definition)))
                .collect()
        } else {
            Vec::new()
        };

        let privileges =
            self.object_privileges(ObjectKind::Table, table, &schema.owner, &schema.privileges);

        format!(
            "\nCREATE {} {} (\n\t{}\n)\nWITH ( OIDS={} );\n{}\n{}\n",
            self.if_not_exists("TABLE"),
            table,
            definitions.join(",\n\t"),
            if schema.options.with_oids { "TRUE" } else { "FALSE" },
            indexes.join(""),
            privileges
        )
    }

    pub fn generate_change_table_options_script(
        &self,
        table: &str,
        options: &TableOptions,
    ) -> String {
        format!(
            "\nALTER {} {} SET {} OIDS;\n",
            self.if_exists("TABLE"),
            table,
            if options.with_oids { "WITH" } else { "WITHOUT" }
        )
    }

    pub fn generate_add_table_column_script(
        &self,
        table: &str,
        column: &str,
        schema: &Column,
    ) -> String {
        let hint = if !schema.nullable && schema.default.is_none() {
            hints::ADD_COLUMN_NOT_NULLABLE_WITHOUT_DEFAULT
        } else {
            ""
        };
        format!(
            "\nALTER {} {} ADD {} {};{}\n",
            self.if_exists("TABLE"),
            table,
            self.if_not_exists("COLUMN"),
            column_definition(column, schema),
            hint
        )
    }

    pub fn generate_change_table_column_script(
        &self,
        table: &str,
        column: &str,
        changes: &ColumnChanges,
    ) -> String {
        let mut definitions = Vec::new();
        let mut hint = "";

        if let Some(nullable) = changes.nullable {
            definitions.push(format!(
                "ALTER COLUMN {} {}",
                column,
                if nullable { "DROP NOT NULL" } else { "SET NOT NULL" }
            ));
        }

        if let Some(ref data_type) = changes.data_type {
            definitions.push(format!(
                "ALTER COLUMN {column} SET DATA TYPE {data_type} USING {column}::{data_type}"
            ));
            hint = hints::CHANGE_COLUMN_DATA_TYPE;
        }

        if let Some(ref default) = changes.default {
            definitions.push(match default {
                Some(value) => format!("ALTER COLUMN {column} SET DEFAULT {value}"),
                None => format!("ALTER COLUMN {column} DROP DEFAULT"),
            });
        }

        if let Some(ref identity) = changes.identity {
            definitions.push(match identity {
                IdentityChange::Add(kind) => {
                    format!("ALTER COLUMN {column} ADD GENERATED {kind} AS IDENTITY")
                }
                IdentityChange::Set(kind) => format!("ALTER COLUMN {column} SET GENERATED {kind}"),
                IdentityChange::Drop => format!(
                    "ALTER COLUMN {} DROP {}",
                    column,
                    self.if_exists("IDENTITY")
                ),
            });
        }

        format!(
            "\nALTER {} {}\n\t{};{}\n",
            self.if_exists("TABLE"),
            table,
            definitions.join(",\n\t"),
            hint
        )
    }

    pub fn generate_drop_table_column_script(&self, table: &str, column: &str) -> String {
        format!(
            "\nALTER {} {} DROP {} {} CASCADE;{}\n",
            self.if_exists("TABLE"),
            table,
            self.if_exists("COLUMN"),
            column,
            hints::DROP_COLUMN
        )
    }

    pub fn generate_add_table_constraint_script(
        &self,
        table: &str,
        constraint: &str,
        schema: &Constraint,
    ) -> String {
        format!(
            "\nALTER {} {} ADD CONSTRAINT {} {};\n",
            self.if_exists("TABLE"),
            table,
            constraint,
            schema.definition
        )
    }

    pub fn generate_drop_table_constraint_script(&self, table: &str, constraint: &str) -> String {
        format!(
            "\nALTER {} {} DROP {} {};\n",
            self.if_exists("TABLE"),
            table,
            self.if_exists("CONSTRAINT"),
            constraint
        )
    }

    /// Index creation in the diff pass. Returns a bare newline when indexes
    /// are disabled, like [`Self::generate_drop_index_script`].
    pub fn generate_create_index_script(&self, definition: &str) -> String {
        if !self.options.indexes {
            return "\n".to_string();
        }
        format!("\n{};\n", self.index_definition(definition))
    }

    pub fn generate_drop_index_script(&self, index: &str) -> String {
        if !self.options.indexes {
            return "\n".to_string();
        }
        format!("\nDROP {} {};\n", self.if_exists("INDEX"), index)
    }

    fn index_definition(&self, definition: &str) -> String {
        if !self.options.idempotent_script {
            return definition.to_string();
        }
        definition
            .replacen("CREATE INDEX", "CREATE INDEX IF NOT EXISTS", 1)
            .replacen("CREATE UNIQUE INDEX", "CREATE UNIQUE INDEX IF NOT EXISTS", 1)
    }

    pub fn generate_change_owner_script(
        &self,
        kind: ObjectKind,
        object: &str,
        owner: &str,
    ) -> String {
        if !self.options.grants {
            return String::new();
        }
        format!("\n{}\n", self.owner_statement(kind, object, owner))
    }

    fn owner_statement(&self, kind: ObjectKind, object: &str, owner: &str) -> String {
        // ALTER FUNCTION has no IF EXISTS form
        let keyword = match kind {
            ObjectKind::Function => kind.as_sql_str().to_string(),
            _ => self.if_exists(kind.as_sql_str()),
        };
        format!("ALTER {keyword} {object} OWNER TO {owner};")
    }

    /// Full grant set of a role that has no privileges on the target yet.
    pub fn generate_role_grants_script<P: PrivilegeSet>(
        &self,
        kind: ObjectKind,
        object: &str,
        role: &str,
        privileges: &P,
    ) -> String {
        if !self.options.grants {
            return String::new();
        }
        let lines = grant_lines(kind, object, role, privileges);
        if lines.is_empty() {
            return String::new();
        }
        format!("\n{}\n", lines.join("\n"))
    }

    /// One GRANT or REVOKE line per changed permission.
    pub fn generate_change_role_grants_script(
        &self,
        kind: ObjectKind,
        object: &str,
        role: &str,
        changes: &[(Permission, bool)],
    ) -> String {
        if !self.options.grants || changes.is_empty() {
            return String::new();
        }
        let lines: Vec<String> = changes
            .iter()
            .map(|(permission, granted)| {
                let (verb, preposition) = if *granted {
                    ("GRANT", "TO")
                } else {
                    ("REVOKE", "FROM")
                };
                format!(
                    "{verb} {} ON {} {object} {preposition} {role};{}",
                    permission.as_sql_str(),
                    kind.grant_keyword(),
                    hints::POTENTIAL_ROLE_MISSING
                )
            })
            .collect();
        format!("\n{}\n", lines.join("\n"))
    }

    /// Owner statement followed by the grants of every role, or an empty
    /// string when grants are disabled.
    fn object_privileges<P: PrivilegeSet>(
        &self,
        kind: ObjectKind,
        object: &str,
        owner: &str,
        privileges: &BTreeMap<String, P>,
    ) -> String {
        if !self.options.grants {
            return String::new();
        }
        let mut lines = vec![self.owner_statement(kind, object, owner)];
        for (role, set) in privileges {
            lines.extend(grant_lines(kind, object, role, set));
        }
        lines.join("\n")
    }

    pub fn generate_create_view_script(&self, view: &str, schema: &View) -> String {
        let keyword = if self.options.idempotent_script {
            "OR REPLACE VIEW"
        } else {
            "VIEW"
        };
        format!(
            "\nCREATE {} {} AS {}\n{}\n",
            keyword,
            view,
            terminated(&schema.definition),
            self.object_privileges(ObjectKind::View, view, &schema.owner, &schema.privileges)
        )
    }

    pub fn generate_drop_view_script(&self, view: &str) -> String {
        format!("\nDROP {} {};\n", self.if_exists("VIEW"), view)
    }

    pub fn generate_create_materialized_view_script(
        &self,
        view: &str,
        schema: &MaterializedView,
    ) -> String {
        let indexes: Vec<String> = if self.options.indexes {
            schema
                .indexes
                .values()
                .map(|index| format!("\n{};\n", self.index_definition(&index.definition)))
                .collect()
        } else {
            Vec::new()
        };

        format!(
            "\nCREATE {} {} AS {}\n{}\n{}\n",
            self.if_not_exists("MATERIALIZED VIEW"),
            view,
            terminated(&schema.definition),
            indexes.join(""),
            self.object_privileges(
                ObjectKind::MaterializedView,
                view,
                &schema.owner,
                &schema.privileges
            )
        )
    }

    pub fn generate_drop_materialized_view_script(&self, view: &str) -> String {
        format!("\nDROP {} {};\n", self.if_exists("MATERIALIZED VIEW"), view)
    }

    pub fn generate_create_procedure_script(&self, function: &Function) -> String {
        let signature = function.signature();
        format!(
            "\n{}\n{}\n",
            terminated(&function.definition),
            self.object_privileges(
                ObjectKind::Function,
                &signature,
                &function.owner,
                &function.privileges
            )
        )
    }

    /// Drop followed by the full create, owner and grants included.
    pub fn generate_change_procedure_script(&self, function: &Function) -> String {
        format!(
            "{}{}",
            self.generate_drop_procedure_script(function),
            self.generate_create_procedure_script(function)
        )
    }

    pub fn generate_drop_procedure_script(&self, function: &Function) -> String {
        format!(
            "\nDROP {} {};\n",
            self.if_exists("FUNCTION"),
            function.signature()
        )
    }

    pub fn generate_create_sequence_script(&self, sequence: &str, schema: &Sequence) -> String {
        let clauses = [
            format!("INCREMENT BY {}", schema.increment),
            format!("MINVALUE {}", schema.min_value),
            format!("MAXVALUE {}", schema.max_value),
            format!("START WITH {}", schema.start_value),
            format!("CACHE {}", schema.cache_size),
            format!("{}CYCLE", if schema.is_cycle { "" } else { "NO " }),
        ];
        format!(
            "\nCREATE {} {}\n\t{};\n{}\n",
            self.if_not_exists("SEQUENCE"),
            sequence,
            clauses.join("\n\t"),
            self.object_privileges(
                ObjectKind::Sequence,
                sequence,
                &schema.owner,
                &schema.privileges
            )
        )
    }

    pub fn generate_change_sequence_property_script(
        &self,
        sequence: &str,
        property: SequenceProperty,
    ) -> String {
        let clause = match property {
            SequenceProperty::StartValue(value) => format!("START WITH {value}"),
            SequenceProperty::MinValue(value) => format!("MINVALUE {value}"),
            SequenceProperty::MaxValue(value) => format!("MAXVALUE {value}"),
            SequenceProperty::Increment(value) => format!("INCREMENT BY {value}"),
            SequenceProperty::CacheSize(value) => format!("CACHE {value}"),
            SequenceProperty::Cycle(true) => "CYCLE".to_string(),
            SequenceProperty::Cycle(false) => "NO CYCLE".to_string(),
        };
        format!("\nALTER {} {} {};\n", self.if_exists("SEQUENCE"), sequence, clause)
    }

    /// `new_name` is the bare sequence name; RENAME TO keeps the schema.
    pub fn generate_rename_sequence_script(&self, old: &str, new_name: &str) -> String {
        format!(
            "\nALTER {} {} RENAME TO {};\n",
            self.if_exists("SEQUENCE"),
            old,
            quote_ident(new_name)
        )
    }
}

fn grant_lines<P: PrivilegeSet>(
    kind: ObjectKind,
    object: &str,
    role: &str,
    privileges: &P,
) -> Vec<String> {
    privileges
        .permissions()
        .into_iter()
        .filter(|(_, granted)| *granted)
        .map(|(permission, _)| {
            format!(
                "GRANT {} ON {} {object} TO {role};{}",
                permission.as_sql_str(),
                kind.grant_keyword(),
                hints::POTENTIAL_ROLE_MISSING
            )
        })
        .collect()
}

/// `<name> <type> NULL|NOT NULL [DEFAULT x] [GENERATED mode AS IDENTITY]`
pub fn column_definition(name: &str, column: &Column) -> String {
    let mut parts = vec![
        name.to_string(),
        column.data_type_definition(),
        if column.nullable { "NULL" } else { "NOT NULL" }.to_string(),
    ];
    if let Some(ref default) = column.default {
        parts.push(format!("DEFAULT {default}"));
    }
    if let Some(identity) = column.identity {
        parts.push(format!("GENERATED {identity} AS IDENTITY"));
    }
    parts.join(" ")
}

fn terminated(definition: &str) -> String {
    let trimmed = definition.trim();
    if trimmed.ends_with(';') {
        trimmed.to_string()
    } else {
        format!("{trimmed};")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        FunctionPrivileges, IdentityKind, Index, SequencePrivileges, TablePrivileges,
    };
    use indexmap::IndexMap;

    fn generator() -> ScriptGenerator {
        ScriptGenerator::new(CompareOptions::default())
    }

    fn idempotent() -> ScriptGenerator {
        ScriptGenerator::new(CompareOptions::default().idempotent())
    }

    fn int_column(nullable: bool) -> Column {
        Column {
            datatype: "integer".to_string(),
            data_type_id: 23,
            data_type_category: 'N',
            precision: None,
            scale: None,
            nullable,
            default: None,
            identity: None,
        }
    }

    fn people_table() -> Table {
        let mut columns = IndexMap::new();
        columns.insert(
            r#""id""#.to_string(),
            Column {
                identity: Some(IdentityKind::Always),
                ..int_column(false)
            },
        );
        columns.insert(
            r#""name""#.to_string(),
            Column {
                datatype: "character varying".to_string(),
                precision: Some(80),
                default: Some("'anonymous'::character varying".to_string()),
                ..int_column(true)
            },
        );
        let mut constraints = BTreeMap::new();
        constraints.insert(
            r#""people_pkey""#.to_string(),
            Constraint {
                definition: r#"PRIMARY KEY ("id")"#.to_string(),
            },
        );
        let mut indexes = BTreeMap::new();
        indexes.insert(
            r#""public"."people_name_idx""#.to_string(),
            Index {
                definition: r#"CREATE INDEX people_name_idx ON public.people USING btree (name)"#
                    .to_string(),
            },
        );
        let mut privileges = BTreeMap::new();
        privileges.insert(
            "reader".to_string(),
            TablePrivileges {
                select: true,
                ..Default::default()
            },
        );
        Table {
            owner: "postgres".to_string(),
            options: TableOptions::default(),
            columns,
            constraints,
            indexes,
            privileges,
        }
    }

    #[test]
    fn create_table_lists_columns_constraints_indexes_and_grants() {
        let sql = generator().generate_create_table_script(r#""public"."people""#, &people_table());
        assert_eq!(
            sql,
            format!(
                "\nCREATE TABLE \"public\".\"people\" (\n\
                 \t\"id\" integer NOT NULL GENERATED ALWAYS AS IDENTITY,\n\
                 \t\"name\" character varying(80) NULL DEFAULT 'anonymous'::character varying,\n\
                 \tCONSTRAINT \"people_pkey\" PRIMARY KEY (\"id\")\n\
                 )\nWITH ( OIDS=FALSE );\n\
                 \nCREATE INDEX people_name_idx ON public.people USING btree (name);\n\
                 \nALTER TABLE \"public\".\"people\" OWNER TO postgres;\n\
                 GRANT SELECT ON TABLE \"public\".\"people\" TO reader;{}\n",
                hints::POTENTIAL_ROLE_MISSING
            )
        );
    }

    #[test]
    fn idempotent_create_table_uses_if_not_exists() {
        let sql = idempotent().generate_create_table_script(r#""public"."people""#, &people_table());
        assert!(sql.starts_with("\nCREATE TABLE IF NOT EXISTS \"public\".\"people\" (\n"));
        assert!(sql.contains("CREATE INDEX IF NOT EXISTS people_name_idx"));
        assert!(sql.contains("ALTER TABLE IF EXISTS \"public\".\"people\" OWNER TO postgres;"));
    }

    #[test]
    fn create_table_without_grants_or_indexes() {
        let generator =
            ScriptGenerator::new(CompareOptions::default().without_grants().without_indexes());
        let sql = generator.generate_create_table_script(r#""public"."people""#, &people_table());
        assert!(!sql.contains("OWNER TO"));
        assert!(!sql.contains("GRANT"));
        assert!(!sql.contains("CREATE INDEX"));
    }

    #[test]
    fn add_not_null_column_without_default_is_annotated() {
        let sql = generator().generate_add_table_column_script(
            r#""public"."people""#,
            r#""age""#,
            &int_column(false),
        );
        assert_eq!(
            sql,
            format!(
                "\nALTER TABLE \"public\".\"people\" ADD COLUMN \"age\" integer NOT NULL;{}\n",
                hints::ADD_COLUMN_NOT_NULLABLE_WITHOUT_DEFAULT
            )
        );

        let nullable = idempotent().generate_add_table_column_script(
            r#""public"."people""#,
            r#""age""#,
            &int_column(true),
        );
        assert_eq!(
            nullable,
            "\nALTER TABLE IF EXISTS \"public\".\"people\" ADD COLUMN IF NOT EXISTS \"age\" integer NULL;\n"
        );
    }

    #[test]
    fn change_column_combines_alterations_in_one_statement() {
        let changes = ColumnChanges {
            nullable: Some(false),
            data_type: Some("bigint".to_string()),
            default: Some(None),
            identity: None,
        };
        let sql =
            generator().generate_change_table_column_script(r#""public"."t""#, r#""n""#, &changes);
        assert_eq!(
            sql,
            format!(
                "\nALTER TABLE \"public\".\"t\"\n\
                 \tALTER COLUMN \"n\" SET NOT NULL,\n\
                 \tALTER COLUMN \"n\" SET DATA TYPE bigint USING \"n\"::bigint,\n\
                 \tALTER COLUMN \"n\" DROP DEFAULT;{}\n",
                hints::CHANGE_COLUMN_DATA_TYPE
            )
        );
    }

    #[test]
    fn identity_transitions_render_distinct_clauses() {
        let render = |identity| {
            let changes = ColumnChanges {
                identity: Some(identity),
                ..Default::default()
            };
            idempotent().generate_change_table_column_script(r#""public"."t""#, r#""id""#, &changes)
        };
        assert!(render(IdentityChange::Add(IdentityKind::ByDefault))
            .contains("ALTER COLUMN \"id\" ADD GENERATED BY DEFAULT AS IDENTITY;"));
        assert!(render(IdentityChange::Set(IdentityKind::Always))
            .contains("ALTER COLUMN \"id\" SET GENERATED ALWAYS;"));
        assert!(render(IdentityChange::Drop).contains("ALTER COLUMN \"id\" DROP IDENTITY IF EXISTS;"));
    }

    #[test]
    fn drop_column_cascades_and_warns() {
        let sql = generator().generate_drop_table_column_script(r#""public"."t""#, r#""c""#);
        assert_eq!(
            sql,
            format!(
                "\nALTER TABLE \"public\".\"t\" DROP COLUMN \"c\" CASCADE;{}\n",
                hints::DROP_COLUMN
            )
        );
    }

    #[test]
    fn constraint_drop_and_add() {
        let generator = idempotent();
        assert_eq!(
            generator.generate_drop_table_constraint_script(r#""public"."t""#, r#""t_check""#),
            "\nALTER TABLE IF EXISTS \"public\".\"t\" DROP CONSTRAINT IF EXISTS \"t_check\";\n"
        );
        let constraint = Constraint {
            definition: "CHECK ((abs(age) > 0))".to_string(),
        };
        assert_eq!(
            generator.generate_add_table_constraint_script(
                r#""public"."t""#,
                r#""t_check""#,
                &constraint
            ),
            "\nALTER TABLE IF EXISTS \"public\".\"t\" ADD CONSTRAINT \"t_check\" CHECK ((abs(age) > 0));\n"
        );
    }

    #[test]
    fn disabled_indexes_render_inert_newlines() {
        let generator = ScriptGenerator::new(CompareOptions::default().without_indexes());
        assert_eq!(generator.generate_drop_index_script(r#""public"."i""#), "\n");
        assert_eq!(
            generator.generate_create_index_script("CREATE INDEX i ON public.t USING btree (a)"),
            "\n"
        );
    }

    #[test]
    fn index_scripts_follow_idempotent_flag() {
        assert_eq!(
            generator().generate_drop_index_script(r#""public"."i""#),
            "\nDROP INDEX \"public\".\"i\";\n"
        );
        assert_eq!(
            idempotent().generate_create_index_script(
                "CREATE UNIQUE INDEX i ON public.t USING btree (a)"
            ),
            "\nCREATE UNIQUE INDEX IF NOT EXISTS i ON public.t USING btree (a);\n"
        );
    }

    #[test]
    fn change_grants_emit_one_line_per_permission() {
        let sql = generator().generate_change_role_grants_script(
            ObjectKind::Table,
            r#""public"."t""#,
            "writer",
            &[(Permission::Insert, true), (Permission::Delete, false)],
        );
        assert_eq!(
            sql,
            format!(
                "\nGRANT INSERT ON TABLE \"public\".\"t\" TO writer;{hint}\n\
                 REVOKE DELETE ON TABLE \"public\".\"t\" FROM writer;{hint}\n",
                hint = hints::POTENTIAL_ROLE_MISSING
            )
        );
    }

    #[test]
    fn grants_disabled_suppresses_owner_and_privileges() {
        let generator = ScriptGenerator::new(CompareOptions::default().without_grants());
        let privileges = SequencePrivileges {
            select: true,
            usage: true,
            update: false,
        };
        assert_eq!(
            generator.generate_role_grants_script(
                ObjectKind::Sequence,
                r#""public"."s""#,
                "app",
                &privileges
            ),
            ""
        );
        assert_eq!(
            generator.generate_change_owner_script(ObjectKind::View, r#""public"."v""#, "app"),
            ""
        );
        assert_eq!(
            generator.generate_change_role_grants_script(
                ObjectKind::Table,
                r#""public"."t""#,
                "app",
                &[(Permission::Select, true)]
            ),
            ""
        );
    }

    #[test]
    fn owner_statement_depends_on_object_kind() {
        let generator = idempotent();
        assert_eq!(
            generator.generate_change_owner_script(
                ObjectKind::MaterializedView,
                r#""public"."mv""#,
                "app"
            ),
            "\nALTER MATERIALIZED VIEW IF EXISTS \"public\".\"mv\" OWNER TO app;\n"
        );
        assert_eq!(
            generator.generate_change_owner_script(
                ObjectKind::Function,
                r#""public"."f"(integer)"#,
                "app"
            ),
            "\nALTER FUNCTION \"public\".\"f\"(integer) OWNER TO app;\n"
        );
    }

    #[test]
    fn view_creation_toggles_or_replace() {
        let view = View {
            owner: "postgres".to_string(),
            definition: " SELECT people.id\n   FROM people;".to_string(),
            privileges: BTreeMap::new(),
            dependencies: Vec::new(),
        };
        let plain = generator().generate_create_view_script(r#""public"."v""#, &view);
        assert!(plain.starts_with("\nCREATE VIEW \"public\".\"v\" AS SELECT people.id\n   FROM people;\n"));
        assert!(plain.contains("ALTER VIEW \"public\".\"v\" OWNER TO postgres;"));

        let replace = idempotent().generate_create_view_script(r#""public"."v""#, &view);
        assert!(replace.starts_with("\nCREATE OR REPLACE VIEW \"public\".\"v\" AS "));
    }

    #[test]
    fn materialized_view_creation_includes_indexes() {
        let mut indexes = BTreeMap::new();
        indexes.insert(
            r#""public"."mv_idx""#.to_string(),
            Index {
                definition: "CREATE INDEX mv_idx ON public.mv USING btree (id)".to_string(),
            },
        );
        let view = MaterializedView {
            owner: "postgres".to_string(),
            definition: " SELECT 1 AS id".to_string(),
            indexes,
            privileges: BTreeMap::new(),
            dependencies: Vec::new(),
        };
        let sql = idempotent().generate_create_materialized_view_script(r#""public"."mv""#, &view);
        assert!(sql.starts_with(
            "\nCREATE MATERIALIZED VIEW IF NOT EXISTS \"public\".\"mv\" AS SELECT 1 AS id;\n"
        ));
        assert!(sql.contains("CREATE INDEX IF NOT EXISTS mv_idx ON public.mv USING btree (id);"));
        assert!(sql.contains("ALTER MATERIALIZED VIEW IF EXISTS \"public\".\"mv\" OWNER TO postgres;"));
    }

    #[test]
    fn changed_function_is_dropped_then_recreated() {
        let mut privileges = BTreeMap::new();
        privileges.insert("api".to_string(), FunctionPrivileges { execute: true });
        let function = Function {
            name: r#""public"."add_one""#.to_string(),
            arg_types: "integer".to_string(),
            definition: "CREATE OR REPLACE FUNCTION public.add_one(x integer)\n RETURNS integer\n LANGUAGE sql\nAS $function$ SELECT x + 1 $function$\n".to_string(),
            owner: "postgres".to_string(),
            privileges,
        };
        let sql = generator().generate_change_procedure_script(&function);
        assert!(sql.starts_with("\nDROP FUNCTION \"public\".\"add_one\"(integer);\n"));
        assert!(sql.contains("AS $function$ SELECT x + 1 $function$;\n"));
        assert!(sql.contains("ALTER FUNCTION \"public\".\"add_one\"(integer) OWNER TO postgres;"));
        assert!(sql.contains("GRANT EXECUTE ON FUNCTION \"public\".\"add_one\"(integer) TO api;"));
    }

    #[test]
    fn create_sequence_lists_every_property() {
        let sequence = Sequence {
            name: "orders_id_seq".to_string(),
            owned_by: None,
            start_value: 1,
            min_value: 1,
            max_value: 9223372036854775807,
            increment: 1,
            cache_size: 1,
            is_cycle: false,
            owner: "postgres".to_string(),
            privileges: BTreeMap::new(),
        };
        let sql = generator().generate_create_sequence_script(r#""public"."orders_id_seq""#, &sequence);
        assert_eq!(
            sql,
            "\nCREATE SEQUENCE \"public\".\"orders_id_seq\"\n\
             \tINCREMENT BY 1\n\
             \tMINVALUE 1\n\
             \tMAXVALUE 9223372036854775807\n\
             \tSTART WITH 1\n\
             \tCACHE 1\n\
             \tNO CYCLE;\n\
             ALTER SEQUENCE \"public\".\"orders_id_seq\" OWNER TO postgres;\n"
        );
    }

    #[test]
    fn sequence_rename_and_property_changes() {
        let generator = idempotent();
        assert_eq!(
            generator.generate_rename_sequence_script(r#""public"."s_old""#, "s_new"),
            "\nALTER SEQUENCE IF EXISTS \"public\".\"s_old\" RENAME TO \"s_new\";\n"
        );
        assert_eq!(
            generator.generate_change_sequence_property_script(
                r#""public"."s""#,
                SequenceProperty::Cycle(false)
            ),
            "\nALTER SEQUENCE IF EXISTS \"public\".\"s\" NO CYCLE;\n"
        );
        assert_eq!(
            generator.generate_change_sequence_property_script(
                r#""public"."s""#,
                SequenceProperty::Increment(5)
            ),
            "\nALTER SEQUENCE IF EXISTS \"public\".\"s\" INCREMENT BY 5;\n"
        );
    }

    #[test]
    fn drop_table_warns_about_data_loss() {
        assert_eq!(
            idempotent().generate_drop_table_script(r#""public"."t""#),
            format!(
                "\nDROP TABLE IF EXISTS \"public\".\"t\";{}\n",
                hints::DROP_TABLE
            )
        );
    }

    #[test]
    fn schema_creation_sets_authorization() {
        assert_eq!(
            idempotent().generate_create_schema_script(r#""audit""#, "postgres"),
            "\nCREATE SCHEMA IF NOT EXISTS \"audit\" AUTHORIZATION postgres;\n"
        );
    }
}
