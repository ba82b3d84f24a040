//! In-memory catalog snapshot of one database.
//!
//! Map keys are SQL-ready identifiers: schemas, tables, views, sequences and
//! indexes are keyed by their quoted (qualified) name, columns and constraints
//! by their quoted name. Functions are keyed by quoted qualified name plus the
//! identity argument list, so overloads stay distinct.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct SchemaSnapshot {
    pub schemas: BTreeMap<String, Namespace>,
    pub tables: BTreeMap<String, Table>,
    pub views: BTreeMap<String, View>,
    pub materialized_views: BTreeMap<String, MaterializedView>,
    pub functions: BTreeMap<String, Function>,
    pub sequences: BTreeMap<String, Sequence>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Namespace {
    pub owner: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TableOptions {
    #[serde(default)]
    pub with_oids: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Table {
    pub owner: String,
    #[serde(default)]
    pub options: TableOptions,
    /// Ordered by ordinal position.
    #[serde(default)]
    pub columns: IndexMap<String, Column>,
    #[serde(default)]
    pub constraints: BTreeMap<String, Constraint>,
    #[serde(default)]
    pub indexes: BTreeMap<String, Index>,
    #[serde(default)]
    pub privileges: BTreeMap<String, TablePrivileges>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Column {
    pub datatype: String,
    #[serde(rename = "dataTypeID", default)]
    pub data_type_id: u32,
    #[serde(default = "unknown_category")]
    pub data_type_category: char,
    #[serde(default)]
    pub precision: Option<i32>,
    #[serde(default)]
    pub scale: Option<i32>,
    pub nullable: bool,
    #[serde(default)]
    pub default: Option<String>,
    #[serde(default)]
    pub identity: Option<IdentityKind>,
}

fn unknown_category() -> char {
    'X'
}

impl Column {
    /// Data type plus the optional `(precision[,scale])` modifier.
    pub fn data_type_definition(&self) -> String {
        let Some(precision) = self.precision.filter(|p| *p != 0) else {
            return self.datatype.clone();
        };
        match self.scale.filter(|s| *s != 0) {
            Some(scale) => format!("{}({precision},{scale})", self.datatype),
            None => format!("{}({precision})", self.datatype),
        }
    }

    /// Datatype, precision and scale are compared as one unit.
    pub fn same_data_type(&self, other: &Column) -> bool {
        self.datatype == other.datatype
            && self.precision == other.precision
            && self.scale == other.scale
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub enum IdentityKind {
    #[serde(rename = "ALWAYS")]
    Always,
    #[serde(rename = "BY DEFAULT")]
    ByDefault,
}

impl fmt::Display for IdentityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IdentityKind::Always => f.write_str("ALWAYS"),
            IdentityKind::ByDefault => f.write_str("BY DEFAULT"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Constraint {
    /// Full constraint body, e.g. `CHECK ((length(code) > 2))`.
    pub definition: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Index {
    /// Full `CREATE [UNIQUE] INDEX ...` statement without the trailing semicolon.
    pub definition: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct View {
    pub owner: String,
    pub definition: String,
    #[serde(default)]
    pub privileges: BTreeMap<String, TablePrivileges>,
    #[serde(default)]
    pub dependencies: Vec<ViewDependency>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct MaterializedView {
    pub owner: String,
    pub definition: String,
    #[serde(default)]
    pub indexes: BTreeMap<String, Index>,
    #[serde(default)]
    pub privileges: BTreeMap<String, TablePrivileges>,
    #[serde(default)]
    pub dependencies: Vec<ViewDependency>,
}

/// A table column a view reads from. Names are unquoted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "camelCase")]
pub struct ViewDependency {
    pub schema_name: String,
    pub table_name: String,
    pub column_name: String,
}

impl ViewDependency {
    pub fn references(&self, table: &str, column: &str) -> bool {
        crate::util::quote_qualified(&self.schema_name, &self.table_name) == table
            && crate::util::quote_ident(&self.column_name) == column
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Function {
    /// Quoted qualified name without arguments.
    pub name: String,
    /// Identity argument list, e.g. `integer, text`.
    #[serde(default)]
    pub arg_types: String,
    /// Complete `CREATE OR REPLACE FUNCTION` statement.
    pub definition: String,
    pub owner: String,
    #[serde(default)]
    pub privileges: BTreeMap<String, FunctionPrivileges>,
}

impl Function {
    pub fn signature(&self) -> String {
        format!("{}({})", self.name, self.arg_types)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Sequence {
    /// Unquoted sequence name, used as the rename target.
    pub name: String,
    /// Quoted `"schema"."table"."column"` the sequence feeds, if any.
    #[serde(default)]
    pub owned_by: Option<String>,
    pub start_value: i64,
    pub min_value: i64,
    pub max_value: i64,
    pub increment: i64,
    pub cache_size: i64,
    #[serde(default)]
    pub is_cycle: bool,
    pub owner: String,
    #[serde(default)]
    pub privileges: BTreeMap<String, SequencePrivileges>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TablePrivileges {
    pub select: bool,
    pub insert: bool,
    pub update: bool,
    pub delete: bool,
    pub truncate: bool,
    pub references: bool,
    pub trigger: bool,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct FunctionPrivileges {
    pub execute: bool,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SequencePrivileges {
    pub select: bool,
    pub usage: bool,
    pub update: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Permission {
    Select,
    Insert,
    Update,
    Delete,
    Truncate,
    References,
    Trigger,
    Execute,
    Usage,
}

impl Permission {
    pub fn as_sql_str(&self) -> &'static str {
        match self {
            Permission::Select => "SELECT",
            Permission::Insert => "INSERT",
            Permission::Update => "UPDATE",
            Permission::Delete => "DELETE",
            Permission::Truncate => "TRUNCATE",
            Permission::References => "REFERENCES",
            Permission::Trigger => "TRIGGER",
            Permission::Execute => "EXECUTE",
            Permission::Usage => "USAGE",
        }
    }
}

/// Per-role permission flags of one object kind, in rendering order.
pub trait PrivilegeSet {
    fn permissions(&self) -> Vec<(Permission, bool)>;

    /// Flags that differ from `other`, carrying this side's value.
    fn changes_from(&self, other: &Self) -> Vec<(Permission, bool)> {
        self.permissions()
            .into_iter()
            .zip(other.permissions())
            .filter(|(mine, theirs)| mine.1 != theirs.1)
            .map(|(mine, _)| mine)
            .collect()
    }
}

impl PrivilegeSet for TablePrivileges {
    fn permissions(&self) -> Vec<(Permission, bool)> {
        vec![
            (Permission::Select, self.select),
            (Permission::Insert, self.insert),
            (Permission::Update, self.update),
            (Permission::Delete, self.delete),
            (Permission::Truncate, self.truncate),
            (Permission::References, self.references),
            (Permission::Trigger, self.trigger),
        ]
    }
}

impl PrivilegeSet for FunctionPrivileges {
    fn permissions(&self) -> Vec<(Permission, bool)> {
        vec![(Permission::Execute, self.execute)]
    }
}

impl PrivilegeSet for SequencePrivileges {
    fn permissions(&self) -> Vec<(Permission, bool)> {
        vec![
            (Permission::Select, self.select),
            (Permission::Usage, self.usage),
            (Permission::Update, self.update),
        ]
    }
}

impl SchemaSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
            && self.tables.is_empty()
            && self.views.is_empty()
            && self.materialized_views.is_empty()
            && self.functions.is_empty()
            && self.sequences.is_empty()
    }

    /// SHA-256 of the serialized snapshot, used to identify a snapshot in
    /// script headers.
    pub fn fingerprint(&self) -> String {
        use sha2::{Digest, Sha256};
        let json = serde_json::to_string(self).expect("SchemaSnapshot must serialize");
        let hash = Sha256::digest(json.as_bytes());
        hex::encode(hash)
    }
}
