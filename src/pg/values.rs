//! SQL literal rendering keyed by PostgreSQL type category (`pg_type.typcategory`).

use crate::util::{escape_string, Result, SchemaError};
use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::collections::HashMap;

/// One `pg_type` row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataType {
    pub oid: u32,
    pub typname: String,
    pub typcategory: char,
}

/// Type catalog of the database the records were read from.
#[derive(Debug, Clone, Default)]
pub struct TypeCatalog {
    types: HashMap<u32, DataType>,
}

impl TypeCatalog {
    pub fn new(types: impl IntoIterator<Item = DataType>) -> Self {
        Self {
            types: types.into_iter().map(|t| (t.oid, t)).collect(),
        }
    }

    pub fn get(&self, oid: u32) -> Option<&DataType> {
        self.types.get(&oid)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }
}

/// Name and type oid of a result-set field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldType {
    pub name: String,
    #[serde(rename = "dataTypeID")]
    pub data_type_id: u32,
}

impl FieldType {
    pub fn new(name: impl Into<String>, data_type_id: u32) -> Self {
        Self {
            name: name.into(),
            data_type_id,
        }
    }
}

/// A scalar read from a row, in the representation the caller decoded it to.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    /// Textual representation, trusted as-is for unquoted categories.
    Text(String),
    Timestamp(DateTime<Utc>),
    Json(serde_json::Value),
}

impl FieldValue {
    fn as_text(&self) -> Cow<'_, str> {
        match self {
            FieldValue::Null => Cow::Borrowed("NULL"),
            FieldValue::Text(text) => Cow::Borrowed(text),
            FieldValue::Timestamp(ts) => Cow::Owned(iso_8601(ts)),
            FieldValue::Json(serde_json::Value::String(text)) => Cow::Borrowed(text),
            FieldValue::Json(other) => Cow::Owned(other.to_string()),
        }
    }

    fn to_json(&self) -> serde_json::Value {
        match self {
            FieldValue::Null => serde_json::Value::Null,
            FieldValue::Json(value) => value.clone(),
            other => serde_json::Value::String(other.as_text().into_owned()),
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        FieldValue::Text(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        FieldValue::Text(value.to_string())
    }
}

impl From<DateTime<Utc>> for FieldValue {
    fn from(value: DateTime<Utc>) -> Self {
        FieldValue::Timestamp(value)
    }
}

impl From<serde_json::Value> for FieldValue {
    fn from(value: serde_json::Value) -> Self {
        FieldValue::Json(value)
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(FieldValue::Null, Into::into)
    }
}

fn iso_8601(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn quoted(text: &str) -> String {
    format!("'{}'", escape_string(text))
}

/// Renders `value` of field `field_name` as a SQL literal.
///
/// The field's type oid is looked up in `fields`, then in `catalog`. An oid
/// missing from the catalog falls back to the unknown category `X`, which is
/// rejected like every other unsupported category.
pub fn format_value(
    field_name: &str,
    fields: &[FieldType],
    value: &FieldValue,
    catalog: &TypeCatalog,
) -> Result<String> {
    if matches!(value, FieldValue::Null) {
        return Ok("NULL".to_string());
    }

    let field = fields
        .iter()
        .find(|f| f.name == field_name)
        .ok_or_else(|| SchemaError::UnknownField {
            field: field_name.to_string(),
        })?;

    let (type_name, category) = catalog
        .get(field.data_type_id)
        .map(|t| (t.typname.as_str(), t.typcategory))
        .unwrap_or(("", 'X'));

    match category {
        // date/time
        'D' => Ok(quoted(&value.as_text())),
        // array, range, bit string, string
        'A' | 'R' | 'V' | 'S' => Ok(quoted(&value.as_text())),
        // boolean, enum, geometric, network address, numeric, timespan
        'B' | 'E' | 'G' | 'I' | 'N' | 'T' => Ok(value.as_text().into_owned()),
        'U' => match type_name {
            "json" | "jsonb" => Ok(quoted(&value.to_json().to_string())),
            "xml" | "uuid" => Ok(quoted(&value.as_text())),
            _ => Err(unsupported(field_name, category, type_name)),
        },
        _ => Err(unsupported(field_name, category, type_name)),
    }
}

fn unsupported(field: &str, category: char, type_name: &str) -> SchemaError {
    SchemaError::UnsupportedDataType {
        field: field.to_string(),
        category,
        type_name: type_name.to_string(),
    }
}
