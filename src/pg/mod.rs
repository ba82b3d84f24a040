pub mod connection;
pub mod introspect;
pub mod records;
pub mod sqlgen;
pub mod values;

pub use connection::PgConnection;
pub use introspect::{introspect_snapshot, introspect_type_catalog};
pub use records::{generate_set_sequence_value_script, MergeOptions, Record, RecordScriptGenerator};
pub use sqlgen::{ObjectKind, ScriptGenerator, SequenceProperty};
pub use values::{format_value, DataType, FieldType, FieldValue, TypeCatalog};
