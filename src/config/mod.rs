//! Comparison options and the named-configuration file.
//!
//! The configuration file (`pg-diff-config.json` by default) maps configuration
//! names to a source connection, a target connection and the options driving
//! script generation:
//!
//! ```json
//! {
//!   "development": {
//!     "source": { "host": "localhost", "port": 5432, "database": "app_dev", "user": "postgres", "password": "postgres" },
//!     "target": { "host": "localhost", "port": 5432, "database": "app_prod", "user": "postgres", "password": "postgres" },
//!     "options": {
//!       "author": "jane",
//!       "outputDirectory": "patches",
//!       "schemaCompare": { "namespaces": ["public"], "idempotentScript": true, "indexes": true }
//!     }
//!   }
//! }
//! ```

use crate::util::{Result, SchemaError};
use serde::{Deserialize, Serialize};
use sqlx::postgres::PgConnectOptions;
use std::collections::BTreeMap;
use std::path::Path;

pub const DEFAULT_CONFIG_FILE: &str = "pg-diff-config.json";

/// Options consumed by the script generator and the diff engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompareOptions {
    /// Schemas to collect. Applied by the collector, not by the engine.
    pub namespaces: Vec<String>,
    /// Use `IF [NOT] EXISTS` / `OR REPLACE` forms.
    pub idempotent_script: bool,
    /// Generate owner and GRANT/REVOKE statements.
    #[serde(default = "enabled")]
    pub grants: bool,
    /// Generate index statements.
    pub indexes: bool,
    #[serde(default)]
    pub drop_missing_table: bool,
    #[serde(default)]
    pub drop_missing_view: bool,
    #[serde(default)]
    pub drop_missing_function: bool,
}

fn enabled() -> bool {
    true
}

impl Default for CompareOptions {
    fn default() -> Self {
        Self {
            namespaces: vec!["public".into()],
            idempotent_script: false,
            grants: true,
            indexes: true,
            drop_missing_table: false,
            drop_missing_view: false,
            drop_missing_function: false,
        }
    }
}

impl CompareOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the schemas to compare.
    pub fn with_namespaces(mut self, namespaces: Vec<String>) -> Self {
        self.namespaces = namespaces;
        self
    }

    /// Generate an idempotent script.
    pub fn idempotent(mut self) -> Self {
        self.idempotent_script = true;
        self
    }

    /// Disable owner and privilege statements.
    pub fn without_grants(mut self) -> Self {
        self.grants = false;
        self
    }

    /// Disable index statements.
    pub fn without_indexes(mut self) -> Self {
        self.indexes = false;
        self
    }

    /// Drop tables that only exist on the target.
    pub fn drop_missing_tables(mut self) -> Self {
        self.drop_missing_table = true;
        self
    }

    /// Drop views and materialized views that only exist on the target.
    pub fn drop_missing_views(mut self) -> Self {
        self.drop_missing_view = true;
        self
    }

    /// Drop functions that only exist on the target.
    pub fn drop_missing_functions(mut self) -> Self {
        self.drop_missing_function = true;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionConfig {
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub database: String,
    pub user: String,
    #[serde(default)]
    pub password: String,
}

fn default_port() -> u16 {
    5432
}

impl ConnectionConfig {
    pub fn connect_options(&self) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .database(&self.database)
            .username(&self.user)
            .password(&self.password)
    }

    /// `database @ host`, as shown in script headers and logs.
    pub fn display_name(&self) -> String {
        format!("{} @ {}", self.database, self.host)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptOptions {
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub output_directory: String,
    pub schema_compare: CompareOptions,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Configuration {
    pub source: ConnectionConfig,
    pub target: ConnectionConfig,
    pub options: ScriptOptions,
}

impl Configuration {
    fn validate(&self, name: &str) -> Result<()> {
        if self.options.output_directory.trim().is_empty() {
            return Err(SchemaError::ConfigError(format!(
                "configuration '{name}': options.outputDirectory must be a non-empty string"
            )));
        }
        if self.options.schema_compare.namespaces.is_empty() {
            return Err(SchemaError::ConfigError(format!(
                "configuration '{name}': options.schemaCompare.namespaces must list at least one schema"
            )));
        }
        Ok(())
    }
}

/// Parses a configuration file body and returns the configuration named `name`.
pub fn parse_config(json: &str, name: &str) -> Result<Configuration> {
    let mut all: BTreeMap<String, serde_json::Value> = serde_json::from_str(json)
        .map_err(|e| SchemaError::ConfigError(format!("invalid configuration file: {e}")))?;

    let entry = all.remove(name).ok_or_else(|| {
        SchemaError::ConfigError(format!(
            "impossible to find the configuration with name '{name}'"
        ))
    })?;

    let config: Configuration = serde_json::from_value(entry)
        .map_err(|e| SchemaError::ConfigError(format!("configuration '{name}': {e}")))?;
    config.validate(name)?;

    Ok(config)
}

/// Reads the configuration file at `path` and returns the configuration named `name`.
pub fn load_config(path: &Path, name: &str) -> Result<Configuration> {
    let json = std::fs::read_to_string(path).map_err(|e| {
        SchemaError::ConfigError(format!(
            "cannot read configuration file {}: {e}",
            path.display()
        ))
    })?;
    let config = parse_config(&json, name)?;
    tracing::debug!(config = name, path = %path.display(), "configuration loaded");
    Ok(config)
}
