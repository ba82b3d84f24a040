use crate::config::{load_config, Configuration};
use std::path::Path;

use super::Error;

/// Input of [`super::compare`].
#[derive(Debug, Clone)]
pub struct CompareRequest {
    /// Connections and script options
    pub configuration: Configuration,
    /// Suffix of the patch file name
    pub script_name: String,
}

impl CompareRequest {
    pub fn new(configuration: Configuration, script_name: impl Into<String>) -> Self {
        Self {
            configuration,
            script_name: script_name.into(),
        }
    }

    /// Reads the configuration named `config_name` from `path`.
    pub fn from_config_file(
        path: &Path,
        config_name: &str,
        script_name: impl Into<String>,
    ) -> Result<Self, Error> {
        let configuration =
            load_config(path, config_name).map_err(|e| Error::config(e.to_string()))?;
        Ok(Self::new(configuration, script_name))
    }
}
