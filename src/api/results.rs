use std::path::PathBuf;

/// Result of comparing a source database with a target database.
#[derive(Debug, Clone)]
pub struct CompareResult {
    /// Script fragments in execution order, markers included
    pub statements: Vec<String>,
    /// Written patch file
    pub script_path: PathBuf,
    /// Whether the databases already match
    pub is_empty: bool,
}
