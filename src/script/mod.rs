//! Patch file writer: header framing, blank-line stripping and the
//! timestamped file name.

use crate::model::SchemaSnapshot;
use crate::util::{Result, SchemaError};
use chrono::{DateTime, SecondsFormat, Utc};
use regex::Regex;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptHeader {
    pub author: String,
    pub created_on: DateTime<Utc>,
    pub source: String,
    pub target: String,
}

impl ScriptHeader {
    pub fn render(&self) -> String {
        let created_on = self.created_on.to_rfc3339_opts(SecondsFormat::Millis, true);
        let width = self.author.len().max(created_on.len());
        let border = format!("/******************{}***/\n", "*".repeat(width + 2));

        let mut header = border.clone();
        header.push_str(&format!("/*** SCRIPT AUTHOR: {:<width$} ***/\n", self.author));
        header.push_str(&format!("/***    CREATED ON: {created_on:<width$} ***/\n"));
        header.push_str(&format!("/***    SOURCE: {} ***/\n", self.source));
        header.push_str(&format!("/***    TARGET: {} ***/\n", self.target));
        header.push_str(&border);
        header
    }
}

/// `database @ host [fingerprint]` shown for each side in the header.
pub fn endpoint_label(display_name: &str, snapshot: &SchemaSnapshot) -> String {
    let fingerprint = snapshot.fingerprint();
    format!("{display_name} [{}]", &fingerprint[..12])
}

/// `YYYYMMDDHHMMSSmmm_<name>.sql`
pub fn script_file_name(now: DateTime<Utc>, script_name: &str) -> String {
    format!("{}_{script_name}.sql", now.format("%Y%m%d%H%M%S%3f"))
}

/// Removes blank and whitespace-only lines.
pub fn clear_empty_lines(text: &str) -> String {
    let empty_line = Regex::new(r"(?m)^[ \t]*\n").unwrap();
    empty_line.replace_all(text, "").into_owned()
}

/// Writes header and fragments to `directory/file_name`, creating the
/// directory when missing, and returns the written path.
pub fn write_script(
    directory: &Path,
    file_name: &str,
    header: &ScriptHeader,
    fragments: &[String],
) -> Result<PathBuf> {
    std::fs::create_dir_all(directory).map_err(|e| {
        SchemaError::Io(format!("cannot create directory {}: {e}", directory.display()))
    })?;

    let mut content = header.render();
    for fragment in fragments {
        content.push_str(fragment);
    }

    let path = directory.join(file_name);
    std::fs::write(&path, clear_empty_lines(&content))
        .map_err(|e| SchemaError::Io(format!("cannot write {}: {e}", path.display())))?;

    tracing::info!(path = %path.display(), fragments = fragments.len(), "patch script written");
    Ok(path)
}
