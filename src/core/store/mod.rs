//! Store document persistence.
//!
//! Handles reading, validating and writing the `configstore.json` document
//! that backs a main environment.
//!
//! ## Adding a Schema Version
//!
//! 1. Bump `LATEST_VERSION` in `constants`
//! 2. Add the new (defaulted) field to `Document` or `Entry`
//! 3. Register a step in `migrate::STEPS` keyed by the previous version

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::core::types::Key;
use crate::error::{Error, FormatError, Result, ValidationError};

pub mod migrate;

pub use migrate::{migrate, MigrationContext};

/// Bytes kept on each side of a JSON error offset in diagnostics.
const SNIPPET_RADIUS: usize = 10;

/// A store document as it lives on disk.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub version: u32,
    pub region: String,
    pub role: String,
    pub is_insecure: bool,
    /// Base64 key material: literal in insecure mode, KMS-wrapped otherwise.
    pub data_key: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub master_key_id: String,
    pub data: BTreeMap<Key, Entry>,
}

/// A single stored value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    /// Plaintext, or encrypted value when `is_secret` is set.
    pub value: String,
    /// Display hint only; never changes how `value` is stored.
    #[serde(default)]
    pub is_binary: bool,
    pub is_secret: bool,
}

/// Lenient mirror of `Document` used to report missing fields by name.
#[derive(Deserialize)]
struct RawDocument {
    #[serde(default)]
    version: u32,
    #[serde(default)]
    region: String,
    #[serde(default)]
    role: String,
    #[serde(default)]
    is_insecure: bool,
    #[serde(default)]
    data_key: String,
    #[serde(default)]
    master_key_id: String,
    data: Option<BTreeMap<Key, Entry>>,
}

impl Document {
    /// Keys in sorted order.
    pub fn keys(&self) -> Vec<Key> {
        self.data.keys().cloned().collect()
    }
}

/// Load and validate a store document.
///
/// # Errors
///
/// - `ValidationError::EmptyPath` when `path` is empty
/// - `Error::File` when the file cannot be read
/// - `FormatError` when the JSON is malformed, with offset and snippet
/// - `ValidationError::MissingField` when `version`, `data_key` or `data`
///   is missing
pub fn load(path: &Path) -> Result<Document> {
    if path.as_os_str().is_empty() {
        return Err(ValidationError::EmptyPath.into());
    }
    debug!(path = %path.display(), "loading store");

    let contents = std::fs::read_to_string(path).map_err(|e| Error::file(path, e))?;
    let raw: RawDocument =
        serde_json::from_str(&contents).map_err(|e| format_error(path, &contents, e))?;

    let doc = validate(path, raw)?;
    debug!(
        version = doc.version,
        entries = doc.data.len(),
        insecure = doc.is_insecure,
        "store loaded"
    );
    Ok(doc)
}

/// Write a store document as 2-space indented JSON, replacing the file.
///
/// The document is fully serialized before the file is touched. There is no
/// locking: concurrent writers race and the last one wins.
pub fn save(path: &Path, doc: &Document) -> Result<()> {
    debug!(path = %path.display(), version = doc.version, "saving store");
    let contents = serde_json::to_string_pretty(doc)?;
    std::fs::write(path, contents).map_err(|e| Error::file(path, e))?;
    Ok(())
}

fn validate(path: &Path, raw: RawDocument) -> Result<Document> {
    let missing = |field| -> Error {
        ValidationError::MissingField {
            field,
            path: path.to_path_buf(),
        }
        .into()
    };

    if raw.version == 0 {
        return Err(missing("version"));
    }
    if raw.data_key.is_empty() {
        return Err(missing("data_key"));
    }
    let data = raw.data.ok_or_else(|| missing("data"))?;

    Ok(Document {
        version: raw.version,
        region: raw.region,
        role: raw.role,
        is_insecure: raw.is_insecure,
        data_key: raw.data_key,
        master_key_id: raw.master_key_id,
        data,
    })
}

/// Build a `FormatError` pointing at the byte serde_json stopped at.
pub(crate) fn format_error(path: &Path, contents: &str, source: serde_json::Error) -> Error {
    let offset = byte_offset(contents, source.line(), source.column());
    FormatError {
        path: PathBuf::from(path),
        offset,
        snippet: safe_slice(
            contents,
            offset.saturating_sub(SNIPPET_RADIUS),
            offset + SNIPPET_RADIUS,
        )
        .to_string(),
        source,
    }
    .into()
}

/// Convert serde_json's one-based line/column into a byte offset.
fn byte_offset(contents: &str, line: usize, column: usize) -> usize {
    if line == 0 {
        return 0;
    }
    let line_start: usize = contents
        .split_inclusive('\n')
        .take(line - 1)
        .map(str::len)
        .sum();
    (line_start + column.saturating_sub(1)).min(contents.len())
}

/// Slice `s` to `[start, end)`, clamped to its bounds and char boundaries.
fn safe_slice(s: &str, start: usize, end: usize) -> &str {
    let mut start = start.min(s.len());
    let mut end = end.min(s.len());
    while !s.is_char_boundary(start) {
        start -= 1;
    }
    while !s.is_char_boundary(end) {
        end += 1;
    }
    &s[start..end]
}
