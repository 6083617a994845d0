//! Input validation for store operations.
//!
//! Validates key names, plaintext values and environment path segments.

use crate::error::{Result, ValidationError};

/// Validate a key name.
///
/// Any non-empty name is accepted; templates can still reach names that are
/// not identifiers through `{{index . "name"}}`.
///
/// # Errors
///
/// Returns `ValidationError::EmptyKey` if the key is empty.
pub fn validate_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(ValidationError::EmptyKey.into());
    }
    Ok(())
}

/// Validate a plaintext (non-secret) value and return it as text.
///
/// Plaintext values are stored as JSON strings, so they must be UTF-8.
///
/// # Errors
///
/// Returns `ValidationError::NotText` if the bytes are not valid UTF-8.
pub fn validate_text<'a>(key: &str, raw: &'a [u8]) -> Result<&'a str> {
    std::str::from_utf8(raw).map_err(|_| ValidationError::NotText(key.to_string()).into())
}

/// Validate a single environment path segment.
///
/// Segments name directories, so they cannot be empty, `.`/`..`, or hidden.
///
/// # Errors
///
/// Returns `ValidationError::InvalidEnvironment` describing the problem.
pub fn validate_segment(env: &str, segment: &str) -> Result<()> {
    let reason = if segment.is_empty() {
        Some("empty path segment")
    } else if segment == "." || segment == ".." {
        Some("relative path segments are not allowed")
    } else if segment.starts_with('.') {
        Some("segments cannot start with '.'")
    } else if segment.contains('\\') {
        Some("segments cannot contain '\\'")
    } else {
        None
    };

    match reason {
        Some(reason) => Err(ValidationError::InvalidEnvironment {
            env: env.to_string(),
            reason: reason.to_string(),
        }
        .into()),
        None => Ok(()),
    }
}
