//! Strict template rendering.
//!
//! Supports the subset of Go `text/template` syntax that configuration
//! templates use:
//!
//! - `{{.name}}` for identifier keys
//! - `{{index . "name"}}` (or a raw `` `name` `` string) for any key
//! - `{{/* comment */}}`
//! - `{{-` and `-}}` to trim adjacent whitespace
//!
//! Field names may use any Unicode letter. Inside an action, `}}` only
//! closes it outside quoted strings, raw strings and comments.
//!
//! A template is parsed completely before anything is rendered, and a
//! reference to an unknown key is an error rather than an empty string.

use regex::Regex;
use std::collections::BTreeMap;

use crate::core::constants::DUMMY_VALUE;
use crate::core::types::Key;
use crate::error::{Result, TemplateError};

const FIELD: &str = r"^\.([\p{L}_][\p{L}\p{Nd}_]*)$";
const INDEX: &str = r#"^index\s+\.\s+(?:"((?:[^"\\]|\\.)*)"|`([^`]*)`)$"#;

#[derive(Debug, PartialEq, Eq)]
enum Segment<'a> {
    Text(&'a str),
    Key(String),
}

/// Render `source`, substituting every reference from `values`.
///
/// # Errors
///
/// Returns `TemplateError::Syntax` for unsupported or unterminated actions
/// and `TemplateError::MissingKey` for the first reference not in `values`.
pub fn render(source: &str, values: &BTreeMap<Key, String>) -> Result<String> {
    let segments = parse(source)?;

    let mut out = String::with_capacity(source.len());
    for segment in &segments {
        match segment {
            Segment::Text(text) => out.push_str(text),
            Segment::Key(name) => {
                let value = values
                    .get(name)
                    .ok_or_else(|| TemplateError::MissingKey(name.clone()))?;
                out.push_str(value);
            }
        }
    }
    Ok(out)
}

/// Check that `source` parses and only references names in `keys`.
///
/// Every key renders as a fixed dummy value, so no real value is needed.
pub fn validate(source: &str, keys: &[Key]) -> Result<()> {
    let dummies: BTreeMap<Key, String> = keys
        .iter()
        .map(|k| (k.clone(), DUMMY_VALUE.to_string()))
        .collect();
    render(source, &dummies).map(|_| ())
}

fn compile(pattern: &str) -> Result<Regex> {
    Regex::new(pattern).map_err(|e| {
        TemplateError::Syntax {
            position: 0,
            reason: e.to_string(),
        }
        .into()
    })
}

fn syntax(position: usize, reason: impl Into<String>) -> crate::error::Error {
    TemplateError::Syntax {
        position,
        reason: reason.into(),
    }
    .into()
}

/// Byte offset just past the `}}` that closes the action opened at `open`.
///
/// Quoted strings, raw strings and comments may contain `}}`.
fn action_end(source: &str, open: usize) -> Result<usize> {
    let bytes = source.as_bytes();
    let mut i = open + 2;
    while i < bytes.len() {
        match bytes[i] {
            b'"' => {
                i = quoted_end(bytes, i + 1)
                    .ok_or_else(|| syntax(open, "unterminated quoted string"))?;
            }
            b'`' => {
                i = source[i + 1..]
                    .find('`')
                    .map(|p| i + 1 + p + 1)
                    .ok_or_else(|| syntax(open, "unterminated raw string"))?;
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                i = source[i + 2..]
                    .find("*/")
                    .map(|p| i + 2 + p + 2)
                    .ok_or_else(|| syntax(open, "unclosed comment"))?;
            }
            b'}' if bytes.get(i + 1) == Some(&b'}') => return Ok(i + 2),
            _ => i += 1,
        }
    }
    Err(syntax(open, "unterminated action"))
}

fn quoted_end(bytes: &[u8], mut i: usize) -> Option<usize> {
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'"' => return Some(i + 1),
            _ => i += 1,
        }
    }
    None
}

fn parse(source: &str) -> Result<Vec<Segment<'_>>> {
    let field = compile(FIELD)?;
    let index = compile(INDEX)?;

    let mut segments = Vec::new();
    let mut cursor = 0;
    let mut trim_next = false;

    while let Some(offset) = source[cursor..].find("{{") {
        let start = cursor + offset;
        let end = action_end(source, start)?;
        let inner = &source[start + 2..end - 2];

        let mut text = &source[cursor..start];
        if trim_next {
            text = text.trim_start();
        }

        let mut body = inner;
        let trim_left = body.starts_with('-') && body[1..].starts_with(char::is_whitespace);
        if trim_left {
            body = &body[1..];
            text = text.trim_end();
        }
        trim_next = body.ends_with('-') && body[..body.len() - 1].ends_with(char::is_whitespace);
        if trim_next {
            body = &body[..body.len() - 1];
        }

        if !text.is_empty() {
            segments.push(Segment::Text(text));
        }

        let body = body.trim();
        if body.starts_with("/*") {
            if !body.ends_with("*/") || body.len() < 4 {
                return Err(syntax(start, "comment must be the whole action"));
            }
        } else if let Some(name) = field.captures(body).and_then(|c| c.get(1)) {
            segments.push(Segment::Key(name.as_str().to_string()));
        } else if let Some(c) = index.captures(body) {
            let name = match (c.get(1), c.get(2)) {
                (Some(quoted), _) => unescape(quoted.as_str(), start)?,
                (None, Some(raw)) => raw.as_str().to_string(),
                (None, None) => return Err(syntax(start, "missing key name")),
            };
            segments.push(Segment::Key(name));
        } else {
            return Err(syntax(
                start,
                format!("unsupported action \"{{{{{}}}}}\"", inner),
            ));
        }

        cursor = end;
    }

    let mut rest = &source[cursor..];
    if trim_next {
        rest = rest.trim_start();
    }
    if !rest.is_empty() {
        segments.push(Segment::Text(rest));
    }

    Ok(segments)
}

fn unescape(quoted: &str, position: usize) -> Result<String> {
    let mut out = String::with_capacity(quoted.len());
    let mut chars = quoted.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('"') => out.push('"'),
            Some('\\') => out.push('\\'),
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            other => {
                return Err(syntax(
                    position,
                    format!("unsupported escape \\{}", other.map(String::from).unwrap_or_default()),
                ))
            }
        }
    }
    Ok(out)
}
