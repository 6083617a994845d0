//! Shared CLI output helpers.
//!
//! Color scheme (respects NO_COLOR):
//! - Green: success, main environments
//! - Red: errors, missing values
//! - Yellow: warnings, secret values
//! - Cyan: paths, keys, hints, sub-environments
//! - Bold: headers

use console::style;
use std::fmt::Display;

/// Check if color output is disabled via NO_COLOR env var.
fn colors_enabled() -> bool {
    std::env::var("NO_COLOR").is_err() && console::colors_enabled()
}

fn paint(text: &str, f: impl FnOnce(console::StyledObject<&str>) -> console::StyledObject<&str>) -> String {
    if colors_enabled() {
        f(style(text)).to_string()
    } else {
        text.to_string()
    }
}

/// Print a success message with checkmark.
///
/// Example: `✓ store created`
pub fn success(msg: &str) {
    println!("{} {}", paint("✓", |s| s.green()), msg);
}

/// Print an error message to stderr.
pub fn error(msg: &str) {
    eprintln!("{} {}", paint("✗", |s| s.red()), msg);
}

/// Print a warning message to stderr.
pub fn warn(msg: &str) {
    eprintln!("{} {}", paint("⚠", |s| s.yellow()), msg);
}

/// Print a hint message to stderr.
///
/// Example: `→ run: configstore init`
pub fn hint(msg: &str) {
    eprintln!("{} {}", paint("→", |s| s.cyan()), paint(msg, |s| s.cyan()));
}

/// Print a bold section header.
///
/// Example: `=== Environments:`
pub fn header(title: &str) {
    println!("{}", paint(title, |s| s.bold()));
}

/// Print `key: value`.
pub fn kv(label: &str, value: impl Display) {
    println!("{}: {}", label, value);
}

/// Print a dimmed line.
pub fn dimmed(msg: &str) {
    println!("{}", paint(msg, |s| s.dim()));
}

/// Format a path in cyan.
pub fn path(p: impl Display) -> String {
    paint(&p.to_string(), |s| s.cyan())
}

/// Format a key name in cyan.
pub fn key(k: &str) -> String {
    paint(k, |s| s.cyan())
}

/// Format a main environment name in green.
pub fn env(name: &str) -> String {
    paint(name, |s| s.green())
}

/// Format a secret value in yellow.
pub fn secret(value: &str) -> String {
    paint(value, |s| s.yellow())
}

/// Format a missing-value marker in red.
pub fn missing(value: &str) -> String {
    paint(value, |s| s.red())
}
