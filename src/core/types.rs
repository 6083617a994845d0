//! Type aliases for domain concepts.
//!
//! Provides semantic type aliases to make function signatures more descriptive.

/// A configuration key name (e.g., `db_password`).
pub type Key = String;

/// A flat override layer: key to plaintext replacement value.
pub type Overrides = std::collections::BTreeMap<Key, String>;
