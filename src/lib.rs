//! Configstore - plain-text and encrypted configuration in a local JSON file.
//!
//! # Architecture
//!
//! ```text
//! src/
//! ├── cli/              # Command-line interface
//! │   ├── store         # Single-store commands (init, set, get, ls, ...)
//! │   ├── package       # Environment package commands
//! │   ├── input         # Value input (argument, pipe, hidden prompt)
//! │   ├── output        # Terminal output helpers
//! │   └── completions   # Shell completions
//! └── core/             # Core library components
//!     ├── store/        # Store document load/save and migrations
//!     ├── cipher/       # Envelope encryption
//!     │   └── kms/      # Key-management providers (AWS KMS)
//!     ├── client/       # Client facade over one store
//!     ├── env/          # Environment hierarchy, overrides, copy, tree
//!     ├── template      # Strict template rendering
//!     └── diff          # Environment comparison
//! ```
//!
//! # Features
//!
//! - Values stored in plain text or encrypted with a KMS-wrapped data key
//! - Environment packages with layered, non-secret overrides
//! - Strict template rendering that never substitutes blanks
//! - `aws` feature for AWS KMS support

pub mod cli;
pub mod core;
pub mod error;
