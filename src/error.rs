//! Error types.
//!
//! One enum per failure kind, unified under [`Error`]. Every operation in the
//! crate returns [`Result`]; nothing is swallowed.

use std::path::PathBuf;

use thiserror::Error;

/// Top-level error type.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Format(#[from] FormatError),

    #[error(transparent)]
    NotFound(#[from] NotFoundError),

    #[error(transparent)]
    Conflict(#[from] ConflictError),

    #[error(transparent)]
    Crypto(#[from] CryptoError),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Template(#[from] TemplateError),

    #[error("failed to access {}: {source}", .path.display())]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json serialize error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("prompt failed: {0}")]
    Prompt(#[from] dialoguer::Error),
}

impl Error {
    /// Wrap an io error with the path it happened on.
    pub fn file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::File {
            path: path.into(),
            source,
        }
    }
}

/// Missing or malformed input.
#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("key name cannot be empty")]
    EmptyKey,

    #[error("cannot load a store from an empty path")]
    EmptyPath,

    #[error("missing key in store {}: {field}", .path.display())]
    MissingField { field: &'static str, path: PathBuf },

    #[error("a master key id is required unless the store is insecure")]
    MissingMasterKey,

    #[error("a region is required unless the store is insecure")]
    MissingRegion,

    #[error("value for '{0}' is not valid UTF-8; store it as a secret instead")]
    NotText(String),

    #[error("no value given for '{0}'; pass it as an argument or pipe it to stdin")]
    MissingValue(String),

    #[error("no command given")]
    EmptyCommand,

    #[error("environment name cannot be empty")]
    EmptyEnvironment,

    #[error("invalid environment '{env}': {reason}")]
    InvalidEnvironment { env: String, reason: String },

    #[error("can only copy between environments at the same depth: {src} -> {dest}")]
    DepthMismatch { src: String, dest: String },

    #[error("secret values cannot be stored in overrides: {0}")]
    SecretOverride(String),

    #[error("unsupported store version {version} (latest is {latest})")]
    UnsupportedVersion { version: u32, latest: u32 },
}

/// Malformed JSON, with the position it was detected at.
#[derive(Error, Debug)]
#[error("failed to parse JSON from {} at byte {offset} (near \"{snippet}\"): {source}", .path.display())]
pub struct FormatError {
    pub path: PathBuf,
    pub offset: usize,
    pub snippet: String,
    #[source]
    pub source: serde_json::Error,
}

/// Something that was asked for does not exist.
#[derive(Error, Debug)]
pub enum NotFoundError {
    #[error("key does not exist in store: {0}")]
    Key(String),

    #[error("environment doesn't exist: {0}")]
    Environment(String),

    #[error("sub-environment doesn't exist: {0}")]
    SubEnvironment(String),

    #[error("no environments in package: {}", .0.display())]
    NoEnvironments(PathBuf),

    #[error("directory doesn't exist: {}", .0.display())]
    Directory(PathBuf),
}

/// The request contradicts existing state.
#[derive(Error, Debug)]
pub enum ConflictError {
    #[error("override key doesn't exist in store: {key} (in {})", .layer.display())]
    UnknownOverrideKey { key: String, layer: PathBuf },

    #[error("trying to override key with secret value: {key} (in {})", .layer.display())]
    SecretOverrideKey { key: String, layer: PathBuf },

    #[error("environment already exists: {0}")]
    EnvironmentExists(String),

    #[error("store already exists: {}", .0.display())]
    StoreExists(PathBuf),

    #[error("keys differ between {left} and {right}")]
    KeysDiffer { left: String, right: String },
}

/// Local symmetric encryption failures.
#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("failed to decode {what}: {source}")]
    Decode {
        what: &'static str,
        #[source]
        source: base64::DecodeError,
    },

    #[error("ciphertext too short")]
    CiphertextTooShort,

    #[error("invalid data key length: {0} bytes (expected 16, 24 or 32)")]
    InvalidKeyLength(usize),
}

/// Failures reported by, or about, the key-management provider.
#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("KMS {op} failed: {message}")]
    Request { op: &'static str, message: String },

    #[error("KMS {op} returned no {field}")]
    MissingField {
        op: &'static str,
        field: &'static str,
    },

    #[error("insecure store has no key-management provider (attempted {0})")]
    Insecure(&'static str),

    #[error("{0}")]
    Unavailable(String),

    #[error("data key unavailable after an earlier failure: {0}")]
    Unresolved(String),
}

/// Template parse and execution failures.
#[derive(Error, Debug)]
pub enum TemplateError {
    #[error("template syntax error at byte {position}: {reason}")]
    Syntax { position: usize, reason: String },

    #[error("template references missing key: {0}")]
    MissingKey(String),
}

pub type Result<T> = std::result::Result<T, Error>;
