//! Constants used throughout configstore.
//!
//! Centralizes file names, markers and schema values.

/// Store file name inside an environment directory.
pub const STORE_FILE: &str = "configstore.json";

/// Override layer file name inside a sub-environment directory.
pub const OVERRIDE_FILE: &str = "override.json";

/// Directory holding the environments of a package.
pub const ENV_DIR: &str = "env";

/// Directory holding the template sources of a package.
pub const TEMPLATE_DIR: &str = "template";

/// Placeholder written into empty package directories.
pub const GITKEEP: &str = ".gitkeep";

/// Current store schema version.
pub const LATEST_VERSION: u32 = 3;

/// Data key written into insecure stores.
///
/// Shared by every insecure store; it offers no protection and is only meant
/// for local development.
pub const INSECURE_DATA_KEY: &str = "OfvuQJ0Cis1CvnFV2KTTYv3WCPKXOIord3OBDc0kwcU=";

/// Shown instead of a secret value when decryption is skipped.
pub const REDACTED: &str = "(secret)";

/// Shown instead of a binary value.
pub const BINARY: &str = "(binary)";

/// Shown when a key is absent from an environment.
pub const MISSING: &str = "(missing)";

/// Value substituted for every key when validating templates.
pub const DUMMY_VALUE: &str = "dummy_value";

/// AES block width, which is also the IV width.
pub const BLOCK_SIZE: usize = 16;
