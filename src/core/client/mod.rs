//! Client facade over one store and its override layers.
//!
//! A [`Client`] owns the loaded document, the merged overrides of every layer
//! it was opened with, and the lazily resolved encryption. Opening a client
//! never contacts the key-management provider unless a migration needs the
//! master key id; the provider is otherwise reached only by the first
//! operation that touches a secret.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use zeroize::Zeroizing;

use crate::core::cipher::kms::{self, KeyManagement};
use crate::core::cipher::{self, Encryption, LazyEncryption};
use crate::core::constants::{BINARY, INSECURE_DATA_KEY, LATEST_VERSION, STORE_FILE};
use crate::core::env::{check_override_key, load_override};
use crate::core::store::{self, Document};
use crate::core::types::Overrides;
use crate::error::{ConflictError, Result, ValidationError};

mod values;

/// Options for creating a new store.
#[derive(Debug, Clone, Default)]
pub struct InitOptions {
    pub region: String,
    /// IAM role assumed before every provider call; empty for none.
    pub role: String,
    pub master_key_id: String,
    /// Store the data key in the clear and never use a provider.
    pub insecure: bool,
}

/// One resolved value as returned by [`Client::get_all`].
#[derive(Clone)]
pub struct Value {
    data: Zeroizing<Vec<u8>>,
    is_secret: bool,
    is_binary: bool,
}

impl Value {
    pub(crate) fn new(data: Vec<u8>, is_secret: bool, is_binary: bool) -> Self {
        Self {
            data: Zeroizing::new(data),
            is_secret,
            is_binary,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// The value as text, replacing invalid UTF-8.
    pub fn to_string_lossy(&self) -> String {
        String::from_utf8_lossy(&self.data).into_owned()
    }

    pub fn is_secret(&self) -> bool {
        self.is_secret
    }

    pub fn is_binary(&self) -> bool {
        self.is_binary
    }

    /// Text suitable for listings: binary values are shown as a marker.
    pub fn display(&self) -> String {
        if self.is_binary {
            BINARY.to_string()
        } else {
            self.to_string_lossy()
        }
    }
}

impl std::fmt::Debug for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let data: &dyn std::fmt::Debug = if self.is_secret {
            &"<redacted>"
        } else {
            &self.data.len()
        };
        f.debug_struct("Value")
            .field("data", data)
            .field("is_secret", &self.is_secret)
            .field("is_binary", &self.is_binary)
            .finish()
    }
}

/// A store opened for reading and writing.
pub struct Client {
    path: PathBuf,
    doc: Document,
    overrides: Overrides,
    encryption: LazyEncryption,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("path", &self.path)
            .field("keys", &self.doc.data.len())
            .field("overrides", &self.overrides.len())
            .field("encryption", &self.encryption)
            .finish()
    }
}

impl Client {
    /// Open the store at `path` with override layers applied in order.
    ///
    /// # Arguments
    ///
    /// * `path` - Store file
    /// * `override_paths` - Override layers, root to leaf; later layers win
    /// * `ignore_role` - Use ambient credentials instead of the store's IAM role
    ///
    /// # Errors
    ///
    /// Returns the store's load error, `ConflictError` if an override layer
    /// names a key the store lacks or holds as a secret, and migration
    /// errors for old stores.
    pub fn open(path: impl AsRef<Path>, override_paths: &[PathBuf], ignore_role: bool) -> Result<Self> {
        let path = path.as_ref();
        let doc = store::load(path)?;
        let provider = kms::provider_for(&doc, ignore_role);
        Self::from_document(path, doc, override_paths, provider)
    }

    /// Open with an explicit key-management provider.
    pub fn open_with_provider(
        path: impl AsRef<Path>,
        override_paths: &[PathBuf],
        provider: Box<dyn KeyManagement>,
    ) -> Result<Self> {
        let path = path.as_ref();
        let doc = store::load(path)?;
        Self::from_document(path, doc, override_paths, provider)
    }

    fn from_document(
        path: &Path,
        doc: Document,
        override_paths: &[PathBuf],
        provider: Box<dyn KeyManagement>,
    ) -> Result<Self> {
        let overrides = merge_overrides(&doc, override_paths)?;
        let encryption = LazyEncryption::new(provider);
        let doc = store::migrate(path, doc, &encryption)?;

        debug!(
            path = %path.display(),
            keys = doc.data.len(),
            overrides = overrides.len(),
            "store opened"
        );
        Ok(Self {
            path: path.to_path_buf(),
            doc,
            overrides,
            encryption,
        })
    }

    /// Create a new store in `dir`.
    ///
    /// Secure stores get a fresh data key wrapped under
    /// `options.master_key_id`; insecure stores use the fixed clear key.
    ///
    /// # Errors
    ///
    /// Returns `ConflictError::StoreExists` if `dir` already has a store and
    /// `ValidationError` if a secure store lacks its master key or region.
    pub fn init(dir: impl AsRef<Path>, options: &InitOptions) -> Result<Self> {
        let provider = if options.insecure {
            Box::new(kms::Insecure) as Box<dyn KeyManagement>
        } else {
            kms::provider(&options.region, &options.role)
        };
        Self::init_with_provider(dir, options, provider)
    }

    /// Create a new store with an explicit key-management provider.
    pub fn init_with_provider(
        dir: impl AsRef<Path>,
        options: &InitOptions,
        provider: Box<dyn KeyManagement>,
    ) -> Result<Self> {
        let path = dir.as_ref().join(STORE_FILE);
        if path.exists() {
            return Err(ConflictError::StoreExists(path).into());
        }

        let doc = if options.insecure {
            Document {
                version: LATEST_VERSION,
                is_insecure: true,
                data_key: INSECURE_DATA_KEY.to_string(),
                ..Document::default()
            }
        } else {
            if options.master_key_id.is_empty() {
                return Err(ValidationError::MissingMasterKey.into());
            }
            if options.region.is_empty() {
                return Err(ValidationError::MissingRegion.into());
            }
            Document {
                version: LATEST_VERSION,
                region: options.region.clone(),
                role: options.role.clone(),
                is_insecure: false,
                data_key: cipher::wrap_new_key(provider.as_ref(), &options.master_key_id)?,
                master_key_id: options.master_key_id.clone(),
                data: BTreeMap::new(),
            }
        };

        store::save(&path, &doc)?;
        info!(path = %path.display(), insecure = options.insecure, "store created");

        Ok(Self {
            path,
            doc,
            overrides: Overrides::new(),
            encryption: LazyEncryption::new(provider),
        })
    }

    /// Store file this client reads and writes.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The loaded document.
    pub fn document(&self) -> &Document {
        &self.doc
    }

    /// Merged overrides of all layers.
    pub fn overrides(&self) -> &Overrides {
        &self.overrides
    }

    /// Whether the data key has been resolved yet.
    pub fn is_encryption_resolved(&self) -> bool {
        self.encryption.is_resolved()
    }

    fn encryption(&self) -> Result<&Encryption> {
        self.encryption.get(&self.doc)
    }

    /// Persist `doc` and make it current.
    ///
    /// The in-memory document only changes once the write succeeded.
    fn commit(&mut self, doc: Document) -> Result<()> {
        store::save(&self.path, &doc)?;
        self.doc = doc;
        Ok(())
    }
}

/// Load and merge override layers, checking each key against `doc`.
fn merge_overrides(doc: &Document, paths: &[PathBuf]) -> Result<Overrides> {
    let mut merged = Overrides::new();
    for path in paths {
        let layer = load_override(path)?;
        for key in layer.keys() {
            check_override_key(doc, key, path)?;
        }
        debug!(layer = %path.display(), keys = layer.len(), "override layer loaded");
        merged.extend(layer);
    }
    Ok(merged)
}

