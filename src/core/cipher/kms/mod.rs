//! Key-management providers.
//!
//! The envelope engine only ever talks to a [`KeyManagement`] implementation,
//! so tests and insecure stores never depend on a live service.
//!
//! - `aws`: AWS KMS (feature-gated)
//! - [`Insecure`]: stand-in for insecure stores; every call fails
//! - [`Unavailable`]: stand-in when the binary was built without a provider

use zeroize::Zeroizing;

use crate::core::store::Document;
use crate::error::{ProviderError, Result};

#[cfg(feature = "aws")]
pub mod aws;

/// A freshly generated data key.
pub struct DataKey {
    /// Plaintext key material; never persisted.
    pub plaintext: Zeroizing<Vec<u8>>,
    /// The same key wrapped under the master key.
    pub ciphertext: Vec<u8>,
}

/// A data key unwrapped by the provider.
pub struct UnwrappedKey {
    pub plaintext: Zeroizing<Vec<u8>>,
    /// Master key that had wrapped it.
    pub master_key_id: String,
}

/// Operations the envelope engine needs from a key-management service.
///
/// Implemented by real providers (AWS) and by fakes in tests.
pub trait KeyManagement: std::fmt::Debug {
    /// Generate a data key under `master_key_id`.
    fn generate_data_key(&self, master_key_id: &str) -> Result<DataKey>;

    /// Unwrap a data key previously produced by `generate_data_key`.
    fn decrypt(&self, ciphertext: &[u8]) -> Result<UnwrappedKey>;

    /// Encrypt arbitrary bytes directly under `master_key_id`.
    fn encrypt(&self, master_key_id: &str, plaintext: &[u8]) -> Result<Vec<u8>>;

    /// Provider name for logs.
    fn name(&self) -> &'static str;
}

/// Provider used for insecure stores, whose data key is stored in the clear.
#[derive(Debug, Default)]
pub struct Insecure;

impl KeyManagement for Insecure {
    fn generate_data_key(&self, _master_key_id: &str) -> Result<DataKey> {
        Err(ProviderError::Insecure("GenerateDataKey").into())
    }

    fn decrypt(&self, _ciphertext: &[u8]) -> Result<UnwrappedKey> {
        Err(ProviderError::Insecure("Decrypt").into())
    }

    fn encrypt(&self, _master_key_id: &str, _plaintext: &[u8]) -> Result<Vec<u8>> {
        Err(ProviderError::Insecure("Encrypt").into())
    }

    fn name(&self) -> &'static str {
        "insecure"
    }
}

/// Provider used when no real backend was compiled in.
#[derive(Debug, Default)]
pub struct Unavailable;

impl Unavailable {
    fn error() -> crate::error::Error {
        ProviderError::Unavailable(
            "KMS support not compiled. Rebuild with: cargo install configstore --features aws"
                .to_string(),
        )
        .into()
    }
}

impl KeyManagement for Unavailable {
    fn generate_data_key(&self, _master_key_id: &str) -> Result<DataKey> {
        Err(Self::error())
    }

    fn decrypt(&self, _ciphertext: &[u8]) -> Result<UnwrappedKey> {
        Err(Self::error())
    }

    fn encrypt(&self, _master_key_id: &str, _plaintext: &[u8]) -> Result<Vec<u8>> {
        Err(Self::error())
    }

    fn name(&self) -> &'static str {
        "unavailable"
    }
}

/// Pick the provider for an existing store.
///
/// Constructing a provider never touches the network; the first call does.
/// With `ignore_role` the store's IAM role is not assumed and the ambient
/// credentials are used instead (e.g. EC2 instance roles).
pub fn provider_for(doc: &Document, ignore_role: bool) -> Box<dyn KeyManagement> {
    if doc.is_insecure {
        return Box::new(Insecure);
    }
    let role = if ignore_role { "" } else { doc.role.as_str() };
    provider(&doc.region, role)
}

/// Provider for a region and optional IAM role.
#[cfg(feature = "aws")]
pub fn provider(region: &str, role: &str) -> Box<dyn KeyManagement> {
    Box::new(aws::AwsKms::new(region, role))
}

/// Provider for a region and optional IAM role.
#[cfg(not(feature = "aws"))]
pub fn provider(_region: &str, _role: &str) -> Box<dyn KeyManagement> {
    Box::new(Unavailable)
}
