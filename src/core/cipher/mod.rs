//! Envelope encryption.
//!
//! A store's values are encrypted locally with a symmetric data key. The data
//! key itself is wrapped by a master key held in a key-management service
//! ([`kms`]), except in insecure mode where it is stored in the clear.
//!
//! ## Value format
//!
//! `base64(IV || AES-CFB(base64(plaintext)))`, with a fresh random IV the
//! width of one AES block for every encryption. AES-128, -192 or -256 is
//! selected by the data key length.

use std::cell::OnceCell;

use aes::{Aes128, Aes192, Aes256};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use cfb_mode::cipher::{AsyncStreamCipher, KeyIvInit};
use rand::rngs::OsRng;
use rand::RngCore;
use tracing::{debug, trace};
use zeroize::Zeroizing;

use crate::core::constants::BLOCK_SIZE;
use crate::core::store::{Document, MigrationContext};
use crate::error::{CryptoError, ProviderError, Result};

pub mod kms;

pub use kms::KeyManagement;

/// A resolved data key, ready to encrypt and decrypt values.
pub struct Encryption {
    data_key: Zeroizing<Vec<u8>>,
    master_key_id: String,
}

impl std::fmt::Debug for Encryption {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Encryption")
            .field("data_key", &"<redacted>")
            .field("master_key_id", &self.master_key_id)
            .finish()
    }
}

impl Encryption {
    /// Resolve the document's data key.
    ///
    /// Insecure documents carry the key itself; otherwise the provider
    /// unwraps it and reports which master key had wrapped it.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError` if `data_key` is not valid base64 or the key has
    /// an unusable length, and the provider's error if unwrapping fails.
    pub fn resolve(doc: &Document, provider: &dyn KeyManagement) -> Result<Self> {
        let ciphertext = Zeroizing::new(STANDARD.decode(&doc.data_key).map_err(|source| {
            CryptoError::Decode {
                what: "data key",
                source,
            }
        })?);

        let (data_key, master_key_id) = if doc.is_insecure {
            (ciphertext, String::new())
        } else {
            debug!(provider = provider.name(), "unwrapping data key");
            let unwrapped = provider.decrypt(&ciphertext)?;
            (unwrapped.plaintext, unwrapped.master_key_id)
        };

        Self::from_key(data_key, master_key_id)
    }

    /// Build from raw key material.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::InvalidKeyLength` unless the key is 16, 24 or 32
    /// bytes long.
    pub fn from_key(data_key: Zeroizing<Vec<u8>>, master_key_id: String) -> Result<Self> {
        match data_key.len() {
            16 | 24 | 32 => Ok(Self {
                data_key,
                master_key_id,
            }),
            n => Err(CryptoError::InvalidKeyLength(n).into()),
        }
    }

    /// Master key reported by the provider; empty for insecure stores.
    pub fn master_key_id(&self) -> &str {
        &self.master_key_id
    }

    /// Encrypt `plaintext` into the stored value format.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<String> {
        let inner = STANDARD.encode(plaintext);

        let mut buf = vec![0u8; BLOCK_SIZE + inner.len()];
        let (iv, body) = buf.split_at_mut(BLOCK_SIZE);
        OsRng.fill_bytes(iv);
        body.copy_from_slice(inner.as_bytes());
        cfb_encrypt(&self.data_key, iv, body)?;

        trace!(plaintext_len = plaintext.len(), "encrypted value");
        Ok(STANDARD.encode(&buf))
    }

    /// Decrypt a stored value back into the original bytes.
    ///
    /// # Errors
    ///
    /// Returns `CryptoError::CiphertextTooShort` for inputs shorter than one
    /// block, and `CryptoError::Decode` when either base64 layer is invalid
    /// (which is how a wrong key or corrupted value shows up).
    pub fn decrypt(&self, stored: &str) -> Result<Zeroizing<Vec<u8>>> {
        let mut buf = STANDARD
            .decode(stored)
            .map_err(|source| CryptoError::Decode {
                what: "stored value",
                source,
            })?;
        if buf.len() < BLOCK_SIZE {
            return Err(CryptoError::CiphertextTooShort.into());
        }

        let (iv, body) = buf.split_at_mut(BLOCK_SIZE);
        cfb_decrypt(&self.data_key, iv, body)?;
        let inner = Zeroizing::new(body.to_vec());

        let plaintext = STANDARD
            .decode(inner.as_slice())
            .map_err(|source| CryptoError::Decode {
                what: "decrypted payload",
                source,
            })?;
        trace!(plaintext_len = plaintext.len(), "decrypted value");
        Ok(Zeroizing::new(plaintext))
    }
}

/// Generate a new data key for a store and return it wrapped, base64-encoded.
///
/// Only the wrapped form leaves this function; the plaintext key is dropped
/// (and zeroized) here.
pub fn wrap_new_key(provider: &dyn KeyManagement, master_key_id: &str) -> Result<String> {
    debug!(provider = provider.name(), master_key_id, "generating data key");
    let key = provider.generate_data_key(master_key_id)?;
    Ok(STANDARD.encode(&key.ciphertext))
}

fn cfb_encrypt(key: &[u8], iv: &[u8], buf: &mut [u8]) -> Result<()> {
    let invalid = |_| CryptoError::InvalidKeyLength(key.len());
    match key.len() {
        16 => cfb_mode::Encryptor::<Aes128>::new_from_slices(key, iv)
            .map_err(invalid)?
            .encrypt(buf),
        24 => cfb_mode::Encryptor::<Aes192>::new_from_slices(key, iv)
            .map_err(invalid)?
            .encrypt(buf),
        32 => cfb_mode::Encryptor::<Aes256>::new_from_slices(key, iv)
            .map_err(invalid)?
            .encrypt(buf),
        n => return Err(CryptoError::InvalidKeyLength(n).into()),
    }
    Ok(())
}

fn cfb_decrypt(key: &[u8], iv: &[u8], buf: &mut [u8]) -> Result<()> {
    let invalid = |_| CryptoError::InvalidKeyLength(key.len());
    match key.len() {
        16 => cfb_mode::Decryptor::<Aes128>::new_from_slices(key, iv)
            .map_err(invalid)?
            .decrypt(buf),
        24 => cfb_mode::Decryptor::<Aes192>::new_from_slices(key, iv)
            .map_err(invalid)?
            .decrypt(buf),
        32 => cfb_mode::Decryptor::<Aes256>::new_from_slices(key, iv)
            .map_err(invalid)?
            .decrypt(buf),
        n => return Err(CryptoError::InvalidKeyLength(n).into()),
    }
    Ok(())
}

/// Encryption resolved on first use and kept for the owner's lifetime.
///
/// The provider round-trip happens at most once. A failed resolution is
/// remembered too, so later calls fail with `ProviderError::Unresolved`
/// without contacting the provider again.
#[derive(Debug)]
pub struct LazyEncryption {
    provider: Box<dyn KeyManagement>,
    resolved: OnceCell<std::result::Result<Encryption, String>>,
}

impl LazyEncryption {
    /// Wrap a provider without contacting it.
    pub fn new(provider: Box<dyn KeyManagement>) -> Self {
        Self {
            provider,
            resolved: OnceCell::new(),
        }
    }

    /// Resolved encryption for `doc`, resolving it on the first call.
    ///
    /// The first failure is returned as-is.
    pub fn get(&self, doc: &Document) -> Result<&Encryption> {
        if let Some(outcome) = self.resolved.get() {
            return memoized(outcome);
        }
        match Encryption::resolve(doc, self.provider.as_ref()) {
            Ok(encryption) => memoized(self.resolved.get_or_init(|| Ok(encryption))),
            Err(e) => {
                debug!(error = %e, "data key resolution failed");
                let _ = self.resolved.set(Err(e.to_string()));
                Err(e)
            }
        }
    }

    /// Whether resolution has already succeeded.
    pub fn is_resolved(&self) -> bool {
        matches!(self.resolved.get(), Some(Ok(_)))
    }

    /// The underlying provider.
    pub fn provider(&self) -> &dyn KeyManagement {
        self.provider.as_ref()
    }
}

fn memoized(outcome: &std::result::Result<Encryption, String>) -> Result<&Encryption> {
    outcome
        .as_ref()
        .map_err(|reason| ProviderError::Unresolved(reason.clone()).into())
}

impl MigrationContext for LazyEncryption {
    fn master_key_id(&self, doc: &Document) -> Result<String> {
        Ok(self.get(doc)?.master_key_id().to_string())
    }
}
