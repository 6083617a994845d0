//! Value operations.
//!
//! Reads honour override precedence; writes persist immediately.

use std::collections::BTreeMap;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use tracing::debug;
use zeroize::Zeroizing;

use super::{Client, Value};
use crate::core::constants::REDACTED;
use crate::core::store::Entry;
use crate::core::template;
use crate::core::types::Key;
use crate::core::validation::{validate_key, validate_text};
use crate::error::{NotFoundError, Result};

impl Client {
    /// Get a value as text.
    ///
    /// Invalid UTF-8 in binary secrets is replaced; use [`Client::get_bytes`]
    /// for the exact bytes.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::EmptyKey` for an empty key,
    /// `NotFoundError::Key` if the key is absent, and decryption or provider
    /// errors for secrets.
    pub fn get(&self, key: &str) -> Result<Zeroizing<String>> {
        let bytes = self.get_bytes(key)?;
        Ok(Zeroizing::new(String::from_utf8_lossy(&bytes).into_owned()))
    }

    /// Get the raw bytes of a value.
    ///
    /// Secrets are decrypted from the base store and never overridden;
    /// plaintext values are taken from the last override layer that sets
    /// them, falling back to the store.
    pub fn get_bytes(&self, key: &str) -> Result<Zeroizing<Vec<u8>>> {
        validate_key(key)?;
        let entry = self.entry(key)?;

        if entry.is_secret {
            return self.encryption()?.decrypt(&entry.value);
        }
        let value = self.overrides.get(key).unwrap_or(&entry.value);
        Ok(Zeroizing::new(value.as_bytes().to_vec()))
    }

    /// Every value, keyed by name.
    ///
    /// With `skip_decryption` secrets are returned as the `(secret)` marker
    /// and the provider is never contacted.
    pub fn get_all(&self, skip_decryption: bool) -> Result<BTreeMap<Key, Value>> {
        let mut values = BTreeMap::new();
        for (key, entry) in &self.doc.data {
            let data = if !entry.is_secret {
                self.overrides.get(key).unwrap_or(&entry.value).as_bytes().to_vec()
            } else if skip_decryption {
                REDACTED.as_bytes().to_vec()
            } else {
                self.encryption()?.decrypt(&entry.value)?.to_vec()
            };
            let is_binary = entry.is_binary && !(entry.is_secret && skip_decryption);
            values.insert(key.clone(), Value::new(data, entry.is_secret, is_binary));
        }
        Ok(values)
    }

    /// Key names in sorted order.
    pub fn keys(&self) -> Vec<Key> {
        self.doc.keys()
    }

    pub fn exists(&self, key: &str) -> bool {
        self.doc.data.contains_key(key)
    }

    /// Whether `key` holds a secret; `None` if absent.
    pub fn is_secret(&self, key: &str) -> Option<bool> {
        self.doc.data.get(key).map(|e| e.is_secret)
    }

    /// Set a value, replacing any previous one.
    ///
    /// # Arguments
    ///
    /// * `key` - Key name
    /// * `raw` - Value bytes; must be UTF-8 unless `is_secret`
    /// * `is_secret` - Encrypt the value under the store's data key
    /// * `is_binary` - Display hint for listings
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` for an empty key or a non-UTF-8 plaintext
    /// value, and encryption errors for secrets.
    pub fn set(&mut self, key: &str, raw: &[u8], is_secret: bool, is_binary: bool) -> Result<()> {
        validate_key(key)?;

        let value = if is_secret {
            self.encryption()?.encrypt(raw)?
        } else {
            validate_text(key, raw)?.to_string()
        };

        let mut doc = self.doc.clone();
        doc.data.insert(
            key.to_string(),
            Entry {
                value,
                is_binary,
                is_secret,
            },
        );
        self.commit(doc)?;

        debug!(key, is_secret, "value set");
        Ok(())
    }

    /// Remove a key.
    pub fn unset(&mut self, key: &str) -> Result<()> {
        validate_key(key)?;
        self.entry(key)?;

        let mut doc = self.doc.clone();
        doc.data.remove(key);
        self.commit(doc)?;

        debug!(key, "value removed");
        Ok(())
    }

    /// Turn a plaintext entry into a secret. A secret entry is left alone.
    pub fn encrypt(&mut self, key: &str) -> Result<()> {
        validate_key(key)?;
        let entry = self.entry(key)?;
        if entry.is_secret {
            return Ok(());
        }

        let encrypted = self.encryption()?.encrypt(entry.value.as_bytes())?;
        let mut doc = self.doc.clone();
        if let Some(entry) = doc.data.get_mut(key) {
            entry.value = encrypted;
            entry.is_secret = true;
        }
        self.commit(doc)?;

        debug!(key, "value encrypted");
        Ok(())
    }

    /// Turn a secret entry back into plaintext. A plaintext entry is left
    /// alone.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::NotText` if the secret is not UTF-8, since
    /// plaintext values are stored as text.
    pub fn decrypt(&mut self, key: &str) -> Result<()> {
        validate_key(key)?;
        let entry = self.entry(key)?;
        if !entry.is_secret {
            return Ok(());
        }

        let plaintext = self.encryption()?.decrypt(&entry.value)?;
        let text = validate_text(key, &plaintext)?.to_string();
        let mut doc = self.doc.clone();
        if let Some(entry) = doc.data.get_mut(key) {
            entry.value = text;
            entry.is_secret = false;
        }
        self.commit(doc)?;

        debug!(key, "value decrypted");
        Ok(())
    }

    /// Encrypt the current value of `key` directly with the provider under
    /// the store's master key and return it base64-encoded.
    ///
    /// The result is meant for systems that decrypt with the provider
    /// themselves and never see the store's data key.
    pub fn get_as_externally_wrapped(&self, key: &str) -> Result<String> {
        let value = self.get_bytes(key)?;

        let encryption = self.encryption()?;
        let master_key_id = if encryption.master_key_id().is_empty() {
            self.doc.master_key_id.as_str()
        } else {
            encryption.master_key_id()
        };

        let wrapped = self.encryption.provider().encrypt(master_key_id, &value)?;
        Ok(STANDARD.encode(wrapped))
    }

    /// Render a template with the store's values.
    ///
    /// # Errors
    ///
    /// Returns `TemplateError` for syntax errors or references to absent
    /// keys; nothing is produced in that case.
    pub fn process_template(&self, source: &str) -> Result<String> {
        let values: BTreeMap<Key, String> = self
            .get_all(false)?
            .into_iter()
            .map(|(key, value)| (key, value.to_string_lossy()))
            .collect();
        template::render(source, &values)
    }

    /// Check that a template renders against this store's keys, without
    /// decrypting anything.
    pub fn test_template(&self, source: &str) -> Result<()> {
        template::validate(source, &self.keys())
    }

    fn entry(&self, key: &str) -> Result<&Entry> {
        self.doc
            .data
            .get(key)
            .ok_or_else(|| NotFoundError::Key(key.to_string()).into())
    }
}
