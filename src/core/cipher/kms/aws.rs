//! AWS KMS provider.
//!
//! Wraps and unwraps store data keys with AWS Key Management Service.
//! Enable with `--features aws`.
//!
//! Credentials come from the default AWS provider chain. When the store names
//! an IAM role, temporary credentials for it are obtained through STS before
//! any KMS call.

use std::future::Future;

use aws_config::{BehaviorVersion, Region};
use aws_sdk_kms::error::DisplayErrorContext;
use aws_sdk_kms::primitives::Blob;
use aws_sdk_kms::types::DataKeySpec;
use tracing::trace;
use zeroize::Zeroizing;

use super::{DataKey, KeyManagement, UnwrappedKey};
use crate::error::{Error, ProviderError, Result};

/// AWS KMS provider for one region and optional IAM role.
#[derive(Debug, Clone)]
pub struct AwsKms {
    region: String,
    role: String,
}

impl AwsKms {
    /// Create a provider. No connection is made until the first call.
    pub fn new(region: &str, role: &str) -> Self {
        Self {
            region: region.to_string(),
            role: role.to_string(),
        }
    }

    async fn client(&self) -> aws_sdk_kms::Client {
        let region = Region::new(self.region.clone());
        let mut loader = aws_config::defaults(BehaviorVersion::latest()).region(region.clone());

        if !self.role.is_empty() {
            trace!(role = %self.role, "assuming IAM role");
            let assumed = aws_config::sts::AssumeRoleProvider::builder(self.role.clone())
                .session_name("configstore")
                .region(region)
                .build()
                .await;
            loader = loader.credentials_provider(assumed);
        }

        let config = loader.load().await;
        aws_sdk_kms::Client::new(&config)
    }

    /// Drive one async SDK call to completion on a private runtime.
    fn run<T, F, Fut>(&self, op: &'static str, call: F) -> Result<T>
    where
        F: FnOnce(aws_sdk_kms::Client) -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        if self.region.is_empty() {
            return Err(ProviderError::Unavailable(
                "region cannot be empty when connecting to KMS".to_string(),
            )
            .into());
        }

        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .map_err(|e| ProviderError::Request {
                op,
                message: format!("failed to create runtime: {}", e),
            })?;

        rt.block_on(async {
            let client = self.client().await;
            call(client).await
        })
    }
}

fn request_error<E: std::error::Error>(op: &'static str, err: E) -> Error {
    ProviderError::Request {
        op,
        message: DisplayErrorContext(err).to_string(),
    }
    .into()
}

impl KeyManagement for AwsKms {
    fn generate_data_key(&self, master_key_id: &str) -> Result<DataKey> {
        const OP: &str = "GenerateDataKey";
        trace!(master_key_id, region = %self.region, "generating data key with AWS KMS");

        let key_id = master_key_id.to_string();
        self.run(OP, |client| async move {
            let out = client
                .generate_data_key()
                .key_id(key_id)
                .key_spec(DataKeySpec::Aes256)
                .send()
                .await
                .map_err(|e| request_error(OP, e))?;

            let plaintext = out.plaintext().ok_or(ProviderError::MissingField {
                op: OP,
                field: "plaintext",
            })?;
            let ciphertext = out.ciphertext_blob().ok_or(ProviderError::MissingField {
                op: OP,
                field: "ciphertext blob",
            })?;

            Ok::<_, Error>(DataKey {
                plaintext: Zeroizing::new(plaintext.as_ref().to_vec()),
                ciphertext: ciphertext.as_ref().to_vec(),
            })
        })
    }

    fn decrypt(&self, ciphertext: &[u8]) -> Result<UnwrappedKey> {
        const OP: &str = "Decrypt";
        trace!(ciphertext_len = ciphertext.len(), "unwrapping data key with AWS KMS");

        let blob = Blob::new(ciphertext.to_vec());
        self.run(OP, |client| async move {
            // The ciphertext blob carries the key id, so none is passed.
            let out = client
                .decrypt()
                .ciphertext_blob(blob)
                .send()
                .await
                .map_err(|e| request_error(OP, e))?;

            let plaintext = out.plaintext().ok_or(ProviderError::MissingField {
                op: OP,
                field: "plaintext",
            })?;
            let master_key_id = out.key_id().ok_or(ProviderError::MissingField {
                op: OP,
                field: "key id",
            })?;

            Ok::<_, Error>(UnwrappedKey {
                plaintext: Zeroizing::new(plaintext.as_ref().to_vec()),
                master_key_id: master_key_id.to_string(),
            })
        })
    }

    fn encrypt(&self, master_key_id: &str, plaintext: &[u8]) -> Result<Vec<u8>> {
        const OP: &str = "Encrypt";
        trace!(master_key_id, plaintext_len = plaintext.len(), "encrypting with AWS KMS");

        let key_id = master_key_id.to_string();
        let blob = Blob::new(plaintext.to_vec());
        self.run(OP, |client| async move {
            let out = client
                .encrypt()
                .key_id(key_id)
                .plaintext(blob)
                .send()
                .await
                .map_err(|e| request_error(OP, e))?;

            let ciphertext = out.ciphertext_blob().ok_or(ProviderError::MissingField {
                op: OP,
                field: "ciphertext blob",
            })?;

            Ok::<_, Error>(ciphertext.as_ref().to_vec())
        })
    }

    fn name(&self) -> &'static str {
        "aws-kms"
    }
}
