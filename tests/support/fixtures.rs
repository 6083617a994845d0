//! Store documents and templates for tests.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use configstore::core::cipher::Encryption;
use serde_json::{json, Value};
use zeroize::Zeroizing;

use super::kms::{fake_key_material, WRAP_PREFIX};

pub const MASTER_KEY_ID: &str = "arn:aws:kms:eu-west-1:123456789012:key/fake";

/// Data key wrapped the way [`super::FakeKms`] expects, base64-encoded.
pub fn fake_wrapped_key() -> String {
    let mut wrapped = WRAP_PREFIX.to_vec();
    wrapped.extend_from_slice(&fake_key_material());
    STANDARD.encode(wrapped)
}

/// Encrypt `plaintext` under the fake data key.
pub fn fake_encrypt(plaintext: &str) -> String {
    let enc = Encryption::from_key(Zeroizing::new(fake_key_material()), String::new())
        .expect("fake key has a valid length");
    enc.encrypt(plaintext.as_bytes()).expect("encryption failed")
}

/// A version 1 secure store: no `master_key_id`, no `is_binary` fields.
pub fn v1_store(plain: &[(&str, &str)], secrets: &[(&str, &str)]) -> String {
    let mut data = serde_json::Map::new();
    for (k, v) in plain {
        data.insert(k.to_string(), json!({ "value": v, "is_secret": false }));
    }
    for (k, v) in secrets {
        data.insert(
            k.to_string(),
            json!({ "value": fake_encrypt(v), "is_secret": true }),
        );
    }
    pretty(json!({
        "version": 1,
        "region": "eu-west-1",
        "role": "",
        "is_insecure": false,
        "data_key": fake_wrapped_key(),
        "data": Value::Object(data),
    }))
}

/// A current secure store wrapped under [`MASTER_KEY_ID`].
pub fn secure_store(plain: &[(&str, &str)], secrets: &[(&str, &str)]) -> String {
    let mut doc: Value = serde_json::from_str(&v1_store(plain, secrets)).expect("valid fixture");
    doc["version"] = json!(3);
    doc["master_key_id"] = json!(MASTER_KEY_ID);
    pretty(doc)
}

/// Override layer contents.
pub fn overrides(pairs: &[(&str, &str)]) -> String {
    let map: serde_json::Map<String, Value> = pairs
        .iter()
        .map(|(k, v)| (k.to_string(), json!(v)))
        .collect();
    pretty(Value::Object(map))
}

pub const DB_TEMPLATE: &str = "host={{.DB_HOST}}\nport={{ index . \"DB_PORT\" }}\n";

pub const COMMENTED_TEMPLATE: &str = "{{/* connection */}}\nurl = {{- .DB_HOST -}} :5432\n";

fn pretty(value: Value) -> String {
    serde_json::to_string_pretty(&value).expect("serializable fixture")
}
