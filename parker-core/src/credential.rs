//! Credential hashing: phone and passcode are SHA-256 digested before they leave the device.

use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Lowercase hex SHA-256 of the UTF-8 bytes of `text`. Always 64 characters.
pub fn hash(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}

/// Hashed phone/passcode pair. Plaintext is dropped as soon as this is built.
#[derive(Clone, PartialEq, Eq)]
pub struct AuthCredential {
    phone_hash: String,
    pass_hash: String,
}

impl AuthCredential {
    /// Hash both fields independently.
    pub fn derive(phone: &str, passcode: &str) -> Self {
        Self {
            phone_hash: hash(phone),
            pass_hash: hash(passcode),
        }
    }

    pub fn phone_hash(&self) -> &str {
        &self.phone_hash
    }

    pub fn pass_hash(&self) -> &str {
        &self.pass_hash
    }
}

impl fmt::Debug for AuthCredential {
    // Digests are not secrets on the wire, but keep them out of logs anyway.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthCredential")
            .field("phone_hash", &"<redacted>")
            .field("pass_hash", &"<redacted>")
            .finish()
    }
}

/// Body returned by sign-up and login. `success == false` is an account-level rejection
/// (bad passcode, duplicate phone), not a transport failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthResult {
    pub success: bool,
    #[serde(default)]
    pub credits: Option<i64>,
}
