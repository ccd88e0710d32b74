//! SSH key models.

use chrono::{DateTime, FixedOffset};
use robot_core::form::FormParams;
use robot_core::time::parse_provider_timestamp;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

/// Key types accepted by the provider, by public key prefix.
const KEY_PREFIXES: &[&str] = &[
    "ssh-rsa ",
    "ssh-ed25519 ",
    "ssh-dss ",
    "ecdsa-sha2-nistp256 ",
    "ecdsa-sha2-nistp384 ",
    "ecdsa-sha2-nistp521 ",
];

/// SSH key as sent on the wire.
///
/// `created_at` is a zone-less provider timestamp; convert with [`KeyRecord::into_key`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct KeyRecord {
    /// Key name
    pub name: String,
    /// MD5 fingerprint, colon separated
    pub fingerprint: String,
    /// Algorithm, e.g. `ED25519`
    #[serde(rename = "type")]
    pub key_type: String,
    /// Size in bits
    pub size: u32,
    /// Public key in OpenSSH format
    pub data: String,
    /// Creation time in provider local time
    pub created_at: String,
}

impl KeyRecord {
    /// Resolve `created_at` using the provider offset.
    ///
    /// # Errors
    ///
    /// Returns a parse error if the timestamp is malformed.
    pub fn into_key(self, offset: FixedOffset) -> robot_core::Result<SshKey> {
        let created_at = parse_provider_timestamp(&self.created_at, offset)?;
        Ok(SshKey {
            name: self.name,
            fingerprint: self.fingerprint,
            key_type: self.key_type,
            size: self.size,
            data: self.data,
            created_at,
        })
    }
}

/// SSH key stored with the provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SshKey {
    /// Key name
    pub name: String,
    /// MD5 fingerprint, colon separated
    pub fingerprint: String,
    /// Algorithm, e.g. `ED25519`
    pub key_type: String,
    /// Size in bits
    pub size: u32,
    /// Public key in OpenSSH format
    pub data: String,
    /// Creation time
    pub created_at: DateTime<FixedOffset>,
}

/// Parameters for storing a new key.
#[derive(Debug, Clone, PartialEq, Eq, Validate)]
pub struct CreateKeyRequest {
    /// Key name
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    /// Public key in OpenSSH format
    #[validate(custom(function = "validate_public_key"))]
    pub data: String,
}

impl CreateKeyRequest {
    /// Create a request.
    #[must_use]
    pub fn new(name: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            data: data.into(),
        }
    }

    /// Form encoding of the request.
    #[must_use]
    pub fn to_form(&self) -> FormParams {
        FormParams::new()
            .with("name", &self.name)
            .with("data", self.data.trim())
    }
}

fn validate_public_key(data: &str) -> Result<(), ValidationError> {
    let data = data.trim();
    if KEY_PREFIXES.iter().any(|prefix| data.starts_with(prefix)) {
        return Ok(());
    }
    Err(ValidationError::new("unsupported_public_key"))
}

/// Returns true for a colon separated MD5 fingerprint.
#[must_use]
pub fn is_fingerprint(value: &str) -> bool {
    let groups: Vec<&str> = value.split(':').collect();
    groups.len() == 16
        && groups
            .iter()
            .all(|group| group.len() == 2 && group.chars().all(|c| c.is_ascii_hexdigit()))
}
