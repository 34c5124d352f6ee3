//! Pairing credentials handed back to the caller.
//!
//! A successful PIN pairing yields an application id and a 16-byte key. The
//! client never persists them; callers store the base64 form and later rebuild
//! a session through `Credentials::from_base64`.

use std::fmt;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::error::{CryptoError, Error, Result};

/// 16-byte credential key issued by a successful pairing.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct EncryptionKey([u8; 16]);

impl EncryptionKey {
    /// Key length in bytes.
    pub const LEN: usize = 16;

    /// Create from raw bytes.
    pub fn new(bytes: [u8; Self::LEN]) -> Self {
        Self(bytes)
    }

    /// Create from a slice, checking its length.
    pub fn from_slice(bytes: &[u8]) -> std::result::Result<Self, CryptoError> {
        let arr: [u8; Self::LEN] =
            bytes
                .try_into()
                .map_err(|_| CryptoError::InvalidKeyLength {
                    expected: Self::LEN,
                    actual: bytes.len(),
                })?;
        Ok(Self(arr))
    }

    /// Decode from standard base64.
    pub fn from_base64(encoded: &str) -> Result<Self> {
        let mut bytes = STANDARD
            .decode(encoded.trim())
            .map_err(|e| Error::InvalidArgument(format!("encryption key is not base64: {}", e)))?;
        let key = Self::from_slice(&bytes);
        bytes.zeroize();
        Ok(key?)
    }

    /// Encode as standard base64.
    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.0)
    }

    /// Get raw bytes.
    pub fn as_bytes(&self) -> &[u8; Self::LEN] {
        &self.0
    }
}

impl fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("EncryptionKey(..)")
    }
}

/// Application id and key produced by PIN pairing.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    application_id: String,
    #[serde(with = "key_base64")]
    encryption_key: EncryptionKey,
}

impl Credentials {
    pub fn new(application_id: impl Into<String>, encryption_key: EncryptionKey) -> Self {
        Self {
            application_id: application_id.into(),
            encryption_key,
        }
    }

    /// Rebuild credentials from the base64 strings a caller persisted.
    pub fn from_base64(application_id: impl Into<String>, encryption_key: &str) -> Result<Self> {
        let application_id = application_id.into();
        if application_id.is_empty() {
            return Err(Error::InvalidArgument(
                "application id must not be empty".to_string(),
            ));
        }
        Ok(Self::new(
            application_id,
            EncryptionKey::from_base64(encryption_key)?,
        ))
    }

    pub fn application_id(&self) -> &str {
        &self.application_id
    }

    pub fn encryption_key(&self) -> &EncryptionKey {
        &self.encryption_key
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("application_id", &self.application_id)
            .field("encryption_key", &self.encryption_key)
            .finish()
    }
}

mod key_base64 {
    use super::EncryptionKey;
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(key: &EncryptionKey, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&key.to_base64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<EncryptionKey, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        EncryptionKey::from_base64(&encoded).map_err(de::Error::custom)
    }
}
