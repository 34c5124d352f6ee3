//! Session key types and derivation.

use std::fmt;

use crate::aes::AesCbcCipher;
use crate::hkdf;
use viera_core::credentials::EncryptionKey;
use viera_core::error::CryptoError;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// AES and HMAC keys for one encrypted session.
///
/// Both halves are always derived together from the 16-byte credential key,
/// so a session can be rebuilt from stored credentials alone.
#[derive(Clone, ZeroizeOnDrop)]
pub struct SessionKeys {
    encryption_key: [u8; 16],
    hmac_key: [u8; 32],
}

impl SessionKeys {
    /// Expand the credential key into the full session key set.
    pub fn derive(key: &EncryptionKey) -> Result<Self, CryptoError> {
        let hmac_key = hkdf::derive_key_array::<32>(
            key.as_bytes(),
            hkdf::constants::SESSION_HMAC_SALT,
            hkdf::constants::SESSION_HMAC_INFO,
        )?;

        Ok(Self {
            encryption_key: *key.as_bytes(),
            hmac_key,
        })
    }

    /// AES-128 payload key.
    pub fn encryption_key(&self) -> &[u8; 16] {
        &self.encryption_key
    }

    /// HMAC-SHA256 tag key.
    pub fn hmac_key(&self) -> &[u8; 32] {
        &self.hmac_key
    }

    /// The key a caller persists to rebuild this session later.
    pub fn credential_key(&self) -> EncryptionKey {
        EncryptionKey::new(self.encryption_key)
    }

    pub(crate) fn cipher(&self) -> AesCbcCipher {
        AesCbcCipher::new(self.encryption_key)
    }
}

impl fmt::Debug for SessionKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SessionKeys(..)")
    }
}

/// Derive session keys from a PIN and the nonces exchanged while pairing.
///
/// `seed_material` is `tv_nonce || client_nonce`. The same inputs always give
/// the same keys, which is what lets both ends agree without sending them.
pub fn derive_session_key(pin: &str, seed_material: &[u8]) -> Result<SessionKeys, CryptoError> {
    let mut key = hkdf::derive_key_array::<16>(
        pin.as_bytes(),
        seed_material,
        hkdf::constants::SESSION_KEY_INFO,
    )?;
    let keys = SessionKeys::derive(&EncryptionKey::new(key));
    key.zeroize();
    keys
}
