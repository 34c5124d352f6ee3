//! HKDF-SHA256 key derivation and the PIN challenge.

use hkdf::Hkdf;
use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};
use viera_core::error::CryptoError;

/// Derive a fixed-size key using HKDF-SHA256.
///
/// # Arguments
/// * `ikm` - Input key material
/// * `salt` - Salt value (can be empty)
/// * `info` - Context/application-specific info
pub fn derive_key_array<const N: usize>(
    ikm: &[u8],
    salt: &[u8],
    info: &[u8],
) -> Result<[u8; N], CryptoError> {
    let hk = Hkdf::<Sha256>::new(Some(salt), ikm);
    let mut okm = [0u8; N];
    hk.expand(info, &mut okm)
        .map_err(|_| CryptoError::KeyDerivation("HKDF expand failed".to_string()))?;
    Ok(okm)
}

/// Labels mixed into every derivation.
pub mod constants {
    pub const SESSION_KEY_INFO: &[u8] = b"viera-session-key";
    pub const SESSION_HMAC_SALT: &[u8] = b"viera-session-salt";
    pub const SESSION_HMAC_INFO: &[u8] = b"viera-session-hmac";
    pub const PIN_CHALLENGE_LABEL: &[u8] = b"viera-pin-challenge";
}

/// SHA-256 over the client's device name and the PIN.
pub fn pin_seed(device_name: &str, pin: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(device_name.as_bytes());
    hasher.update([0u8]);
    hasher.update(pin.as_bytes());
    hasher.finalize().into()
}

/// Challenge proving knowledge of the displayed PIN without sending it.
///
/// `HMAC-SHA256(pin_seed, label || tv_nonce || client_nonce)`
pub fn pin_challenge(
    device_name: &str,
    pin: &str,
    tv_nonce: &[u8; 16],
    client_nonce: &[u8; 16],
) -> Result<[u8; 32], CryptoError> {
    challenge_from_seed(&pin_seed(device_name, pin), tv_nonce, client_nonce)
}

/// Same as `pin_challenge`, for a seed computed earlier with `pin_seed`.
pub fn challenge_from_seed(
    seed: &[u8; 32],
    tv_nonce: &[u8; 16],
    client_nonce: &[u8; 16],
) -> Result<[u8; 32], CryptoError> {
    let mut mac = Hmac::<Sha256>::new_from_slice(seed)
        .map_err(|e| CryptoError::KeyDerivation(format!("HMAC init failed: {}", e)))?;
    mac.update(constants::PIN_CHALLENGE_LABEL);
    mac.update(tv_nonce);
    mac.update(client_nonce);
    Ok(mac.finalize().into_bytes().into())
}
