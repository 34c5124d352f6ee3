//! HMAC-SHA256 message tags bound to a sequence number.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use viera_core::error::CryptoError;

type HmacSha256 = Hmac<Sha256>;

/// Tag length in bytes.
pub const TAG_LEN: usize = 32;

/// `HMAC-SHA256(hmac_key, sequence_be32 || associated_data)`.
pub fn compute_tag(
    associated_data: &[u8],
    sequence: u32,
    hmac_key: &[u8],
) -> Result<[u8; TAG_LEN], CryptoError> {
    let mac = keyed(hmac_key, sequence, associated_data)?;
    Ok(mac.finalize().into_bytes().into())
}

/// Check `tag` in constant time.
pub fn verify_tag(
    associated_data: &[u8],
    sequence: u32,
    hmac_key: &[u8],
    tag: &[u8],
) -> Result<(), CryptoError> {
    keyed(hmac_key, sequence, associated_data)?
        .verify_slice(tag)
        .map_err(|_| CryptoError::AuthTagMismatch)
}

fn keyed(hmac_key: &[u8], sequence: u32, associated_data: &[u8]) -> Result<HmacSha256, CryptoError> {
    let mut mac = HmacSha256::new_from_slice(hmac_key)
        .map_err(|e| CryptoError::KeyDerivation(format!("HMAC init failed: {}", e)))?;
    mac.update(&sequence.to_be_bytes());
    mac.update(associated_data);
    Ok(mac)
}
