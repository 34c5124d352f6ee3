//! AES-128-CBC with PKCS7 padding for session payloads.

use aes::cipher::{BlockDecrypt, BlockEncrypt, KeyInit};
use aes::Aes128;
use rand::rngs::OsRng;
use rand::RngCore;
use viera_core::error::CryptoError;
use zeroize::ZeroizeOnDrop;

/// AES block size in bytes.
pub const BLOCK_SIZE: usize = 16;

/// AES-128-CBC cipher bound to one session key.
///
/// The IV is not part of the cipher: `encrypt` draws a fresh one from the OS
/// RNG on every call and hands it back, so no IV is ever reused.
#[derive(ZeroizeOnDrop)]
pub struct AesCbcCipher {
    key: [u8; 16],
}

impl AesCbcCipher {
    /// Create cipher with a 16-byte key.
    pub fn new(key: [u8; 16]) -> Self {
        Self { key }
    }

    /// Pad and encrypt `plaintext` under a fresh random IV.
    pub fn encrypt(&self, plaintext: &[u8]) -> Result<([u8; 16], Vec<u8>), CryptoError> {
        let mut iv = [0u8; 16];
        OsRng.fill_bytes(&mut iv);

        let ciphertext = self.encrypt_blocks(&iv, &pkcs7_pad(plaintext))?;
        Ok((iv, ciphertext))
    }

    /// Decrypt and strip PKCS7 padding.
    ///
    /// Fails on empty or non-block-aligned input and on malformed padding,
    /// which indicates a wrong key or corrupted data.
    pub fn decrypt(&self, iv: &[u8; 16], ciphertext: &[u8]) -> Result<Vec<u8>, CryptoError> {
        if ciphertext.is_empty() {
            return Err(CryptoError::Decryption("Ciphertext is empty".to_string()));
        }
        let padded = self.decrypt_blocks(iv, ciphertext)?;
        pkcs7_unpad(padded)
    }

    /// Raw CBC over block-aligned data.
    fn encrypt_blocks(&self, iv: &[u8; 16], data: &[u8]) -> Result<Vec<u8>, CryptoError> {
        if data.len() % BLOCK_SIZE != 0 {
            return Err(CryptoError::Encryption(
                "Plaintext must be a multiple of 16 bytes".to_string(),
            ));
        }

        let cipher = Aes128::new_from_slice(&self.key)
            .map_err(|e| CryptoError::Encryption(format!("Invalid key: {}", e)))?;

        let mut ciphertext = Vec::with_capacity(data.len());
        let mut prev_block = *iv;

        for chunk in data.chunks(BLOCK_SIZE) {
            // XOR with previous ciphertext (or IV for first block)
            let mut block = [0u8; 16];
            for i in 0..BLOCK_SIZE {
                block[i] = chunk[i] ^ prev_block[i];
            }

            // Encrypt in place
            let block_arr = aes::Block::from_mut_slice(&mut block);
            cipher.encrypt_block(block_arr);

            // Output block chains into the next one
            prev_block = block;
            ciphertext.extend_from_slice(&block);
        }

        Ok(ciphertext)
    }

    fn decrypt_blocks(&self, iv: &[u8; 16], data: &[u8]) -> Result<Vec<u8>, CryptoError> {
        if data.len() % BLOCK_SIZE != 0 {
            return Err(CryptoError::Decryption(
                "Ciphertext must be a multiple of 16 bytes".to_string(),
            ));
        }

        let cipher = Aes128::new_from_slice(&self.key)
            .map_err(|e| CryptoError::Decryption(format!("Invalid key: {}", e)))?;

        let mut plaintext = Vec::with_capacity(data.len());
        let mut prev_block = *iv;

        for chunk in data.chunks(BLOCK_SIZE) {
            let mut block = [0u8; 16];
            block.copy_from_slice(chunk);

            // Decrypt
            let block_arr = aes::Block::from_mut_slice(&mut block);
            cipher.decrypt_block(block_arr);

            // XOR with previous ciphertext (or IV for first block)
            for i in 0..BLOCK_SIZE {
                block[i] ^= prev_block[i];
            }

            // Chain on the ciphertext, not the plaintext
            prev_block.copy_from_slice(chunk);
            plaintext.extend_from_slice(&block);
        }

        Ok(plaintext)
    }
}

/// Append PKCS7 padding. Aligned input gains a whole block.
fn pkcs7_pad(data: &[u8]) -> Vec<u8> {
    let pad_len = BLOCK_SIZE - data.len() % BLOCK_SIZE;
    let mut padded = Vec::with_capacity(data.len() + pad_len);
    padded.extend_from_slice(data);
    padded.resize(data.len() + pad_len, pad_len as u8);
    padded
}

fn pkcs7_unpad(mut data: Vec<u8>) -> Result<Vec<u8>, CryptoError> {
    let pad_len = *data.last().ok_or(CryptoError::InvalidPadding)? as usize;
    if pad_len == 0 || pad_len > BLOCK_SIZE || pad_len > data.len() {
        return Err(CryptoError::InvalidPadding);
    }
    // Every padding byte carries the pad length
    if !data[data.len() - pad_len..]
        .iter()
        .all(|&b| b as usize == pad_len)
    {
        return Err(CryptoError::InvalidPadding);
    }
    data.truncate(data.len() - pad_len);
    Ok(data)
}
