//! Sealed payloads exchanged inside an encrypted session.
//!
//! Wire layout (base64 inside a SOAP element):
//!
//! ```text
//! [16-byte IV][AES-128-CBC ciphertext, PKCS7][32-byte HMAC-SHA256 tag]
//! ```
//!
//! The sequence number is carried next to the envelope rather than inside
//! it, and the tag covers
//! `sequence_be32 || len(header)_be16 || header || iv || ciphertext`.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use viera_core::error::{CryptoError, Error, FramingError, Result};

use crate::aes::BLOCK_SIZE;
use crate::keys::SessionKeys;
use crate::tag::{self, TAG_LEN};

/// IV length in bytes.
pub const IV_LEN: usize = 16;

/// Smallest valid envelope: IV, one ciphertext block, tag.
pub const MIN_ENVELOPE_LEN: usize = IV_LEN + BLOCK_SIZE + TAG_LEN;

/// Header of the pairing confirmation sealed by the TV.
pub const CONFIRM_HEADER: &str = "confirm";

/// Header bound into requests from this client.
pub fn request_header(application_id: &str) -> String {
    format!("request:{}", application_id)
}

/// Header bound into responses from the TV.
pub fn response_header(application_id: &str) -> String {
    format!("response:{}", application_id)
}

/// One authenticated, encrypted message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Envelope {
    iv: [u8; IV_LEN],
    ciphertext: Vec<u8>,
    tag: [u8; TAG_LEN],
    sequence: u32,
}

impl Envelope {
    /// Encrypt `plaintext` under a fresh IV and tag it.
    pub fn seal(
        keys: &SessionKeys,
        header: &str,
        sequence: u32,
        plaintext: &[u8],
    ) -> std::result::Result<Self, CryptoError> {
        let (iv, ciphertext) = keys.cipher().encrypt(plaintext)?;
        let aad = associated_data(header, &iv, &ciphertext)?;
        let tag = tag::compute_tag(&aad, sequence, keys.hmac_key())?;

        Ok(Self {
            iv,
            ciphertext,
            tag,
            sequence,
        })
    }

    /// Verify and decrypt.
    ///
    /// The sequence number is checked first, then the tag. Nothing is
    /// decrypted unless both pass.
    pub fn open(&self, keys: &SessionKeys, header: &str, expected_sequence: u32) -> Result<Vec<u8>> {
        if self.sequence != expected_sequence {
            return Err(Error::Sequence {
                expected: expected_sequence,
                actual: self.sequence,
            });
        }

        let aad = associated_data(header, &self.iv, &self.ciphertext)?;
        tag::verify_tag(&aad, self.sequence, keys.hmac_key(), &self.tag)?;

        Ok(keys.cipher().decrypt(&self.iv, &self.ciphertext)?)
    }

    /// Serialize to `iv || ciphertext || tag`.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(IV_LEN + self.ciphertext.len() + TAG_LEN);
        out.extend_from_slice(&self.iv);
        out.extend_from_slice(&self.ciphertext);
        out.extend_from_slice(&self.tag);
        out
    }

    /// Parse wire bytes received alongside `sequence`.
    pub fn from_bytes(bytes: &[u8], sequence: u32) -> std::result::Result<Self, FramingError> {
        if bytes.len() < MIN_ENVELOPE_LEN {
            return Err(FramingError::InvalidEnvelope(format!(
                "{} bytes is shorter than the {} byte minimum",
                bytes.len(),
                MIN_ENVELOPE_LEN
            )));
        }
        let ct_len = bytes.len() - IV_LEN - TAG_LEN;
        if ct_len % BLOCK_SIZE != 0 {
            return Err(FramingError::InvalidEnvelope(format!(
                "ciphertext length {} is not block aligned",
                ct_len
            )));
        }

        let mut iv = [0u8; IV_LEN];
        iv.copy_from_slice(&bytes[..IV_LEN]);
        let mut tag = [0u8; TAG_LEN];
        tag.copy_from_slice(&bytes[IV_LEN + ct_len..]);

        Ok(Self {
            iv,
            ciphertext: bytes[IV_LEN..IV_LEN + ct_len].to_vec(),
            tag,
            sequence,
        })
    }

    pub fn to_base64(&self) -> String {
        STANDARD.encode(self.to_bytes())
    }

    pub fn from_base64(encoded: &str, sequence: u32) -> std::result::Result<Self, FramingError> {
        let bytes = STANDARD
            .decode(encoded.trim())
            .map_err(|e| FramingError::InvalidEnvelope(format!("not base64: {}", e)))?;
        Self::from_bytes(&bytes, sequence)
    }

    pub fn sequence(&self) -> u32 {
        self.sequence
    }
}

fn associated_data(
    header: &str,
    iv: &[u8; IV_LEN],
    ciphertext: &[u8],
) -> std::result::Result<Vec<u8>, CryptoError> {
    let header_len = u16::try_from(header.len())
        .map_err(|_| CryptoError::Encryption("envelope header too long".to_string()))?;

    let mut aad = Vec::with_capacity(2 + header.len() + IV_LEN + ciphertext.len());
    aad.extend_from_slice(&header_len.to_be_bytes());
    aad.extend_from_slice(header.as_bytes());
    aad.extend_from_slice(iv);
    aad.extend_from_slice(ciphertext);
    Ok(aad)
}

#[cfg(test)]
mod tests {
    use super::*;
    use viera_core::credentials::EncryptionKey;

    fn keys() -> SessionKeys {
        SessionKeys::derive(&EncryptionKey::new([0x3Cu8; 16])).unwrap()
    }

    mod seal_open {
        use super::*;

        #[test]
        fn open_recovers_plaintext() {
            let keys = keys();
            let header = request_header("app");
            let env = Envelope::seal(&keys, &header, 3, b"<X_KeyEvent>NRC_EPG-ONOFF</X_KeyEvent>")
                .unwrap();
            let plaintext = env.open(&keys, &header, 3).unwrap();
            assert_eq!(plaintext, b"<X_KeyEvent>NRC_EPG-ONOFF</X_KeyEvent>");
        }

        #[test]
        fn two_seals_differ() {
            let keys = keys();
            let a = Envelope::seal(&keys, "h", 0, b"same").unwrap();
            let b = Envelope::seal(&keys, "h", 0, b"same").unwrap();
            // Fresh IV up front
            assert_ne!(a.to_bytes()[..IV_LEN], b.to_bytes()[..IV_LEN]);
            assert_ne!(a.to_bytes(), b.to_bytes());
        }

        #[test]
        fn wrong_sequence_is_reported_before_tag() {
            let keys = keys();
            let mut env = Envelope::seal(&keys, "h", 5, b"data").unwrap();
            env.tag[0] ^= 0xFF;
            let err = env.open(&keys, "h", 4).unwrap_err();
            assert!(matches!(
                err,
                Error::Sequence {
                    expected: 4,
                    actual: 5
                }
            ));
        }

        #[test]
        fn tampered_ciphertext_fails_tag() {
            let keys = keys();
            let mut env = Envelope::seal(&keys, "h", 0, b"data").unwrap();
            env.ciphertext[0] ^= 0x01;
            let err = env.open(&keys, "h", 0).unwrap_err();
            assert!(matches!(err, Error::Crypto(CryptoError::AuthTagMismatch)));
        }

        #[test]
        fn request_does_not_open_as_response() {
            let keys = keys();
            let env = Envelope::seal(&keys, &request_header("app"), 0, b"data").unwrap();
            let err = env.open(&keys, &response_header("app"), 0).unwrap_err();
            assert!(matches!(err, Error::Crypto(CryptoError::AuthTagMismatch)));
        }

        #[test]
        fn other_keys_fail_tag() {
            let env = Envelope::seal(&keys(), "h", 0, b"data").unwrap();
            let other = SessionKeys::derive(&EncryptionKey::new([0x3Du8; 16])).unwrap();
            assert!(env.open(&other, "h", 0).is_err());
        }

        #[test]
        fn empty_plaintext_seals_one_block() {
            let keys = keys();
            let env = Envelope::seal(&keys, "h", 0, b"").unwrap();
            assert_eq!(env.to_bytes().len(), MIN_ENVELOPE_LEN);
            assert!(env.open(&keys, "h", 0).unwrap().is_empty());
        }
    }

    mod wire {
        use super::*;

        #[test]
        fn base64_form_reopens() {
            let keys = keys();
            let env = Envelope::seal(&keys, "h", 9, b"volume").unwrap();
            let parsed = Envelope::from_base64(&env.to_base64(), 9).unwrap();
            assert_eq!(parsed, env);
            assert_eq!(parsed.open(&keys, "h", 9).unwrap(), b"volume");
        }

        #[test]
        fn short_input_is_rejected() {
            let err = Envelope::from_bytes(&[0u8; MIN_ENVELOPE_LEN - 1], 0).unwrap_err();
            assert!(matches!(err, FramingError::InvalidEnvelope(_)));
        }

        #[test]
        fn unaligned_ciphertext_is_rejected() {
            let err = Envelope::from_bytes(&[0u8; MIN_ENVELOPE_LEN + 5], 0).unwrap_err();
            assert!(matches!(err, FramingError::InvalidEnvelope(_)));
        }

        #[test]
        fn garbage_base64_is_rejected() {
            assert!(Envelope::from_base64("%%%", 0).is_err());
        }

        #[test]
        fn sequence_is_not_part_of_the_bytes() {
            let env = Envelope::seal(&keys(), "h", 1, b"x").unwrap();
            let parsed = Envelope::from_bytes(&env.to_bytes(), 2).unwrap();
            assert_eq!(parsed.sequence(), 2);
        }
    }
}
