//! # viera-crypto
//!
//! Cryptographic layer of the Viera encrypted session.
//!
//! This crate provides:
//! - AES-128-CBC with PKCS7 padding
//! - HMAC-SHA256 tags bound to sequence numbers
//! - HKDF-SHA256 key derivation and the PIN challenge
//! - Sealed envelopes and per-session sequence state
//!
//! All secret material is zeroized on drop.

pub mod aes;
pub mod envelope;
pub mod hkdf;
pub mod keys;
pub mod state;
pub mod tag;

pub use envelope::{request_header, response_header, Envelope, CONFIRM_HEADER};
pub use crate::hkdf::pin_challenge;
pub use keys::{derive_session_key, SessionKeys};
pub use state::SessionState;
pub use tag::{compute_tag, verify_tag};
