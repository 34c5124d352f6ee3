//! # viera-core
//!
//! Core types and error definitions shared across the Viera remote crates.
//!
//! This crate provides:
//! - The error taxonomy used by every layer
//! - Pairing credentials and their base64 form
//! - The catalogue of remote-control key codes
//! - Per-TV connection settings

pub mod config;
pub mod credentials;
pub mod error;
pub mod keys;

pub use config::{RemoteConfig, DEFAULT_DEVICE_NAME, DEFAULT_PORT, DEFAULT_TIMEOUT};
pub use credentials::{Credentials, EncryptionKey};
pub use error::{AuthorizationError, CryptoError, Error, FramingError, Result, SoapError};
pub use keys::Key;
