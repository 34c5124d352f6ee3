//! Error types for the Viera remote-control client.

use thiserror::Error;

/// Primary error type for all remote-control operations.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Connection error: {0}")]
    Connection(#[from] std::io::Error),

    #[error("Operation timed out")]
    Timeout,

    #[error("Protocol framing error: {0}")]
    Framing(#[from] FramingError),

    #[error("Crypto error: {0}")]
    Crypto(#[from] CryptoError),

    #[error("Authorization error: {0}")]
    Authorization(#[from] AuthorizationError),

    #[error("Sequence number mismatch: expected {expected}, got {actual}")]
    Sequence { expected: u32, actual: u32 },

    #[error("SOAP error: {0}")]
    Soap(#[from] SoapError),

    #[error("TV requires an encrypted session; pair with a PIN or load credentials first")]
    EncryptionRequired,

    #[error("Session is no longer usable after an integrity failure; re-pair or reload credentials")]
    SessionPoisoned,

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl Error {
    /// True when the encrypted session that produced this error must be discarded.
    pub fn is_session_fatal(&self) -> bool {
        matches!(
            self,
            Error::Crypto(_) | Error::Sequence { .. } | Error::SessionPoisoned
        )
    }
}

/// Errors delimiting or decoding a message on the wire.
#[derive(Error, Debug)]
pub enum FramingError {
    #[error("missing header terminator")]
    MissingHeaderTerminator,

    #[error("malformed status line: {0}")]
    InvalidStatusLine(String),

    #[error("invalid Content-Length: {0}")]
    InvalidContentLength(String),

    #[error("body too short: expected {expected} bytes, got {actual}")]
    Truncated { expected: usize, actual: usize },

    #[error("unsupported transfer encoding: {0}")]
    UnsupportedTransferEncoding(String),

    #[error("missing element <{0}>")]
    MissingElement(String),

    #[error("invalid base64 in <{0}>")]
    InvalidBase64(String),

    #[error("invalid value in <{element}>: {value}")]
    InvalidValue { element: String, value: String },

    #[error("invalid envelope: {0}")]
    InvalidEnvelope(String),

    #[error("invalid UTF-8 in {0}")]
    InvalidUtf8(&'static str),
}

/// Errors reported by the TV at the SOAP/HTTP level.
#[derive(Error, Debug)]
pub enum SoapError {
    #[error("fault {code}: {description}")]
    Fault { code: String, description: String },

    #[error("unexpected HTTP status: {0}")]
    UnexpectedStatus(u16),
}

/// Cryptographic operation errors.
#[derive(Error, Debug)]
pub enum CryptoError {
    #[error("Encryption failed: {0}")]
    Encryption(String),

    #[error("Decryption failed: {0}")]
    Decryption(String),

    #[error("Invalid padding")]
    InvalidPadding,

    #[error("Key derivation failed: {0}")]
    KeyDerivation(String),

    #[error("Invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },

    #[error("Authentication tag mismatch")]
    AuthTagMismatch,
}

/// Errors during PIN pairing.
#[derive(Error, Debug)]
pub enum AuthorizationError {
    #[error("PIN rejected by TV ({code}: {description})")]
    Rejected { code: String, description: String },

    #[error("TV confirmation failed integrity check (wrong PIN or protocol desync)")]
    ConfirmationFailed,

    #[error("Invalid handshake state: {0}")]
    InvalidState(String),

    #[error("Invalid PIN: {0}")]
    InvalidPin(String),

    #[error("{stage} failed: {source}")]
    Step {
        stage: &'static str,
        #[source]
        source: Box<Error>,
    },
}

/// Convenience Result type.
pub type Result<T> = std::result::Result<T, Error>;
