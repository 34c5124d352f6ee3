//! Per-session keys and sequence counters.

use std::fmt;

use viera_core::credentials::Credentials;
use viera_core::error::{CryptoError, Error, Result};

use crate::envelope::{self, Envelope};
use crate::keys::SessionKeys;

/// State of one encrypted session.
///
/// The outbound counter numbers our requests and the inbound counter the
/// TV's responses. Both start at 0 and only move forward, one step per
/// completed exchange.
pub struct SessionState {
    keys: SessionKeys,
    credentials: Credentials,
    outbound_sequence: u32,
    inbound_sequence: u32,
}

impl SessionState {
    /// Fresh session with both counters at 0.
    pub fn new(keys: SessionKeys, application_id: impl Into<String>) -> Self {
        let credentials = Credentials::new(application_id, keys.credential_key());
        Self {
            keys,
            credentials,
            outbound_sequence: 0,
            inbound_sequence: 0,
        }
    }

    /// Rebuild a session from credentials a caller stored earlier.
    pub fn from_credentials(credentials: &Credentials) -> std::result::Result<Self, CryptoError> {
        let keys = SessionKeys::derive(credentials.encryption_key())?;
        Ok(Self::new(keys, credentials.application_id()))
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn application_id(&self) -> &str {
        self.credentials.application_id()
    }

    pub fn keys(&self) -> &SessionKeys {
        &self.keys
    }

    /// Sequence number the next request will carry.
    pub fn outbound_sequence(&self) -> u32 {
        self.outbound_sequence
    }

    /// Sequence number expected on the next response.
    pub fn inbound_sequence(&self) -> u32 {
        self.inbound_sequence
    }

    /// Seal a request at the current outbound sequence.
    ///
    /// Does not advance the counter; call `advance_outbound` once the
    /// request has actually been delivered.
    pub fn seal_request(&self, plaintext: &[u8]) -> std::result::Result<Envelope, CryptoError> {
        Envelope::seal(
            &self.keys,
            &envelope::request_header(self.application_id()),
            self.outbound_sequence,
            plaintext,
        )
    }

    /// Verify and decrypt a response at the expected inbound sequence.
    pub fn open_response(&self, envelope: &Envelope) -> Result<Vec<u8>> {
        envelope.open(
            &self.keys,
            &envelope::response_header(self.application_id()),
            self.inbound_sequence,
        )
    }

    pub fn advance_outbound(&mut self) -> Result<()> {
        self.outbound_sequence = next(self.outbound_sequence)?;
        Ok(())
    }

    pub fn advance_inbound(&mut self) -> Result<()> {
        self.inbound_sequence = next(self.inbound_sequence)?;
        Ok(())
    }
}

fn next(sequence: u32) -> Result<u32> {
    sequence.checked_add(1).ok_or_else(|| {
        Error::Crypto(CryptoError::Encryption(
            "sequence space exhausted; re-pair to continue".to_string(),
        ))
    })
}

impl fmt::Debug for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionState")
            .field("application_id", &self.application_id())
            .field("outbound_sequence", &self.outbound_sequence)
            .field("inbound_sequence", &self.inbound_sequence)
            .finish_non_exhaustive()
    }
}
