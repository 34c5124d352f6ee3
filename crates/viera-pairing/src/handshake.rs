//! PIN pairing state machine.
//!
//! The machine performs no I/O. Each call to [`Handshake::advance`] consumes
//! one event and returns the next thing the driver must do:
//!
//! ```text
//! Begin               -> Send(X_DisplayPinCode)
//! Response(body)      -> NeedPin                 (TV shows the PIN)
//! PinEntered(pin)     -> Send(X_RequestAuth)
//! Response(body)      -> Confirm
//! Confirm             -> Complete(credentials, session)
//! ```
//!
//! Any error before the end moves the machine to `Failed`. Both `Failed` and
//! `Authorized` are terminal and reject further events without changing
//! state; a new pairing attempt needs a new `Handshake`.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;
use viera_core::credentials::Credentials;
use viera_core::error::{AuthorizationError, CryptoError, Error, FramingError, Result, SoapError};
use viera_crypto::envelope::{Envelope, CONFIRM_HEADER};
use viera_crypto::hkdf;
use viera_crypto::keys::derive_session_key;
use viera_crypto::state::SessionState;
use viera_soap::{xml, SoapCommand};
use zeroize::{Zeroize, ZeroizeOnDrop};

const STAGE_DISPLAY_PIN: &str = "X_DisplayPinCode";
const STAGE_REQUEST_AUTH: &str = "X_RequestAuth";
const STAGE_CONFIRM: &str = "confirm";

/// Public handshake state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeState {
    Idle,
    PinRequested,
    ChallengeExchanged,
    Authorized,
    Failed,
}

/// Input to the state machine.
#[derive(Debug)]
pub enum HandshakeEvent {
    /// Start pairing.
    Begin,
    /// SOAP body answering the last `Send`.
    Response(String),
    /// PIN read off the TV screen.
    PinEntered(String),
    /// Derive keys and check the TV's confirmation.
    Confirm,
    /// The last `Send` failed.
    TransportFailed(Error),
}

/// What the driver must do next.
#[derive(Debug)]
pub enum HandshakeStep {
    /// Send this command and feed back the response.
    Send(SoapCommand),
    /// Ask the user for the PIN shown on the TV.
    NeedPin,
    /// Feed back `HandshakeEvent::Confirm`.
    Confirm,
    /// Pairing succeeded.
    Complete(Credentials, SessionState),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stage {
    Idle,
    AwaitingChallengeKey,
    PinRequested,
    AwaitingAuthResult,
    ChallengeExchanged,
    Authorized,
    Failed,
}

impl Stage {
    fn public(self) -> HandshakeState {
        match self {
            Stage::Idle | Stage::AwaitingChallengeKey => HandshakeState::Idle,
            Stage::PinRequested | Stage::AwaitingAuthResult => HandshakeState::PinRequested,
            Stage::ChallengeExchanged => HandshakeState::ChallengeExchanged,
            Stage::Authorized => HandshakeState::Authorized,
            Stage::Failed => HandshakeState::Failed,
        }
    }
}

/// Secrets alive only for one pairing attempt.
#[derive(Zeroize, ZeroizeOnDrop)]
struct HandshakeContext {
    device_name: String,
    pin: String,
    pin_seed: [u8; 32],
    tv_nonce: [u8; 16],
    client_nonce: [u8; 16],
}

impl HandshakeContext {
    fn new(device_name: String) -> Self {
        let mut client_nonce = [0u8; 16];
        OsRng.fill_bytes(&mut client_nonce);
        Self {
            device_name,
            pin: String::new(),
            pin_seed: [0u8; 32],
            tv_nonce: [0u8; 16],
            client_nonce,
        }
    }

    fn seed_material(&self) -> [u8; 32] {
        let mut seed = [0u8; 32];
        seed[..16].copy_from_slice(&self.tv_nonce);
        seed[16..].copy_from_slice(&self.client_nonce);
        seed
    }
}

/// One PIN pairing attempt.
pub struct Handshake {
    stage: Stage,
    context: HandshakeContext,
    confirmation: Option<Envelope>,
}

impl Handshake {
    /// New attempt with fresh nonces. `device_name` is shown on the TV.
    pub fn new(device_name: impl Into<String>) -> Self {
        Self {
            stage: Stage::Idle,
            context: HandshakeContext::new(device_name.into()),
            confirmation: None,
        }
    }

    pub fn state(&self) -> HandshakeState {
        self.stage.public()
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.stage, Stage::Authorized | Stage::Failed)
    }

    /// Feed one event and get the next step.
    ///
    /// Events reaching an `Authorized` or `Failed` handshake are rejected
    /// and leave it where it is.
    pub fn advance(&mut self, event: HandshakeEvent) -> Result<HandshakeStep> {
        let from = self.stage;
        if self.is_terminal() {
            return Err(AuthorizationError::InvalidState(format!(
                "{} not allowed in state {:?}",
                event_name(&event),
                from.public()
            ))
            .into());
        }
        match self.step(from, event) {
            Ok((next, step)) => {
                tracing::debug!(from = ?from.public(), to = ?next.public(), "handshake advanced");
                self.stage = next;
                if next == Stage::Authorized {
                    self.context.zeroize();
                }
                Ok(step)
            }
            Err(e) => {
                tracing::warn!(from = ?from.public(), "handshake failed: {}", e);
                self.stage = Stage::Failed;
                self.confirmation = None;
                self.context.zeroize();
                Err(Error::Authorization(e))
            }
        }
    }

    fn step(
        &mut self,
        stage: Stage,
        event: HandshakeEvent,
    ) -> std::result::Result<(Stage, HandshakeStep), AuthorizationError> {
        match (stage, event) {
            (Stage::Idle, HandshakeEvent::Begin) => Ok((
                Stage::AwaitingChallengeKey,
                HandshakeStep::Send(SoapCommand::display_pin_code(&self.context.device_name)),
            )),

            (Stage::AwaitingChallengeKey, HandshakeEvent::Response(body)) => {
                self.context.tv_nonce =
                    decode_nonce(&body, "X_ChallengeKey").map_err(|e| step_error(STAGE_DISPLAY_PIN, e))?;
                Ok((Stage::PinRequested, HandshakeStep::NeedPin))
            }

            (Stage::PinRequested, HandshakeEvent::PinEntered(pin)) => {
                validate_pin(&pin)?;
                self.context.pin_seed = hkdf::pin_seed(&self.context.device_name, &pin);
                self.context.pin = pin;
                let mut challenge = hkdf::challenge_from_seed(
                    &self.context.pin_seed,
                    &self.context.tv_nonce,
                    &self.context.client_nonce,
                )
                .map_err(|e| step_error(STAGE_REQUEST_AUTH, e.into()))?;
                let auth_info = STANDARD.encode(challenge);
                challenge.zeroize();

                Ok((
                    Stage::AwaitingAuthResult,
                    HandshakeStep::Send(SoapCommand::request_auth(
                        &self.context.device_name,
                        &STANDARD.encode(self.context.client_nonce),
                        &auth_info,
                    )),
                ))
            }

            (Stage::AwaitingAuthResult, HandshakeEvent::Response(body)) => {
                let encoded = xml::element_text(&body, "X_AuthResult")
                    .map_err(|e| step_error(STAGE_REQUEST_AUTH, e.into()))?;
                // The TV seals the confirmation as the first message of the session
                let envelope = Envelope::from_base64(&encoded, 0)
                    .map_err(|e| step_error(STAGE_REQUEST_AUTH, e.into()))?;
                self.confirmation = Some(envelope);
                Ok((Stage::ChallengeExchanged, HandshakeStep::Confirm))
            }

            (Stage::ChallengeExchanged, HandshakeEvent::Confirm) => {
                let (credentials, state) = self.confirm()?;
                Ok((Stage::Authorized, HandshakeStep::Complete(credentials, state)))
            }

            (Stage::AwaitingAuthResult, HandshakeEvent::TransportFailed(Error::Soap(SoapError::Fault { code, description }))) => {
                Err(AuthorizationError::Rejected { code, description })
            }

            (Stage::AwaitingChallengeKey, HandshakeEvent::TransportFailed(e)) => {
                Err(step_error(STAGE_DISPLAY_PIN, e))
            }

            (Stage::AwaitingAuthResult, HandshakeEvent::TransportFailed(e)) => {
                Err(step_error(STAGE_REQUEST_AUTH, e))
            }

            (stage, event) => Err(AuthorizationError::InvalidState(format!(
                "{} not allowed in state {:?}",
                event_name(&event),
                stage.public()
            ))),
        }
    }

    fn confirm(&mut self) -> std::result::Result<(Credentials, SessionState), AuthorizationError> {
        let envelope = self
            .confirmation
            .take()
            .ok_or_else(|| AuthorizationError::InvalidState("no confirmation received".to_string()))?;

        let keys = derive_session_key(&self.context.pin, &self.context.seed_material())
            .map_err(|e| step_error(STAGE_CONFIRM, e.into()))?;

        let plaintext = envelope
            .open(&keys, CONFIRM_HEADER, 0)
            .map_err(|e| match e {
                Error::Crypto(CryptoError::AuthTagMismatch) => AuthorizationError::ConfirmationFailed,
                other => step_error(STAGE_CONFIRM, other),
            })?;

        let text = String::from_utf8(plaintext)
            .map_err(|_| step_error(STAGE_CONFIRM, FramingError::InvalidUtf8("confirmation").into()))?;
        let application_id = xml::element_text(&text, "X_ApplicationId")
            .map_err(|e| step_error(STAGE_CONFIRM, e.into()))?;
        if application_id.is_empty() {
            return Err(step_error(
                STAGE_CONFIRM,
                FramingError::MissingElement("X_ApplicationId".to_string()).into(),
            ));
        }

        tracing::info!(application_id = %application_id, "pairing confirmed");
        let state = SessionState::new(keys, application_id);
        Ok((state.credentials().clone(), state))
    }
}

impl std::fmt::Debug for Handshake {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Handshake")
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

fn step_error(stage: &'static str, source: Error) -> AuthorizationError {
    AuthorizationError::Step {
        stage,
        source: Box::new(source),
    }
}

fn validate_pin(pin: &str) -> std::result::Result<(), AuthorizationError> {
    if pin.is_empty() || !pin.bytes().all(|b| b.is_ascii_digit()) {
        return Err(AuthorizationError::InvalidPin(
            "PIN must be the digits shown on the TV".to_string(),
        ));
    }
    Ok(())
}

fn decode_nonce(body: &str, element: &str) -> Result<[u8; 16]> {
    let encoded = xml::element_text(body, element)?;
    let bytes = STANDARD
        .decode(&encoded)
        .map_err(|_| FramingError::InvalidBase64(element.to_string()))?;
    let nonce: [u8; 16] = bytes
        .as_slice()
        .try_into()
        .map_err(|_| CryptoError::InvalidKeyLength {
            expected: 16,
            actual: bytes.len(),
        })?;
    Ok(nonce)
}

fn event_name(event: &HandshakeEvent) -> &'static str {
    match event {
        HandshakeEvent::Begin => "Begin",
        HandshakeEvent::Response(_) => "Response",
        HandshakeEvent::PinEntered(_) => "PinEntered",
        HandshakeEvent::Confirm => "Confirm",
        HandshakeEvent::TransportFailed(_) => "TransportFailed",
    }
}
