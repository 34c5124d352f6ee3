//! Session layer: plain or encrypted SOAP calls.

use viera_core::credentials::Credentials;
use viera_core::error::{Error, FramingError, Result};
use viera_crypto::envelope::Envelope;
use viera_crypto::state::SessionState;

use crate::request::{HttpRequest, SoapCommand};
use crate::response::HttpResponse;
use crate::traits::Transport;
use crate::xml;

/// Send one request and parse the response.
pub async fn exchange<T: Transport + ?Sized>(
    transport: &mut T,
    request: &HttpRequest,
) -> Result<HttpResponse> {
    let wire = request.serialize(&transport.authority());
    tracing::debug!(
        "HTTP -> {} /{} (body_len={})",
        request.method.as_str(),
        request.path,
        request.body.as_ref().map(|b| b.len()).unwrap_or(0)
    );
    let data = transport.send(wire).await?;
    Ok(HttpResponse::parse(&data)?)
}

/// How commands reach the TV.
#[derive(Debug)]
enum Mode {
    /// Legacy TVs: commands go out as-is.
    Plain,
    /// Paired TVs: every command is sealed in an envelope.
    Encrypted(SessionState),
}

/// One logical session with a TV.
///
/// `call` takes `&mut self`, so calls on one session never overlap and the
/// sequence counters see one exchange at a time.
#[derive(Debug)]
pub struct Session {
    mode: Mode,
    poisoned: bool,
}

impl Session {
    pub fn plain() -> Self {
        Self {
            mode: Mode::Plain,
            poisoned: false,
        }
    }

    pub fn encrypted(state: SessionState) -> Self {
        Self {
            mode: Mode::Encrypted(state),
            poisoned: false,
        }
    }

    pub fn is_encrypted(&self) -> bool {
        matches!(self.mode, Mode::Encrypted(_))
    }

    /// True once an integrity failure has made the session unusable.
    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    pub fn state(&self) -> Option<&SessionState> {
        match &self.mode {
            Mode::Encrypted(state) => Some(state),
            Mode::Plain => None,
        }
    }

    pub fn credentials(&self) -> Option<&Credentials> {
        self.state().map(SessionState::credentials)
    }

    /// Run one command and return the response body.
    ///
    /// In encrypted mode the returned text is the decrypted inner response.
    /// A crypto, sequence or framing failure on the response poisons the
    /// session; every later call then fails with `SessionPoisoned`.
    pub async fn call<T: Transport + ?Sized>(
        &mut self,
        transport: &mut T,
        command: &SoapCommand,
    ) -> Result<String> {
        if self.poisoned {
            return Err(Error::SessionPoisoned);
        }

        match &mut self.mode {
            Mode::Plain => {
                tracing::debug!(action = %command.action, "plain call");
                exchange(transport, &command.to_request())
                    .await?
                    .into_soap_body()
            }
            Mode::Encrypted(state) => {
                let result = call_encrypted(state, transport, command).await;
                if let Err(ref e) = result {
                    if e.is_session_fatal() || matches!(e, Error::Framing(_)) {
                        tracing::warn!(action = %command.action, "session poisoned: {}", e);
                        self.poisoned = true;
                    }
                }
                result
            }
        }
    }
}

async fn call_encrypted<T: Transport + ?Sized>(
    state: &mut SessionState,
    transport: &mut T,
    command: &SoapCommand,
) -> Result<String> {
    let plaintext = format!(
        "<X_OriginalCommand>{}</X_OriginalCommand>",
        command.action_xml()
    );
    let sequence = state.outbound_sequence();
    let envelope = state.seal_request(plaintext.as_bytes())?;
    let wrapper =
        SoapCommand::encrypted_command(state.application_id(), sequence, &envelope.to_base64());

    tracing::debug!(
        action = %command.action,
        sequence,
        payload_len = plaintext.len(),
        "encrypted call"
    );

    let request = wrapper.to_request();
    let wire = request.serialize(&transport.authority());

    // Counters stay put if the request never completed
    let data = transport.send(wire).await?;
    state.advance_outbound()?;

    let body = HttpResponse::parse(&data)?.into_soap_body()?;
    let response_sequence = xml::element_text(&body, "X_SequenceNumber")?;
    let response_sequence = response_sequence
        .parse::<u32>()
        .map_err(|_| FramingError::InvalidValue {
            element: "X_SequenceNumber".to_string(),
            value: response_sequence.clone(),
        })?;
    let encoded = xml::element_text(&body, "X_EncResult")?;
    let response = Envelope::from_base64(&encoded, response_sequence)?;

    let decrypted = state.open_response(&response)?;
    state.advance_inbound()?;

    tracing::debug!(
        outbound = state.outbound_sequence(),
        inbound = state.inbound_sequence(),
        "encrypted response verified"
    );

    String::from_utf8(decrypted).map_err(|_| FramingError::InvalidUtf8("decrypted response").into())
}
