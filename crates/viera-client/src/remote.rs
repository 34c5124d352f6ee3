//! Remote-control API for one TV.

use viera_core::config::RemoteConfig;
use viera_core::credentials::Credentials;
use viera_core::error::{AuthorizationError, Error, FramingError, Result, SoapError};
use viera_core::keys::Key;
use viera_crypto::state::SessionState;
use viera_pairing::{Handshake, HandshakeEvent, HandshakeStep};
use tokio::net::TcpListener;
use viera_soap::{exchange, xml, HttpRequest, Session, SoapCommand, TcpTransport, Transport, PATH_NRC_DESCRIPTION};

use crate::webpage;

/// Highest volume the TV accepts.
pub const MAX_VOLUME: u8 = 100;

/// Whether a TV takes plain commands or needs PIN pairing first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TvType {
    Plain,
    Encrypted,
}

/// Remote control for one Viera TV.
///
/// Plain TVs are usable right away. Encrypted TVs need either a PIN pairing
/// (`request_pin_code` then `authorize_pin_code`) or previously issued
/// credentials (`load_credentials`) before any command goes out.
pub struct RemoteControl<T: Transport = TcpTransport> {
    config: RemoteConfig,
    transport: T,
    session: Option<Session>,
    pairing: Option<Handshake>,
}

impl RemoteControl<TcpTransport> {
    /// Remote over TCP with the settings in `config`.
    pub fn new(config: RemoteConfig) -> Self {
        let transport = TcpTransport::from_config(&config);
        Self::with_transport(config, transport)
    }
}

impl<T: Transport> RemoteControl<T> {
    /// Remote over a caller-supplied transport.
    pub fn with_transport(config: RemoteConfig, transport: T) -> Self {
        let session = if config.encrypted {
            None
        } else {
            Some(Session::plain())
        };
        Self {
            config,
            transport,
            session,
            pairing: None,
        }
    }

    /// Use credentials from an earlier pairing.
    pub fn with_credentials(mut self, credentials: &Credentials) -> Result<Self> {
        self.load_credentials(credentials)?;
        Ok(self)
    }

    /// Replace the current session with one built from `credentials`.
    ///
    /// Sequence counters restart at zero. This is also how a poisoned
    /// session is recovered.
    pub fn load_credentials(&mut self, credentials: &Credentials) -> Result<()> {
        let state = SessionState::from_credentials(credentials)?;
        tracing::info!(application_id = %credentials.application_id(), "credentials loaded");
        self.session = Some(Session::encrypted(state));
        self.config.encrypted = true;
        Ok(())
    }

    pub fn config(&self) -> &RemoteConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// Credentials of the encrypted session, if one is installed.
    pub fn credentials(&self) -> Option<&Credentials> {
        self.session.as_ref().and_then(Session::credentials)
    }

    pub fn is_encrypted(&self) -> bool {
        self.config.encrypted
    }

    // Pairing

    /// Ask the TV to display a PIN and wait for `authorize_pin_code`.
    ///
    /// Starts a fresh handshake; any attempt already in progress is dropped.
    pub async fn request_pin_code(&mut self) -> Result<()> {
        self.pairing = None;
        let mut handshake = Handshake::new(self.config.device_name.clone());

        let step = handshake.advance(HandshakeEvent::Begin)?;
        match drive(&mut self.transport, &mut handshake, step).await? {
            HandshakeStep::NeedPin => {
                tracing::info!(host = %self.config.host, "TV is showing a PIN");
                self.pairing = Some(handshake);
                Ok(())
            }
            other => Err(unexpected_step(other)),
        }
    }

    /// Finish pairing with the PIN shown on the TV.
    ///
    /// On success the remote switches to an encrypted session. The returned
    /// credentials can be stored and passed to `load_credentials` later.
    pub async fn authorize_pin_code(&mut self, pin: &str) -> Result<Credentials> {
        let mut handshake = self.pairing.take().ok_or_else(|| {
            AuthorizationError::InvalidState("no PIN has been requested".to_string())
        })?;

        let step = handshake.advance(HandshakeEvent::PinEntered(pin.to_string()))?;
        let step = match drive(&mut self.transport, &mut handshake, step).await? {
            HandshakeStep::Confirm => handshake.advance(HandshakeEvent::Confirm)?,
            other => return Err(unexpected_step(other)),
        };

        match step {
            HandshakeStep::Complete(credentials, state) => {
                self.session = Some(Session::encrypted(state));
                self.config.encrypted = true;
                Ok(credentials)
            }
            other => Err(unexpected_step(other)),
        }
    }

    // Commands

    /// Run one SOAP command through the current session.
    pub async fn call(&mut self, command: &SoapCommand) -> Result<String> {
        let session = self.session.as_mut().ok_or(Error::EncryptionRequired)?;
        session.call(&mut self.transport, command).await
    }

    pub async fn send_key(&mut self, key: Key) -> Result<()> {
        self.send_key_code(key.code()).await
    }

    /// Send a raw `NRC_*-ONOFF` code, for keys missing from [`Key`].
    pub async fn send_key_code(&mut self, code: &str) -> Result<()> {
        if code.trim().is_empty() {
            return Err(Error::InvalidArgument("key code must not be empty".to_string()));
        }
        tracing::debug!(key = code, "send key");
        self.call(&SoapCommand::send_key(code)).await?;
        Ok(())
    }

    pub async fn get_volume(&mut self) -> Result<u8> {
        let body = self.call(&SoapCommand::get_volume()).await?;
        let text = xml::element_text(&body, "CurrentVolume")?;
        text.trim().parse::<u8>().map_err(|_| {
            FramingError::InvalidValue {
                element: "CurrentVolume".to_string(),
                value: text.clone(),
            }
            .into()
        })
    }

    /// Set the volume. Values above [`MAX_VOLUME`] are rejected before any I/O.
    pub async fn set_volume(&mut self, volume: u8) -> Result<()> {
        if volume > MAX_VOLUME {
            return Err(Error::InvalidArgument(format!(
                "volume must be between 0 and {}, got {}",
                MAX_VOLUME, volume
            )));
        }
        self.call(&SoapCommand::set_volume(volume)).await?;
        Ok(())
    }

    pub async fn get_mute(&mut self) -> Result<bool> {
        let body = self.call(&SoapCommand::get_mute()).await?;
        let text = xml::element_text(&body, "CurrentMute")?;
        Ok(text.trim() != "0")
    }

    pub async fn set_mute(&mut self, enable: bool) -> Result<()> {
        self.call(&SoapCommand::set_mute(enable)).await?;
        Ok(())
    }

    pub async fn turn_off(&mut self) -> Result<()> {
        self.send_key(Key::Power).await
    }

    pub async fn volume_up(&mut self) -> Result<()> {
        self.send_key(Key::VolumeUp).await
    }

    pub async fn volume_down(&mut self) -> Result<()> {
        self.send_key(Key::VolumeDown).await
    }

    pub async fn mute_volume(&mut self) -> Result<()> {
        self.send_key(Key::Mute).await
    }

    pub async fn media_play(&mut self) -> Result<()> {
        self.send_key(Key::Play).await
    }

    pub async fn media_pause(&mut self) -> Result<()> {
        self.send_key(Key::Pause).await
    }

    pub async fn media_next_track(&mut self) -> Result<()> {
        self.send_key(Key::FastForward).await
    }

    pub async fn media_previous_track(&mut self) -> Result<()> {
        self.send_key(Key::Rewind).await
    }

    /// Open `url` in the TV's web browser.
    ///
    /// Launches the browser, asks it to connect back to a listener on the
    /// interface that routes to the TV, and hands it the URL there. Both
    /// SOAP calls go through the session, so this works on paired TVs too.
    /// The URL must be at most 255 bytes.
    pub async fn open_webpage(&mut self, url: &str) -> Result<()> {
        let packet = webpage::url_packet(url)?;

        let body = self
            .call(&SoapCommand::launch_app(
                webpage::BROWSER_APP_TYPE,
                webpage::BROWSER_LAUNCH_KEYWORD,
            ))
            .await?;
        let session_id = xml::element_text(&body, "X_SessionId")?;

        let ip = webpage::local_ip(&self.config).await;
        let listener = TcpListener::bind((ip, 0)).await?;
        let connect_addr = listener.local_addr()?;
        tracing::debug!(%connect_addr, session_id = %session_id, "browser launched");

        self.call(&SoapCommand::connect_app(
            webpage::BROWSER_APP_TYPE,
            &session_id,
            webpage::CONNECT_KEYWORD,
            &connect_addr.to_string(),
        ))
        .await?;

        webpage::serve_url(listener, &packet, self.config.timeout).await
    }

    /// Fetch the NRC service description and check for the pairing action.
    ///
    /// Does not touch the session, so it works before pairing.
    pub async fn detect_tv_type(&mut self) -> Result<TvType> {
        let response = exchange(&mut self.transport, &HttpRequest::get(PATH_NRC_DESCRIPTION)).await?;
        if !response.is_success() {
            return Err(SoapError::UnexpectedStatus(response.status_code).into());
        }
        let tv_type = if response.body_text()?.contains("X_DisplayPinCode") {
            TvType::Encrypted
        } else {
            TvType::Plain
        };
        tracing::debug!(?tv_type, "detected TV type");
        Ok(tv_type)
    }
}

impl<T: Transport> std::fmt::Debug for RemoteControl<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteControl")
            .field("config", &self.config)
            .field("session", &self.session)
            .field("pairing", &self.pairing.is_some())
            .finish_non_exhaustive()
    }
}

/// Send every command the handshake asks for until it wants something else.
async fn drive<T: Transport + ?Sized>(
    transport: &mut T,
    handshake: &mut Handshake,
    mut step: HandshakeStep,
) -> Result<HandshakeStep> {
    loop {
        let command = match step {
            HandshakeStep::Send(command) => command,
            other => return Ok(other),
        };
        tracing::debug!(action = %command.action, "pairing step");
        let event = match exchange(transport, &command.to_request()).await {
            Ok(response) => match response.into_soap_body() {
                Ok(body) => HandshakeEvent::Response(body),
                Err(e) => HandshakeEvent::TransportFailed(e),
            },
            Err(e) => HandshakeEvent::TransportFailed(e),
        };
        step = handshake.advance(event)?;
    }
}

fn unexpected_step(step: HandshakeStep) -> Error {
    AuthorizationError::InvalidState(format!("unexpected handshake step: {:?}", step)).into()
}
