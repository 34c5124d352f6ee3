//! Remote builder for configuration.

use std::time::Duration;

use viera_core::config::RemoteConfig;
use viera_core::credentials::Credentials;
use viera_soap::{TcpTransport, Transport};

use crate::{RemoteControl, Result};

/// Builder for configuring a [`RemoteControl`].
pub struct RemoteControlBuilder {
    config: RemoteConfig,
    credentials: Option<Credentials>,
}

impl RemoteControlBuilder {
    /// Create new builder with defaults for `host`.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            config: RemoteConfig::new(host),
            credentials: None,
        }
    }

    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    /// Deadline for each exchange (connect, write and read together).
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Name shown on the TV while pairing.
    pub fn device_name(mut self, name: impl Into<String>) -> Self {
        self.config.device_name = name.into();
        self
    }

    /// Mark the TV as one that needs PIN pairing.
    pub fn encrypted(mut self, encrypted: bool) -> Self {
        self.config.encrypted = encrypted;
        self
    }

    /// Start with credentials from an earlier pairing. Implies `encrypted(true)`.
    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.config.encrypted = true;
        self.credentials = Some(credentials);
        self
    }

    pub fn config(&self) -> &RemoteConfig {
        &self.config
    }

    /// Build a remote that talks TCP.
    pub fn build(self) -> Result<RemoteControl<TcpTransport>> {
        let transport = TcpTransport::from_config(&self.config);
        self.build_with_transport(transport)
    }

    /// Build a remote over another transport.
    pub fn build_with_transport<T: Transport>(self, transport: T) -> Result<RemoteControl<T>> {
        let remote = RemoteControl::with_transport(self.config, transport);
        match self.credentials {
            Some(credentials) => remote.with_credentials(&credentials),
            None => Ok(remote),
        }
    }
}
