//! Connection settings for a single TV.

use std::time::Duration;

/// Default control port of Viera TVs.
pub const DEFAULT_PORT: u16 = 55000;

/// Default per-exchange deadline.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Name shown on the TV while pairing.
pub const DEFAULT_DEVICE_NAME: &str = "viera-remote";

/// Settings for talking to one TV.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteConfig {
    pub host: String,
    pub port: u16,
    /// Deadline covering connect, write and read of one exchange.
    pub timeout: Duration,
    /// Identifies this client during PIN pairing.
    pub device_name: String,
    /// Whether the TV requires PIN pairing and encrypted commands.
    pub encrypted: bool,
}

impl RemoteConfig {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            port: DEFAULT_PORT,
            timeout: DEFAULT_TIMEOUT,
            device_name: DEFAULT_DEVICE_NAME.to_string(),
            encrypted: false,
        }
    }

    /// `host:port`, as used in the HTTP `Host` header.
    pub fn authority(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
