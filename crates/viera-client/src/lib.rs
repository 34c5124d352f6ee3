//! # viera-client
//!
//! High-level remote control for Panasonic Viera TVs.
//!
//! This crate provides:
//! - PIN pairing for TVs that require encrypted commands
//! - Key presses, volume and mute control
//! - Detection of whether a TV needs pairing
//! - Opening a URL in the TV's browser
//!
//! ## Example
//!
//! ```ignore
//! use viera_client::{Key, RemoteControlBuilder};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut remote = RemoteControlBuilder::new("192.168.1.20")
//!         .encrypted(true)
//!         .build()?;
//!
//!     // The TV shows a PIN
//!     remote.request_pin_code().await?;
//!     let credentials = remote.authorize_pin_code("1234").await?;
//!
//!     remote.send_key(Key::Epg).await?;
//!     Ok(())
//! }
//! ```

mod builder;
mod remote;
mod webpage;

pub use builder::RemoteControlBuilder;
pub use remote::{RemoteControl, TvType, MAX_VOLUME};

// Re-export commonly used types
pub use viera_core::{
    Credentials, EncryptionKey, Error, Key, RemoteConfig, Result, DEFAULT_DEVICE_NAME, DEFAULT_PORT,
    DEFAULT_TIMEOUT,
};
pub use viera_soap::{TcpTransport, Transport};
