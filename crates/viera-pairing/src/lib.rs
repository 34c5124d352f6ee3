//! # viera-pairing
//!
//! PIN pairing for Viera TVs that require encrypted commands.
//!
//! The handshake is a sans-IO state machine: the caller sends the commands it
//! emits and feeds back the responses, so it can be driven over any transport.

mod handshake;

pub use handshake::{Handshake, HandshakeEvent, HandshakeState, HandshakeStep};
