//! # viera-soap
//!
//! SOAP-over-HTTP plumbing for Panasonic Viera TVs.
//!
//! This crate provides:
//! - HTTP request framing and response delimiting
//! - SOAP command bodies and fault parsing
//! - A TCP transport with a per-exchange deadline
//! - The session layer that seals and verifies encrypted commands

mod connection;
mod request;
mod response;
mod session;
mod traits;
pub mod xml;

pub use connection::TcpTransport;
pub use request::{
    soap_envelope, HttpMethod, HttpRequest, SoapCommand, PATH_CONTROL_DMR, PATH_CONTROL_NRC,
    PATH_NRC_DESCRIPTION, URN_REMOTE_CONTROL, URN_RENDERING_CONTROL,
};
pub use response::{parse_fault, HttpResponse};
pub use session::{exchange, Session};
pub use traits::Transport;
