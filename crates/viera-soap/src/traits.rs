//! Traits for transport abstraction.

use async_trait::async_trait;
use viera_core::error::Result;

/// Request/response transport to one TV.
///
/// `send` takes a fully framed HTTP request and returns one fully framed
/// response. Implementations never retry.
#[async_trait]
#[cfg_attr(test, mockall::automock)]
pub trait Transport: Send + Sync {
    /// Send one request and read its response.
    async fn send(&mut self, request: Vec<u8>) -> Result<Vec<u8>>;

    /// `host:port` used in the `Host` header.
    fn authority(&self) -> String;
}
