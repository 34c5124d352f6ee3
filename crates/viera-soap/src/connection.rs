//! TCP transport: one connection per exchange.

use std::io;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use viera_core::config::{RemoteConfig, DEFAULT_TIMEOUT};
use viera_core::error::{Error, FramingError, Result};

use crate::response::{find_header_end, ResponseHead};
use crate::traits::Transport;

/// Upper bound on response headers before giving up on the terminator.
const MAX_HEADER_LEN: usize = 16 * 1024;

/// Upper bound on a response body.
const MAX_BODY_LEN: usize = 1024 * 1024;

/// HTTP transport to a TV.
///
/// Every `send` opens a fresh connection, writes the request, reads exactly
/// one response and closes. Connect, write and read share one deadline.
#[derive(Debug, Clone)]
pub struct TcpTransport {
    host: String,
    port: u16,
    timeout: Duration,
}

impl TcpTransport {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    pub fn from_config(config: &RemoteConfig) -> Self {
        Self::new(config.host.clone(), config.port).with_timeout(config.timeout)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    async fn exchange(&self, request: &[u8]) -> Result<Vec<u8>> {
        let mut stream = TcpStream::connect((self.host.as_str(), self.port)).await?;
        stream.write_all(request).await?;
        stream.flush().await?;

        let mut data = Vec::with_capacity(1024);
        let mut chunk = [0u8; 4096];

        // Read headers until we see \r\n\r\n
        let header_end = loop {
            if let Some(end) = find_header_end(&data) {
                break end;
            }
            if data.len() > MAX_HEADER_LEN {
                return Err(FramingError::MissingHeaderTerminator.into());
            }

            let n = stream.read(&mut chunk).await?;
            if n == 0 {
                if data.is_empty() {
                    return Err(Error::Connection(io::Error::new(
                        io::ErrorKind::UnexpectedEof,
                        "connection closed before response",
                    )));
                }
                return Err(FramingError::MissingHeaderTerminator.into());
            }
            data.extend_from_slice(&chunk[..n]);
        };

        let head = ResponseHead::parse(&data[..header_end])?;
        let body_start = header_end + 4;

        match head.content_length()? {
            Some(len) => {
                if len > MAX_BODY_LEN {
                    return Err(FramingError::InvalidContentLength(len.to_string()).into());
                }
                let total = body_start + len;
                while data.len() < total {
                    let n = stream.read(&mut chunk).await?;
                    if n == 0 {
                        return Err(FramingError::Truncated {
                            expected: len,
                            actual: data.len() - body_start,
                        }
                        .into());
                    }
                    data.extend_from_slice(&chunk[..n]);
                }
                data.truncate(total);
            }
            None => loop {
                let n = stream.read(&mut chunk).await?;
                if n == 0 {
                    break;
                }
                data.extend_from_slice(&chunk[..n]);
                if data.len() - body_start > MAX_BODY_LEN {
                    return Err(FramingError::InvalidContentLength(format!(
                        "body exceeds {} bytes",
                        MAX_BODY_LEN
                    ))
                    .into());
                }
            },
        }

        tracing::debug!(
            status = head.status_code,
            body_len = data.len() - body_start,
            "HTTP <- {}",
            self.authority()
        );
        Ok(data)
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn send(&mut self, request: Vec<u8>) -> Result<Vec<u8>> {
        tracing::debug!(wire_len = request.len(), "HTTP -> {}", self.authority());
        timeout(self.timeout, self.exchange(&request))
            .await
            .map_err(|_| Error::Timeout)?
    }

    fn authority(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
