//! Opening a URL in the TV's web browser.
//!
//! The browser is launched over SOAP, then asked to connect back to a
//! listener on this host. The first packet it reads there carries the URL:
//!
//! ```text
//! f4 01 01 00 00 00 00 <len> <url bytes> 00
//! ```

use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, UdpSocket};
use tokio::time::timeout;
use viera_core::config::RemoteConfig;
use viera_core::error::{Error, Result};

/// Application type of the TV browser.
pub const BROWSER_APP_TYPE: &str = "vc_app";

/// Launch keyword selecting the browser.
pub const BROWSER_LAUNCH_KEYWORD: &str = "resource_id=1063";

/// Identifies this client when the browser connects back.
pub const CONNECT_KEYWORD: &str = concat!("viera-remote ", env!("CARGO_PKG_VERSION"));

const URL_PACKET_HEADER: [u8; 7] = [0xf4, 0x01, 0x01, 0x00, 0x00, 0x00, 0x00];

/// Frame `url` for the browser. The length field is one byte.
pub fn url_packet(url: &str) -> Result<Vec<u8>> {
    if url.is_empty() {
        return Err(Error::InvalidArgument("URL must not be empty".to_string()));
    }
    let len = u8::try_from(url.len()).map_err(|_| {
        Error::InvalidArgument(format!("URL is {} bytes, at most 255 allowed", url.len()))
    })?;

    let mut packet = Vec::with_capacity(URL_PACKET_HEADER.len() + url.len() + 2);
    packet.extend_from_slice(&URL_PACKET_HEADER);
    packet.push(len);
    packet.extend_from_slice(url.as_bytes());
    packet.push(0x00);
    Ok(packet)
}

/// Address of the local interface that routes to the TV.
///
/// Connecting a UDP socket sends nothing; it only picks the route. Falls back
/// to loopback when no route is found.
pub async fn local_ip(config: &RemoteConfig) -> IpAddr {
    let probe = async {
        let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)).await?;
        socket.connect(config.authority()).await?;
        socket.local_addr()
    };
    match probe.await {
        Ok(addr) => addr.ip(),
        Err(e) => {
            tracing::warn!(host = %config.host, "no route to TV, advertising loopback: {}", e);
            IpAddr::V4(Ipv4Addr::LOCALHOST)
        }
    }
}

/// Wait for the browser to connect, hand it `packet` and close.
pub async fn serve_url(listener: TcpListener, packet: &[u8], deadline: Duration) -> Result<()> {
    let (mut stream, peer) = timeout(deadline, listener.accept())
        .await
        .map_err(|_| Error::Timeout)??;
    tracing::debug!(%peer, "browser connected");

    stream.write_all(packet).await?;
    stream.shutdown().await?;
    Ok(())
}
