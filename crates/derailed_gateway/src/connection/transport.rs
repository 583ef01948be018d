//! WebSocket transport setup.
//!
//! Direct connections use `connect_async`. Proxied connections first open an
//! HTTP `CONNECT` tunnel to the gateway host and then run the WebSocket (and
//! TLS, for `wss://`) handshake over that tunnel.

use crate::config::{GatewayConfig, ProxyConfig};
use crate::error::GatewayError;
use futures::{Sink, Stream};
use std::pin::Pin;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::{self, http::Uri, Message};
use tokio_tungstenite::{client_async_tls, connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, info};

/// Upper bound on the proxy's CONNECT response head.
const MAX_PROXY_RESPONSE_BYTES: usize = 8 * 1024;

/// WebSocket stream produced by [`open`].
pub type GatewayStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Outbound half of a session transport.
pub type TransportSink = Pin<Box<dyn Sink<Message, Error = tungstenite::Error> + Send>>;

/// Inbound half of a session transport.
pub type TransportStream = Pin<Box<dyn Stream<Item = Result<Message, tungstenite::Error>> + Send>>;

/// Opens the WebSocket described by `config`.
pub async fn open(config: &GatewayConfig) -> Result<GatewayStream, GatewayError> {
    config.validate()?;

    let request = config
        .uri
        .as_str()
        .into_client_request()
        .map_err(|e| GatewayError::InvalidUri(format!("{}: {e}", config.uri)))?;

    match &config.proxy {
        None => {
            let (stream, response) = connect_async(request).await?;
            debug!("🔌 WebSocket handshake with {} returned {}", config.uri, response.status());
            Ok(stream)
        }
        Some(proxy) => {
            let (host, port) = target_authority(request.uri())?;
            let tunnel = open_tunnel(proxy, &host, port).await?;
            info!("🔀 Tunnel to {}:{} open via proxy {}:{}", host, port, proxy.host, proxy.port);

            let (stream, response) = client_async_tls(request, tunnel).await?;
            debug!("🔌 WebSocket handshake with {} returned {}", config.uri, response.status());
            Ok(stream)
        }
    }
}

fn target_authority(uri: &Uri) -> Result<(String, u16), GatewayError> {
    let host = uri
        .host()
        .filter(|host| !host.is_empty())
        .ok_or_else(|| GatewayError::InvalidUri(format!("{uri}: missing host")))?;

    let port = uri.port_u16().unwrap_or(match uri.scheme_str() {
        Some("wss") => 443,
        _ => 80,
    });

    Ok((host.to_string(), port))
}

/// Asks `proxy` for a raw TCP tunnel to `host:port`.
///
/// The response head is read byte by byte so nothing past the blank line is
/// consumed; those bytes belong to the handshake that follows.
async fn open_tunnel(proxy: &ProxyConfig, host: &str, port: u16) -> Result<TcpStream, GatewayError> {
    let mut stream = TcpStream::connect((proxy.host.as_str(), proxy.port)).await?;

    let mut request = format!("CONNECT {host}:{port} HTTP/1.1\r\nHost: {host}:{port}\r\n");
    if let Some(credentials) = proxy.authorization() {
        request.push_str(&format!("Proxy-Authorization: Basic {credentials}\r\n"));
    }
    request.push_str("\r\n");
    stream.write_all(request.as_bytes()).await?;

    let mut head = Vec::with_capacity(256);
    let mut byte = [0u8; 1];
    while !head.ends_with(b"\r\n\r\n") {
        if stream.read(&mut byte).await? == 0 {
            return Err(GatewayError::Proxy(
                "proxy closed the connection during CONNECT".to_string(),
            ));
        }
        head.push(byte[0]);
        if head.len() > MAX_PROXY_RESPONSE_BYTES {
            return Err(GatewayError::Proxy("proxy response head too large".to_string()));
        }
    }

    let head = String::from_utf8_lossy(&head);
    let status_line = head.lines().next().unwrap_or_default();
    let status = status_line
        .split_whitespace()
        .nth(1)
        .and_then(|code| code.parse::<u16>().ok())
        .ok_or_else(|| GatewayError::Proxy(format!("malformed proxy response: {status_line:?}")))?;

    if !(200..300).contains(&status) {
        return Err(GatewayError::Proxy(format!("proxy refused CONNECT: {status_line}")));
    }

    Ok(stream)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_ports_follow_scheme() {
        let plain: Uri = "ws://gateway.local/ws".parse().unwrap();
        let secure: Uri = "wss://gateway.local".parse().unwrap();
        let explicit: Uri = "ws://gateway.local:9000".parse().unwrap();

        assert_eq!(target_authority(&plain).unwrap(), ("gateway.local".to_string(), 80));
        assert_eq!(target_authority(&secure).unwrap(), ("gateway.local".to_string(), 443));
        assert_eq!(target_authority(&explicit).unwrap(), ("gateway.local".to_string(), 9000));
    }
}
