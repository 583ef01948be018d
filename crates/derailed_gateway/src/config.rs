//! Gateway configuration types.
//!
//! The gateway needs to know where to connect and, optionally, which HTTP
//! proxy to tunnel through. Token storage is the caller's concern.

use crate::error::GatewayError;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use tokio_tungstenite::tungstenite::client::IntoClientRequest;

/// Connection settings for a [`Gateway`](crate::Gateway).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayConfig {
    /// WebSocket endpoint, `ws://` or `wss://`
    pub uri: String,
    /// Optional HTTP proxy to tunnel the connection through
    #[serde(default)]
    pub proxy: Option<ProxyConfig>,
}

/// HTTP proxy reached with a `CONNECT` tunnel.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyConfig {
    /// Proxy hostname or IP address
    pub host: String,
    /// Proxy port
    pub port: u16,
    /// Basic authentication user name
    #[serde(default)]
    pub username: Option<String>,
    /// Basic authentication password
    #[serde(default)]
    pub password: Option<String>,
}

impl GatewayConfig {
    /// Creates a configuration for a direct connection to `uri`.
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: uri.into(),
            proxy: None,
        }
    }

    /// Routes the connection through `proxy`.
    pub fn with_proxy(mut self, proxy: ProxyConfig) -> Self {
        self.proxy = Some(proxy);
        self
    }

    /// Checks that the URI is a WebSocket endpoint with a host.
    pub fn validate(&self) -> Result<(), GatewayError> {
        let request = self
            .uri
            .as_str()
            .into_client_request()
            .map_err(|e| GatewayError::InvalidUri(format!("{}: {e}", self.uri)))?;

        match request.uri().scheme_str() {
            Some("ws") | Some("wss") => {}
            other => {
                return Err(GatewayError::InvalidUri(format!(
                    "{}: unsupported scheme {:?}",
                    self.uri, other
                )))
            }
        }

        if request.uri().host().map_or(true, str::is_empty) {
            return Err(GatewayError::InvalidUri(format!("{}: missing host", self.uri)));
        }

        if let Some(proxy) = &self.proxy {
            if proxy.host.is_empty() {
                return Err(GatewayError::Proxy("proxy host cannot be empty".to_string()));
            }
        }

        Ok(())
    }
}

impl ProxyConfig {
    /// Creates an unauthenticated proxy configuration.
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            username: None,
            password: None,
        }
    }

    /// Adds basic authentication credentials.
    pub fn with_credentials(mut self, username: impl Into<String>, password: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    /// Value for the `Proxy-Authorization: Basic` header, if credentials are set.
    pub fn authorization(&self) -> Option<String> {
        let username = self.username.as_deref()?;
        let password = self.password.as_deref().unwrap_or("");
        Some(STANDARD.encode(format!("{username}:{password}")))
    }
}

impl std::fmt::Debug for ProxyConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProxyConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "[redacted]"))
            .finish()
    }
}
