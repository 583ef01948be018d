//! Error types and handling for the gateway client.
//!
//! [`GatewayError`] is returned synchronously from the public API
//! (`connect`, `send`, ...). Problems that happen inside the background
//! receive task have no caller to return to, so they are published as
//! [`SessionFault`]s instead.

use crate::connection::ConnectionState;
use derailed_events::HandlerFailure;
use tokio_tungstenite::tungstenite;

/// Errors surfaced to callers of the gateway API.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// `send` (or another session operation) without an open transport
    #[error("Not connected to the gateway")]
    NotConnected,

    /// The authentication token was empty
    #[error("Authentication token must not be empty")]
    EmptyToken,

    /// The configured gateway URI is not a usable WebSocket endpoint
    #[error("Invalid gateway URI: {0}")]
    InvalidUri(String),

    /// The HTTP proxy refused or broke the tunnel
    #[error("Proxy error: {0}")]
    Proxy(String),

    /// WebSocket handshake or frame I/O failed
    #[error("Transport error: {0}")]
    Transport(#[from] tungstenite::Error),

    /// Socket-level failure, e.g. while talking to the proxy
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A message could not be encoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The receive task panicked or was cancelled
    #[error("Session task failed: {0}")]
    SessionTask(String),

    /// The peer did not finish the close handshake in time
    #[error("Gateway did not answer the close within {0:?}")]
    CloseTimeout(std::time::Duration),
}

/// Problem observed by the receive loop.
///
/// Apart from [`SessionFault::Transport`], none of these end the session.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionFault {
    /// A subscribed handler returned an error or panicked
    Handler(HandlerFailure),

    /// A text frame that is not a valid gateway message
    MalformedFrame {
        error: String,
        preview: String,
    },

    /// A frame that is valid but arrived in a state where it makes no sense
    ProtocolViolation {
        op: i64,
        state: ConnectionState,
        detail: String,
    },

    /// Reading from or writing to the transport failed
    Transport(String),
}

impl std::fmt::Display for SessionFault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionFault::Handler(failure) => write!(f, "{failure}"),
            SessionFault::MalformedFrame { error, preview } => {
                write!(f, "malformed frame ({error}): {preview}")
            }
            SessionFault::ProtocolViolation { op, state, detail } => {
                write!(f, "protocol violation: op {op} while {state}: {detail}")
            }
            SessionFault::Transport(error) => write!(f, "transport failure: {error}"),
        }
    }
}
