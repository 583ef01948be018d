//! Session lifecycle types.

use serde::{Deserialize, Serialize};
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use uuid::Uuid;

/// Coarse handshake state of a gateway connection.
///
/// ```text
/// Disconnected --connect--> AwaitingHello --HELLO/identify--> AwaitingReady --READY--> Ready
///       ^                                                                               |
///       +--------------------------- transport closed ----------------------------------+
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConnectionState {
    /// No transport is open
    Disconnected,
    /// Transport open, waiting for the server's HELLO
    AwaitingHello,
    /// Identify sent, waiting for READY
    AwaitingReady,
    /// Handshake complete; dispatches and acks keep flowing
    Ready,
}

impl Default for ConnectionState {
    fn default() -> Self {
        ConnectionState::Disconnected
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::AwaitingHello => "awaiting hello",
            ConnectionState::AwaitingReady => "awaiting ready",
            ConnectionState::Ready => "ready",
        };
        f.write_str(name)
    }
}

/// Per-session data, replaced wholesale on every `connect`.
#[derive(Debug, Clone)]
pub(crate) struct SessionState {
    pub(crate) session_id: Uuid,
    pub(crate) token: String,
    /// Last `s` seen; last write wins
    pub(crate) sequence: Option<u64>,
    pub(crate) ack_received: bool,
}

impl SessionState {
    pub(crate) fn new(session_id: Uuid, token: &str) -> Self {
        Self {
            session_id,
            token: token.to_string(),
            sequence: None,
            ack_received: false,
        }
    }
}

/// Why a session's receive loop stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseReason {
    /// A Close frame was received
    ClosedByPeer { code: Option<u16>, reason: String },
    /// The stream ended without a Close frame
    StreamEnded,
    /// Reading from the transport failed
    TransportError(String),
}

impl From<Option<CloseFrame>> for CloseReason {
    fn from(frame: Option<CloseFrame>) -> Self {
        match frame {
            Some(frame) => CloseReason::ClosedByPeer {
                code: Some(u16::from(frame.code)),
                reason: frame.reason.as_str().to_string(),
            },
            None => CloseReason::ClosedByPeer {
                code: None,
                reason: String::new(),
            },
        }
    }
}

/// Result of a finished receive task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionEnd {
    /// Session this result belongs to
    pub session_id: Uuid,
    /// Why the loop stopped
    pub reason: CloseReason,
    /// Last sequence number observed
    pub last_sequence: Option<u64>,
    /// Text frames processed, including malformed ones
    pub frames_processed: u64,
}
