//! Operation codes.
//!
//! Inbound and outbound operations are kept as separate enums. The server's
//! READY notification and the client's IDENTIFY request share the wire value
//! `1`, but they are two independent operations that travel in opposite
//! directions.

use serde::{Deserialize, Serialize};

/// Operation carried by a frame received from the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "i64", into = "i64")]
pub enum OpCode {
    /// Application event named by `t` with payload `d`
    Dispatch,
    /// The server accepted the identify; the session is usable
    Ready,
    /// Heartbeat acknowledgment
    Ack,
    /// The server invites the client to identify
    Hello,
    /// Any code this client does not know; ignored
    Unknown(i64),
}

impl OpCode {
    pub const DISPATCH: i64 = 0;
    pub const READY: i64 = 1;
    pub const ACK: i64 = 3;
    pub const HELLO: i64 = 4;

    /// Numeric wire value of this op code.
    pub fn code(self) -> i64 {
        match self {
            OpCode::Dispatch => Self::DISPATCH,
            OpCode::Ready => Self::READY,
            OpCode::Ack => Self::ACK,
            OpCode::Hello => Self::HELLO,
            OpCode::Unknown(code) => code,
        }
    }
}

impl From<i64> for OpCode {
    fn from(code: i64) -> Self {
        match code {
            Self::DISPATCH => OpCode::Dispatch,
            Self::READY => OpCode::Ready,
            Self::ACK => OpCode::Ack,
            Self::HELLO => OpCode::Hello,
            other => OpCode::Unknown(other),
        }
    }
}

impl From<OpCode> for i64 {
    fn from(op: OpCode) -> Self {
        op.code()
    }
}

impl std::fmt::Display for OpCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OpCode::Dispatch => write!(f, "DISPATCH"),
            OpCode::Ready => write!(f, "READY"),
            OpCode::Ack => write!(f, "ACK"),
            OpCode::Hello => write!(f, "HELLO"),
            OpCode::Unknown(code) => write!(f, "UNKNOWN({code})"),
        }
    }
}

/// Operation sent by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClientOp {
    /// Authenticate the session with a token, in reply to HELLO
    Identify,
}

impl ClientOp {
    /// Numeric wire value of this operation.
    pub fn code(self) -> i64 {
        match self {
            ClientOp::Identify => 1,
        }
    }
}
