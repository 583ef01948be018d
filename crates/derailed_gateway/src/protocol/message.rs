use super::opcode::{ClientOp, OpCode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// A single frame exchanged with the gateway.
///
/// Inbound frames always carry `op` and `s`; `t` is only present on
/// dispatches. Outbound frames carry `op` and usually `d`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GatewayMessage {
    /// Numeric operation code, any JSON integer
    pub op: i64,
    /// Event name, dispatches only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub t: Option<String>,
    /// Payload
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub d: Value,
    /// Sequence number assigned by the server
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub s: Option<u64>,
}

impl GatewayMessage {
    /// Creates a message with the given op code and payload.
    pub fn new(op: i64, d: Value) -> Self {
        Self {
            op,
            t: None,
            d,
            s: None,
        }
    }

    /// The identify request, sent in reply to HELLO.
    pub fn identify(token: &str) -> Self {
        Self::new(ClientOp::Identify.code(), json!({ "token": token }))
    }

    /// A dispatch frame as the server would send it.
    pub fn dispatch(event_name: impl Into<String>, d: Value, s: u64) -> Self {
        Self {
            op: OpCode::DISPATCH,
            t: Some(event_name.into()),
            d,
            s: Some(s),
        }
    }

    /// Sets the sequence number.
    pub fn with_sequence(mut self, s: u64) -> Self {
        self.s = Some(s);
        self
    }

    /// Interprets `op` as an inbound op code.
    pub fn opcode(&self) -> OpCode {
        OpCode::from(self.op)
    }

    /// Decodes a text frame.
    pub fn decode(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Encodes into a text frame.
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
