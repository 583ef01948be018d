//! Wire protocol types for the gateway.
//!
//! Every frame is a JSON text message carrying an integer `op`, and depending
//! on the operation an event name `t`, a payload `d` and a sequence number `s`.

pub mod message;
pub mod opcode;

pub use message::GatewayMessage;
pub use opcode::{ClientOp, OpCode};
