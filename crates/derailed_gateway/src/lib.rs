//! # Derailed Gateway
//!
//! Client for the Derailed real-time gateway: a persistent WebSocket over
//! which the server pushes JSON frames and the client performs a short
//! handshake.
//!
//! ## Session Lifecycle
//!
//! 1. [`Gateway::connect`] opens the transport (directly or through an HTTP
//!    proxy) and spawns the receive task
//! 2. On HELLO the gateway sends identify with the stored token
//! 3. On READY it emits a `"READY"` event and the session becomes usable
//! 4. Every dispatch is emitted on the [`EventBus`] under its event name
//!
//! The receive task is owned by the [`Gateway`]; how it ended is returned by
//! [`Gateway::wait_until_closed`]. Handler failures, malformed frames and
//! out-of-order handshake frames never stop it. They are published on
//! [`Gateway::faults`].

pub mod config;
pub mod connection;
pub mod error;
pub mod gateway;
pub mod protocol;

#[cfg(test)]
mod tests;

pub use config::{GatewayConfig, ProxyConfig};
pub use connection::{CloseReason, ConnectionState, SessionEnd};
pub use error::{GatewayError, SessionFault};
pub use gateway::Gateway;
pub use protocol::{ClientOp, GatewayMessage, OpCode};

pub use derailed_events::{
    EventBus, EventError, EventHandler, GatewayEvent, HandlerFailure, Ready,
};
