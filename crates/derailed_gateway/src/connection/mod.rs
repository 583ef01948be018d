//! Connection state and transport management.
//!
//! This module tracks the lifecycle of a single gateway session and opens the
//! underlying WebSocket, directly or through an HTTP proxy.

pub mod state;
pub mod transport;

pub use state::{CloseReason, ConnectionState, SessionEnd};
pub use transport::{GatewayStream, TransportSink, TransportStream};
