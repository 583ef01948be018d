//! # Derailed Event Bus
//!
//! An in-process publish/subscribe registry that decouples protocol-level
//! message routing in the gateway from application-level event handling.
//!
//! ## Delivery Guarantees
//!
//! - **Exact names**: event names are case-sensitive and matched exactly
//! - **Ordered**: handlers run one at a time, in subscription order
//! - **Snapshot**: an emission only reaches handlers registered before it began
//! - **Isolated**: a handler that errors or panics is reported, never fatal
//!
//! ## Quick Start Example
//!
//! ```rust,no_run
//! use derailed_events::{EventBus, GatewayEvent, Ready};
//! use serde::Deserialize;
//!
//! #[derive(Debug, Deserialize)]
//! struct MessageCreate {
//!     id: u64,
//! }
//!
//! impl GatewayEvent for MessageCreate {
//!     const NAME: &'static str = "MESSAGE_CREATE";
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let events = EventBus::new();
//!
//!     events.on(|ready: Ready| async move {
//!         println!("session ready: {}", ready.payload);
//!         Ok(())
//!     }).await?;
//!
//!     events.on(|message: MessageCreate| async move {
//!         println!("message {} created", message.id);
//!         Ok(())
//!     }).await?;
//!
//!     let failures = events.emit("MESSAGE_CREATE", &serde_json::json!({"id": 42})).await;
//!     assert!(failures.is_empty());
//!     Ok(())
//! }
//! ```

pub mod events;
pub mod system;

pub use events::{
    EventError, EventHandler, FnEventHandler, GatewayEvent, HandlerFailure, Ready,
    TypedEventHandler,
};
pub use system::{EventBus, EventBusStats};
