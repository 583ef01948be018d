//! # Event Traits and Built-in Events
//!
//! This module defines the handler abstraction used by the [`EventBus`](crate::EventBus),
//! the closure adapters that turn plain async functions into handlers, and the typed
//! facade ([`GatewayEvent`]) that lets application code subscribe to a named event
//! with a documented payload shape instead of a raw [`serde_json::Value`].
//!
//! ## Handler Kinds
//!
//! - [`FnEventHandler`]: wraps `Fn(Value) -> impl Future` and receives the payload as-is.
//! - [`TypedEventHandler`]: deserializes the payload into `T` before calling the closure.
//!   A payload that does not match `T` is reported as a handler failure.

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use std::fmt::Debug;
use std::future::Future;
use std::marker::PhantomData;

// ============================================================================
// Handler Traits
// ============================================================================

/// Trait for anything that can receive an emitted event.
///
/// Handlers are stored behind `Arc<dyn EventHandler>` and invoked one at a time,
/// in subscription order, by [`EventBus::emit`](crate::EventBus::emit).
#[async_trait]
pub trait EventHandler: Send + Sync + 'static + Debug {
    /// Handles one emission of the event this handler is subscribed to.
    ///
    /// Returning `Err` does not stop delivery to the remaining handlers; the
    /// error is captured as a [`HandlerFailure`].
    async fn handle(&self, payload: &Value) -> Result<(), EventError>;

    /// Returns a human-readable name for this handler for debugging.
    fn handler_name(&self) -> &str;
}

/// Marker trait for events with a fixed name and a known payload shape.
///
/// Implementors are subscribed with [`EventBus::on`](crate::EventBus::on), which routes
/// emissions of [`GatewayEvent::NAME`] to the handler after deserializing the payload.
///
/// ```rust
/// use derailed_events::GatewayEvent;
/// use serde::Deserialize;
///
/// #[derive(Debug, Deserialize)]
/// struct MessageCreate {
///     id: u64,
/// }
///
/// impl GatewayEvent for MessageCreate {
///     const NAME: &'static str = "MESSAGE_CREATE";
/// }
/// ```
pub trait GatewayEvent: DeserializeOwned + Send + 'static {
    /// Exact, case-sensitive event name this type is delivered under.
    const NAME: &'static str;
}

/// Delivered once per session when the server confirms the identify.
///
/// The payload shape is server-defined, so it is carried through unchanged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Ready {
    pub payload: Value,
}

impl GatewayEvent for Ready {
    const NAME: &'static str = "READY";
}

// ============================================================================
// Closure Adapters
// ============================================================================

/// Handler backed by an async closure receiving the raw payload.
pub struct FnEventHandler<F, Fut> {
    handler: F,
    name: String,
    _phantom: PhantomData<fn() -> Fut>,
}

impl<F, Fut> FnEventHandler<F, Fut>
where
    F: Fn(Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), EventError>> + Send + 'static,
{
    /// Creates a new closure-backed handler.
    pub fn new(name: impl Into<String>, handler: F) -> Self {
        Self {
            handler,
            name: name.into(),
            _phantom: PhantomData,
        }
    }
}

impl<F, Fut> Debug for FnEventHandler<F, Fut> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnEventHandler")
            .field("name", &self.name)
            .finish()
    }
}

#[async_trait]
impl<F, Fut> EventHandler for FnEventHandler<F, Fut>
where
    F: Fn(Value) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), EventError>> + Send + 'static,
{
    async fn handle(&self, payload: &Value) -> Result<(), EventError> {
        (self.handler)(payload.clone()).await
    }

    fn handler_name(&self) -> &str {
        &self.name
    }
}

/// Type-safe wrapper for event handlers.
///
/// Bridges the untyped [`EventHandler`] interface and a closure taking `T`,
/// deserializing each payload before the closure runs.
///
/// # Type Parameters
///
/// * `T` - The payload type this handler processes
/// * `F` - The closure type
/// * `Fut` - The future returned by the closure
pub struct TypedEventHandler<T, F, Fut> {
    handler: F,
    name: String,
    _phantom: PhantomData<fn(T) -> Fut>,
}

impl<T, F, Fut> TypedEventHandler<T, F, Fut>
where
    T: DeserializeOwned + Send + 'static,
    F: Fn(T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), EventError>> + Send + 'static,
{
    /// Creates a new typed event handler.
    ///
    /// # Arguments
    ///
    /// * `name` - Human-readable name for debugging
    /// * `handler` - Function to handle payloads of type `T`
    pub fn new(name: impl Into<String>, handler: F) -> Self {
        Self {
            handler,
            name: name.into(),
            _phantom: PhantomData,
        }
    }
}

impl<T, F, Fut> Debug for TypedEventHandler<T, F, Fut> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypedEventHandler")
            .field("name", &self.name)
            .field("payload_type", &std::any::type_name::<T>())
            .finish()
    }
}

#[async_trait]
impl<T, F, Fut> EventHandler for TypedEventHandler<T, F, Fut>
where
    T: DeserializeOwned + Send + 'static,
    F: Fn(T) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), EventError>> + Send + 'static,
{
    async fn handle(&self, payload: &Value) -> Result<(), EventError> {
        let event = T::deserialize(payload).map_err(|e| {
            tracing::warn!(
                "🟡 Handler '{}' expects '{}' but the payload did not match: {}",
                self.name,
                std::any::type_name::<T>(),
                e
            );
            EventError::Deserialization(e)
        })?;
        (self.handler)(event).await
    }

    fn handler_name(&self) -> &str {
        &self.name
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Record of one handler that failed during an emission.
///
/// Failures never interrupt delivery to the other handlers of the same event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandlerFailure {
    /// Event that was being delivered
    pub event_name: String,
    /// Name of the handler that failed
    pub handler_name: String,
    /// Error or panic message
    pub message: String,
}

impl std::fmt::Display for HandlerFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "handler {} failed on {}: {}",
            self.handler_name, self.event_name, self.message
        )
    }
}

/// Errors that can occur during event bus operations.
#[derive(Debug, thiserror::Error)]
pub enum EventError {
    /// Event names must be non-empty
    #[error("Invalid event name: {0:?}")]
    InvalidEventName(String),
    /// Payload did not match the handler's expected type
    #[error("Deserialization error: {0}")]
    Deserialization(#[from] serde_json::Error),
    /// Handler execution failed during event processing
    #[error("Handler execution error: {0}")]
    HandlerExecution(String),
    #[error("An unexpected error occurred: {0}")]
    Other(String),
}

impl EventError {
    /// Shorthand for a [`EventError::HandlerExecution`] built from any message.
    pub fn handler(message: impl Into<String>) -> Self {
        Self::HandlerExecution(message.into())
    }
}
