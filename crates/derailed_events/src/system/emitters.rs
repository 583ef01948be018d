/// Event emission methods
use crate::events::HandlerFailure;
use super::core::EventBus;
use futures::FutureExt;
use serde_json::Value;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use tracing::{debug, error, trace};

impl EventBus {
    /// Delivers `payload` to every handler subscribed to `event_name`.
    ///
    /// Handlers run sequentially in subscription order, each awaited to
    /// completion before the next starts. Only the handlers registered when
    /// the emission begins are invoked.
    ///
    /// Emitting a name with no subscribers is a no-op. A handler that returns
    /// an error or panics does not stop delivery; every such failure is logged
    /// and returned in invocation order.
    ///
    /// # Arguments
    ///
    /// * `event_name` - Name the handlers were subscribed under, e.g. `"READY"`
    /// * `payload` - Event payload, passed by reference to each handler
    ///
    /// # Returns
    ///
    /// One [`HandlerFailure`] per handler that failed, empty when all of them
    /// succeeded or nobody was subscribed.
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use derailed_events::EventBus;
    /// use serde_json::json;
    ///
    /// async fn example() {
    ///     let events = EventBus::new();
    ///     let failures = events.emit("MESSAGE_CREATE", &json!({"id": 42})).await;
    ///     assert!(failures.is_empty());
    /// }
    /// ```
    pub async fn emit(&self, event_name: &str, payload: &Value) -> Vec<HandlerFailure> {
        // Snapshot, so the map guard is released before any handler runs
        let event_handlers = self
            .handlers
            .get(event_name)
            .map(|entry| entry.value().clone());

        let Some(event_handlers) = event_handlers else {
            trace!("No subscribers for event: {}", event_name);
            self.stats.write().await.unobserved_events += 1;
            return Vec::new();
        };

        debug!("📤 Emitting {} to {} handlers", event_name, event_handlers.len());

        let mut failures = Vec::new();
        for handler in event_handlers.iter() {
            let outcome = AssertUnwindSafe(handler.handle(payload)).catch_unwind().await;

            let message = match outcome {
                Ok(Ok(())) => continue,
                Ok(Err(e)) => e.to_string(),
                Err(panic) => format!("handler panicked: {}", panic_message(panic.as_ref())),
            };

            error!("❌ Handler {} failed on {}: {}", handler.handler_name(), event_name, message);
            failures.push(HandlerFailure {
                event_name: event_name.to_string(),
                handler_name: handler.handler_name().to_string(),
                message,
            });
        }

        let mut stats = self.stats.write().await;
        stats.events_emitted += 1;
        stats.handler_failures += failures.len() as u64;

        failures
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string panic payload"
    }
}
