/// Event handler registration methods
use crate::events::{EventError, EventHandler, FnEventHandler, GatewayEvent, TypedEventHandler};
use super::core::EventBus;
use compact_str::CompactString;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use tracing::debug;

impl EventBus {
    /// Subscribes an async closure to `event_name`, receiving the raw payload.
    ///
    /// The closure is appended after any existing handlers for the same name.
    /// Subscribing the same logic twice registers it twice, and it will run
    /// twice per emission.
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use derailed_events::{EventBus, EventError};
    ///
    /// async fn example() -> Result<(), EventError> {
    ///     let events = EventBus::new();
    ///     events.subscribe("MESSAGE_CREATE", |payload| async move {
    ///         println!("new message: {payload}");
    ///         Ok(())
    ///     }).await?;
    ///     Ok(())
    /// }
    /// ```
    pub async fn subscribe<F, Fut>(&self, event_name: &str, handler: F) -> Result<(), EventError>
    where
        F: Fn(Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), EventError>> + Send + 'static,
    {
        let name = self.next_handler_name(event_name);
        self.subscribe_handler(event_name, Arc::new(FnEventHandler::new(name, handler)))
            .await
    }

    /// Subscribes a typed handler to the event's fixed [`GatewayEvent::NAME`].
    ///
    /// Payloads that fail to deserialize into `E` are reported as handler
    /// failures by [`EventBus::emit`].
    pub async fn on<E, F, Fut>(&self, handler: F) -> Result<(), EventError>
    where
        E: GatewayEvent,
        F: Fn(E) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), EventError>> + Send + 'static,
    {
        self.on_named::<E, F, Fut>(E::NAME, handler).await
    }

    /// Subscribes a handler with a typed payload to an arbitrary event name.
    pub async fn on_named<T, F, Fut>(&self, event_name: &str, handler: F) -> Result<(), EventError>
    where
        T: DeserializeOwned + Send + 'static,
        F: Fn(T) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), EventError>> + Send + 'static,
    {
        let name = self.next_handler_name(event_name);
        self.subscribe_handler(event_name, Arc::new(TypedEventHandler::new(name, handler)))
            .await
    }

    /// Appends an already-constructed handler to the list for `event_name`,
    /// creating the list if absent.
    ///
    /// # Arguments
    ///
    /// * `event_name` - Event to subscribe to, must not be empty
    /// * `handler` - Handler invoked on every emission of `event_name`
    ///
    /// # Returns
    ///
    /// `Ok(())` once registered, or [`EventError::InvalidEventName`] for an
    /// empty name.
    pub async fn subscribe_handler(
        &self,
        event_name: &str,
        handler: Arc<dyn EventHandler>,
    ) -> Result<(), EventError> {
        if event_name.is_empty() {
            return Err(EventError::InvalidEventName(event_name.to_string()));
        }

        debug!("📝 Subscribing {} to {}", handler.handler_name(), event_name);
        self.handlers
            .entry(CompactString::new(event_name))
            .or_default()
            .push(handler);

        let mut stats = self.stats.write().await;
        stats.total_handlers += 1;
        Ok(())
    }

    fn next_handler_name(&self, event_name: &str) -> String {
        format!("{}#{}", event_name, self.handler_count(event_name))
    }
}
