/// Core EventBus implementation
use crate::events::EventHandler;
use super::stats::EventBusStats;
use compact_str::CompactString;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// The in-process publish/subscribe registry for gateway events.
///
/// Maps exact, case-sensitive event names to the ordered list of handlers
/// subscribed to them. Entries are only ever appended, so an emission reads a
/// snapshot of the list without blocking subscribers.
///
/// Uses DashMap so emissions running on the gateway's receive task never
/// contend with application code subscribing from another task.
pub struct EventBus {
    /// Event name -> handlers in subscription order
    pub(super) handlers: DashMap<CompactString, Vec<Arc<dyn EventHandler>>>,
    /// Delivery statistics
    pub(super) stats: RwLock<EventBusStats>,
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("events", &self.handlers.len())
            .field("stats", &"[stats]")
            .finish()
    }
}

impl EventBus {
    /// Creates a new event bus with no registered handlers.
    pub fn new() -> Self {
        Self {
            handlers: DashMap::new(),
            stats: RwLock::new(EventBusStats::default()),
        }
    }

    /// Number of handlers currently subscribed to `event_name`.
    pub fn handler_count(&self, event_name: &str) -> usize {
        self.handlers
            .get(event_name)
            .map(|entry| entry.value().len())
            .unwrap_or(0)
    }

    /// Gets the current event bus statistics
    #[inline]
    pub async fn stats(&self) -> EventBusStats {
        self.stats.read().await.clone()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
