/// Statistics tracking for the event bus
use serde::{Deserialize, Serialize};

/// Event bus statistics for monitoring delivery
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventBusStats {
    /// Total number of registered event handlers
    pub total_handlers: usize,
    /// Emissions that reached at least one handler
    pub events_emitted: u64,
    /// Emissions for names nobody subscribed to
    pub unobserved_events: u64,
    /// Handler invocations that returned an error or panicked
    pub handler_failures: u64,
}
