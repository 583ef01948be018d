/// Event bus module - broken down into manageable components
mod core;
mod emitters;
mod handlers;
mod stats;

pub use self::core::EventBus;
pub use stats::EventBusStats;
