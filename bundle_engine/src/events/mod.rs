//! Notifications and activity-log entries leave the engine as events.
//!
//! Hooks are installed with [`EventHooks`], turned into running handlers with [`EventHandlers`], and the engine
//! publishes through the matching [`EventProducers`]. Publishing never fails from the engine's point of view.
mod channel;
mod event_types;
mod hooks;

pub use channel::{EventHandler, EventProducer, Handler};
pub use event_types::*;
pub use hooks::{EventHandlers, EventHooks, EventProducers};
