//! Event multiplexing
//!
//! Keeps every handle for one physical table observationally consistent:
//! the engine that performs a mutation publishes once, and each subscribing
//! handle re-emits the change locally in its own row shape.

mod event;
mod registry;

pub use event::{ChangeEvent, EventKind};
pub use registry::{EventHub, EventRegistry, DEFAULT_EVENT_CAPACITY};
