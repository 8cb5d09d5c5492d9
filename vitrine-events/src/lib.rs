//! VITRINE Events - Synchronous Event Layer
//!
//! Typed events emitted after reads and writes, delivered synchronously to
//! listeners in registration order. The gateway in `vitrine-dal` publishes
//! through the [`EventBus`] after a search result is assembled or a write
//! committed; listener failures surface to the caller but never roll back
//! committed work.

mod bus;
mod event;

pub use bus::{EventBus, EventListener};
pub use event::{DataEvent, EventPayload};

// Re-export core types for convenience
pub use vitrine_core::{Context, EventError};
