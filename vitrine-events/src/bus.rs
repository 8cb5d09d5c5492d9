//! Synchronous event dispatcher
//!
//! Listeners run on the calling thread, in registration order. A failing
//! listener never stops later listeners and never rolls back the write that
//! already committed; failures are collected and surfaced to the caller
//! after the full pass.

use std::sync::Arc;

use vitrine_core::EventError;

use crate::event::DataEvent;

/// A synchronous event listener.
pub trait EventListener: Send + Sync {
    /// Stable name used in failure diagnostics.
    fn name(&self) -> &str;

    /// Handle one event.
    fn on_event(&self, event: &DataEvent) -> Result<(), EventError>;
}

/// Dispatcher delivering events to listeners in registration order.
#[derive(Default)]
pub struct EventBus {
    listeners: Vec<Arc<dyn EventListener>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a listener. Registration order is delivery order.
    pub fn register(&mut self, listener: Arc<dyn EventListener>) {
        self.listeners.push(listener);
    }

    /// Number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Deliver an event to every listener.
    ///
    /// All listeners run even when an earlier one fails. Failures are
    /// aggregated into [`EventError::ListenerFailures`].
    pub fn publish(&self, event: &DataEvent) -> Result<(), EventError> {
        let mut failures = Vec::new();
        for listener in &self.listeners {
            if let Err(error) = listener.on_event(event) {
                failures.push(EventError::ListenerFailed {
                    listener: listener.name().to_string(),
                    reason: error.to_string(),
                });
            }
        }
        if failures.is_empty() {
            Ok(())
        } else {
            Err(EventError::ListenerFailures(failures))
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
