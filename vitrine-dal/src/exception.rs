//! Exception handler chain
//!
//! Translates raw storage failures into domain errors. Handlers are held in
//! a priority-sorted list; the sort happens once at registration (stable, so
//! equal priorities keep registration order) and `translate` walks it in
//! ascending priority order. The first handler returning a mapped error
//! wins; if none match, the original storage error propagates unchanged.

use std::sync::Arc;

use vitrine_core::{DomainError, StorageError, VitrineError};

/// Priority for ordinary handlers; tried first.
pub const PRIORITY_DEFAULT: i32 = 0;
/// Priority for catch-all handlers; tried after all default handlers.
pub const PRIORITY_LATE: i32 = 10;

/// A translator for one class of raw storage failures.
pub trait ExceptionHandler: Send + Sync {
    /// Position in the chain; lower runs earlier.
    fn priority(&self) -> i32 {
        PRIORITY_DEFAULT
    }

    /// Return the translated domain error, or `None` when this handler does
    /// not recognize the failure.
    fn match_exception(&self, error: &StorageError) -> Option<DomainError>;
}

/// Priority-ordered chain of exception handlers.
#[derive(Default)]
pub struct ExceptionHandlerChain {
    handlers: Vec<Arc<dyn ExceptionHandler>>,
}

impl ExceptionHandlerChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a handler, keeping the list sorted by ascending priority.
    /// The sort is stable: handlers with equal priority stay in
    /// registration order.
    pub fn register(&mut self, handler: Arc<dyn ExceptionHandler>) {
        self.handlers.push(handler);
        self.handlers.sort_by_key(|h| h.priority());
    }

    /// Number of registered handlers.
    pub fn handler_count(&self) -> usize {
        self.handlers.len()
    }

    /// Translate a raw storage failure.
    ///
    /// Returns the first matching handler's domain error; unmatched
    /// failures come back wrapped as-is.
    pub fn translate(&self, error: StorageError) -> VitrineError {
        for handler in &self.handlers {
            if let Some(domain) = handler.match_exception(&error) {
                tracing::debug!(code = %domain.code, "translated storage error");
                return VitrineError::Domain(domain);
            }
        }
        VitrineError::Storage(error)
    }
}

// =============================================================================
// TESTS
// =============================================================================
