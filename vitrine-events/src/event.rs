//! Event types emitted after reads and writes
//!
//! Events are immutable-by-convention payloads carrying the originating
//! context and the affected data. They are consumed once by the dispatcher
//! and never persisted. Event names are derived from the entity name, e.g.
//! `product.loaded` or `product.partial_loaded`.

use serde::{Deserialize, Serialize};
use vitrine_core::Context;

/// Payload variants carried by a [`DataEvent`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventPayload {
    /// Hydrated records returned by a search.
    Loaded { records: Vec<serde_json::Value> },
    /// Primary keys written by inserts and updates.
    Written { ids: Vec<String> },
    /// Primary keys removed by deletes.
    Deleted { ids: Vec<String> },
    /// A context was materialized from raw parameters.
    ContextResolved,
}

/// An event emitted by the gateway after a read or a committed write.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataEvent {
    /// Derived event name, e.g. `product.loaded`.
    pub name: String,
    /// Entity the event concerns; `None` for context events.
    pub entity: Option<String>,
    pub context: Context,
    pub payload: EventPayload,
}

impl DataEvent {
    /// Fully hydrated records were loaded.
    pub fn entity_loaded(entity: &str, context: Context, records: Vec<serde_json::Value>) -> Self {
        Self {
            name: format!("{entity}.loaded"),
            entity: Some(entity.to_string()),
            context,
            payload: EventPayload::Loaded { records },
        }
    }

    /// Partially hydrated records (a subset of fields) were loaded.
    pub fn partial_loaded(entity: &str, context: Context, records: Vec<serde_json::Value>) -> Self {
        Self {
            name: format!("{entity}.partial_loaded"),
            entity: Some(entity.to_string()),
            context,
            payload: EventPayload::Loaded { records },
        }
    }

    /// Records were inserted or updated.
    pub fn entity_written(entity: &str, context: Context, ids: Vec<String>) -> Self {
        Self {
            name: format!("{entity}.written"),
            entity: Some(entity.to_string()),
            context,
            payload: EventPayload::Written { ids },
        }
    }

    /// Records were deleted.
    pub fn entity_deleted(entity: &str, context: Context, ids: Vec<String>) -> Self {
        Self {
            name: format!("{entity}.deleted"),
            entity: Some(entity.to_string()),
            context,
            payload: EventPayload::Deleted { ids },
        }
    }

    /// A context was resolved.
    pub fn context_resolved(context: Context) -> Self {
        Self {
            name: "context.resolved".to_string(),
            entity: None,
            context,
            payload: EventPayload::ContextResolved,
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
