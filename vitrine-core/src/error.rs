//! Error types for VITRINE operations

use crate::DurationMs;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Validation errors.
///
/// Raised before any I/O happens, at definition-build or payload-validation
/// time. Never retried; always carries the offending field and value.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid entity name: {value}")]
    InvalidEntityName { value: String },

    #[error("Invalid field name {field}: {value}")]
    InvalidFieldName { field: String, value: String },

    #[error("Duplicate field {field} on entity {entity}")]
    DuplicateField { entity: String, field: String },

    #[error("Entity {entity} has no primary key field")]
    MissingPrimaryKey { entity: String },

    #[error("Association {field} on entity {entity} cannot be a primary key")]
    AssociationAsPrimaryKey { entity: String, field: String },

    #[error("Association {association} on entity {entity} references missing field {field}")]
    MissingReferenceField {
        entity: String,
        association: String,
        field: String,
    },

    #[error("Enum field {field} on entity {entity} has no allowed values")]
    EmptyEnum { entity: String, field: String },

    #[error("Required field missing: {entity}.{field}")]
    RequiredFieldMissing { entity: String, field: String },

    #[error("Unknown field {entity}.{field}")]
    UnknownField { entity: String, field: String },

    #[error("Invalid enum value for {entity}.{field}: {value}")]
    InvalidEnumValue {
        entity: String,
        field: String,
        value: String,
    },

    #[error("Type mismatch for {entity}.{field}: expected {expected}, got {got}")]
    TypeMismatch {
        entity: String,
        field: String,
        expected: String,
        got: String,
    },

    #[error("Invalid price value: {reason}")]
    InvalidPrice { reason: String },
}

/// Raw storage-layer errors.
///
/// These are engine-level failures. The `Engine` variant carries the
/// backend's own error code (SQLSTATE-style) and is the input to the
/// exception handler chain; everything the chain does not remap propagates
/// unchanged.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StorageError {
    #[error("Entity not found: {entity} with id {id}")]
    NotFound { entity: String, id: String },

    #[error("Engine error {code}: {message}")]
    Engine { code: String, message: String },

    #[error("Transaction failed: {reason}")]
    TransactionFailed { reason: String },

    #[error("Definition registry is sealed, cannot register {entity}")]
    RegistrySealed { entity: String },

    #[error("A definition for entity {entity} is already registered")]
    DuplicateDefinition { entity: String },

    #[error("No definition registered for entity {entity}")]
    DefinitionNotFound { entity: String },

    #[error("Storage lock poisoned")]
    LockPoisoned,
}

/// A domain error translated from a raw storage failure.
///
/// Carries a stable machine-readable code, an HTTP-like status for
/// transport mapping, and a message template with `{named}` placeholders
/// filled from `parameters`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DomainError {
    /// Stable error code, e.g. `VITRINE__DUPLICATE_ENTITY`.
    pub code: String,
    /// HTTP-like status code for transport mapping.
    pub status: u16,
    /// Message template with `{named}` placeholders.
    pub message_template: String,
    /// Placeholder substitutions.
    pub parameters: BTreeMap<String, serde_json::Value>,
}

impl DomainError {
    /// Create a domain error with an empty parameter map.
    pub fn new(code: &str, status: u16, message_template: &str) -> Self {
        Self {
            code: code.to_string(),
            status,
            message_template: message_template.to_string(),
            parameters: BTreeMap::new(),
        }
    }

    /// Attach a named parameter.
    pub fn with_param(mut self, name: &str, value: impl Into<serde_json::Value>) -> Self {
        self.parameters.insert(name.to_string(), value.into());
        self
    }

    /// Render the message template with all parameters substituted.
    pub fn message(&self) -> String {
        let mut message = self.message_template.clone();
        for (name, value) in &self.parameters {
            let placeholder = format!("{{{name}}}");
            let rendered = match value {
                serde_json::Value::String(s) => s.clone(),
                other => other.to_string(),
            };
            message = message.replace(&placeholder, &rendered);
        }
        message
    }

    /// A duplicate primary key was written.
    pub fn duplicate_entity(entity: &str, id: &str) -> Self {
        Self::new(
            "VITRINE__DUPLICATE_ENTITY",
            409,
            "An entity \"{entity}\" with id \"{id}\" already exists.",
        )
        .with_param("entity", entity)
        .with_param("id", id)
    }

    /// A delete was blocked because other records still reference the row.
    pub fn restrict_delete(entity: &str, referenced_by: &str) -> Self {
        Self::new(
            "VITRINE__RESTRICT_DELETE",
            409,
            "Cannot delete \"{entity}\": referenced by \"{referencedBy}\".",
        )
        .with_param("entity", entity)
        .with_param("referencedBy", referenced_by)
    }

    /// A record addressed by id does not exist.
    pub fn not_found(entity: &str, id: &str) -> Self {
        Self::new(
            "VITRINE__ENTITY_NOT_FOUND",
            404,
            "Entity \"{entity}\" with id \"{id}\" was not found.",
        )
        .with_param("entity", entity)
        .with_param("id", id)
    }
}

impl fmt::Display for DomainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message())
    }
}

impl std::error::Error for DomainError {}

/// Rate limit exceeded.
///
/// `retry_after` is the remaining window in milliseconds, computed as
/// `retry_after_at - now` at construction time. Callers are expected to
/// respect it; nothing retries internally.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Rate limit exceeded, retry after {retry_after}ms")]
pub struct RateLimitError {
    pub retry_after: DurationMs,
}

impl RateLimitError {
    /// Compute the retry-after duration from the window deadline.
    pub fn from_deadline(retry_after_at: crate::Timestamp) -> Self {
        let retry_after = (retry_after_at - Utc::now()).num_milliseconds().max(0);
        Self { retry_after }
    }
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {field}: {value} - {reason}")]
    InvalidValue {
        field: String,
        value: String,
        reason: String,
    },
}

/// Event dispatch errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EventError {
    #[error("Listener {listener} failed: {reason}")]
    ListenerFailed { listener: String, reason: String },

    #[error("{} listener(s) failed during dispatch", .0.len())]
    ListenerFailures(Vec<EventError>),
}

/// Master error type for all VITRINE errors.
#[derive(Debug, Clone, Error)]
pub enum VitrineError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Domain error: {0}")]
    Domain(#[from] DomainError),

    #[error("Rate limit error: {0}")]
    RateLimit(#[from] RateLimitError),

    #[error("Config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Event error: {0}")]
    Event(#[from] EventError),
}

/// Result type alias for VITRINE operations.
pub type VitrineResult<T> = Result<T, VitrineError>;

// =============================================================================
// TESTS
// =============================================================================
