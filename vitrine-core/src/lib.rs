//! VITRINE Core - Data Contracts
//!
//! Leaf data types for the VITRINE data-abstraction layer: entity and field
//! definitions, criteria, price values, request contexts, configuration, and
//! the error taxonomy. This crate performs no I/O; the operational layer
//! lives in `vitrine-dal`.

mod config;
mod context;
mod criteria;
mod definition;
mod error;
mod field;
mod identity;
mod price;

pub use config::{DalConfig, RateLimitConfig};
pub use context::{Context, ContextSource};
pub use criteria::{Criteria, FieldSorting, Filter, MatchMode, SortDirection};
pub use definition::EntityDefinition;
pub use error::{
    ConfigError, DomainError, EventError, RateLimitError, StorageError, ValidationError,
    VitrineError, VitrineResult,
};
pub use field::{is_valid_name, FieldDef, FieldType};
pub use identity::{new_entity_id, DurationMs, EntityId, Timestamp};
pub use price::{Price, PriceCollection};
