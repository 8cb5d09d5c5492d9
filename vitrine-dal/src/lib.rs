//! VITRINE DAL - Criteria Search and the Write Gateway
//!
//! The operational layer of the VITRINE data-abstraction layer:
//!
//! - [`DefinitionRegistry`]: process-wide entity definitions with a
//!   startup-phase guard (`seal`)
//! - [`ExceptionHandlerChain`]: priority-ordered translation of raw storage
//!   failures into domain errors
//! - [`Store`] and [`InMemoryStore`]: the storage boundary and the in-memory
//!   reference backend with its own exception handlers
//! - [`EntityGateway`]: criteria validation, search with association
//!   loading and partial hydration, atomic write batches, rate limiting,
//!   and event publication
//!
//! Execution is request-scoped and synchronous. Registry and chain are
//! built at startup and treated as immutable afterwards; all store I/O may
//! block on the backing engine, and callers own any timeout policy.

mod exception;
mod gateway;
mod registry;
mod store;

pub use exception::{
    ExceptionHandler, ExceptionHandlerChain, PRIORITY_DEFAULT, PRIORITY_LATE,
};
pub use gateway::{EntityGateway, SearchResult, WriteResult};
pub use registry::DefinitionRegistry;
pub use store::{
    compare_values, resolve_field_value, DuplicateKeyHandler, EntityRecord, ForeignKeyHandler,
    InMemoryStore, Store, WriteOperation,
};

// Re-export core types for convenience
pub use vitrine_core::{
    Context, Criteria, DalConfig, DomainError, EntityDefinition, FieldDef, FieldSorting,
    FieldType, Filter, MatchMode, SortDirection, StorageError, ValidationError, VitrineError,
    VitrineResult,
};
