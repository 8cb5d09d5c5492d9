//! Search/write gateway
//!
//! The [`EntityGateway`] ties the registry, the backing store, the exception
//! handler chain, and the event bus together. Reads and writes are
//! request-scoped and synchronous; storage failures go through the chain,
//! successful operations publish events before the call returns. The write
//! commits before events fire, so a listener failure surfaces to the caller
//! without rolling anything back.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Mutex};

use chrono::{Duration, Utc};
use serde_json::Value;

use vitrine_core::{
    Context, Criteria, DalConfig, EntityDefinition, FieldDef, FieldType, Price, RateLimitConfig,
    RateLimitError, Timestamp, ValidationError, VitrineError, VitrineResult,
};
use vitrine_events::{DataEvent, EventBus};

use crate::exception::ExceptionHandlerChain;
use crate::registry::DefinitionRegistry;
use crate::store::{resolve_field_value, EntityRecord, Store, WriteOperation};

// ============================================================================
// RESULTS
// ============================================================================

/// Result of a criteria search.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchResult {
    /// Hydrated records in result order.
    pub entities: Vec<EntityRecord>,
    /// Number of returned records.
    pub total: usize,
}

/// Result of a committed write batch, primary keys grouped by entity.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct WriteResult {
    pub written: BTreeMap<String, Vec<String>>,
    pub deleted: BTreeMap<String, Vec<String>>,
}

// ============================================================================
// RATE LIMITING
// ============================================================================

struct Window {
    started_at: Timestamp,
    count: u32,
}

/// Fixed-window request counter, keyed by context source.
struct FixedWindowLimiter {
    config: RateLimitConfig,
    windows: Mutex<HashMap<String, Window>>,
}

impl FixedWindowLimiter {
    fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            windows: Mutex::new(HashMap::new()),
        }
    }

    fn check(&self, key: &str) -> Result<(), RateLimitError> {
        if !self.config.enabled {
            return Ok(());
        }
        let now = Utc::now();
        let window_len = Duration::milliseconds(self.config.window);
        let mut windows = self
            .windows
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let window = windows.entry(key.to_string()).or_insert(Window {
            started_at: now,
            count: 0,
        });
        if now - window.started_at >= window_len {
            window.started_at = now;
            window.count = 0;
        }
        window.count += 1;
        if window.count > self.config.max_requests {
            return Err(RateLimitError::from_deadline(window.started_at + window_len));
        }
        Ok(())
    }
}

// ============================================================================
// GATEWAY
// ============================================================================

/// Executes criteria searches and transactional write batches.
pub struct EntityGateway {
    registry: Arc<DefinitionRegistry>,
    store: Arc<dyn Store>,
    exceptions: ExceptionHandlerChain,
    events: EventBus,
    config: DalConfig,
    limiter: FixedWindowLimiter,
}

impl EntityGateway {
    /// Wire a gateway. Validates the configuration.
    pub fn new(
        registry: Arc<DefinitionRegistry>,
        store: Arc<dyn Store>,
        exceptions: ExceptionHandlerChain,
        events: EventBus,
        config: DalConfig,
    ) -> VitrineResult<Self> {
        config.validate()?;
        let limiter = FixedWindowLimiter::new(config.rate_limit.clone());
        Ok(Self {
            registry,
            store,
            exceptions,
            events,
            config,
            limiter,
        })
    }

    /// Resolve a request context from config defaults and publish the
    /// `context.resolved` event.
    pub fn resolve_context(
        &self,
        language_id: Option<&str>,
        currency_id: Option<&str>,
    ) -> VitrineResult<Context> {
        let context = Context::resolve(&self.config, language_id, currency_id);
        self.events
            .publish(&DataEvent::context_resolved(context.clone()))?;
        Ok(context)
    }

    /// Execute a criteria against the backing store.
    ///
    /// The criteria is validated against the entity definition before any
    /// I/O; storage failures are translated through the exception chain.
    /// Declared associations named in the criteria are eager-loaded, and a
    /// non-empty source set reduces hydration to the requested fields. The
    /// matching loaded event is published before the result is returned.
    pub fn search(
        &self,
        entity: &str,
        criteria: &Criteria,
        context: &Context,
    ) -> VitrineResult<SearchResult> {
        self.limiter.check(&context.source.key())?;
        let definition = self.registry.get(entity)?;
        self.validate_criteria(&definition, criteria)?;

        let mut effective = criteria.clone();
        let cap = self.config.max_criteria_limit;
        effective.limit = Some(effective.limit.map_or(cap, |limit| limit.min(cap)));
        tracing::debug!(entity, limit = ?effective.limit, "executing search");

        let mut records = self
            .store
            .fetch(entity, &effective, context)
            .map_err(|error| self.exceptions.translate(error))?;

        for record in &mut records {
            hydrate(&definition, record, context);
        }
        for path in &effective.associations {
            self.load_association(&definition, path, &mut records, context)?;
        }
        if effective.is_partial() {
            records = records
                .iter()
                .map(|record| record.project(&effective.source, &definition))
                .collect();
        }

        let payload: Vec<Value> = records.iter().map(EntityRecord::to_value).collect();
        let event = if effective.is_partial() {
            DataEvent::partial_loaded(entity, context.clone(), payload)
        } else {
            DataEvent::entity_loaded(entity, context.clone(), payload)
        };
        let total = records.len();
        let result = SearchResult {
            entities: records,
            total,
        };
        self.events.publish(&event)?;
        Ok(result)
    }

    /// Apply a write batch.
    ///
    /// Every payload is validated against its entity definition before the
    /// batch reaches the store; the store applies the batch atomically.
    /// Events fire after the commit, so event-listener failures surface to
    /// the caller while the data stays written.
    pub fn write(
        &self,
        operations: Vec<WriteOperation>,
        context: &Context,
    ) -> VitrineResult<WriteResult> {
        self.limiter.check(&context.source.key())?;

        let mut result = WriteResult::default();
        for operation in &operations {
            let definition = self.registry.get(operation.entity())?;
            match operation {
                WriteOperation::Insert { entity, payload } => {
                    self.validate_insert(&definition, payload)?;
                    if let Some(id) = payload.primary_key(&definition) {
                        result.written.entry(entity.clone()).or_default().push(id);
                    }
                }
                WriteOperation::Update {
                    entity,
                    id,
                    payload,
                } => {
                    self.validate_payload_fields(&definition, payload)?;
                    result
                        .written
                        .entry(entity.clone())
                        .or_default()
                        .push(id.clone());
                }
                WriteOperation::Delete { entity, id } => {
                    result
                        .deleted
                        .entry(entity.clone())
                        .or_default()
                        .push(id.clone());
                }
            }
        }

        tracing::debug!(changes = operations.len(), "applying write batch");
        self.store
            .apply(&operations)
            .map_err(|error| self.exceptions.translate(error))?;

        let mut failures = Vec::new();
        for (entity, ids) in &result.written {
            let event = DataEvent::entity_written(entity, context.clone(), ids.clone());
            if let Err(vitrine_core::EventError::ListenerFailures(errors)) =
                self.events.publish(&event)
            {
                failures.extend(errors);
            }
        }
        for (entity, ids) in &result.deleted {
            let event = DataEvent::entity_deleted(entity, context.clone(), ids.clone());
            if let Err(vitrine_core::EventError::ListenerFailures(errors)) =
                self.events.publish(&event)
            {
                failures.extend(errors);
            }
        }
        if !failures.is_empty() {
            return Err(VitrineError::Event(
                vitrine_core::EventError::ListenerFailures(failures),
            ));
        }
        Ok(result)
    }

    fn validate_criteria(
        &self,
        definition: &EntityDefinition,
        criteria: &Criteria,
    ) -> VitrineResult<()> {
        let unknown = |field: &str| {
            VitrineError::Validation(ValidationError::UnknownField {
                entity: definition.name().to_string(),
                field: field.to_string(),
            })
        };
        for sorting in &criteria.sortings {
            let known = definition
                .field(&sorting.field)
                .is_some_and(|f| !f.field_type.is_association());
            if !known {
                return Err(unknown(&sorting.field));
            }
        }
        for filter in &criteria.filters {
            for field in filter.referenced_fields() {
                let known = definition
                    .field(field)
                    .is_some_and(|f| !f.field_type.is_association());
                if !known {
                    return Err(unknown(field));
                }
            }
        }
        for path in &criteria.associations {
            if definition.association(path).is_none() {
                return Err(unknown(path));
            }
        }
        for field in &criteria.source {
            if !definition.has_field(field) {
                return Err(unknown(field));
            }
        }
        Ok(())
    }

    fn load_association(
        &self,
        definition: &EntityDefinition,
        path: &str,
        records: &mut [EntityRecord],
        context: &Context,
    ) -> VitrineResult<()> {
        // Validated upfront, so the field exists and is an association.
        let Some(association) = definition.association(path) else {
            return Ok(());
        };
        let FieldType::ManyToOne {
            referenced_entity,
            reference_field,
        } = &association.field_type
        else {
            return Ok(());
        };

        let referenced_definition = self.registry.get(referenced_entity)?;
        let ids: Vec<String> = records
            .iter()
            .filter_map(|r| r.get(reference_field).and_then(Value::as_str))
            .map(String::from)
            .collect::<BTreeSet<String>>()
            .into_iter()
            .collect();
        let referenced = self
            .store
            .fetch_by_ids(referenced_entity, &ids)
            .map_err(|error| self.exceptions.translate(error))?;

        let mut by_id: HashMap<String, Value> = HashMap::new();
        for mut record in referenced {
            hydrate(&referenced_definition, &mut record, context);
            if let Some(id) = record.primary_key(&referenced_definition) {
                by_id.insert(id, record.to_value());
            }
        }
        for record in records.iter_mut() {
            let embedded = record
                .get(reference_field)
                .and_then(Value::as_str)
                .and_then(|fk| by_id.get(fk))
                .cloned()
                .unwrap_or(Value::Null);
            record.insert(path, embedded);
        }
        Ok(())
    }

    fn validate_insert(
        &self,
        definition: &EntityDefinition,
        payload: &EntityRecord,
    ) -> VitrineResult<()> {
        self.validate_payload_fields(definition, payload)?;
        for field in definition.fields() {
            if !field.required || field.field_type.is_association() {
                continue;
            }
            let missing = payload
                .get(&field.name)
                .map_or(true, Value::is_null);
            if missing {
                return Err(VitrineError::Validation(
                    ValidationError::RequiredFieldMissing {
                        entity: definition.name().to_string(),
                        field: field.name.clone(),
                    },
                ));
            }
        }
        Ok(())
    }

    fn validate_payload_fields(
        &self,
        definition: &EntityDefinition,
        payload: &EntityRecord,
    ) -> VitrineResult<()> {
        for (name, value) in &payload.values {
            let field = definition.field(name).filter(|f| !f.field_type.is_association());
            let Some(field) = field else {
                return Err(VitrineError::Validation(ValidationError::UnknownField {
                    entity: definition.name().to_string(),
                    field: name.clone(),
                }));
            };
            validate_value(definition.name(), field, value)?;
        }
        Ok(())
    }
}

/// Resolve translatable values of a record in place.
fn hydrate(definition: &EntityDefinition, record: &mut EntityRecord, context: &Context) {
    for field in definition.translatable_fields() {
        if let Some(value) = record.get(&field.name) {
            let resolved = resolve_field_value(field, value, context);
            record.insert(&field.name, resolved);
        }
    }
}

fn value_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn type_mismatch(entity: &str, field: &FieldDef, value: &Value) -> VitrineError {
    VitrineError::Validation(ValidationError::TypeMismatch {
        entity: entity.to_string(),
        field: field.name.clone(),
        expected: field.field_type.type_name().to_string(),
        got: value_type_name(value).to_string(),
    })
}

fn validate_value(entity: &str, field: &FieldDef, value: &Value) -> VitrineResult<()> {
    if value.is_null() {
        return Ok(());
    }
    // Translatable fields may carry a per-language object; each variant is
    // validated against the base type.
    if field.translatable {
        if let Value::Object(translations) = value {
            for translated in translations.values() {
                validate_scalar(entity, field, translated)?;
            }
            return Ok(());
        }
    }
    validate_scalar(entity, field, value)
}

fn validate_scalar(entity: &str, field: &FieldDef, value: &Value) -> VitrineResult<()> {
    if value.is_null() {
        return Ok(());
    }
    match &field.field_type {
        FieldType::Uuid => {
            let valid = value.as_str().is_some_and(|s| !s.is_empty());
            if !valid {
                return Err(type_mismatch(entity, field, value));
            }
        }
        FieldType::String | FieldType::Text => {
            if !value.is_string() {
                return Err(type_mismatch(entity, field, value));
            }
        }
        FieldType::Int => {
            if value.as_i64().is_none() {
                return Err(type_mismatch(entity, field, value));
            }
        }
        FieldType::Float => {
            if value.as_f64().is_none() {
                return Err(type_mismatch(entity, field, value));
            }
        }
        FieldType::Bool => {
            if !value.is_boolean() {
                return Err(type_mismatch(entity, field, value));
            }
        }
        FieldType::DateTime => {
            let valid = value
                .as_str()
                .is_some_and(|s| chrono::DateTime::parse_from_rfc3339(s).is_ok());
            if !valid {
                return Err(type_mismatch(entity, field, value));
            }
        }
        FieldType::Price => {
            Price::from_api_value(value).map_err(VitrineError::Validation)?;
        }
        FieldType::Json => {}
        FieldType::Enum { allowed } => {
            let Some(variant) = value.as_str() else {
                return Err(type_mismatch(entity, field, value));
            };
            if !allowed.iter().any(|a| a == variant) {
                return Err(VitrineError::Validation(ValidationError::InvalidEnumValue {
                    entity: entity.to_string(),
                    field: field.name.clone(),
                    value: variant.to_string(),
                }));
            }
        }
        // Associations are rejected before scalar validation.
        FieldType::ManyToOne { .. } => {}
    }
    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================
