//! Backing store trait and the in-memory reference backend
//!
//! The [`Store`] trait is the storage boundary: it applies filters, sorting
//! and pagination to reads and applies write batches atomically. The
//! [`InMemoryStore`] is the reference backend; real engines plug in behind
//! the same trait.
//!
//! Engine-specific failure codes stay inside the backend: [`InMemoryStore`]
//! reports SQLSTATE-style codes (`23505` unique violation, `23503` foreign
//! key violation) and ships the matching exception handlers
//! ([`DuplicateKeyHandler`], [`ForeignKeyHandler`]) so the domain layer
//! never inspects engine messages itself.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, RwLock};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use vitrine_core::{
    Context, Criteria, DomainError, EntityDefinition, FieldDef, FieldType, Filter, MatchMode,
    SortDirection, StorageError,
};

use crate::exception::ExceptionHandler;
use crate::registry::DefinitionRegistry;

// ============================================================================
// RECORDS
// ============================================================================

/// A dynamic record: field name to JSON value, in field-name order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct EntityRecord {
    pub values: BTreeMap<String, Value>,
}

impl EntityRecord {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a field value.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.values.get(field)
    }

    /// Set a field value.
    pub fn insert(&mut self, field: &str, value: impl Into<Value>) -> &mut Self {
        self.values.insert(field.to_string(), value.into());
        self
    }

    /// Builder-style variant of [`EntityRecord::insert`].
    pub fn with(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.values.insert(field.to_string(), value.into());
        self
    }

    /// Render the primary key as a string; composite keys join with `/`.
    /// `None` when any key field is absent.
    pub fn primary_key(&self, definition: &EntityDefinition) -> Option<String> {
        let mut parts = Vec::new();
        for field in definition.primary_key_fields() {
            let value = self.values.get(&field.name)?;
            let part = match value {
                Value::String(s) => s.clone(),
                Value::Null => return None,
                other => other.to_string(),
            };
            parts.push(part);
        }
        Some(parts.join("/"))
    }

    /// Keep only the requested fields plus the primary key.
    pub fn project(&self, fields: &[String], definition: &EntityDefinition) -> Self {
        let values = self
            .values
            .iter()
            .filter(|(name, _)| {
                fields.iter().any(|f| f == *name)
                    || definition
                        .field(name)
                        .is_some_and(|f| f.primary_key)
            })
            .map(|(name, value)| (name.clone(), value.clone()))
            .collect();
        Self { values }
    }

    /// Plain JSON object view of the record.
    pub fn to_value(&self) -> Value {
        Value::Object(
            self.values
                .iter()
                .map(|(name, value)| (name.clone(), value.clone()))
                .collect(),
        )
    }
}

impl From<serde_json::Map<String, Value>> for EntityRecord {
    fn from(map: serde_json::Map<String, Value>) -> Self {
        Self {
            values: map.into_iter().collect(),
        }
    }
}

/// One change inside a write batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteOperation {
    Insert {
        entity: String,
        payload: EntityRecord,
    },
    Update {
        entity: String,
        id: String,
        payload: EntityRecord,
    },
    Delete {
        entity: String,
        id: String,
    },
}

impl WriteOperation {
    /// Entity this operation touches.
    pub fn entity(&self) -> &str {
        match self {
            WriteOperation::Insert { entity, .. }
            | WriteOperation::Update { entity, .. }
            | WriteOperation::Delete { entity, .. } => entity,
        }
    }
}

// ============================================================================
// VALUE RESOLUTION AND ORDERING
// ============================================================================

/// Resolve a stored value against the request context.
///
/// Translatable fields may store a per-language object; the context language
/// picks the variant, falling back to the configured fallback language, then
/// to null.
pub fn resolve_field_value(field: &FieldDef, value: &Value, context: &Context) -> Value {
    if field.translatable {
        if let Value::Object(translations) = value {
            if let Some(translated) = translations.get(&context.language_id) {
                return translated.clone();
            }
            if let Some(fallback) = &context.fallback_language_id {
                if let Some(translated) = translations.get(fallback) {
                    return translated.clone();
                }
            }
            return Value::Null;
        }
    }
    value.clone()
}

/// Total order over JSON values for sorting and range filters.
///
/// Null < Bool < Number < String < Array < Object; `natural` switches
/// string comparison to case-insensitive.
pub fn compare_values(a: &Value, b: &Value, natural: bool) -> Ordering {
    fn rank(value: &Value) -> u8 {
        match value {
            Value::Null => 0,
            Value::Bool(_) => 1,
            Value::Number(_) => 2,
            Value::String(_) => 3,
            Value::Array(_) => 4,
            Value::Object(_) => 5,
        }
    }

    match (a, b) {
        (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
        (Value::Number(a), Value::Number(b)) => {
            let a = a.as_f64().unwrap_or(f64::NAN);
            let b = b.as_f64().unwrap_or(f64::NAN);
            a.total_cmp(&b)
        }
        (Value::String(a), Value::String(b)) => {
            if natural {
                a.to_lowercase().cmp(&b.to_lowercase())
            } else {
                a.cmp(b)
            }
        }
        _ => rank(a).cmp(&rank(b)),
    }
}

fn resolved(record: &EntityRecord, definition: &EntityDefinition, field: &str, context: &Context) -> Value {
    match (definition.field(field), record.get(field)) {
        (Some(field_def), Some(value)) => resolve_field_value(field_def, value, context),
        _ => Value::Null,
    }
}

fn filter_matches(
    filter: &Filter,
    record: &EntityRecord,
    definition: &EntityDefinition,
    context: &Context,
) -> bool {
    match filter {
        Filter::Equals { field, value } => resolved(record, definition, field, context) == *value,
        Filter::EqualsAny { field, values } => {
            let actual = resolved(record, definition, field, context);
            values.iter().any(|v| *v == actual)
        }
        Filter::Contains { field, value } => resolved(record, definition, field, context)
            .as_str()
            .is_some_and(|s| s.contains(value.as_str())),
        Filter::Prefix { field, value } => resolved(record, definition, field, context)
            .as_str()
            .is_some_and(|s| s.starts_with(value.as_str())),
        Filter::Suffix { field, value } => resolved(record, definition, field, context)
            .as_str()
            .is_some_and(|s| s.ends_with(value.as_str())),
        Filter::Range {
            field,
            gt,
            gte,
            lt,
            lte,
        } => {
            let actual = resolved(record, definition, field, context);
            if actual.is_null() {
                return false;
            }
            let check = |bound: &Option<Value>, accept: &[Ordering]| {
                bound
                    .as_ref()
                    .map_or(true, |b| accept.contains(&compare_values(&actual, b, false)))
            };
            check(gt, &[Ordering::Greater])
                && check(gte, &[Ordering::Greater, Ordering::Equal])
                && check(lt, &[Ordering::Less])
                && check(lte, &[Ordering::Less, Ordering::Equal])
        }
        Filter::Not(inner) => !filter_matches(inner, record, definition, context),
        Filter::Multi { operator, filters } => match operator {
            MatchMode::And => filters
                .iter()
                .all(|f| filter_matches(f, record, definition, context)),
            MatchMode::Or => filters
                .iter()
                .any(|f| filter_matches(f, record, definition, context)),
        },
    }
}

// ============================================================================
// STORE TRAIT
// ============================================================================

/// Storage boundary for the gateway.
pub trait Store: Send + Sync {
    /// Execute a criteria: filter, stable multi-key sort, paginate.
    fn fetch(
        &self,
        entity: &str,
        criteria: &Criteria,
        context: &Context,
    ) -> Result<Vec<EntityRecord>, StorageError>;

    /// Fetch records by primary key, in the order given. Missing ids are
    /// skipped.
    fn fetch_by_ids(&self, entity: &str, ids: &[String]) -> Result<Vec<EntityRecord>, StorageError>;

    /// Apply a write batch atomically: every change applies in submitted
    /// order, or none do.
    fn apply(&self, operations: &[WriteOperation]) -> Result<(), StorageError>;
}

// ============================================================================
// IN-MEMORY BACKEND
// ============================================================================

type Tables = HashMap<String, BTreeMap<String, EntityRecord>>;

/// In-memory reference backend.
pub struct InMemoryStore {
    registry: Arc<DefinitionRegistry>,
    tables: RwLock<Tables>,
}

impl InMemoryStore {
    pub fn new(registry: Arc<DefinitionRegistry>) -> Self {
        Self {
            registry,
            tables: RwLock::new(HashMap::new()),
        }
    }

    /// Number of stored records for an entity.
    pub fn record_count(&self, entity: &str) -> usize {
        self.tables
            .read()
            .map(|tables| tables.get(entity).map_or(0, BTreeMap::len))
            .unwrap_or(0)
    }

    fn check_outgoing_references(
        &self,
        tables: &Tables,
        definition: &EntityDefinition,
        record: &EntityRecord,
    ) -> Result<(), StorageError> {
        for association in definition.associations() {
            let FieldType::ManyToOne {
                referenced_entity,
                reference_field,
            } = &association.field_type
            else {
                continue;
            };
            let Some(Value::String(fk)) = record.get(reference_field) else {
                continue;
            };
            let present = tables
                .get(referenced_entity)
                .is_some_and(|table| table.contains_key(fk));
            if !present {
                return Err(StorageError::Engine {
                    code: "23503".to_string(),
                    message: format!(
                        "insert or update on \"{}\" violates foreign key constraint: \
                         key id={fk} is not present in \"{referenced_entity}\"",
                        definition.name()
                    ),
                });
            }
        }
        Ok(())
    }

    fn check_incoming_references(
        &self,
        tables: &Tables,
        entity: &str,
        id: &str,
    ) -> Result<(), StorageError> {
        for definition in self.registry.definitions()? {
            for association in definition.associations() {
                let FieldType::ManyToOne {
                    referenced_entity,
                    reference_field,
                } = &association.field_type
                else {
                    continue;
                };
                if referenced_entity != entity {
                    continue;
                }
                let referencing = tables
                    .get(definition.name())
                    .is_some_and(|table| {
                        table
                            .values()
                            .any(|r| r.get(reference_field).and_then(Value::as_str) == Some(id))
                    });
                if referencing {
                    return Err(StorageError::Engine {
                        code: "23503".to_string(),
                        message: format!(
                            "update or delete on \"{entity}\" violates foreign key constraint: \
                             still referenced by \"{}\"",
                            definition.name()
                        ),
                    });
                }
            }
        }
        Ok(())
    }

    fn apply_one(&self, tables: &mut Tables, operation: &WriteOperation) -> Result<(), StorageError> {
        match operation {
            WriteOperation::Insert { entity, payload } => {
                let definition = self.registry.get(entity)?;
                let id = payload.primary_key(&definition).ok_or_else(|| {
                    StorageError::Engine {
                        code: "23502".to_string(),
                        message: format!("null value in primary key of \"{entity}\""),
                    }
                })?;
                if tables
                    .get(entity)
                    .is_some_and(|table| table.contains_key(&id))
                {
                    return Err(StorageError::Engine {
                        code: "23505".to_string(),
                        message: format!(
                            "duplicate key value violates unique constraint \"{entity}_pkey\": id={id}"
                        ),
                    });
                }
                self.check_outgoing_references(tables, &definition, payload)?;
                tables
                    .entry(entity.clone())
                    .or_default()
                    .insert(id, payload.clone());
                Ok(())
            }
            WriteOperation::Update {
                entity,
                id,
                payload,
            } => {
                let definition = self.registry.get(entity)?;
                let mut merged = tables
                    .get(entity)
                    .and_then(|table| table.get(id))
                    .cloned()
                    .ok_or_else(|| StorageError::NotFound {
                        entity: entity.clone(),
                        id: id.clone(),
                    })?;
                for (name, value) in &payload.values {
                    merged.values.insert(name.clone(), value.clone());
                }
                self.check_outgoing_references(tables, &definition, &merged)?;
                tables
                    .entry(entity.clone())
                    .or_default()
                    .insert(id.clone(), merged);
                Ok(())
            }
            WriteOperation::Delete { entity, id } => {
                self.registry.get(entity)?;
                let existed = tables
                    .get_mut(entity)
                    .and_then(|table| table.remove(id))
                    .is_some();
                if !existed {
                    return Err(StorageError::NotFound {
                        entity: entity.clone(),
                        id: id.clone(),
                    });
                }
                self.check_incoming_references(tables, entity, id)
            }
        }
    }
}

impl Store for InMemoryStore {
    fn fetch(
        &self,
        entity: &str,
        criteria: &Criteria,
        context: &Context,
    ) -> Result<Vec<EntityRecord>, StorageError> {
        let definition = self.registry.get(entity)?;
        let tables = self.tables.read().map_err(|_| StorageError::LockPoisoned)?;

        let mut records: Vec<EntityRecord> = tables
            .get(entity)
            .map(|table| {
                table
                    .values()
                    .filter(|record| {
                        criteria
                            .filters
                            .iter()
                            .all(|f| filter_matches(f, record, &definition, context))
                    })
                    .cloned()
                    .collect()
            })
            .unwrap_or_default();

        // Stable sort, clauses in insertion order: the first non-equal
        // clause decides.
        records.sort_by(|a, b| {
            for sorting in &criteria.sortings {
                let av = resolved(a, &definition, &sorting.field, context);
                let bv = resolved(b, &definition, &sorting.field, context);
                let mut ordering = compare_values(&av, &bv, sorting.natural);
                if sorting.direction == SortDirection::Descending {
                    ordering = ordering.reverse();
                }
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            Ordering::Equal
        });

        let records = records
            .into_iter()
            .skip(criteria.offset as usize)
            .take(criteria.limit.map_or(usize::MAX, |l| l as usize))
            .collect();
        Ok(records)
    }

    fn fetch_by_ids(&self, entity: &str, ids: &[String]) -> Result<Vec<EntityRecord>, StorageError> {
        self.registry.get(entity)?;
        let tables = self.tables.read().map_err(|_| StorageError::LockPoisoned)?;
        let Some(table) = tables.get(entity) else {
            return Ok(Vec::new());
        };
        Ok(ids.iter().filter_map(|id| table.get(id)).cloned().collect())
    }

    fn apply(&self, operations: &[WriteOperation]) -> Result<(), StorageError> {
        let mut tables = self.tables.write().map_err(|_| StorageError::LockPoisoned)?;
        // Apply to a copy, swap on success: a failing change leaves nothing
        // behind.
        let mut staged = tables.clone();
        for operation in operations {
            self.apply_one(&mut staged, operation)?;
        }
        *tables = staged;
        Ok(())
    }
}

// ============================================================================
// BACKEND EXCEPTION HANDLERS
// ============================================================================

static DUPLICATE_KEY_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"unique constraint "(?P<entity>[A-Za-z_][A-Za-z0-9_]*)_pkey": id=(?P<id>.+)$"#)
        .unwrap()
});

static RESTRICT_DELETE_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"delete on "(?P<entity>[A-Za-z_][A-Za-z0-9_]*)" violates foreign key constraint: still referenced by "(?P<by>[A-Za-z_][A-Za-z0-9_]*)"$"#,
    )
    .unwrap()
});

/// Remaps the backend's unique-violation code to a duplicate-entity error.
pub struct DuplicateKeyHandler;

impl ExceptionHandler for DuplicateKeyHandler {
    fn match_exception(&self, error: &StorageError) -> Option<DomainError> {
        let StorageError::Engine { code, message } = error else {
            return None;
        };
        if code != "23505" {
            return None;
        }
        let caps = DUPLICATE_KEY_PATTERN.captures(message)?;
        Some(DomainError::duplicate_entity(&caps["entity"], &caps["id"]))
    }
}

/// Remaps the backend's foreign-key code on deletes to a restrict-delete
/// error. Insert-side violations stay raw storage errors.
pub struct ForeignKeyHandler;

impl ExceptionHandler for ForeignKeyHandler {
    fn match_exception(&self, error: &StorageError) -> Option<DomainError> {
        let StorageError::Engine { code, message } = error else {
            return None;
        };
        if code != "23503" {
            return None;
        }
        let caps = RESTRICT_DELETE_PATTERN.captures(message)?;
        Some(DomainError::restrict_delete(&caps["entity"], &caps["by"]))
    }
}

// =============================================================================
// TESTS
// =============================================================================
