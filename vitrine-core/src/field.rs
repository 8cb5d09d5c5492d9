//! Field model for entity definitions
//!
//! Fields carry a semantic type plus the flags the write validator and the
//! hydration path need (nullability, translatability, primary-key membership).

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::ValidationError;

/// Names for entities and fields: leading letter or underscore, then
/// letters, digits, underscores.
static NAME_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap());

/// Check a field name against the allowed pattern.
pub fn is_valid_name(name: &str) -> bool {
    NAME_PATTERN.is_match(name)
}

/// Semantic type of a field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    /// Opaque identifier stored as a non-empty string, canonically UUIDv7.
    Uuid,
    /// Short string.
    String,
    /// Long text.
    Text,
    /// 64-bit signed integer.
    Int,
    /// 64-bit float.
    Float,
    /// Boolean flag.
    Bool,
    /// RFC 3339 timestamp.
    DateTime,
    /// Gross/net price mapping (see [`crate::Price`]).
    Price,
    /// Arbitrary JSON payload, not validated.
    Json,
    /// Closed string enumeration.
    Enum { allowed: Vec<String> },
    /// Many-to-one association. The association field itself stores nothing;
    /// `reference_field` names the sibling scalar field holding the foreign key.
    ManyToOne {
        referenced_entity: String,
        reference_field: String,
    },
}

impl FieldType {
    /// Human-readable name used in type-mismatch errors.
    pub fn type_name(&self) -> &'static str {
        match self {
            FieldType::Uuid => "uuid",
            FieldType::String => "string",
            FieldType::Text => "text",
            FieldType::Int => "int",
            FieldType::Float => "float",
            FieldType::Bool => "bool",
            FieldType::DateTime => "date-time",
            FieldType::Price => "price",
            FieldType::Json => "json",
            FieldType::Enum { .. } => "enum",
            FieldType::ManyToOne { .. } => "many-to-one",
        }
    }

    /// Whether this field is an association rather than stored data.
    pub fn is_association(&self) -> bool {
        matches!(self, FieldType::ManyToOne { .. })
    }
}

/// Declarative field definition, owned by its entity definition.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    pub field_type: FieldType,
    /// Value must be present on insert.
    pub required: bool,
    /// Value may be stored per language and is resolved against the context.
    pub translatable: bool,
    /// Part of the primary key.
    pub primary_key: bool,
}

impl FieldDef {
    /// Create a field with the given type. Flags default to off.
    pub fn new(name: &str, field_type: FieldType) -> Self {
        Self {
            name: name.to_string(),
            field_type,
            required: false,
            translatable: false,
            primary_key: false,
        }
    }

    /// A UUID field.
    pub fn uuid(name: &str) -> Self {
        Self::new(name, FieldType::Uuid)
    }

    /// A short string field.
    pub fn string(name: &str) -> Self {
        Self::new(name, FieldType::String)
    }

    /// A long text field.
    pub fn text(name: &str) -> Self {
        Self::new(name, FieldType::Text)
    }

    /// An integer field.
    pub fn int(name: &str) -> Self {
        Self::new(name, FieldType::Int)
    }

    /// A float field.
    pub fn float(name: &str) -> Self {
        Self::new(name, FieldType::Float)
    }

    /// A boolean field.
    pub fn bool(name: &str) -> Self {
        Self::new(name, FieldType::Bool)
    }

    /// A timestamp field.
    pub fn date_time(name: &str) -> Self {
        Self::new(name, FieldType::DateTime)
    }

    /// A price field.
    pub fn price(name: &str) -> Self {
        Self::new(name, FieldType::Price)
    }

    /// An unvalidated JSON field.
    pub fn json(name: &str) -> Self {
        Self::new(name, FieldType::Json)
    }

    /// A closed string enumeration.
    pub fn enumeration(name: &str, allowed: Vec<String>) -> Self {
        Self::new(name, FieldType::Enum { allowed })
    }

    /// A many-to-one association resolved through `reference_field`.
    pub fn many_to_one(name: &str, referenced_entity: &str, reference_field: &str) -> Self {
        Self::new(
            name,
            FieldType::ManyToOne {
                referenced_entity: referenced_entity.to_string(),
                reference_field: reference_field.to_string(),
            },
        )
    }

    /// Mark the field as required on insert.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Mark the field as translatable.
    pub fn translatable(mut self) -> Self {
        self.translatable = true;
        self
    }

    /// Mark the field as part of the primary key. Primary keys are implicitly
    /// required.
    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self.required = true;
        self
    }

    /// Validate the field name against the allowed pattern.
    pub fn validate_name(&self) -> Result<(), ValidationError> {
        if is_valid_name(&self.name) {
            Ok(())
        } else {
            Err(ValidationError::InvalidFieldName {
                field: self.name.clone(),
                value: self.name.clone(),
            })
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_names_accepted() {
        for name in ["id", "name", "_internal", "customField_2", "A"] {
            assert!(is_valid_name(name), "expected {name} to be valid");
        }
    }

    #[test]
    fn test_invalid_names_rejected() {
        for name in ["9field", "with-dash", "with space", "", "a.b", "ümlaut"] {
            assert!(!is_valid_name(name), "expected {name} to be invalid");
        }
    }

    #[test]
    fn test_validate_name_carries_offending_value() {
        let field = FieldDef::string("my-field");
        let err = field.validate_name().unwrap_err();
        assert_eq!(
            err,
            ValidationError::InvalidFieldName {
                field: "my-field".to_string(),
                value: "my-field".to_string(),
            }
        );
    }

    #[test]
    fn test_primary_key_implies_required() {
        let field = FieldDef::uuid("id").primary_key();
        assert!(field.primary_key);
        assert!(field.required);
    }

    #[test]
    fn test_association_detection() {
        let assoc = FieldDef::many_to_one("category", "category", "category_id");
        assert!(assoc.field_type.is_association());
        assert!(!FieldDef::string("name").field_type.is_association());
    }
}
