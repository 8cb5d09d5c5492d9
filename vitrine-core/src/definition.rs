//! Entity definitions
//!
//! An [`EntityDefinition`] identifies an entity type by name and enumerates
//! its fields. Definitions are validated when built and immutable afterwards;
//! they are created at process start and registered once.

use serde::{Deserialize, Serialize};

use crate::field::{is_valid_name, FieldDef, FieldType};
use crate::ValidationError;

/// Immutable description of an entity type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityDefinition {
    name: String,
    fields: Vec<FieldDef>,
}

impl EntityDefinition {
    /// Build a definition, validating the entity name and every field.
    ///
    /// Validation fails fast on the first offending field:
    /// - entity and field names must match `^[A-Za-z_][A-Za-z0-9_]*$`
    /// - field names must be unique
    /// - at least one field must be a primary key
    /// - associations cannot be primary keys and must reference an existing
    ///   sibling field
    /// - enum fields must allow at least one value
    pub fn new(name: &str, fields: Vec<FieldDef>) -> Result<Self, ValidationError> {
        if !is_valid_name(name) {
            return Err(ValidationError::InvalidEntityName {
                value: name.to_string(),
            });
        }

        for field in &fields {
            field.validate_name()?;
        }

        for (i, field) in fields.iter().enumerate() {
            if fields[..i].iter().any(|f| f.name == field.name) {
                return Err(ValidationError::DuplicateField {
                    entity: name.to_string(),
                    field: field.name.clone(),
                });
            }
        }

        if !fields.iter().any(|f| f.primary_key) {
            return Err(ValidationError::MissingPrimaryKey {
                entity: name.to_string(),
            });
        }

        for field in &fields {
            match &field.field_type {
                FieldType::ManyToOne {
                    reference_field, ..
                } => {
                    if field.primary_key {
                        return Err(ValidationError::AssociationAsPrimaryKey {
                            entity: name.to_string(),
                            field: field.name.clone(),
                        });
                    }
                    let exists = fields
                        .iter()
                        .any(|f| f.name == *reference_field && !f.field_type.is_association());
                    if !exists {
                        return Err(ValidationError::MissingReferenceField {
                            entity: name.to_string(),
                            association: field.name.clone(),
                            field: reference_field.clone(),
                        });
                    }
                }
                FieldType::Enum { allowed } => {
                    if allowed.is_empty() {
                        return Err(ValidationError::EmptyEnum {
                            entity: name.to_string(),
                            field: field.name.clone(),
                        });
                    }
                }
                _ => {}
            }
        }

        Ok(Self {
            name: name.to_string(),
            fields,
        })
    }

    /// Entity name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// All fields in declaration order.
    pub fn fields(&self) -> &[FieldDef] {
        &self.fields
    }

    /// Look up a field by name.
    pub fn field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Whether a field with this name exists.
    pub fn has_field(&self, name: &str) -> bool {
        self.field(name).is_some()
    }

    /// Primary-key fields in declaration order.
    pub fn primary_key_fields(&self) -> Vec<&FieldDef> {
        self.fields.iter().filter(|f| f.primary_key).collect()
    }

    /// Association fields in declaration order.
    pub fn associations(&self) -> Vec<&FieldDef> {
        self.fields
            .iter()
            .filter(|f| f.field_type.is_association())
            .collect()
    }

    /// Look up an association field by name.
    pub fn association(&self, name: &str) -> Option<&FieldDef> {
        self.field(name).filter(|f| f.field_type.is_association())
    }

    /// Translatable fields in declaration order.
    pub fn translatable_fields(&self) -> Vec<&FieldDef> {
        self.fields.iter().filter(|f| f.translatable).collect()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn product_fields() -> Vec<FieldDef> {
        vec![
            FieldDef::uuid("id").primary_key(),
            FieldDef::string("name").required().translatable(),
            FieldDef::int("stock"),
        ]
    }

    #[test]
    fn test_valid_definition_builds() {
        let def = EntityDefinition::new("product", product_fields()).unwrap();
        assert_eq!(def.name(), "product");
        assert_eq!(def.fields().len(), 3);
        assert_eq!(def.primary_key_fields().len(), 1);
        assert_eq!(def.translatable_fields().len(), 1);
    }

    #[test]
    fn test_invalid_entity_name_rejected() {
        let err = EntityDefinition::new("my-entity", product_fields()).unwrap_err();
        assert_eq!(
            err,
            ValidationError::InvalidEntityName {
                value: "my-entity".to_string(),
            }
        );
    }

    #[test]
    fn test_invalid_field_name_rejected_with_value() {
        let mut fields = product_fields();
        fields.push(FieldDef::string("bad name"));
        let err = EntityDefinition::new("product", fields).unwrap_err();
        assert_eq!(
            err,
            ValidationError::InvalidFieldName {
                field: "bad name".to_string(),
                value: "bad name".to_string(),
            }
        );
    }

    #[test]
    fn test_duplicate_field_rejected() {
        let mut fields = product_fields();
        fields.push(FieldDef::string("name"));
        let err = EntityDefinition::new("product", fields).unwrap_err();
        assert!(matches!(err, ValidationError::DuplicateField { field, .. } if field == "name"));
    }

    #[test]
    fn test_missing_primary_key_rejected() {
        let fields = vec![FieldDef::string("name")];
        let err = EntityDefinition::new("product", fields).unwrap_err();
        assert!(matches!(err, ValidationError::MissingPrimaryKey { .. }));
    }

    #[test]
    fn test_association_needs_reference_field() {
        let mut fields = product_fields();
        fields.push(FieldDef::many_to_one("category", "category", "category_id"));
        let err = EntityDefinition::new("product", fields.clone()).unwrap_err();
        assert!(matches!(
            err,
            ValidationError::MissingReferenceField { ref field, .. } if field == "category_id"
        ));

        fields.insert(2, FieldDef::uuid("category_id"));
        let def = EntityDefinition::new("product", fields).unwrap();
        assert!(def.association("category").is_some());
        assert!(def.association("name").is_none());
    }

    #[test]
    fn test_association_cannot_be_primary_key() {
        let fields = vec![
            FieldDef::uuid("id").primary_key(),
            FieldDef::uuid("category_id"),
            FieldDef::many_to_one("category", "category", "category_id").primary_key(),
        ];
        let err = EntityDefinition::new("product", fields).unwrap_err();
        assert!(matches!(err, ValidationError::AssociationAsPrimaryKey { .. }));
    }

    #[test]
    fn test_empty_enum_rejected() {
        let fields = vec![
            FieldDef::uuid("id").primary_key(),
            FieldDef::enumeration("state", vec![]),
        ];
        let err = EntityDefinition::new("product", fields).unwrap_err();
        assert!(matches!(err, ValidationError::EmptyEnum { .. }));
    }
}
