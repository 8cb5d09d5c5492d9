//! Entity definition registry
//!
//! Process-wide, read-mostly registry keyed by entity name. Definitions are
//! registered during startup; `seal()` flips the startup-phase guard and any
//! later registration is rejected. Lookups hand out cheap `Arc` clones.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};

use vitrine_core::{EntityDefinition, StorageError};

/// Registry of entity definitions.
#[derive(Default)]
pub struct DefinitionRegistry {
    definitions: RwLock<HashMap<String, Arc<EntityDefinition>>>,
    sealed: AtomicBool,
}

impl DefinitionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a definition. Fails once the registry is sealed, and for
    /// names registered twice.
    pub fn register(&self, definition: EntityDefinition) -> Result<(), StorageError> {
        if self.sealed.load(Ordering::Acquire) {
            return Err(StorageError::RegistrySealed {
                entity: definition.name().to_string(),
            });
        }
        let mut definitions = self
            .definitions
            .write()
            .map_err(|_| StorageError::LockPoisoned)?;
        let name = definition.name().to_string();
        if definitions.contains_key(&name) {
            return Err(StorageError::DuplicateDefinition { entity: name });
        }
        tracing::debug!(entity = %name, "registered entity definition");
        definitions.insert(name, Arc::new(definition));
        Ok(())
    }

    /// End the startup phase. Registration is rejected afterwards.
    pub fn seal(&self) {
        self.sealed.store(true, Ordering::Release);
        tracing::info!("definition registry sealed");
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed.load(Ordering::Acquire)
    }

    /// Look up a definition by entity name.
    pub fn get(&self, name: &str) -> Result<Arc<EntityDefinition>, StorageError> {
        let definitions = self
            .definitions
            .read()
            .map_err(|_| StorageError::LockPoisoned)?;
        definitions
            .get(name)
            .cloned()
            .ok_or_else(|| StorageError::DefinitionNotFound {
                entity: name.to_string(),
            })
    }

    /// All registered definitions, ordered by entity name.
    pub fn definitions(&self) -> Result<Vec<Arc<EntityDefinition>>, StorageError> {
        let definitions = self
            .definitions
            .read()
            .map_err(|_| StorageError::LockPoisoned)?;
        let mut all: Vec<Arc<EntityDefinition>> = definitions.values().cloned().collect();
        all.sort_by(|a, b| a.name().cmp(b.name()));
        Ok(all)
    }

    /// Number of registered definitions.
    pub fn len(&self) -> usize {
        self.definitions.read().map(|d| d.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use vitrine_core::FieldDef;

    fn product() -> EntityDefinition {
        EntityDefinition::new(
            "product",
            vec![
                FieldDef::uuid("id").primary_key(),
                FieldDef::string("name").required(),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_register_and_get() {
        let registry = DefinitionRegistry::new();
        registry.register(product()).unwrap();
        let def = registry.get("product").unwrap();
        assert_eq!(def.name(), "product");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_get_missing_fails() {
        let registry = DefinitionRegistry::new();
        let err = registry.get("category").unwrap_err();
        assert_eq!(
            err,
            StorageError::DefinitionNotFound {
                entity: "category".to_string(),
            }
        );
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let registry = DefinitionRegistry::new();
        registry.register(product()).unwrap();
        let err = registry.register(product()).unwrap_err();
        assert!(matches!(err, StorageError::DuplicateDefinition { .. }));
    }

    #[test]
    fn test_sealed_registry_rejects_registration() {
        let registry = DefinitionRegistry::new();
        registry.register(product()).unwrap();
        registry.seal();
        assert!(registry.is_sealed());

        let category = EntityDefinition::new(
            "category",
            vec![FieldDef::uuid("id").primary_key()],
        )
        .unwrap();
        let err = registry.register(category).unwrap_err();
        assert_eq!(
            err,
            StorageError::RegistrySealed {
                entity: "category".to_string(),
            }
        );
        // Lookups keep working after seal.
        assert!(registry.get("product").is_ok());
    }

    #[test]
    fn test_definitions_ordered_by_name() {
        let registry = DefinitionRegistry::new();
        registry.register(product()).unwrap();
        registry
            .register(
                EntityDefinition::new("category", vec![FieldDef::uuid("id").primary_key()])
                    .unwrap(),
            )
            .unwrap();
        let names: Vec<String> = registry
            .definitions()
            .unwrap()
            .iter()
            .map(|d| d.name().to_string())
            .collect();
        assert_eq!(names, vec!["category", "product"]);
    }
}
