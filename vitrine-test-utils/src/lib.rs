//! VITRINE Test Utilities
//!
//! Centralized test infrastructure for the VITRINE workspace:
//! - Proptest generators for criteria, prices, and records
//! - Fixtures for common definitions and a fully wired gateway
//! - Custom assertions for VITRINE-specific validation

// Re-export the crate surface for convenience
pub use vitrine_core::{
    Context, ContextSource, Criteria, DalConfig, DomainError, EntityDefinition, FieldDef,
    FieldSorting, FieldType, Filter, MatchMode, Price, PriceCollection, RateLimitConfig,
    SortDirection, StorageError, ValidationError, VitrineError, VitrineResult,
};
pub use vitrine_dal::{
    DefinitionRegistry, DuplicateKeyHandler, EntityGateway, EntityRecord,
    ExceptionHandlerChain, ForeignKeyHandler, InMemoryStore, Store, WriteOperation,
};
pub use vitrine_events::{DataEvent, EventBus, EventListener, EventPayload};

// ============================================================================
// GENERATORS
// ============================================================================

pub mod generators {
    use super::*;
    use proptest::prelude::*;

    /// Generate a field name matching the allowed pattern.
    pub fn arb_field_name() -> impl Strategy<Value = String> {
        "[A-Za-z_][A-Za-z0-9_]{0,30}"
    }

    /// Generate a string that violates the field-name pattern.
    pub fn arb_invalid_field_name() -> impl Strategy<Value = String> {
        prop_oneof![
            Just(String::new()),
            "[0-9][A-Za-z0-9_]{0,10}",
            "[a-z]{1,5}-[a-z]{1,5}",
            "[a-z]{1,5} [a-z]{1,5}",
        ]
    }

    /// Generate a sort direction.
    pub fn arb_sort_direction() -> impl Strategy<Value = SortDirection> {
        prop_oneof![
            Just(SortDirection::Ascending),
            Just(SortDirection::Descending),
        ]
    }

    /// Generate a price without a list price.
    pub fn arb_price() -> impl Strategy<Value = Price> {
        (
            0.0f64..10_000.0,
            0.0f64..10_000.0,
            any::<bool>(),
            prop_oneof![Just("EUR"), Just("USD"), Just("GBP")],
        )
            .prop_map(|(gross, net, linked, currency)| Price::new(currency, gross, net, linked))
    }

    /// Generate a price, possibly carrying a nested list price.
    pub fn arb_price_with_list() -> impl Strategy<Value = Price> {
        (arb_price(), prop::option::of(arb_price())).prop_map(|(price, list)| match list {
            Some(list) => price.with_list_price(list),
            None => price,
        })
    }

    /// Generate an insert payload for the fixture product definition.
    pub fn arb_product_record() -> impl Strategy<Value = EntityRecord> {
        (
            "[a-z0-9]{8}",
            "[a-zA-Z ]{1,24}",
            prop::option::of(0i64..100_000),
        )
            .prop_map(|(id, name, stock)| {
                let mut record = EntityRecord::new().with("id", id).with("name", name);
                if let Some(stock) = stock {
                    record.insert("stock", stock);
                }
                record
            })
    }

    /// Generate a criteria over the fixture product definition.
    pub fn arb_criteria() -> impl Strategy<Value = Criteria> {
        (
            prop::option::of(1u32..50),
            0u32..10,
            prop::collection::vec(
                (prop_oneof![Just("id"), Just("name"), Just("stock")], arb_sort_direction()),
                0..3,
            ),
        )
            .prop_map(|(limit, offset, sorts)| {
                let mut criteria = Criteria::new(limit, offset);
                for (field, direction) in sorts {
                    criteria.add_sorting(FieldSorting::new(field, direction));
                }
                criteria
            })
    }
}

// ============================================================================
// FIXTURES
// ============================================================================

pub mod fixtures {
    use super::*;
    use std::sync::Arc;

    /// Product definition: id (pk), translatable name, stock, price,
    /// category association.
    pub fn product_definition() -> EntityDefinition {
        EntityDefinition::new(
            "product",
            vec![
                FieldDef::uuid("id").primary_key(),
                FieldDef::string("name").required().translatable(),
                FieldDef::int("stock"),
                FieldDef::price("price"),
                FieldDef::uuid("category_id"),
                FieldDef::many_to_one("category", "category", "category_id"),
            ],
        )
        .expect("fixture definition is valid")
    }

    /// Category definition referenced by the product fixture.
    pub fn category_definition() -> EntityDefinition {
        EntityDefinition::new(
            "category",
            vec![
                FieldDef::uuid("id").primary_key(),
                FieldDef::string("label").required(),
            ],
        )
        .expect("fixture definition is valid")
    }

    /// A sealed registry holding the product and category fixtures.
    pub fn sealed_registry() -> Arc<DefinitionRegistry> {
        let registry = DefinitionRegistry::new();
        registry
            .register(category_definition())
            .expect("fixture registration");
        registry
            .register(product_definition())
            .expect("fixture registration");
        registry.seal();
        Arc::new(registry)
    }

    /// A fully wired gateway over the in-memory store with both backend
    /// exception handlers installed and an empty event bus.
    pub fn gateway() -> EntityGateway {
        gateway_with(DalConfig::default(), EventBus::new())
    }

    /// Like [`gateway`], with a custom config and event bus.
    pub fn gateway_with(config: DalConfig, events: EventBus) -> EntityGateway {
        let registry = sealed_registry();
        let store = Arc::new(InMemoryStore::new(registry.clone()));
        let mut exceptions = ExceptionHandlerChain::new();
        exceptions.register(Arc::new(DuplicateKeyHandler));
        exceptions.register(Arc::new(ForeignKeyHandler));
        EntityGateway::new(registry, store, exceptions, events, config)
            .expect("fixture gateway wiring")
    }

    /// System context matching the fixture defaults.
    pub fn context() -> Context {
        Context::system("en-GB", "EUR")
    }

    /// Insert operation for the product fixture.
    pub fn insert_product(id: &str, name: &str) -> WriteOperation {
        WriteOperation::Insert {
            entity: "product".to_string(),
            payload: EntityRecord::new().with("id", id).with("name", name),
        }
    }
}

// ============================================================================
// ASSERTIONS
// ============================================================================

pub mod assertions {
    use super::*;
    use serde_json::Value;

    /// Assert that a result failed with the given domain error code.
    #[track_caller]
    pub fn assert_domain_code<T: std::fmt::Debug>(result: &VitrineResult<T>, code: &str) {
        match result {
            Err(VitrineError::Domain(domain)) => assert_eq!(
                domain.code, code,
                "domain code mismatch: expected {code}, got {}",
                domain.code
            ),
            other => panic!("expected domain error {code}, got {other:?}"),
        }
    }

    /// Assert that a result failed with a validation error.
    #[track_caller]
    pub fn assert_validation_error<T: std::fmt::Debug>(result: &VitrineResult<T>) {
        assert!(
            matches!(result, Err(VitrineError::Validation(_))),
            "expected validation error, got {result:?}"
        );
    }

    /// Assert that records are sorted by a string field, ascending.
    #[track_caller]
    pub fn assert_sorted_by(records: &[EntityRecord], field: &str) {
        let values: Vec<&str> = records
            .iter()
            .filter_map(|r| r.get(field).and_then(Value::as_str))
            .collect();
        let mut sorted = values.clone();
        sorted.sort_unstable();
        assert_eq!(values, sorted, "records are not sorted by {field}");
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn test_fixture_gateway_round_trip() {
        let gateway = fixtures::gateway();
        let context = fixtures::context();
        gateway
            .write(vec![fixtures::insert_product("X", "Widget")], &context)
            .unwrap();

        let result = gateway
            .search("product", &Criteria::new(Some(10), 0), &context)
            .unwrap();
        assert_eq!(result.total, 1);
        assert_eq!(result.entities[0].get("name"), Some(&json!("Widget")));
    }

    #[test]
    fn test_fixture_gateway_translates_duplicates() {
        let gateway = fixtures::gateway();
        let context = fixtures::context();
        gateway
            .write(vec![fixtures::insert_product("X", "Widget")], &context)
            .unwrap();
        let result = gateway.write(vec![fixtures::insert_product("X", "Widget")], &context);
        assertions::assert_domain_code(&result, "VITRINE__DUPLICATE_ENTITY");
    }

    #[test]
    fn test_assert_sorted_by_detects_order() {
        let records = vec![
            EntityRecord::new().with("name", "alpha"),
            EntityRecord::new().with("name", "beta"),
        ];
        assertions::assert_sorted_by(&records, "name");
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(50))]

        #[test]
        fn prop_generated_field_names_are_valid(name in generators::arb_field_name()) {
            prop_assert!(vitrine_core::is_valid_name(&name));
        }

        #[test]
        fn prop_generated_invalid_names_are_rejected(name in generators::arb_invalid_field_name()) {
            prop_assert!(!vitrine_core::is_valid_name(&name));
        }

        #[test]
        fn prop_field_name_validation_matches_pattern(name in generators::arb_invalid_field_name()) {
            // Definitions reject every invalid name and attach the value.
            let err = EntityDefinition::new(
                "item",
                vec![
                    FieldDef::uuid("id").primary_key(),
                    FieldDef::string(&name),
                ],
            )
            .unwrap_err();
            prop_assert_eq!(
                err,
                ValidationError::InvalidFieldName {
                    field: name.clone(),
                    value: name.clone(),
                }
            );
        }

        #[test]
        fn prop_price_transform_round_trips(price in generators::arb_price_with_list()) {
            let value = price.to_api_value();
            let parsed = Price::from_api_value(&value).unwrap();
            prop_assert_eq!(parsed, price.clone());
            // The nested mapping mirrors the presence of the list price.
            prop_assert_eq!(value["listPrice"].is_null(), price.list_price.is_none());
        }

        #[test]
        fn prop_generated_records_survive_write(record in generators::arb_product_record()) {
            let gateway = fixtures::gateway();
            let context = fixtures::context();
            gateway
                .write(
                    vec![WriteOperation::Insert {
                        entity: "product".to_string(),
                        payload: record,
                    }],
                    &context,
                )
                .unwrap();
            let result = gateway.search("product", &Criteria::default(), &context).unwrap();
            prop_assert_eq!(result.total, 1);
        }

        #[test]
        fn prop_criteria_pagination_is_window(criteria in generators::arb_criteria()) {
            let gateway = fixtures::gateway();
            let context = fixtures::context();
            let ops: Vec<WriteOperation> = (0..20)
                .map(|i| fixtures::insert_product(&format!("id{i:02}"), "Widget"))
                .collect();
            gateway.write(ops, &context).unwrap();

            let result = gateway.search("product", &criteria, &context).unwrap();
            let expected = 20usize
                .saturating_sub(criteria.offset as usize)
                .min(criteria.limit.map_or(usize::MAX, |l| l as usize));
            prop_assert_eq!(result.total, expected);
        }
    }
}
