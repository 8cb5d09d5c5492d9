//! Criteria - storage-agnostic search description
//!
//! A [`Criteria`] is a mutable builder holding pagination, sort clauses,
//! filters, association paths, and an optional source-field projection. It is
//! pure configuration: building one performs no I/O, and the gateway treats a
//! handed-over criteria as a frozen value (plain `Clone`, no interior
//! mutability), so later builder mutation cannot affect an in-flight search.

use serde::{Deserialize, Serialize};

/// Sort direction for a sort clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Ascending,
    Descending,
}

/// A single sort clause.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSorting {
    /// Field to sort by.
    pub field: String,
    /// Direction to apply.
    pub direction: SortDirection,
    /// Natural ordering: strings compare case-insensitively.
    pub natural: bool,
}

impl FieldSorting {
    /// Create a sort clause.
    pub fn new(field: &str, direction: SortDirection) -> Self {
        Self {
            field: field.to_string(),
            direction,
            natural: false,
        }
    }

    /// Ascending sort on a field.
    pub fn ascending(field: &str) -> Self {
        Self::new(field, SortDirection::Ascending)
    }

    /// Descending sort on a field.
    pub fn descending(field: &str) -> Self {
        Self::new(field, SortDirection::Descending)
    }

    /// Enable natural (case-insensitive) ordering.
    pub fn natural(mut self) -> Self {
        self.natural = true;
        self
    }
}

/// Logical combination mode for [`Filter::Multi`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    And,
    Or,
}

/// Filter expression evaluated by the backing store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Filter {
    /// Field equals value.
    Equals {
        field: String,
        value: serde_json::Value,
    },
    /// Field equals any of the values.
    EqualsAny {
        field: String,
        values: Vec<serde_json::Value>,
    },
    /// String field contains the substring.
    Contains { field: String, value: String },
    /// String field starts with the prefix.
    Prefix { field: String, value: String },
    /// String field ends with the suffix.
    Suffix { field: String, value: String },
    /// Field falls inside the (partially) bounded range.
    Range {
        field: String,
        gt: Option<serde_json::Value>,
        gte: Option<serde_json::Value>,
        lt: Option<serde_json::Value>,
        lte: Option<serde_json::Value>,
    },
    /// Negation of the inner filter.
    Not(Box<Filter>),
    /// Logical combination of inner filters.
    Multi {
        operator: MatchMode,
        filters: Vec<Filter>,
    },
}

impl Filter {
    /// Equality filter.
    pub fn equals(field: &str, value: impl Into<serde_json::Value>) -> Self {
        Filter::Equals {
            field: field.to_string(),
            value: value.into(),
        }
    }

    /// Membership filter.
    pub fn equals_any(field: &str, values: Vec<serde_json::Value>) -> Self {
        Filter::EqualsAny {
            field: field.to_string(),
            values,
        }
    }

    /// Substring filter.
    pub fn contains(field: &str, value: &str) -> Self {
        Filter::Contains {
            field: field.to_string(),
            value: value.to_string(),
        }
    }

    /// Unbounded range filter; set bounds on the returned value.
    pub fn range(field: &str) -> Self {
        Filter::Range {
            field: field.to_string(),
            gt: None,
            gte: None,
            lt: None,
            lte: None,
        }
    }

    /// Every field name referenced by this filter, including nested ones.
    pub fn referenced_fields(&self) -> Vec<&str> {
        match self {
            Filter::Equals { field, .. }
            | Filter::EqualsAny { field, .. }
            | Filter::Contains { field, .. }
            | Filter::Prefix { field, .. }
            | Filter::Suffix { field, .. }
            | Filter::Range { field, .. } => vec![field.as_str()],
            Filter::Not(inner) => inner.referenced_fields(),
            Filter::Multi { filters, .. } => filters
                .iter()
                .flat_map(|f| f.referenced_fields())
                .collect(),
        }
    }
}

/// Storage-agnostic search request.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Criteria {
    /// Maximum number of records to return; `None` means unbounded (the
    /// gateway still caps it at the configured maximum).
    pub limit: Option<u32>,
    /// Number of records to skip.
    pub offset: u32,
    /// Sort clauses, applied in insertion order (stable multi-key sort).
    pub sortings: Vec<FieldSorting>,
    /// Filters, all of which must match.
    pub filters: Vec<Filter>,
    /// Association paths to eager-load.
    pub associations: Vec<String>,
    /// Requested fields; non-empty means partial hydration.
    pub source: Vec<String>,
}

impl Criteria {
    /// Create a criteria with a paging window.
    pub fn new(limit: Option<u32>, offset: u32) -> Self {
        Self {
            limit,
            offset,
            ..Self::default()
        }
    }

    /// Append a sort clause. Clauses apply in insertion order.
    pub fn add_sorting(&mut self, sorting: FieldSorting) -> &mut Self {
        self.sortings.push(sorting);
        self
    }

    /// Add a filter. Adding an identical filter twice is a no-op.
    pub fn add_filter(&mut self, filter: Filter) -> &mut Self {
        if !self.filters.contains(&filter) {
            self.filters.push(filter);
        }
        self
    }

    /// Request an association to be eager-loaded. Idempotent per path;
    /// insertion order is kept.
    pub fn add_association(&mut self, path: &str) -> &mut Self {
        if !self.associations.iter().any(|a| a == path) {
            self.associations.push(path.to_string());
        }
        self
    }

    /// Restrict hydration to the given field. Idempotent per field.
    pub fn add_source_field(&mut self, field: &str) -> &mut Self {
        if !self.source.iter().any(|f| f == field) {
            self.source.push(field.to_string());
        }
        self
    }

    /// Whether this criteria requests partial hydration.
    pub fn is_partial(&self) -> bool {
        !self.source.is_empty()
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paging_window() {
        let criteria = Criteria::new(Some(10), 20);
        assert_eq!(criteria.limit, Some(10));
        assert_eq!(criteria.offset, 20);
        assert!(!criteria.is_partial());
    }

    #[test]
    fn test_sortings_keep_insertion_order() {
        let mut criteria = Criteria::default();
        criteria
            .add_sorting(FieldSorting::ascending("name"))
            .add_sorting(FieldSorting::descending("id"));
        assert_eq!(criteria.sortings[0].field, "name");
        assert_eq!(criteria.sortings[1].field, "id");
    }

    #[test]
    fn test_add_filter_is_idempotent() {
        let mut criteria = Criteria::default();
        criteria.add_filter(Filter::equals("name", "Widget"));
        criteria.add_filter(Filter::equals("name", "Widget"));
        criteria.add_filter(Filter::equals("name", "Gadget"));
        assert_eq!(criteria.filters.len(), 2);
    }

    #[test]
    fn test_add_association_is_idempotent_and_ordered() {
        let mut criteria = Criteria::default();
        criteria.add_association("category");
        criteria.add_association("manufacturer");
        criteria.add_association("category");
        assert_eq!(criteria.associations, vec!["category", "manufacturer"]);
    }

    #[test]
    fn test_source_fields_mark_partial() {
        let mut criteria = Criteria::default();
        criteria.add_source_field("name").add_source_field("name");
        assert!(criteria.is_partial());
        assert_eq!(criteria.source.len(), 1);
    }

    #[test]
    fn test_referenced_fields_walks_nested_filters() {
        let filter = Filter::Multi {
            operator: MatchMode::Or,
            filters: vec![
                Filter::equals("name", "Widget"),
                Filter::Not(Box::new(Filter::contains("description", "legacy"))),
            ],
        };
        let mut fields = filter.referenced_fields();
        fields.sort_unstable();
        assert_eq!(fields, vec!["description", "name"]);
    }

    #[test]
    fn test_handed_over_criteria_is_insulated_from_builder() {
        let mut criteria = Criteria::new(Some(5), 0);
        criteria.add_filter(Filter::equals("name", "Widget"));
        let snapshot = criteria.clone();
        criteria.add_filter(Filter::equals("stock", 0));
        assert_eq!(snapshot.filters.len(), 1);
        assert_eq!(criteria.filters.len(), 2);
    }
}
