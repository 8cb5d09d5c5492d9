//! Price value objects
//!
//! Immutable gross/net amounts bound to a currency, with an optional nested
//! list price. The transform to the serializable mapping is stateless and its
//! key set (`gross`, `net`, `linked`, `currencyId`, `listPrice`) is a stable
//! contract consumed by downstream serializers.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::ValidationError;

/// Gross/net price for one currency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Price {
    pub gross: f64,
    pub net: f64,
    /// Whether gross and net are linked through the tax rate.
    pub linked: bool,
    pub currency_id: String,
    pub list_price: Option<Box<Price>>,
}

impl Price {
    /// Create a price without a list price.
    pub fn new(currency_id: &str, gross: f64, net: f64, linked: bool) -> Self {
        Self {
            gross,
            net,
            linked,
            currency_id: currency_id.to_string(),
            list_price: None,
        }
    }

    /// Attach a list price.
    pub fn with_list_price(mut self, list_price: Price) -> Self {
        self.list_price = Some(Box::new(list_price));
        self
    }

    /// Transform to the stable API mapping.
    pub fn to_api_value(&self) -> Value {
        let list_price = match &self.list_price {
            Some(price) => price.to_api_value(),
            None => Value::Null,
        };
        json!({
            "gross": self.gross,
            "net": self.net,
            "linked": self.linked,
            "currencyId": self.currency_id,
            "listPrice": list_price,
        })
    }

    /// Parse a price back out of the API mapping.
    pub fn from_api_value(value: &Value) -> Result<Self, ValidationError> {
        let map = value
            .as_object()
            .ok_or_else(|| invalid_price("not a mapping"))?;
        let gross = number_entry(map, "gross")?;
        let net = number_entry(map, "net")?;
        let linked = map
            .get("linked")
            .and_then(Value::as_bool)
            .ok_or_else(|| invalid_price("missing bool entry linked"))?;
        let currency_id = map
            .get("currencyId")
            .and_then(Value::as_str)
            .ok_or_else(|| invalid_price("missing string entry currencyId"))?;

        let list_price = match map.get("listPrice") {
            None | Some(Value::Null) => None,
            Some(nested) => Some(Box::new(Self::from_api_value(nested)?)),
        };

        Ok(Self {
            gross,
            net,
            linked,
            currency_id: currency_id.to_string(),
            list_price,
        })
    }
}

fn invalid_price(reason: &str) -> ValidationError {
    ValidationError::InvalidPrice {
        reason: reason.to_string(),
    }
}

fn number_entry(map: &Map<String, Value>, key: &str) -> Result<f64, ValidationError> {
    map.get(key)
        .and_then(Value::as_f64)
        .ok_or_else(|| invalid_price(&format!("missing number entry {key}")))
}

/// Prices for multiple currencies.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PriceCollection(pub Vec<Price>);

impl PriceCollection {
    pub fn new(prices: Vec<Price>) -> Self {
        Self(prices)
    }

    /// Price for a specific currency.
    pub fn currency(&self, currency_id: &str) -> Option<&Price> {
        self.0.iter().find(|p| p.currency_id == currency_id)
    }

    pub fn first(&self) -> Option<&Price> {
        self.0.first()
    }

    pub fn push(&mut self, price: Price) {
        self.0.push(price);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Transform every price to the stable API mapping.
    pub fn to_api_value(&self) -> Value {
        Value::Array(self.0.iter().map(Price::to_api_value).collect())
    }
}

// =============================================================================
// TESTS
// =============================================================================
