//! DAL configuration

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::DurationMs;

/// Rate limiter configuration (fixed window, per context source).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateLimitConfig {
    pub enabled: bool,
    /// Requests allowed per window.
    pub max_requests: u32,
    /// Window length in milliseconds.
    pub window: DurationMs,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_requests: 60,
            window: 60_000,
        }
    }
}

/// Configuration for the data-abstraction layer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DalConfig {
    /// Hard cap applied to criteria limits; unbounded criteria are clamped
    /// to this value.
    pub max_criteria_limit: u32,
    pub default_language_id: String,
    pub default_currency_id: String,
    pub rate_limit: RateLimitConfig,
}

impl Default for DalConfig {
    fn default() -> Self {
        Self {
            max_criteria_limit: 500,
            default_language_id: "en-GB".to_string(),
            default_currency_id: "EUR".to_string(),
            rate_limit: RateLimitConfig::default(),
        }
    }
}

impl DalConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_criteria_limit == 0 {
            return Err(ConfigError::InvalidValue {
                field: "max_criteria_limit".to_string(),
                value: "0".to_string(),
                reason: "must be positive".to_string(),
            });
        }
        if self.default_language_id.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "default_language_id".to_string(),
                value: String::new(),
                reason: "must not be empty".to_string(),
            });
        }
        if self.default_currency_id.is_empty() {
            return Err(ConfigError::InvalidValue {
                field: "default_currency_id".to_string(),
                value: String::new(),
                reason: "must not be empty".to_string(),
            });
        }
        if self.rate_limit.enabled {
            if self.rate_limit.max_requests == 0 {
                return Err(ConfigError::InvalidValue {
                    field: "rate_limit.max_requests".to_string(),
                    value: "0".to_string(),
                    reason: "must be positive when the limiter is enabled".to_string(),
                });
            }
            if self.rate_limit.window <= 0 {
                return Err(ConfigError::InvalidValue {
                    field: "rate_limit.window".to_string(),
                    value: self.rate_limit.window.to_string(),
                    reason: "must be positive when the limiter is enabled".to_string(),
                });
            }
        }
        Ok(())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(DalConfig::default().validate().is_ok());
    }

    #[test]
    fn test_zero_limit_rejected() {
        let config = DalConfig {
            max_criteria_limit: 0,
            ..DalConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue { ref field, .. } if field == "max_criteria_limit"
        ));
    }

    #[test]
    fn test_enabled_limiter_requires_positive_window() {
        let mut config = DalConfig::default();
        config.rate_limit.enabled = true;
        config.rate_limit.window = 0;
        let err = config.validate().unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidValue { ref field, .. } if field == "rate_limit.window"
        ));

        // A disabled limiter skips the window check.
        config.rate_limit.enabled = false;
        assert!(config.validate().is_ok());
    }
}
