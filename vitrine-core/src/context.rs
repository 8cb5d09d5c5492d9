//! Request context
//!
//! A [`Context`] travels with every gateway call. It is request-scoped,
//! cheap to clone, and never mutated after resolution.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::DalConfig;
use crate::identity::EntityId;

/// Origin of a request, used for rate-limit accounting and diagnostics.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContextSource {
    /// Internal callers (indexers, maintenance tasks).
    System,
    /// External API callers, optionally identified by integration name.
    Api { integration: Option<String> },
}

impl ContextSource {
    /// Stable key for per-source accounting.
    pub fn key(&self) -> String {
        match self {
            ContextSource::System => "system".to_string(),
            ContextSource::Api { integration: None } => "api".to_string(),
            ContextSource::Api {
                integration: Some(name),
            } => format!("api:{name}"),
        }
    }
}

/// Per-request execution context.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Context {
    pub context_id: EntityId,
    /// Language used to resolve translatable field values.
    pub language_id: String,
    /// Fallback language when a translation is missing.
    pub fallback_language_id: Option<String>,
    /// Currency used when resolving price collections.
    pub currency_id: String,
    pub source: ContextSource,
}

impl Context {
    /// System context with explicit language and currency.
    pub fn system(language_id: &str, currency_id: &str) -> Self {
        Self {
            context_id: Uuid::now_v7(),
            language_id: language_id.to_string(),
            fallback_language_id: None,
            currency_id: currency_id.to_string(),
            source: ContextSource::System,
        }
    }

    /// Resolve a context from config defaults, applying optional overrides.
    pub fn resolve(config: &DalConfig, language_id: Option<&str>, currency_id: Option<&str>) -> Self {
        Self {
            context_id: Uuid::now_v7(),
            language_id: language_id
                .unwrap_or(&config.default_language_id)
                .to_string(),
            fallback_language_id: Some(config.default_language_id.clone()),
            currency_id: currency_id
                .unwrap_or(&config.default_currency_id)
                .to_string(),
            source: ContextSource::System,
        }
    }

    /// Set the fallback language.
    pub fn with_fallback_language(mut self, language_id: &str) -> Self {
        self.fallback_language_id = Some(language_id.to_string());
        self
    }

    /// Set the source.
    pub fn with_source(mut self, source: ContextSource) -> Self {
        self.source = source;
        self
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_context() {
        let ctx = Context::system("en-GB", "EUR");
        assert_eq!(ctx.language_id, "en-GB");
        assert_eq!(ctx.currency_id, "EUR");
        assert_eq!(ctx.source, ContextSource::System);
        assert!(ctx.fallback_language_id.is_none());
    }

    #[test]
    fn test_resolve_applies_overrides_and_fallback() {
        let config = DalConfig::default();
        let ctx = Context::resolve(&config, Some("de-DE"), None);
        assert_eq!(ctx.language_id, "de-DE");
        assert_eq!(ctx.currency_id, config.default_currency_id);
        assert_eq!(
            ctx.fallback_language_id.as_deref(),
            Some(config.default_language_id.as_str())
        );
    }

    #[test]
    fn test_source_keys() {
        assert_eq!(ContextSource::System.key(), "system");
        assert_eq!(ContextSource::Api { integration: None }.key(), "api");
        assert_eq!(
            ContextSource::Api {
                integration: Some("erp".to_string())
            }
            .key(),
            "api:erp"
        );
    }
}
