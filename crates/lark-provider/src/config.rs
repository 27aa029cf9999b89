//! Per-provider connection settings.

use crate::error::ProviderError;
use crate::providers::ProviderSpec;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

/// Connection settings for one provider, as supplied by the config loader.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderConfig {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
}

impl ProviderConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: Some(api_key.into()),
            base_url: None,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    /// Check this config against what `spec` needs. Blank values count as
    /// missing; the base URL falls back to the provider's default endpoint.
    pub fn validate(&self, spec: &ProviderSpec) -> Result<ValidatedConfig, ProviderError> {
        let api_key = non_blank(self.api_key.as_deref());
        if spec.requires_api_key && api_key.is_none() {
            return Err(ProviderError::missing_config(&spec.name, "api_key is not set"));
        }

        let base_url = non_blank(self.base_url.as_deref())
            .or(spec.default_base_url.as_deref())
            .ok_or_else(|| ProviderError::missing_config(&spec.name, "base_url is not set"))?;

        Ok(ValidatedConfig {
            api_key: api_key.map(str::to_string),
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// Settings that passed validation; what a transport engine is built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedConfig {
    pub api_key: Option<String>,
    /// Base URL without a trailing slash.
    pub base_url: String,
}

/// Shared map of provider name to [`ProviderConfig`].
///
/// Cloning yields another handle to the same map. Providers read their entry
/// on first invocation; entries are expected to be set during startup.
#[derive(Debug, Clone, Default)]
pub struct ConfigStore {
    inner: Arc<RwLock<HashMap<String, ProviderConfig>>>,
}

impl ConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the config for `provider`, replacing any earlier entry.
    pub fn set(&self, provider: impl Into<String>, config: ProviderConfig) {
        self.inner
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(provider.into(), config);
    }

    pub fn get(&self, provider: &str) -> Option<ProviderConfig> {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(provider)
            .cloned()
    }

    /// Configured provider names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }
}
