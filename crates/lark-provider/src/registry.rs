//! Provider registry: name → provider, plus the shared config store.

use crate::config::{ConfigStore, ProviderConfig};
use crate::error::ProviderError;
use crate::traits::Provider;
use once_cell::sync::Lazy;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

/// Registry of available providers.
///
/// Lookups happen on every call, registrations mostly at startup, so the map
/// sits behind a read/write lock. Registering an existing name replaces the
/// earlier provider.
#[derive(Default)]
pub struct ProviderRegistry {
    providers: RwLock<HashMap<String, Arc<dyn Provider>>>,
    configs: ConfigStore,
}

impl ProviderRegistry {
    /// Create an empty registry with its own config store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty registry sharing `configs`.
    pub fn with_configs(configs: ConfigStore) -> Self {
        Self {
            providers: RwLock::default(),
            configs,
        }
    }

    /// The store providers built for this registry read their settings from.
    pub fn config_store(&self) -> &ConfigStore {
        &self.configs
    }

    /// Register a provider under `name`, replacing any earlier one.
    pub fn register(&self, name: impl Into<String>, provider: Arc<dyn Provider>) {
        let name = name.into();
        let previous = self
            .providers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.clone(), provider);
        if previous.is_some() {
            tracing::warn!(provider = %name, "provider re-registered; previous instance replaced");
        } else {
            tracing::debug!(provider = %name, "provider registered");
        }
    }

    /// Get a provider by name.
    pub fn lookup(&self, name: &str) -> Result<Arc<dyn Provider>, ProviderError> {
        self.providers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
            .ok_or_else(|| ProviderError::NotFound(name.to_string()))
    }

    /// Associate connection settings with `name`. Providers read them on
    /// their first invocation; an engine already built keeps its settings.
    pub fn configure(&self, name: impl Into<String>, config: ProviderConfig) {
        self.configs.set(name, config);
    }

    /// Check if a provider is registered.
    pub fn contains(&self, name: &str) -> bool {
        self.providers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }

    /// Registered provider names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .providers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.providers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.names())
            .field("configs", &self.configs.names())
            .finish()
    }
}

static GLOBAL: Lazy<ProviderRegistry> = Lazy::new(|| {
    let registry = ProviderRegistry::new();
    crate::providers::register_builtin(&registry);
    registry
});

/// Process-wide registry, created on first access with every built-in
/// provider registered. Providers still need [`ProviderRegistry::configure`]
/// before their first invocation.
pub fn global() -> &'static ProviderRegistry {
    &GLOBAL
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::Message;
    use crate::options::InvokeOptions;
    use crate::providers::chat::{ChatProvider, ProviderSpec};
    use crate::providers::echo::{Script, ScriptedFactory};
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;

    fn scripted(registry: &ProviderRegistry, name: &str, factory: Arc<ScriptedFactory>) {
        let provider = ChatProvider::new(
            ProviderSpec::new(name)
                .with_base_url("memory://test")
                .with_default_model("m"),
            registry.config_store().clone(),
            factory,
        );
        registry.register(name, Arc::new(provider));
    }

    #[test]
    fn test_lookup_unregistered_is_not_found() {
        let registry = ProviderRegistry::new();
        let err = registry.lookup("nope").err().unwrap();
        assert!(matches!(err, ProviderError::NotFound(ref name) if name == "nope"));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_register_then_lookup_returns_same_instance() {
        let registry = ProviderRegistry::new();
        let provider: Arc<dyn Provider> = Arc::new(ChatProvider::new(
            ProviderSpec::new("a").with_base_url("memory://a"),
            registry.config_store().clone(),
            Arc::new(ScriptedFactory::new(Script::Echo)),
        ));
        registry.register("a", provider.clone());
        assert!(Arc::ptr_eq(&registry.lookup("a").unwrap(), &provider));
        assert!(registry.contains("a"));
    }

    #[test]
    fn test_duplicate_registration_replaces() {
        let registry = ProviderRegistry::new();
        let first = Arc::new(ScriptedFactory::new(Script::Echo));
        let second = Arc::new(ScriptedFactory::new(Script::Echo));
        scripted(&registry, "dup", first);
        let before = registry.lookup("dup").unwrap();
        scripted(&registry, "dup", second);
        let after = registry.lookup("dup").unwrap();
        assert!(!Arc::ptr_eq(&before, &after));
        assert_eq!(registry.names(), ["dup"]);
    }

    #[test]
    fn test_names_sorted() {
        let registry = ProviderRegistry::new();
        for name in ["zeta", "alpha", "mid"] {
            scripted(&registry, name, Arc::new(ScriptedFactory::new(Script::Echo)));
        }
        assert_eq!(registry.names(), ["alpha", "mid", "zeta"]);
        assert_eq!(registry.len(), 3);
    }

    #[test]
    fn test_concurrent_registration() {
        let registry = Arc::new(ProviderRegistry::new());
        let threads: Vec<_> = (0..8)
            .map(|i| {
                let registry = registry.clone();
                std::thread::spawn(move || {
                    scripted(
                        &registry,
                        &format!("p{i}"),
                        Arc::new(ScriptedFactory::new(Script::Echo)),
                    );
                })
            })
            .collect();
        for thread in threads {
            thread.join().unwrap();
        }
        assert_eq!(registry.len(), 8);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_first_invokes_build_engine_once() {
        let registry = Arc::new(ProviderRegistry::new());
        let factory = Arc::new(
            ScriptedFactory::new(Script::Reply("hello".into()))
                .with_build_delay(Duration::from_millis(50)),
        );
        scripted(&registry, "shared", factory.clone());
        registry.configure("shared", ProviderConfig::new("k"));

        const CALLERS: usize = 12;
        let mut tasks = Vec::new();
        for _ in 0..CALLERS {
            let registry = registry.clone();
            tasks.push(tokio::spawn(async move {
                let provider = registry.lookup("shared").unwrap();
                provider
                    .invoke(
                        CancellationToken::new(),
                        vec![Message::user_text("hi")],
                        InvokeOptions::default(),
                    )
                    .await
                    .unwrap()
                    .result()
                    .await
                    .unwrap()
                    .text
            }));
        }
        for task in tasks {
            assert_eq!(task.await.unwrap(), "hello");
        }
        assert_eq!(factory.builds(), 1);
        assert_eq!(factory.calls(), CALLERS);
    }

    #[test]
    fn test_global_has_builtin_providers() {
        let registry = global();
        for name in ["openai", "deepseek", "ollama", "echo"] {
            assert!(registry.contains(name), "missing {name}");
        }
    }
}
