//! Built-in providers speaking the OpenAI chat completions protocol.

use crate::config::ConfigStore;
use crate::hook::TracingHook;
use crate::providers::chat::{ChatProvider, ProviderSpec};
use crate::providers::echo::new_echo_provider;
use crate::providers::openai_compat::OpenAiCompatFactory;
use crate::registry::ProviderRegistry;
use std::sync::Arc;

pub const OPENAI: &str = "openai";
pub const DEEPSEEK: &str = "deepseek";
pub const MOONSHOT: &str = "moonshot";
pub const QWEN: &str = "qwen";
pub const ZHIPU: &str = "zhipu";
pub const DOUBAO: &str = "doubao";
pub const OLLAMA: &str = "ollama";
/// Any other compatible endpoint; needs both an API key and a base URL.
pub const OPENAI_COMPAT: &str = "openai-compat";

/// Specs of every built-in HTTP provider.
pub fn builtin_specs() -> Vec<ProviderSpec> {
    vec![
        ProviderSpec::new(OPENAI)
            .with_base_url("https://api.openai.com/v1")
            .with_default_model("gpt-4o-mini"),
        ProviderSpec::new(DEEPSEEK)
            .with_base_url("https://api.deepseek.com")
            .with_default_model("deepseek-chat"),
        ProviderSpec::new(MOONSHOT)
            .with_base_url("https://api.moonshot.cn/v1")
            .with_default_model("moonshot-v1-8k"),
        ProviderSpec::new(QWEN)
            .with_base_url("https://dashscope.aliyuncs.com/compatible-mode/v1")
            .with_default_model("qwen-plus"),
        ProviderSpec::new(ZHIPU)
            .with_base_url("https://open.bigmodel.cn/api/paas/v4")
            .with_default_model("glm-4-flash"),
        // Doubao models are addressed by endpoint id, so there is no default.
        ProviderSpec::new(DOUBAO).with_base_url("https://ark.cn-beijing.volces.com/api/v3"),
        ProviderSpec::new(OLLAMA)
            .with_base_url("http://localhost:11434/v1")
            .with_default_model("llama3.2")
            .keyless(),
        ProviderSpec::new(OPENAI_COMPAT),
    ]
}

/// Create an HTTP provider from `spec`.
pub fn new_http_provider(spec: ProviderSpec, configs: ConfigStore) -> ChatProvider {
    ChatProvider::new(spec, configs, Arc::new(OpenAiCompatFactory))
}

/// Register every built-in provider, `echo` included, each with a
/// [`TracingHook`]. Providers share the registry's config store.
pub fn register_builtin(registry: &ProviderRegistry) {
    let configs = registry.config_store();
    for spec in builtin_specs() {
        let name = spec.name.clone();
        let provider = new_http_provider(spec, configs.clone()).with_hook(Arc::new(TracingHook));
        registry.register(name, Arc::new(provider));
    }
    let echo = new_echo_provider(configs.clone()).with_hook(Arc::new(TracingHook));
    registry.register(crate::providers::echo::ECHO, Arc::new(echo));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProviderConfig;
    use crate::error::ProviderError;
    use crate::message::Message;
    use crate::options::InvokeOptions;
    use tokio_util::sync::CancellationToken;

    #[test]
    fn test_builtin_names_unique() {
        let mut names: Vec<_> = builtin_specs().into_iter().map(|s| s.name).collect();
        let total = names.len();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), total);
    }

    #[test]
    fn test_register_builtin() {
        let registry = ProviderRegistry::new();
        register_builtin(&registry);
        assert_eq!(
            registry.names(),
            [
                "deepseek",
                "doubao",
                "echo",
                "moonshot",
                "ollama",
                "openai",
                "openai-compat",
                "qwen",
                "zhipu"
            ]
        );
        let openai = registry.lookup(OPENAI).unwrap();
        assert_eq!(openai.default_model(), Some("gpt-4o-mini"));
        assert_eq!(registry.lookup(DOUBAO).unwrap().default_model(), None);
    }

    #[tokio::test]
    async fn test_unconfigured_openai_reports_missing_config() {
        let registry = ProviderRegistry::new();
        register_builtin(&registry);
        let err = registry
            .lookup(OPENAI)
            .unwrap()
            .invoke(
                CancellationToken::new(),
                vec![Message::user_text("hi")],
                InvokeOptions::default(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::ConfigurationMissing { ref provider, .. } if provider == "openai"));
    }

    #[tokio::test]
    async fn test_openai_compat_requires_base_url() {
        let registry = ProviderRegistry::new();
        register_builtin(&registry);
        registry.configure(OPENAI_COMPAT, ProviderConfig::new("k"));
        let err = registry
            .lookup(OPENAI_COMPAT)
            .unwrap()
            .invoke(
                CancellationToken::new(),
                vec![Message::user_text("hi")],
                InvokeOptions::builder().model("any").build(),
            )
            .await
            .unwrap_err();
        assert!(err.to_string().contains("base_url"));
    }
}
