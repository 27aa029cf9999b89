//! The runtime handle: provider and tool registries wired together.

use crate::config::Config;
use crate::error::LarkError;
use lark_provider::providers::register_builtin;
use lark_provider::{
    InvokeOptions, Message, Provider, ProviderRegistry, Response, ToolCall, ToolDefinition,
};
use lark_tools::{ToolDescriptor, ToolRegistry};
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Provider and tool registries plus the caller-facing defaults.
///
/// Cloning is cheap and yields a handle to the same registries.
#[derive(Debug, Clone)]
pub struct Runtime {
    providers: Arc<ProviderRegistry>,
    tools: ToolRegistry,
    default_provider: String,
    default_model: Option<String>,
}

impl Runtime {
    /// Build a runtime from user configuration.
    ///
    /// Order: create the provider registry, register the built-in
    /// providers, store every provider config, then register the built-in
    /// tools confined to `working_dir`. Nothing touches the network; each
    /// provider builds its transport on its first invocation.
    pub fn bootstrap(config: &Config, working_dir: &Path) -> Result<Self, LarkError> {
        let providers = ProviderRegistry::new();
        register_builtin(&providers);
        for (name, provider_config) in &config.providers {
            if !providers.contains(name) {
                tracing::warn!(provider = %name, "configuration for unknown provider");
            }
            providers.configure(name.clone(), provider_config.clone());
        }

        let tools = ToolRegistry::new();
        lark_tools::register_all(&tools, working_dir)?;

        tracing::info!(
            providers = providers.len(),
            tools = tools.len(),
            default_provider = %config.default_provider,
            "runtime ready"
        );
        Ok(Self::from_parts(
            Arc::new(providers),
            tools,
            config.default_provider.clone(),
            config.default_model.clone(),
        ))
    }

    /// Assemble a runtime from registries the caller already set up.
    pub fn from_parts(
        providers: Arc<ProviderRegistry>,
        tools: ToolRegistry,
        default_provider: impl Into<String>,
        default_model: Option<String>,
    ) -> Self {
        Self {
            providers,
            tools,
            default_provider: default_provider.into(),
            default_model,
        }
    }

    pub fn providers(&self) -> &ProviderRegistry {
        &self.providers
    }

    pub fn tools(&self) -> &ToolRegistry {
        &self.tools
    }

    pub fn default_provider(&self) -> &str {
        &self.default_provider
    }

    /// Look up `name`, or the default provider when `None`.
    pub fn provider(&self, name: Option<&str>) -> Result<Arc<dyn Provider>, LarkError> {
        let name = name.unwrap_or(&self.default_provider);
        Ok(self.providers.lookup(name)?)
    }

    /// Invoke a provider. The configured default model applies only to the
    /// default provider, and only when `options` names no model.
    pub async fn invoke(
        &self,
        cancel: CancellationToken,
        provider: Option<&str>,
        messages: Vec<Message>,
        options: InvokeOptions,
    ) -> Result<Response, LarkError> {
        let name = provider.unwrap_or(&self.default_provider);
        let options = match (&self.default_model, options.model()) {
            (Some(model), None) if name == self.default_provider => {
                options.to_builder().model(model.clone()).build()
            }
            _ => options,
        };
        let provider = self.providers.lookup(name)?;
        Ok(provider.invoke(cancel, messages, options).await?)
    }

    /// Every registered tool as a definition to offer the model.
    pub fn tool_definitions(&self) -> Vec<ToolDefinition> {
        self.tools
            .all()
            .iter()
            .map(|tool| to_tool_definition(tool))
            .collect()
    }

    /// Run a tool call emitted by a model and wrap the outcome as a tool
    /// message. Tool failures become the message text, tagged with the
    /// error kind, so the model can react.
    pub async fn run_tool_call(&self, call: &ToolCall) -> Message {
        let text = match self.tools.invoke_json(&call.name, &call.arguments).await {
            Ok(output) => output,
            Err(error) => {
                tracing::warn!(
                    tool = %call.name,
                    call_id = %call.id,
                    kind = error.kind(),
                    %error,
                    "tool call failed"
                );
                format!("error [{}]: {error}", error.kind())
            }
        };
        Message::tool(text, call.id.clone())
    }
}

/// Render a tool descriptor as a provider tool definition.
pub fn to_tool_definition(tool: &ToolDescriptor) -> ToolDefinition {
    ToolDefinition {
        name: tool.name().to_string(),
        description: tool.description().to_string(),
        parameters: tool.parameters_schema(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lark_provider::{ProviderConfig, ProviderError, Role};
    use tempfile::TempDir;

    fn runtime(dir: &TempDir, config: Config) -> Runtime {
        Runtime::bootstrap(&config, dir.path()).unwrap()
    }

    #[test]
    fn test_bootstrap_registers_builtins() {
        let dir = TempDir::new().unwrap();
        let rt = runtime(&dir, Config::default());
        assert!(rt.providers().contains("openai"));
        assert!(rt.providers().contains("echo"));
        assert!(rt.tools().has("read_file"));
        assert_eq!(rt.default_provider(), "openai");
    }

    #[test]
    fn test_tool_definitions_sorted() {
        let dir = TempDir::new().unwrap();
        let defs = runtime(&dir, Config::default()).tool_definitions();
        let names: Vec<_> = defs.iter().map(|d| d.name.as_str()).collect();
        assert_eq!(names, ["current_date", "read_file", "think", "write_file"]);
        assert_eq!(defs[2].parameters["type"], "object");
    }

    #[tokio::test]
    async fn test_invoke_default_provider_with_default_model() {
        let dir = TempDir::new().unwrap();
        let mut config = Config {
            default_provider: "echo".to_string(),
            default_model: Some("echo-2".to_string()),
            ..Default::default()
        };
        config
            .providers
            .insert("echo".to_string(), ProviderConfig::new("k"));
        let rt = runtime(&dir, config);

        let completion = rt
            .invoke(
                CancellationToken::new(),
                None,
                vec![Message::user_text("ping")],
                InvokeOptions::default(),
            )
            .await
            .unwrap()
            .result()
            .await
            .unwrap();
        assert_eq!(completion.text, "ping");
        assert_eq!(completion.model, "echo-2");
    }

    #[tokio::test]
    async fn test_unconfigured_provider_error() {
        let dir = TempDir::new().unwrap();
        let rt = runtime(&dir, Config::default());
        let err = rt
            .invoke(
                CancellationToken::new(),
                Some("deepseek"),
                vec![Message::user_text("hi")],
                InvokeOptions::default(),
            )
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            LarkError::Provider(ProviderError::ConfigurationMissing { .. })
        ));
    }

    #[test]
    fn test_unknown_provider_not_found() {
        let dir = TempDir::new().unwrap();
        let rt = runtime(&dir, Config::default());
        assert!(matches!(
            rt.provider(Some("nope")),
            Err(LarkError::Provider(ProviderError::NotFound(_)))
        ));
    }

    #[tokio::test]
    async fn test_run_tool_call() {
        let dir = TempDir::new().unwrap();
        let rt = runtime(&dir, Config::default());
        let message = rt
            .run_tool_call(&ToolCall {
                id: "call_7".to_string(),
                name: "think".to_string(),
                arguments: r#"{"task": "sort files"}"#.to_string(),
            })
            .await;
        assert_eq!(message.role, Role::Tool);
        assert_eq!(message.tool_call_id.as_deref(), Some("call_7"));
        assert!(message.text().starts_with("Task: sort files"));

        let failed = rt
            .run_tool_call(&ToolCall {
                id: "call_8".to_string(),
                name: "missing".to_string(),
                arguments: String::new(),
            })
            .await;
        assert_eq!(failed.text(), "error [not_found]: Tool not found: missing");

        let invalid = rt
            .run_tool_call(&ToolCall {
                id: "call_9".to_string(),
                name: "think".to_string(),
                arguments: "{}".to_string(),
            })
            .await;
        assert!(invalid.text().starts_with("error [missing_parameter]: "));
        assert_eq!(invalid.tool_call_id.as_deref(), Some("call_9"));
    }
}
