//! Tool registry for managing available tools.

use crate::descriptor::{Arguments, ToolDescriptor};
use crate::error::ToolError;
use once_cell::sync::Lazy;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

/// Registry of available tools.
///
/// Stores tools by name and provides lookup and invocation. Cloning yields
/// another handle to the same tools. Registering an existing name replaces
/// the earlier tool.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    tools: Arc<RwLock<HashMap<String, Arc<ToolDescriptor>>>>,
}

impl ToolRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool. Replaces any existing tool with the same name.
    pub fn register(&self, tool: ToolDescriptor) -> Result<(), ToolError> {
        tool.validate()?;
        let name = tool.name().to_string();
        let previous = self
            .tools
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(name.clone(), Arc::new(tool));
        if previous.is_some() {
            tracing::warn!(tool = %name, "tool re-registered; previous descriptor replaced");
        } else {
            tracing::debug!(tool = %name, "tool registered");
        }
        Ok(())
    }

    /// Get a tool by name.
    pub fn lookup(&self, name: &str) -> Result<Arc<ToolDescriptor>, ToolError> {
        self.tools
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned()
            .ok_or_else(|| ToolError::NotFound(name.to_string()))
    }

    /// Check if a tool is registered.
    pub fn has(&self, name: &str) -> bool {
        self.tools
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(name)
    }

    /// Validate `args` against the tool's parameters and run it.
    pub async fn invoke(&self, name: &str, args: Arguments) -> Result<String, ToolError> {
        let tool = self.lookup(name)?;
        tracing::debug!(tool = %name, args = args.len(), "invoking tool");
        let result = tool.invoke(args).await;
        if let Err(error) = &result {
            tracing::warn!(tool = %name, %error, "tool failed");
        }
        result
    }

    /// Like [`invoke`](Self::invoke), with arguments as a JSON object string
    /// the way models emit them. An empty string means no arguments.
    pub async fn invoke_json(&self, name: &str, args: &str) -> Result<String, ToolError> {
        let args = if args.trim().is_empty() {
            Arguments::new()
        } else {
            match serde_json::from_str(args) {
                Ok(Value::Object(map)) => map,
                Ok(other) => {
                    return Err(ToolError::InvalidParameters(format!(
                        "arguments must be a JSON object, got {other}"
                    )))
                }
                Err(e) => return Err(ToolError::InvalidParameters(e.to_string())),
            }
        };
        self.invoke(name, args).await
    }

    /// Get all registered tool names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .tools
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }

    /// Get all registered tools, sorted by name.
    pub fn all(&self) -> Vec<Arc<ToolDescriptor>> {
        let mut tools: Vec<_> = self
            .tools
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();
        tools.sort_by(|a, b| a.name().cmp(b.name()));
        tools
    }

    /// Number of registered tools.
    pub fn len(&self) -> usize {
        self.tools
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl std::fmt::Debug for ToolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolRegistry")
            .field("tools", &self.names())
            .finish()
    }
}

static GLOBAL: Lazy<ToolRegistry> = Lazy::new(|| {
    let registry = ToolRegistry::new();
    crate::builtin::register_stateless(&registry);
    registry
});

/// Process-wide registry, created on first access with the built-in tools
/// that need no working directory.
pub fn global() -> &'static ToolRegistry {
    &GLOBAL
}
