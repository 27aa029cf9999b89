//! Error types for the lark-core crate.

use lark_provider::ProviderError;
use lark_tools::ToolError;

/// Core error type for lark.
#[derive(Debug, thiserror::Error)]
pub enum LarkError {
    /// Provider lookup or invocation failed
    #[error(transparent)]
    Provider(#[from] ProviderError),

    /// Tool lookup or execution failed
    #[error(transparent)]
    Tool(#[from] ToolError),

    /// I/O error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
