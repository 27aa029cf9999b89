//! Error types for the lark-provider crate.

/// Errors that can occur while resolving or invoking an LLM provider.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    /// No provider is registered under the requested name.
    #[error("Provider not found: {0}")]
    NotFound(String),

    /// The provider has no usable configuration (missing API key or base URL).
    #[error("Configuration missing for provider '{provider}': {detail}")]
    ConfigurationMissing { provider: String, detail: String },

    /// Caller supplied conflicting or out-of-range options.
    #[error("Invalid options: {0}")]
    InvalidOptions(String),

    /// Network-level failure talking to the remote endpoint.
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The remote endpoint answered with an error.
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Malformed or truncated streamed response.
    #[error("Stream error: {0}")]
    Stream(String),

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The invocation was cancelled before it completed.
    #[error("Invocation cancelled")]
    Cancelled,
}

impl ProviderError {
    pub(crate) fn missing_config(provider: &str, detail: impl Into<String>) -> Self {
        Self::ConfigurationMissing {
            provider: provider.to_string(),
            detail: detail.into(),
        }
    }

    /// Whether the caller may reasonably retry the same request.
    ///
    /// The runtime itself never retries.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Transport(_) => true,
            Self::Api { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}
