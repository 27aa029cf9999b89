//! Per-call invocation options.

use crate::error::ProviderError;
use serde::{Deserialize, Serialize};

/// Upper bound on stop sequences accepted by OpenAI-style endpoints.
const MAX_STOP_SEQUENCES: usize = 4;

/// Tool definition offered to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Tool name.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// JSON Schema for the tool's parameters.
    pub parameters: serde_json::Value,
}

/// Immutable options for one `invoke` call.
///
/// Built with [`InvokeOptions::builder`]. Unset values fall back to the
/// provider's defaults.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InvokeOptions {
    stream: bool,
    model: Option<String>,
    temperature: Option<f32>,
    top_p: Option<f32>,
    max_tokens: Option<u32>,
    stop: Vec<String>,
    seed: Option<u64>,
    presence_penalty: Option<f32>,
    frequency_penalty: Option<f32>,
    json_mode: bool,
    tools: Vec<ToolDefinition>,
}

impl InvokeOptions {
    pub fn builder() -> InvokeOptionsBuilder {
        InvokeOptionsBuilder::default()
    }

    /// Shorthand for `builder().stream(true).build()`.
    pub fn streaming() -> Self {
        Self::builder().stream(true).build()
    }

    /// A builder starting from these options.
    pub fn to_builder(&self) -> InvokeOptionsBuilder {
        InvokeOptionsBuilder {
            inner: self.clone(),
        }
    }

    pub fn stream(&self) -> bool {
        self.stream
    }

    pub fn model(&self) -> Option<&str> {
        self.model.as_deref()
    }

    pub fn temperature(&self) -> Option<f32> {
        self.temperature
    }

    pub fn top_p(&self) -> Option<f32> {
        self.top_p
    }

    pub fn max_tokens(&self) -> Option<u32> {
        self.max_tokens
    }

    pub fn stop(&self) -> &[String] {
        &self.stop
    }

    pub fn seed(&self) -> Option<u64> {
        self.seed
    }

    pub fn presence_penalty(&self) -> Option<f32> {
        self.presence_penalty
    }

    pub fn frequency_penalty(&self) -> Option<f32> {
        self.frequency_penalty
    }

    pub fn json_mode(&self) -> bool {
        self.json_mode
    }

    pub fn tools(&self) -> &[ToolDefinition] {
        &self.tools
    }

    /// Check ranges and combinations; returns `InvalidOptions` on the first problem.
    pub fn validate(&self) -> Result<(), ProviderError> {
        if let Some(model) = &self.model {
            if model.trim().is_empty() {
                return Err(ProviderError::InvalidOptions(
                    "model must not be empty".to_string(),
                ));
            }
        }
        if let Some(t) = self.temperature {
            if !(0.0..=2.0).contains(&t) {
                return Err(ProviderError::InvalidOptions(format!(
                    "temperature must be within [0, 2], got {t}"
                )));
            }
        }
        if let Some(p) = self.top_p {
            if !(p > 0.0 && p <= 1.0) {
                return Err(ProviderError::InvalidOptions(format!(
                    "top_p must be within (0, 1], got {p}"
                )));
            }
        }
        if self.max_tokens == Some(0) {
            return Err(ProviderError::InvalidOptions(
                "max_tokens must be greater than zero".to_string(),
            ));
        }
        if self.stop.len() > MAX_STOP_SEQUENCES {
            return Err(ProviderError::InvalidOptions(format!(
                "at most {MAX_STOP_SEQUENCES} stop sequences are allowed, got {}",
                self.stop.len()
            )));
        }
        for (name, value) in [
            ("presence_penalty", self.presence_penalty),
            ("frequency_penalty", self.frequency_penalty),
        ] {
            if let Some(v) = value {
                if !(-2.0..=2.0).contains(&v) {
                    return Err(ProviderError::InvalidOptions(format!(
                        "{name} must be within [-2, 2], got {v}"
                    )));
                }
            }
        }
        if self.json_mode && !self.tools.is_empty() {
            return Err(ProviderError::InvalidOptions(
                "json_mode cannot be combined with tools".to_string(),
            ));
        }
        Ok(())
    }
}

/// Accumulates options before freezing them into an [`InvokeOptions`].
#[derive(Debug, Clone, Default)]
pub struct InvokeOptionsBuilder {
    inner: InvokeOptions,
}

impl InvokeOptionsBuilder {
    pub fn stream(mut self, stream: bool) -> Self {
        self.inner.stream = stream;
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.inner.model = Some(model.into());
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.inner.temperature = Some(temperature);
        self
    }

    pub fn top_p(mut self, top_p: f32) -> Self {
        self.inner.top_p = Some(top_p);
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.inner.max_tokens = Some(max_tokens);
        self
    }

    pub fn stop<I, S>(mut self, stop: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inner.stop = stop.into_iter().map(Into::into).collect();
        self
    }

    pub fn seed(mut self, seed: u64) -> Self {
        self.inner.seed = Some(seed);
        self
    }

    pub fn presence_penalty(mut self, penalty: f32) -> Self {
        self.inner.presence_penalty = Some(penalty);
        self
    }

    pub fn frequency_penalty(mut self, penalty: f32) -> Self {
        self.inner.frequency_penalty = Some(penalty);
        self
    }

    pub fn json_mode(mut self, json_mode: bool) -> Self {
        self.inner.json_mode = json_mode;
        self
    }

    pub fn tools(mut self, tools: Vec<ToolDefinition>) -> Self {
        self.inner.tools = tools;
        self
    }

    /// Freeze the options. Validation happens at invoke time.
    pub fn build(self) -> InvokeOptions {
        self.inner
    }
}
