//! Invocation results.

use crate::error::ProviderError;
use crate::message::ToolCall;
use crate::stream::StreamHandle;
use serde::{Deserialize, Serialize};

/// Token usage information.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: u32,
    #[serde(default)]
    pub total_tokens: u32,
}

/// A fully materialized model answer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Completion {
    /// Model that produced the answer.
    pub model: String,
    /// Output text.
    pub text: String,
    /// Reasoning output, for models that expose it.
    pub reasoning: Option<String>,
    /// Tool calls requested by the model.
    pub tool_calls: Vec<ToolCall>,
    /// Why the model stopped.
    pub finish_reason: Option<String>,
    /// Token usage, if reported.
    pub usage: Option<Usage>,
}

/// Result of [`Provider::invoke`](crate::Provider::invoke): either a
/// complete answer or a stream of deltas.
#[derive(Debug)]
pub enum Response {
    Complete(Completion),
    Stream(StreamHandle),
}

impl Response {
    pub fn is_stream(&self) -> bool {
        matches!(self, Response::Stream(_))
    }

    /// Borrow the stream handle of a streamed response.
    pub fn stream(&mut self) -> Option<&mut StreamHandle> {
        match self {
            Response::Stream(handle) => Some(handle),
            Response::Complete(_) => None,
        }
    }

    pub fn into_stream(self) -> Option<StreamHandle> {
        match self {
            Response::Stream(handle) => Some(handle),
            Response::Complete(_) => None,
        }
    }

    /// The complete answer.
    ///
    /// For a streamed response this waits until the stream is drained and
    /// returns the aggregate of all its deltas, including any the caller
    /// already took. A stream that was cancelled or failed yields its error.
    pub async fn result(self) -> Result<Completion, ProviderError> {
        match self {
            Response::Complete(completion) => Ok(completion),
            Response::Stream(handle) => handle.collect().await,
        }
    }
}
