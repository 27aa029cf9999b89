//! Provider and transport trait definitions.

use crate::config::ValidatedConfig;
use crate::error::ProviderError;
use crate::message::Message;
use crate::options::InvokeOptions;
use crate::response::{Completion, Response};
use crate::stream::Delta;
use async_trait::async_trait;
use futures::stream::BoxStream;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Trait for LLM providers.
///
/// A provider adapts the uniform message/options contract to one backend.
/// Providers are shared across concurrent callers, so `invoke` takes `&self`.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Provider name (e.g., "openai", "deepseek").
    fn name(&self) -> &str;

    /// Model used when the options name none.
    fn default_model(&self) -> Option<&str>;

    /// Run one invocation.
    ///
    /// `messages` must be non-empty. With `options.stream()` the call returns
    /// as soon as the remote endpoint starts answering and deltas are
    /// delivered through the returned stream handle. Cancelling `cancel`
    /// aborts the request and ends the stream.
    async fn invoke(
        &self,
        cancel: CancellationToken,
        messages: Vec<Message>,
        options: InvokeOptions,
    ) -> Result<Response, ProviderError>;
}

// Compile-time check: Provider must be object-safe
const _: () = {
    fn _assert_object_safe(_: &dyn Provider) {}
};

/// A request with every default resolved, ready for a transport.
#[derive(Debug, Clone)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<Message>,
    pub options: InvokeOptions,
}

/// Stream of deltas produced by a transport.
pub type DeltaStream = BoxStream<'static, Result<Delta, ProviderError>>;

/// The engine that performs network calls for a provider.
///
/// Engines are built once per provider and shared by all of its calls, so
/// they must be safe for concurrent use.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send a non-streaming request and wait for the full answer.
    async fn complete(&self, request: &ChatRequest) -> Result<Completion, ProviderError>;

    /// Send a streaming request.
    ///
    /// Returns once the endpoint accepted the request. Dropping the returned
    /// stream aborts the underlying request.
    async fn stream(&self, request: &ChatRequest) -> Result<DeltaStream, ProviderError>;
}

const _: () = {
    fn _assert_object_safe(_: &dyn Transport) {}
};

/// Builds a provider's transport engine from validated settings.
///
/// Runs inside the provider's lazy initialization, so it must not block.
#[async_trait]
pub trait TransportFactory: Send + Sync {
    async fn build(&self, config: &ValidatedConfig) -> Result<Arc<dyn Transport>, ProviderError>;
}
