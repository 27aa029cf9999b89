//! Generic provider built from a [`ProviderSpec`], a config store, and a transport factory.
//!
//! Every built-in provider is a [`ChatProvider`]; they differ only in their
//! [`ProviderSpec`] and the transport factory they use.

use crate::config::{ConfigStore, ProviderConfig};
use crate::engine::LazyEngine;
use crate::error::ProviderError;
use crate::hook::InvokeHook;
use crate::message::Message;
use crate::options::InvokeOptions;
use crate::response::Response;
use crate::stream::{self, DeltaSender, StreamStatus, DEFAULT_STREAM_CAPACITY};
use crate::traits::{ChatRequest, DeltaStream, Provider, Transport, TransportFactory};
use async_trait::async_trait;
use futures::StreamExt;
use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;

/// Static description of a provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderSpec {
    /// Registry key, also the key of its [`ProviderConfig`].
    pub name: String,
    /// Endpoint used when the config has no `base_url`.
    pub default_base_url: Option<String>,
    /// Model used when the options name none.
    pub default_model: Option<String>,
    /// Whether a missing API key is a configuration error.
    pub requires_api_key: bool,
    /// Bounded buffer size for streamed responses.
    pub stream_capacity: usize,
}

impl ProviderSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            default_base_url: None,
            default_model: None,
            requires_api_key: true,
            stream_capacity: DEFAULT_STREAM_CAPACITY,
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.default_base_url = Some(base_url.into());
        self
    }

    pub fn with_default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = Some(model.into());
        self
    }

    /// Mark the provider as usable without an API key.
    pub fn keyless(mut self) -> Self {
        self.requires_api_key = false;
        self
    }

    pub fn with_stream_capacity(mut self, capacity: usize) -> Self {
        self.stream_capacity = capacity;
        self
    }
}

/// A provider whose transport engine is built on first invocation.
pub struct ChatProvider {
    spec: ProviderSpec,
    configs: ConfigStore,
    factory: Arc<dyn TransportFactory>,
    engine: LazyEngine,
    hooks: Vec<Arc<dyn InvokeHook>>,
}

impl ChatProvider {
    pub fn new(spec: ProviderSpec, configs: ConfigStore, factory: Arc<dyn TransportFactory>) -> Self {
        Self {
            spec,
            configs,
            factory,
            engine: LazyEngine::new(),
            hooks: Vec::new(),
        }
    }

    pub fn with_hook(mut self, hook: Arc<dyn InvokeHook>) -> Self {
        self.hooks.push(hook);
        self
    }

    pub fn spec(&self) -> &ProviderSpec {
        &self.spec
    }

    /// Whether the transport engine has been built.
    pub fn is_initialized(&self) -> bool {
        self.engine.is_initialized()
    }

    fn prepare(
        &self,
        messages: Vec<Message>,
        options: InvokeOptions,
    ) -> Result<ChatRequest, ProviderError> {
        if messages.is_empty() {
            return Err(ProviderError::InvalidOptions(
                "messages must not be empty".to_string(),
            ));
        }
        options.validate()?;
        let model = options
            .model()
            .or(self.spec.default_model.as_deref())
            .ok_or_else(|| {
                ProviderError::InvalidOptions(format!(
                    "no model given and provider '{}' has no default model",
                    self.spec.name
                ))
            })?
            .to_string();
        Ok(ChatRequest {
            model,
            messages,
            options,
        })
    }

    async fn engine(&self) -> Result<Arc<dyn Transport>, ProviderError> {
        self.engine
            .get_or_try_init(|| async {
                let config = match self.configs.get(&self.spec.name) {
                    Some(config) => config,
                    None if !self.spec.requires_api_key => ProviderConfig::default(),
                    None => {
                        return Err(ProviderError::missing_config(
                            &self.spec.name,
                            "provider is not configured",
                        ))
                    }
                };
                let validated = config.validate(&self.spec)?;
                tracing::info!(
                    provider = %self.spec.name,
                    base_url = %validated.base_url,
                    "building transport engine"
                );
                self.factory.build(&validated).await
            })
            .await
    }

    async fn dispatch(
        &self,
        cancel: CancellationToken,
        request: ChatRequest,
        started: Instant,
    ) -> Result<Response, ProviderError> {
        if cancel.is_cancelled() {
            return Err(ProviderError::Cancelled);
        }
        let engine = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ProviderError::Cancelled),
            engine = self.engine() => engine?,
        };

        tracing::debug!(
            provider = %self.spec.name,
            model = %request.model,
            stream = request.options.stream(),
            messages = request.messages.len(),
            "dispatching request"
        );

        if !request.options.stream() {
            return tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(ProviderError::Cancelled),
                completion = engine.complete(&request) => completion.map(Response::Complete),
            };
        }

        let source = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ProviderError::Cancelled),
            source = engine.stream(&request) => source?,
        };
        let token = cancel.child_token();
        let (sink, handle) =
            stream::channel(self.spec.stream_capacity, token.clone(), request.model.clone());
        tokio::spawn(forward(
            source,
            sink,
            token,
            self.hooks.clone(),
            self.spec.name.clone(),
            started,
        ));
        Ok(Response::Stream(handle))
    }
}

#[async_trait]
impl Provider for ChatProvider {
    fn name(&self) -> &str {
        &self.spec.name
    }

    fn default_model(&self) -> Option<&str> {
        self.spec.default_model.as_deref()
    }

    async fn invoke(
        &self,
        cancel: CancellationToken,
        messages: Vec<Message>,
        options: InvokeOptions,
    ) -> Result<Response, ProviderError> {
        let request = self.prepare(messages, options)?;
        let started = Instant::now();
        for hook in &self.hooks {
            hook.on_before_invoke(&self.spec.name, &request.model);
        }

        let result = self.dispatch(cancel, request, started).await;

        for hook in &self.hooks {
            hook.on_after_invoke(&self.spec.name, started.elapsed(), result.as_ref().err());
        }
        result
    }
}

/// Move deltas from the transport into the bounded stream until the final
/// delta, a transport error, or cancellation.
async fn forward(
    mut source: DeltaStream,
    mut sink: DeltaSender,
    cancel: CancellationToken,
    hooks: Vec<Arc<dyn InvokeHook>>,
    provider: String,
    started: Instant,
) {
    let mut first = true;
    loop {
        let next = tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            next = source.next() => next,
        };
        match next {
            Some(Ok(delta)) => {
                if first {
                    first = false;
                    for hook in &hooks {
                        hook.on_first_delta(&provider, started.elapsed());
                    }
                }
                if !sink.send(delta).await || sink.is_closed() {
                    break;
                }
            }
            Some(Err(error)) => {
                tracing::warn!(provider = %provider, %error, "stream terminated by transport error");
                sink.fail(error);
                break;
            }
            None => {
                sink.finish().await;
                break;
            }
        }
    }
    // Dropping the source aborts the in-flight request.
    drop(source);

    let status = match sink.status() {
        StreamStatus::Open if cancel.is_cancelled() => StreamStatus::Cancelled,
        status => status,
    };
    drop(sink);
    for hook in &hooks {
        hook.on_last_delta(&provider, started.elapsed(), status);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::echo::{Script, ScriptedFactory};
    use crate::stream::Delta;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;

    fn provider_with(factory: Arc<ScriptedFactory>, configs: &ConfigStore) -> ChatProvider {
        ChatProvider::new(
            ProviderSpec::new("echo")
                .with_base_url("memory://echo")
                .with_default_model("echo-1"),
            configs.clone(),
            factory,
        )
    }

    #[tokio::test]
    async fn test_missing_configuration_is_reported() {
        let configs = ConfigStore::new();
        let factory = Arc::new(ScriptedFactory::new(Script::Reply("hello".into())));
        let provider = provider_with(factory.clone(), &configs);

        let err = provider
            .invoke(
                CancellationToken::new(),
                vec![Message::user_text("hi")],
                InvokeOptions::default(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::ConfigurationMissing { .. }));
        assert_eq!(factory.builds(), 0);
        assert!(!provider.is_initialized());

        // Configuring afterwards lets the next call succeed.
        configs.set("echo", ProviderConfig::new("k"));
        let response = provider
            .invoke(
                CancellationToken::new(),
                vec![Message::user_text("hi")],
                InvokeOptions::default(),
            )
            .await
            .unwrap();
        assert_eq!(response.result().await.unwrap().text, "hello");
        assert!(provider.is_initialized());
    }

    #[tokio::test]
    async fn test_empty_messages_rejected() {
        let configs = ConfigStore::new();
        configs.set("echo", ProviderConfig::new("k"));
        let provider = provider_with(Arc::new(ScriptedFactory::new(Script::Echo)), &configs);
        let err = provider
            .invoke(CancellationToken::new(), vec![], InvokeOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::InvalidOptions(_)));
    }

    #[tokio::test]
    async fn test_invalid_options_rejected_before_engine_build() {
        let configs = ConfigStore::new();
        configs.set("echo", ProviderConfig::new("k"));
        let factory = Arc::new(ScriptedFactory::new(Script::Echo));
        let provider = provider_with(factory.clone(), &configs);
        let err = provider
            .invoke(
                CancellationToken::new(),
                vec![Message::user_text("hi")],
                InvokeOptions::builder().temperature(9.0).build(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::InvalidOptions(_)));
        assert_eq!(factory.builds(), 0);
    }

    #[tokio::test]
    async fn test_model_required_without_default() {
        let configs = ConfigStore::new();
        configs.set("bare", ProviderConfig::new("k"));
        let provider = ChatProvider::new(
            ProviderSpec::new("bare").with_base_url("memory://bare"),
            configs,
            Arc::new(ScriptedFactory::new(Script::Echo)),
        );
        let err = provider
            .invoke(
                CancellationToken::new(),
                vec![Message::user_text("hi")],
                InvokeOptions::default(),
            )
            .await
            .unwrap_err();
        assert!(err.to_string().contains("no model"));
    }

    #[tokio::test]
    async fn test_cancelled_before_call() {
        let configs = ConfigStore::new();
        configs.set("echo", ProviderConfig::new("k"));
        let provider = provider_with(Arc::new(ScriptedFactory::new(Script::Echo)), &configs);
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = provider
            .invoke(cancel, vec![Message::user_text("hi")], InvokeOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::Cancelled));
    }

    #[tokio::test]
    async fn test_transport_without_final_gets_closing_delta() {
        let configs = ConfigStore::new();
        configs.set("echo", ProviderConfig::new("k"));
        let factory = Arc::new(ScriptedFactory::new(Script::Deltas(vec![
            Delta::text("a"),
            Delta::text("b"),
        ])));
        let provider = provider_with(factory, &configs);
        let mut response = provider
            .invoke(
                CancellationToken::new(),
                vec![Message::user_text("hi")],
                InvokeOptions::streaming(),
            )
            .await
            .unwrap();
        let handle = response.stream().unwrap();
        let mut seen = Vec::new();
        while let Some(delta) = handle.take().await {
            seen.push(delta);
        }
        assert_eq!(seen.len(), 3);
        assert!(seen[2].is_final);
        assert_eq!(handle.status(), StreamStatus::Completed);
    }

    #[derive(Default)]
    struct RecordingHook {
        events: Mutex<Vec<String>>,
        first_deltas: AtomicUsize,
    }

    impl InvokeHook for RecordingHook {
        fn on_before_invoke(&self, provider: &str, model: &str) {
            self.events
                .lock()
                .unwrap()
                .push(format!("before:{provider}:{model}"));
        }

        fn on_after_invoke(
            &self,
            provider: &str,
            _elapsed: Duration,
            error: Option<&ProviderError>,
        ) {
            self.events
                .lock()
                .unwrap()
                .push(format!("after:{provider}:{}", error.is_some()));
        }

        fn on_first_delta(&self, _provider: &str, _elapsed: Duration) {
            self.first_deltas.fetch_add(1, Ordering::SeqCst);
        }

        fn on_last_delta(&self, provider: &str, _elapsed: Duration, status: StreamStatus) {
            self.events
                .lock()
                .unwrap()
                .push(format!("last:{provider}:{status:?}"));
        }
    }

    #[tokio::test]
    async fn test_hooks_observe_streamed_call() {
        let configs = ConfigStore::new();
        configs.set("echo", ProviderConfig::new("k"));
        let hook = Arc::new(RecordingHook::default());
        let provider = provider_with(Arc::new(ScriptedFactory::new(Script::Echo)), &configs)
            .with_hook(hook.clone());

        let response = provider
            .invoke(
                CancellationToken::new(),
                vec![Message::user_text("one two")],
                InvokeOptions::streaming(),
            )
            .await
            .unwrap();
        let completion = response.result().await.unwrap();
        assert_eq!(completion.text, "one two");

        // The forwarding task reports the last delta after the consumer drained.
        tokio::time::sleep(Duration::from_millis(20)).await;
        let events = hook.events.lock().unwrap().clone();
        assert_eq!(events[0], "before:echo:echo-1");
        assert_eq!(events[1], "after:echo:false");
        assert_eq!(events[2], "last:echo:Completed");
        assert_eq!(hook.first_deltas.load(Ordering::SeqCst), 1);
    }
}
