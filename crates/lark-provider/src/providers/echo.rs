//! In-memory provider with a scripted transport.
//!
//! Used for offline runs and tests: the `echo` provider answers with the
//! last user message, and [`ScriptedFactory`] can be given any other script.

use crate::config::{ConfigStore, ValidatedConfig};
use crate::error::ProviderError;
use crate::message::Role;
use crate::providers::chat::{ChatProvider, ProviderSpec};
use crate::response::Completion;
use crate::stream::Delta;
use crate::traits::{ChatRequest, DeltaStream, Transport, TransportFactory};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

pub const ECHO: &str = "echo";

/// What a scripted transport answers.
#[derive(Debug, Clone, PartialEq)]
pub enum Script {
    /// Repeat the last user message, streamed word by word.
    Echo,
    /// Answer with fixed text, streamed as one delta.
    Reply(String),
    /// Stream exactly these deltas; a complete call concatenates them.
    Deltas(Vec<Delta>),
}

/// Transport that never touches the network.
#[derive(Debug)]
pub struct ScriptedTransport {
    script: Script,
    calls: Arc<AtomicUsize>,
}

impl ScriptedTransport {
    fn deltas(&self, request: &ChatRequest) -> Vec<Delta> {
        match &self.script {
            Script::Echo => {
                let mut deltas: Vec<Delta> = last_user_text(request)
                    .split_inclusive(' ')
                    .map(Delta::text)
                    .collect();
                deltas.push(Delta::end().with_finish_reason("stop"));
                deltas
            }
            Script::Reply(text) => vec![
                Delta::text(text.clone()),
                Delta::end().with_finish_reason("stop"),
            ],
            Script::Deltas(deltas) => deltas.clone(),
        }
    }
}

fn last_user_text(request: &ChatRequest) -> String {
    request
        .messages
        .iter()
        .rev()
        .find(|m| m.role == Role::User)
        .map(|m| m.text())
        .unwrap_or_default()
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn complete(&self, request: &ChatRequest) -> Result<Completion, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let deltas = self.deltas(request);
        Ok(Completion {
            model: request.model.clone(),
            text: deltas.iter().map(|d| d.text.as_str()).collect(),
            finish_reason: deltas.iter().rev().find_map(|d| d.finish_reason.clone()),
            ..Default::default()
        })
    }

    async fn stream(&self, request: &ChatRequest) -> Result<DeltaStream, ProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(stream::iter(self.deltas(request).into_iter().map(Ok)).boxed())
    }
}

/// Builds [`ScriptedTransport`]s and counts how often it did.
#[derive(Debug)]
pub struct ScriptedFactory {
    script: Script,
    builds: AtomicUsize,
    calls: Arc<AtomicUsize>,
    build_delay: Option<Duration>,
}

impl ScriptedFactory {
    pub fn new(script: Script) -> Self {
        Self {
            script,
            builds: AtomicUsize::new(0),
            calls: Arc::new(AtomicUsize::new(0)),
            build_delay: None,
        }
    }

    /// Make every build wait for `delay` without blocking the runtime,
    /// widening the first-call window.
    pub fn with_build_delay(mut self, delay: Duration) -> Self {
        self.build_delay = Some(delay);
        self
    }

    /// Number of transports built.
    pub fn builds(&self) -> usize {
        self.builds.load(Ordering::SeqCst)
    }

    /// Number of requests served by all built transports.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TransportFactory for ScriptedFactory {
    async fn build(&self, _config: &ValidatedConfig) -> Result<Arc<dyn Transport>, ProviderError> {
        if let Some(delay) = self.build_delay {
            tokio::time::sleep(delay).await;
        }
        self.builds.fetch_add(1, Ordering::SeqCst);
        Ok(Arc::new(ScriptedTransport {
            script: self.script.clone(),
            calls: self.calls.clone(),
        }))
    }
}

pub fn echo_spec() -> ProviderSpec {
    ProviderSpec::new(ECHO)
        .with_base_url("memory://echo")
        .with_default_model("echo-1")
}

/// Create the `echo` provider. Like remote providers it needs an API key.
pub fn new_echo_provider(configs: ConfigStore) -> ChatProvider {
    ChatProvider::new(
        echo_spec(),
        configs,
        Arc::new(ScriptedFactory::new(Script::Echo)),
    )
}
