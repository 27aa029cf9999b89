//! Observation points around provider invocations.

use crate::error::ProviderError;
use crate::stream::StreamStatus;
use std::time::Duration;

/// Callbacks fired around each invocation. Hooks observe; they never alter
/// requests or responses.
///
/// For streamed calls `on_after_invoke` fires when the stream is handed to
/// the caller, `on_first_delta` when the first delta arrives from the
/// transport, and `on_last_delta` when the stream terminates.
pub trait InvokeHook: Send + Sync {
    fn on_before_invoke(&self, _provider: &str, _model: &str) {}

    fn on_after_invoke(&self, _provider: &str, _elapsed: Duration, _error: Option<&ProviderError>) {
    }

    fn on_first_delta(&self, _provider: &str, _elapsed: Duration) {}

    fn on_last_delta(&self, _provider: &str, _elapsed: Duration, _status: StreamStatus) {}
}

/// Emits one `tracing` event per hook point.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingHook;

impl InvokeHook for TracingHook {
    fn on_before_invoke(&self, provider: &str, model: &str) {
        tracing::debug!(provider, model, "invoke started");
    }

    fn on_after_invoke(&self, provider: &str, elapsed: Duration, error: Option<&ProviderError>) {
        let elapsed_ms = elapsed.as_millis() as u64;
        match error {
            Some(error) => tracing::warn!(provider, elapsed_ms, %error, "invoke failed"),
            None => tracing::debug!(provider, elapsed_ms, "invoke returned"),
        }
    }

    fn on_first_delta(&self, provider: &str, elapsed: Duration) {
        tracing::debug!(provider, elapsed_ms = elapsed.as_millis() as u64, "first delta");
    }

    fn on_last_delta(&self, provider: &str, elapsed: Duration, status: StreamStatus) {
        tracing::debug!(
            provider,
            elapsed_ms = elapsed.as_millis() as u64,
            ?status,
            "stream finished"
        );
    }
}
