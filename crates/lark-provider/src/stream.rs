//! Pull-based delta streams.
//!
//! A stream is a bounded handoff between one producer ([`DeltaSender`]) and
//! one consumer ([`StreamHandle`]). The producer waits while the buffer is
//! full; the consumer waits while it is empty. Both sides share a
//! cancellation token: once it fires, the consumer sees end-of-stream and the
//! producer stops.
//!
//! The terminating condition is recorded next to the channel and can be read
//! back through [`StreamHandle::status`] and [`StreamHandle::take_error`].

use crate::error::ProviderError;
use crate::message::ToolCall;
use crate::response::{Completion, Usage};
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Buffer size used by providers unless configured otherwise.
pub const DEFAULT_STREAM_CAPACITY: usize = 16;

/// Fragment of a streamed tool call. Fragments with the same `index` belong
/// to the same call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToolCallDelta {
    pub index: usize,
    pub id: Option<String>,
    pub name: Option<String>,
    pub arguments: String,
}

/// One incremental unit of a streamed response.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Delta {
    /// Partial output text.
    pub text: String,
    /// Partial reasoning output, for models that expose it.
    pub reasoning: Option<String>,
    /// Partial tool calls.
    pub tool_calls: Vec<ToolCallDelta>,
    /// Why the model stopped, once known.
    pub finish_reason: Option<String>,
    /// Token usage, usually only on the last chunks.
    pub usage: Option<Usage>,
    /// Set on the last delta of a stream, and only there.
    pub is_final: bool,
}

impl Delta {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    /// A delta that closes the stream.
    pub fn finished(text: impl Into<String>) -> Self {
        Self {
            is_final: true,
            ..Self::text(text)
        }
    }

    /// An empty closing delta.
    pub fn end() -> Self {
        Self::finished("")
    }

    pub fn with_reasoning(mut self, reasoning: impl Into<String>) -> Self {
        self.reasoning = Some(reasoning.into());
        self
    }

    pub fn with_finish_reason(mut self, reason: impl Into<String>) -> Self {
        self.finish_reason = Some(reason.into());
        self
    }

    pub fn with_usage(mut self, usage: Usage) -> Self {
        self.usage = Some(usage);
        self
    }
}

/// How a stream ended, or that it has not ended yet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamStatus {
    /// Deltas may still arrive.
    Open,
    /// The final delta was produced.
    Completed,
    /// The invocation was cancelled or the consumer went away.
    Cancelled,
    /// The transport failed mid-stream; see [`StreamHandle::take_error`].
    Failed,
}

#[derive(Debug)]
struct Outcome {
    status: StreamStatus,
    error: Option<ProviderError>,
}

/// Terminating condition shared by both ends. The first settle wins.
#[derive(Debug, Clone)]
struct Shared(Arc<Mutex<Outcome>>);

impl Shared {
    fn new() -> Self {
        Self(Arc::new(Mutex::new(Outcome {
            status: StreamStatus::Open,
            error: None,
        })))
    }

    fn lock(&self) -> MutexGuard<'_, Outcome> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn settle(&self, status: StreamStatus, error: Option<ProviderError>) {
        let mut outcome = self.lock();
        if outcome.status == StreamStatus::Open {
            outcome.status = status;
            outcome.error = error;
        }
    }

    fn status(&self) -> StreamStatus {
        self.lock().status
    }

    fn take_error(&self) -> Option<ProviderError> {
        self.lock().error.take()
    }
}

/// Create a bounded stream pair.
///
/// `cancel` is shared by both ends; `model` is reported by the aggregated
/// [`Completion`].
pub fn channel(
    capacity: usize,
    cancel: CancellationToken,
    model: impl Into<String>,
) -> (DeltaSender, StreamHandle) {
    let (tx, rx) = mpsc::channel(capacity.max(1));
    let shared = Shared::new();
    let sender = DeltaSender {
        tx: Some(tx),
        shared: shared.clone(),
        cancel: cancel.clone(),
    };
    let handle = StreamHandle {
        rx,
        shared,
        cancel,
        exhausted: false,
        collected: Collected {
            model: model.into(),
            ..Default::default()
        },
    };
    (sender, handle)
}

/// Producer end of a stream.
#[derive(Debug)]
pub struct DeltaSender {
    tx: Option<mpsc::Sender<Delta>>,
    shared: Shared,
    cancel: CancellationToken,
}

impl DeltaSender {
    /// Hand one delta to the consumer, waiting while the buffer is full.
    ///
    /// Returns `false` once the stream can take no more deltas: after the
    /// final delta, after cancellation, or when the consumer is gone.
    pub async fn send(&mut self, delta: Delta) -> bool {
        let Some(tx) = self.tx.as_ref() else {
            return false;
        };
        let is_final = delta.is_final;

        let sent = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => false,
            result = tx.send(delta) => result.is_ok(),
        };

        if !sent {
            self.shared.settle(StreamStatus::Cancelled, None);
            self.tx = None;
            return false;
        }
        if is_final {
            self.shared.settle(StreamStatus::Completed, None);
            self.tx = None;
        }
        true
    }

    /// Close the stream normally, emitting an empty final delta if the
    /// producer has not sent one.
    pub async fn finish(&mut self) {
        if self.tx.is_some() {
            self.send(Delta::end()).await;
        }
    }

    /// Close the stream with an error the consumer can inspect.
    pub fn fail(&mut self, error: ProviderError) {
        // Settle before the channel closes so the consumer never observes
        // end-of-stream with an open status.
        if let Some(tx) = self.tx.take() {
            self.shared.settle(StreamStatus::Failed, Some(error));
            drop(tx);
        }
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_none()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub fn status(&self) -> StreamStatus {
        self.shared.status()
    }
}

impl Drop for DeltaSender {
    fn drop(&mut self) {
        if self.tx.is_some() {
            if self.cancel.is_cancelled() {
                self.shared.settle(StreamStatus::Cancelled, None);
            } else {
                self.shared.settle(
                    StreamStatus::Failed,
                    Some(ProviderError::Stream(
                        "producer stopped before the final delta".to_string(),
                    )),
                );
            }
        }
    }
}

#[derive(Debug, Default)]
struct Collected {
    model: String,
    text: String,
    reasoning: String,
    tool_calls: Vec<ToolCallDelta>,
    finish_reason: Option<String>,
    usage: Option<Usage>,
}

impl Collected {
    fn absorb(&mut self, delta: &Delta) {
        self.text.push_str(&delta.text);
        if let Some(reasoning) = &delta.reasoning {
            self.reasoning.push_str(reasoning);
        }
        for fragment in &delta.tool_calls {
            match self
                .tool_calls
                .iter_mut()
                .find(|call| call.index == fragment.index)
            {
                Some(call) => {
                    if call.id.is_none() {
                        call.id = fragment.id.clone();
                    }
                    if call.name.is_none() {
                        call.name = fragment.name.clone();
                    }
                    call.arguments.push_str(&fragment.arguments);
                }
                None => self.tool_calls.push(fragment.clone()),
            }
        }
        if delta.finish_reason.is_some() {
            self.finish_reason = delta.finish_reason.clone();
        }
        if delta.usage.is_some() {
            self.usage = delta.usage;
        }
    }

    fn into_completion(self) -> Completion {
        Completion {
            model: self.model,
            text: self.text,
            reasoning: (!self.reasoning.is_empty()).then_some(self.reasoning),
            tool_calls: self
                .tool_calls
                .into_iter()
                .map(|call| ToolCall {
                    id: call.id.unwrap_or_default(),
                    name: call.name.unwrap_or_default(),
                    arguments: call.arguments,
                })
                .collect(),
            finish_reason: self.finish_reason,
            usage: self.usage,
        }
    }
}

/// Consumer end of a stream. Not restartable: once [`take`](Self::take)
/// returns `None` it keeps returning `None`.
#[derive(Debug)]
pub struct StreamHandle {
    rx: mpsc::Receiver<Delta>,
    shared: Shared,
    cancel: CancellationToken,
    exhausted: bool,
    collected: Collected,
}

impl StreamHandle {
    /// Next delta in production order, or `None` at end of stream.
    ///
    /// End of stream covers natural completion, cancellation and transport
    /// failure; use [`status`](Self::status) to tell them apart.
    pub async fn take(&mut self) -> Option<Delta> {
        if self.exhausted {
            return None;
        }
        let next = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            next = self.rx.recv() => next,
        };
        self.accept(next)
    }

    /// Blocking variant of [`take`](Self::take) for synchronous callers.
    ///
    /// Must not be called from within an async task.
    pub fn blocking_take(&mut self) -> Option<Delta> {
        futures::executor::block_on(self.take())
    }

    fn accept(&mut self, next: Option<Delta>) -> Option<Delta> {
        match next {
            Some(delta) if !self.cancel.is_cancelled() => {
                self.collected.absorb(&delta);
                if delta.is_final {
                    self.shared.settle(StreamStatus::Completed, None);
                    self.exhaust();
                }
                Some(delta)
            }
            _ => {
                if self.cancel.is_cancelled() {
                    self.shared.settle(StreamStatus::Cancelled, None);
                }
                self.exhaust();
                None
            }
        }
    }

    fn exhaust(&mut self) {
        self.exhausted = true;
        self.rx.close();
    }

    /// Stop the stream. Outstanding and later `take` calls return `None`.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }

    pub fn status(&self) -> StreamStatus {
        self.shared.status()
    }

    /// The error that terminated the stream, if it failed. Yields it once.
    pub fn take_error(&self) -> Option<ProviderError> {
        self.shared.take_error()
    }

    /// Text of every delta taken so far.
    pub fn text(&self) -> &str {
        &self.collected.text
    }

    /// Drain the rest of the stream and aggregate every delta (including
    /// ones already taken) into a [`Completion`].
    pub async fn collect(mut self) -> Result<Completion, ProviderError> {
        while self.take().await.is_some() {}
        match self.status() {
            StreamStatus::Completed => Ok(self.collected.into_completion()),
            StreamStatus::Cancelled => Err(ProviderError::Cancelled),
            StreamStatus::Failed => Err(self
                .take_error()
                .unwrap_or_else(|| ProviderError::Stream("stream failed".to_string()))),
            StreamStatus::Open => Err(ProviderError::Stream(
                "stream ended without a final delta".to_string(),
            )),
        }
    }
}

impl futures::Stream for StreamHandle {
    type Item = Delta;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Delta>> {
        let this = self.get_mut();
        if this.exhausted {
            return Poll::Ready(None);
        }
        if this.cancel.is_cancelled() {
            return Poll::Ready(this.accept(None));
        }
        match this.rx.poll_recv(cx) {
            Poll::Ready(next) => Poll::Ready(this.accept(next)),
            Poll::Pending => Poll::Pending,
        }
    }
}
