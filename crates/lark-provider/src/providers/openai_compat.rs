//! Generic OpenAI-compatible transport.
//!
//! Handles the OpenAI chat completions API format used by OpenAI, DeepSeek,
//! Moonshot, Qwen, Zhipu, Doubao, Ollama, and many other providers.

use crate::config::ValidatedConfig;
use crate::error::ProviderError;
use crate::message::{Content, ContentPart, Message, ToolCall};
use crate::response::{Completion, Usage};
use crate::stream::{Delta, ToolCallDelta};
use crate::traits::{ChatRequest, DeltaStream, Transport, TransportFactory};
use async_trait::async_trait;
use futures::stream::{self, Stream, StreamExt};
use reqwest::Client;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::VecDeque;
use std::pin::Pin;
use std::sync::Arc;

/// Transport speaking the chat completions protocol at `<base_url>/chat/completions`.
#[derive(Debug, Clone)]
pub struct OpenAiCompatTransport {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
}

impl OpenAiCompatTransport {
    pub fn new(config: &ValidatedConfig) -> Result<Self, ProviderError> {
        Ok(Self {
            client: Client::builder().build()?,
            endpoint: format!("{}/chat/completions", config.base_url),
            api_key: config.api_key.clone(),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Build the JSON request body.
    fn build_request_body(request: &ChatRequest, stream: bool) -> Value {
        let options = &request.options;
        let mut body = json!({
            "model": request.model,
            "messages": Self::convert_messages(&request.messages),
            "stream": stream,
        });

        if let Some(temperature) = options.temperature() {
            body["temperature"] = json!(temperature);
        }
        if let Some(top_p) = options.top_p() {
            body["top_p"] = json!(top_p);
        }
        if let Some(max_tokens) = options.max_tokens() {
            body["max_tokens"] = json!(max_tokens);
        }
        if !options.stop().is_empty() {
            body["stop"] = json!(options.stop());
        }
        if let Some(seed) = options.seed() {
            body["seed"] = json!(seed);
        }
        if let Some(penalty) = options.presence_penalty() {
            body["presence_penalty"] = json!(penalty);
        }
        if let Some(penalty) = options.frequency_penalty() {
            body["frequency_penalty"] = json!(penalty);
        }
        if options.json_mode() {
            body["response_format"] = json!({"type": "json_object"});
        }

        if !options.tools().is_empty() {
            body["tools"] = json!(options
                .tools()
                .iter()
                .map(|t| {
                    json!({
                        "type": "function",
                        "function": {
                            "name": t.name,
                            "description": t.description,
                            "parameters": t.parameters,
                        }
                    })
                })
                .collect::<Vec<_>>());
            body["tool_choice"] = json!("auto");
        }

        body
    }

    /// Convert messages to OpenAI format.
    fn convert_messages(messages: &[Message]) -> Vec<Value> {
        messages
            .iter()
            .map(|msg| {
                let content = match &msg.content {
                    Content::Text(text) => json!(text),
                    Content::Parts(parts) => json!(parts
                        .iter()
                        .map(|part| match part {
                            ContentPart::Text { text } => json!({"type": "text", "text": text}),
                            ContentPart::ImageUrl { url } => {
                                json!({"type": "image_url", "image_url": {"url": url}})
                            }
                        })
                        .collect::<Vec<_>>()),
                };

                let mut value = json!({"role": msg.role.as_str(), "content": content});
                if !msg.tool_calls.is_empty() {
                    value["tool_calls"] = json!(msg
                        .tool_calls
                        .iter()
                        .map(|call| {
                            json!({
                                "id": call.id,
                                "type": "function",
                                "function": {
                                    "name": call.name,
                                    "arguments": call.arguments,
                                }
                            })
                        })
                        .collect::<Vec<_>>());
                }
                if let Some(id) = &msg.tool_call_id {
                    value["tool_call_id"] = json!(id);
                }
                value
            })
            .collect()
    }

    async fn post(&self, body: &Value) -> Result<reqwest::Response, ProviderError> {
        let mut builder = self
            .client
            .post(&self.endpoint)
            .header("Content-Type", "application/json")
            .json(body);
        if let Some(api_key) = &self.api_key {
            builder = builder.header("Authorization", format!("Bearer {api_key}"));
        }

        let response = builder.send().await?;
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "unknown error".to_string());
            return Err(ProviderError::Api { status, message });
        }
        Ok(response)
    }
}

#[async_trait]
impl Transport for OpenAiCompatTransport {
    async fn complete(&self, request: &ChatRequest) -> Result<Completion, ProviderError> {
        let body = Self::build_request_body(request, false);
        let response = self.post(&body).await?;
        let text = response.text().await?;
        let resp: ChatResponse = serde_json::from_str(&text)?;

        let choice = resp
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::Stream("No choices in response".to_string()))?;

        Ok(Completion {
            model: if resp.model.is_empty() {
                request.model.clone()
            } else {
                resp.model
            },
            text: choice.message.content.unwrap_or_default(),
            reasoning: choice.message.reasoning_content.filter(|r| !r.is_empty()),
            tool_calls: choice
                .message
                .tool_calls
                .into_iter()
                .map(|call| ToolCall {
                    id: call.id,
                    name: call.function.name,
                    arguments: call.function.arguments,
                })
                .collect(),
            finish_reason: choice.finish_reason,
            usage: resp.usage,
        })
    }

    async fn stream(&self, request: &ChatRequest) -> Result<DeltaStream, ProviderError> {
        let body = Self::build_request_body(request, true);
        let response = self.post(&body).await?;
        Ok(decode_sse(response.bytes_stream()))
    }
}

/// Builds an [`OpenAiCompatTransport`] per provider.
#[derive(Debug, Default, Clone, Copy)]
pub struct OpenAiCompatFactory;

#[async_trait]
impl TransportFactory for OpenAiCompatFactory {
    async fn build(
        &self,
        config: &ValidatedConfig,
    ) -> Result<Arc<dyn Transport>, ProviderError> {
        Ok(Arc::new(OpenAiCompatTransport::new(config)?))
    }
}

// -- Server-sent events --

/// Splits a byte stream into `data:` payloads. Lines may span chunks.
#[derive(Debug, Default)]
struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(bytes);
        let mut payloads = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            payloads.extend(data_payload(&line));
        }
        payloads
    }

    fn flush(&mut self) -> Option<String> {
        let rest = std::mem::take(&mut self.buffer);
        data_payload(&rest)
    }
}

fn data_payload(line: &[u8]) -> Option<String> {
    let line = String::from_utf8_lossy(line);
    line.trim()
        .strip_prefix("data:")
        .map(|data| data.trim_start().to_string())
}

/// Turn one `data:` payload into a delta. `[DONE]` yields the final delta;
/// chunks carrying nothing yield `None`.
fn parse_sse_data(data: &str) -> Result<Option<Delta>, ProviderError> {
    if data == "[DONE]" {
        return Ok(Some(Delta::end()));
    }

    let chunk: StreamChunk = match serde_json::from_str(data) {
        Ok(chunk) => chunk,
        Err(error) => {
            tracing::debug!(%error, data, "skipping malformed stream chunk");
            return Ok(None);
        }
    };

    if let Some(error) = chunk.error {
        return Err(ProviderError::Stream(format!("remote error: {}", error.message)));
    }

    let mut delta = Delta {
        usage: chunk.usage,
        ..Default::default()
    };
    if let Some(choice) = chunk.choices.into_iter().next() {
        delta.text = choice.delta.content.unwrap_or_default();
        delta.reasoning = choice.delta.reasoning_content.filter(|r| !r.is_empty());
        delta.finish_reason = choice.finish_reason;
        delta.tool_calls = choice
            .delta
            .tool_calls
            .into_iter()
            .map(|tc| {
                let function = tc.function.unwrap_or_default();
                ToolCallDelta {
                    index: tc.index,
                    id: tc.id,
                    name: function.name,
                    arguments: function.arguments.unwrap_or_default(),
                }
            })
            .collect();
    }

    let empty = delta.text.is_empty()
        && delta.reasoning.is_none()
        && delta.tool_calls.is_empty()
        && delta.finish_reason.is_none()
        && delta.usage.is_none();
    Ok((!empty).then_some(delta))
}

struct SseState<S> {
    body: Pin<Box<S>>,
    decoder: SseDecoder,
    pending: VecDeque<Result<Delta, ProviderError>>,
    done: bool,
}

impl<S> SseState<S> {
    fn enqueue(&mut self, payloads: Vec<String>) {
        for data in payloads {
            if self.done {
                return;
            }
            match parse_sse_data(&data) {
                Ok(Some(delta)) => {
                    self.done = delta.is_final;
                    self.pending.push_back(Ok(delta));
                }
                Ok(None) => {}
                Err(error) => {
                    self.done = true;
                    self.pending.push_back(Err(error));
                }
            }
        }
    }
}

/// Decode an SSE body into deltas, stopping after `[DONE]` or the first error.
fn decode_sse<S, B, E>(body: S) -> DeltaStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Into<ProviderError> + Send + 'static,
{
    let state = SseState {
        body: Box::pin(body),
        decoder: SseDecoder::default(),
        pending: VecDeque::new(),
        done: false,
    };
    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(item) = state.pending.pop_front() {
                return Some((item, state));
            }
            if state.done {
                return None;
            }
            match state.body.next().await {
                Some(Ok(chunk)) => {
                    let payloads = state.decoder.push(chunk.as_ref());
                    state.enqueue(payloads);
                }
                Some(Err(error)) => {
                    state.done = true;
                    state.pending.push_back(Err(error.into()));
                }
                None => {
                    let rest = state.decoder.flush().into_iter().collect();
                    state.enqueue(rest);
                    state.done = true;
                }
            }
        }
    })
    .boxed()
}

// -- OpenAI response types for deserialization --

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    model: String,
    #[serde(default)]
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<Usage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    reasoning_content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<ChatToolCall>,
}

#[derive(Debug, Deserialize)]
struct ChatToolCall {
    #[serde(default)]
    id: String,
    function: ChatFunction,
}

#[derive(Debug, Deserialize)]
struct ChatFunction {
    name: String,
    #[serde(default)]
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct StreamChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
    #[serde(default)]
    usage: Option<Usage>,
    #[serde(default)]
    error: Option<ChunkError>,
}

#[derive(Debug, Deserialize)]
struct ChunkError {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: ChunkDelta,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ChunkDelta {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    reasoning_content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<ChunkToolCall>,
}

#[derive(Debug, Deserialize)]
struct ChunkToolCall {
    #[serde(default)]
    index: usize,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    function: Option<ChunkFunction>,
}

#[derive(Debug, Default, Deserialize)]
struct ChunkFunction {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    arguments: Option<String>,
}
