//! lark-provider: LLM provider registry, invocation and streaming.

pub mod config;
mod engine;
mod error;
pub mod hook;
pub mod message;
pub mod options;
pub mod providers;
pub mod registry;
pub mod response;
pub mod stream;
pub mod traits;

pub use config::{ConfigStore, ProviderConfig, ValidatedConfig};
pub use engine::LazyEngine;
pub use error::ProviderError;
pub use hook::{InvokeHook, TracingHook};
pub use message::{Content, ContentPart, Message, MessageKind, Role, ToolCall};
pub use options::{InvokeOptions, InvokeOptionsBuilder, ToolDefinition};
pub use providers::{ChatProvider, ProviderSpec};
pub use registry::{global, ProviderRegistry};
pub use response::{Completion, Response, Usage};
pub use stream::{Delta, StreamHandle, StreamStatus, ToolCallDelta};
pub use traits::{ChatRequest, DeltaStream, Provider, Transport, TransportFactory};
