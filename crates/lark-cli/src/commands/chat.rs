//! One-shot chat: send a prompt, print the answer.

use lark_core::Runtime;
use lark_provider::{Completion, InvokeOptions, Message, Response, StreamHandle, StreamStatus};
use std::io::Write;
use tokio_util::sync::CancellationToken;

/// Upper bound on model/tool round trips for `--with-tools`.
const MAX_TOOL_ROUNDS: usize = 8;

/// Everything `lark chat` was asked to do.
#[derive(Debug, Clone, Default)]
pub struct ChatRequest {
    pub prompt: String,
    pub system: Option<String>,
    pub provider: Option<String>,
    pub model: Option<String>,
    pub stream: bool,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub with_tools: bool,
}

impl ChatRequest {
    pub fn messages(&self) -> Vec<Message> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = &self.system {
            messages.push(Message::system(system.clone()));
        }
        messages.push(Message::user_text(self.prompt.clone()));
        messages
    }

    pub fn options(&self, runtime: &Runtime) -> InvokeOptions {
        let mut builder = InvokeOptions::builder().stream(self.stream);
        if let Some(model) = &self.model {
            builder = builder.model(model.clone());
        }
        if let Some(temperature) = self.temperature {
            builder = builder.temperature(temperature);
        }
        if let Some(max_tokens) = self.max_tokens {
            builder = builder.max_tokens(max_tokens);
        }
        if self.with_tools {
            builder = builder.tools(runtime.tool_definitions());
        }
        builder.build()
    }
}

/// Run the chat command. Ctrl-C cancels the in-flight request.
pub async fn run(runtime: &Runtime, request: ChatRequest) -> anyhow::Result<()> {
    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    let mut messages = request.messages();
    let options = request.options(runtime);
    let provider = request.provider.as_deref();

    for round in 0..MAX_TOOL_ROUNDS {
        let response = runtime
            .invoke(cancel.clone(), provider, messages.clone(), options.clone())
            .await?;
        let completion = match response {
            Response::Stream(handle) => print_stream(handle).await?,
            Response::Complete(completion) => {
                if !completion.text.is_empty() {
                    println!("{}", completion.text);
                }
                completion
            }
        };
        log_usage(&completion);

        if completion.tool_calls.is_empty() {
            return Ok(());
        }
        tracing::debug!(round, calls = completion.tool_calls.len(), "running tool calls");
        messages.push(Message::assistant_tool_calls(
            completion.text.clone(),
            completion.tool_calls.clone(),
        ));
        for call in &completion.tool_calls {
            eprintln!("[tool] {}({})", call.name, call.arguments);
            messages.push(runtime.run_tool_call(call).await);
        }
    }

    anyhow::bail!("gave up after {MAX_TOOL_ROUNDS} tool rounds")
}

/// Print deltas as they arrive, then return the aggregated answer.
async fn print_stream(mut handle: StreamHandle) -> anyhow::Result<Completion> {
    let mut stdout = std::io::stdout();
    while let Some(delta) = handle.take().await {
        if !delta.text.is_empty() {
            write!(stdout, "{}", delta.text)?;
            stdout.flush()?;
        }
    }
    if !handle.text().is_empty() {
        writeln!(stdout)?;
    }

    // take_error yields once, so surface the transport's own error here
    if handle.status() == StreamStatus::Failed {
        if let Some(error) = handle.take_error() {
            return Err(error.into());
        }
    }
    Ok(handle.collect().await?)
}

fn log_usage(completion: &Completion) {
    if let Some(usage) = &completion.usage {
        tracing::debug!(
            model = %completion.model,
            prompt_tokens = usage.prompt_tokens,
            completion_tokens = usage.completion_tokens,
            "usage"
        );
    }
}
