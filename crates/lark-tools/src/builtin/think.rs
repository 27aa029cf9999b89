//! `think`: gives the model a structured scratchpad for a task.

use crate::descriptor::ToolDescriptor;
use crate::error::ToolError;
use schemars::JsonSchema;
use serde::Deserialize;

pub const NAME: &str = "think";

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ThinkParams {
    /// Description of the task that needs reasoning.
    pub task: String,
}

pub fn descriptor() -> ToolDescriptor {
    ToolDescriptor::typed(
        NAME,
        "Reason about a task step by step before acting. Uses only the details \
         already given; assumes nothing else.",
        |params: ThinkParams| async move { scaffold(&params.task) },
    )
}

fn scaffold(task: &str) -> Result<String, ToolError> {
    let task = task.trim();
    if task.is_empty() {
        return Err(ToolError::InvalidParameters("task must not be empty".to_string()));
    }
    Ok(format!(
        "Task: {task}\n\
         1. Restate the goal in one sentence.\n\
         2. List the known facts and variables.\n\
         3. Note what is missing or uncertain.\n\
         4. Choose an approach and give the reason for it.\n\
         5. State the next concrete step."
    ))
}
