//! `read_file`: reads a text file inside the working directory.

use crate::descriptor::ToolDescriptor;
use crate::error::ToolError;
use crate::path_guard::PathGuard;
use schemars::JsonSchema;
use serde::Deserialize;
use std::sync::Arc;

pub const NAME: &str = "read_file";

const DEFAULT_LIMIT: usize = 2000;
const MAX_OUTPUT_BYTES: usize = 50 * 1024;

fn default_limit() -> usize {
    DEFAULT_LIMIT
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct ReadFileParams {
    /// Path of the file to read, relative to the working directory.
    pub path: String,
    /// First line to return (0-indexed). Default: 0.
    #[serde(default)]
    pub offset: usize,
    /// Maximum number of lines to return. Default: 2000.
    #[serde(default = "default_limit")]
    pub limit: usize,
}

pub fn descriptor(guard: Arc<PathGuard>) -> ToolDescriptor {
    ToolDescriptor::typed(
        NAME,
        "Read the content of a file in the working directory. Lines are numbered; \
         use offset and limit to page through long files.",
        move |params: ReadFileParams| {
            let guard = guard.clone();
            async move { read(&guard, params).await }
        },
    )
}

async fn read(guard: &PathGuard, params: ReadFileParams) -> Result<String, ToolError> {
    let path = guard.resolve_existing(&params.path)?;
    let content = tokio::fs::read_to_string(&path)
        .await
        .map_err(|e| ToolError::ExecutionError(format!("Failed to read file: {e}")))?;

    let lines: Vec<&str> = content.lines().collect();
    let total = lines.len();
    if params.offset >= total {
        return Ok(format!(
            "(no lines: offset {} is past the end of {total} lines)",
            params.offset
        ));
    }

    let end = params.offset.saturating_add(params.limit).min(total);
    let mut output = lines[params.offset..end]
        .iter()
        .enumerate()
        .map(|(i, line)| format!("{:>4} | {line}", params.offset + i + 1))
        .collect::<Vec<_>>()
        .join("\n");

    if output.len() > MAX_OUTPUT_BYTES {
        let mut cut = MAX_OUTPUT_BYTES;
        while !output.is_char_boundary(cut) {
            cut -= 1;
        }
        output.truncate(cut);
        output.push_str(&format!("\n\n... (truncated at 50KB, {end}/{total} lines)"));
    } else if end < total {
        output.push_str(&format!(
            "\n\n({end}/{total} lines shown, use offset to see more)"
        ));
    }
    Ok(output)
}
