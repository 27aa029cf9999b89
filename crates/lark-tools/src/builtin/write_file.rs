//! `write_file`: creates or overwrites a file inside the working directory.

use crate::descriptor::ToolDescriptor;
use crate::error::ToolError;
use crate::path_guard::PathGuard;
use schemars::JsonSchema;
use serde::Deserialize;
use std::sync::Arc;

pub const NAME: &str = "write_file";

#[derive(Debug, Deserialize, JsonSchema)]
pub struct WriteFileParams {
    /// Path of the file to write, relative to the working directory.
    pub path: String,
    /// Content to write to the file.
    pub content: String,
}

pub fn descriptor(guard: Arc<PathGuard>) -> ToolDescriptor {
    ToolDescriptor::typed(
        NAME,
        "Create or overwrite a file in the working directory with the given content. \
         Creates parent directories if needed.",
        move |params: WriteFileParams| {
            let guard = guard.clone();
            async move { write(&guard, params).await }
        },
    )
}

async fn write(guard: &PathGuard, params: WriteFileParams) -> Result<String, ToolError> {
    let path = guard.resolve_for_write(&params.path)?;

    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| ToolError::ExecutionError(format!("Failed to create directories: {e}")))?;
    }
    tokio::fs::write(&path, &params.content)
        .await
        .map_err(|e| ToolError::ExecutionError(format!("Failed to write file: {e}")))?;

    let bytes = params.content.len();
    let lines = params.content.lines().count();
    tracing::debug!(path = %path.display(), bytes, "file written");
    Ok(format!("Wrote {bytes} bytes ({lines} lines) to {}", params.path))
}
