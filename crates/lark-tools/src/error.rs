//! Error types for the lark-tools crate.

/// Errors that can occur while looking up or executing a tool.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// No tool is registered under the requested name.
    #[error("Tool not found: {0}")]
    NotFound(String),

    /// A required parameter was absent and has no default.
    #[error("Missing parameter '{parameter}' for tool '{tool}'")]
    MissingParameter { tool: String, parameter: String },

    /// Invalid parameters passed to tool
    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    /// Tool execution failed
    #[error("Execution error: {0}")]
    ExecutionError(String),

    /// Permission denied for operation
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    /// I/O error during tool execution
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl ToolError {
    /// Stable snake_case name of the variant, for logs and tool messages.
    pub fn kind(&self) -> &'static str {
        match self {
            ToolError::NotFound(_) => "not_found",
            ToolError::MissingParameter { .. } => "missing_parameter",
            ToolError::InvalidParameters(_) => "invalid_parameters",
            ToolError::ExecutionError(_) => "execution_error",
            ToolError::PermissionDenied(_) => "permission_denied",
            ToolError::Io(_) => "io",
        }
    }
}
