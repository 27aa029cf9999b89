//! Built-in tool implementations.

pub mod date;
pub mod read_file;
pub mod think;
pub mod write_file;

use crate::descriptor::{ToolDescriptor, ToolKind};
use crate::error::ToolError;
use crate::path_guard::PathGuard;
use crate::registry::ToolRegistry;
use std::path::Path;
use std::sync::Arc;

/// Register every built-in tool, with file tools confined to `working_dir`.
pub fn register_all(registry: &ToolRegistry, working_dir: &Path) -> Result<(), ToolError> {
    let guard = Arc::new(PathGuard::new(working_dir)?);
    register_stateless(registry);
    register_builtin(registry, read_file::descriptor(guard.clone()));
    register_builtin(registry, write_file::descriptor(guard));
    Ok(())
}

/// Register the built-in tools that need no working directory.
pub fn register_stateless(registry: &ToolRegistry) {
    register_builtin(registry, date::descriptor());
    register_builtin(registry, think::descriptor());
}

fn register_builtin(registry: &ToolRegistry, tool: ToolDescriptor) {
    let name = tool.name().to_string();
    if let Err(error) = registry.register(tool.with_kind(ToolKind::Builtin)) {
        tracing::error!(tool = %name, %error, "built-in tool rejected");
    }
}
