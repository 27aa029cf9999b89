//! Confines filesystem tools to one working directory.

use crate::error::ToolError;
use std::path::{Component, Path, PathBuf};

/// Resolves tool-supplied paths against a canonical root and rejects any
/// that escape it, including through `..` or symlinks.
#[derive(Debug, Clone)]
pub struct PathGuard {
    root: PathBuf,
}

impl PathGuard {
    pub fn new(working_dir: &Path) -> Result<Self, ToolError> {
        let root = working_dir.canonicalize().map_err(|e| {
            ToolError::ExecutionError(format!(
                "Cannot resolve working dir '{}': {e}",
                working_dir.display()
            ))
        })?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve a path that must already exist.
    pub fn resolve_existing(&self, path: &str) -> Result<PathBuf, ToolError> {
        let candidate = self.absolutize(Path::new(path));
        let resolved = candidate
            .canonicalize()
            .map_err(|e| ToolError::ExecutionError(format!("Cannot resolve path '{path}': {e}")))?;
        self.check(path, resolved)
    }

    /// Resolve a path that may not exist yet. The deepest existing ancestor
    /// is canonicalized so symlinked directories cannot lead outside.
    pub fn resolve_for_write(&self, path: &str) -> Result<PathBuf, ToolError> {
        let candidate = self.absolutize(Path::new(path));

        let mut base = candidate.as_path();
        let mut missing = Vec::new();
        while !base.exists() {
            let (Some(name), Some(parent)) = (base.file_name(), base.parent()) else {
                return Err(ToolError::ExecutionError(format!("Cannot resolve path '{path}'")));
            };
            missing.push(name.to_os_string());
            base = parent;
        }

        let mut resolved = base
            .canonicalize()
            .map_err(|e| ToolError::ExecutionError(format!("Cannot resolve path '{path}': {e}")))?;
        resolved.extend(missing.iter().rev());
        self.check(path, resolved)
    }

    fn absolutize(&self, path: &Path) -> PathBuf {
        let joined = if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.root.join(path)
        };
        lexically_normalize(&joined)
    }

    fn check(&self, original: &str, resolved: PathBuf) -> Result<PathBuf, ToolError> {
        if resolved.starts_with(&self.root) {
            Ok(resolved)
        } else {
            Err(ToolError::PermissionDenied(format!(
                "Path '{original}' is outside the working directory"
            )))
        }
    }
}

fn lexically_normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
