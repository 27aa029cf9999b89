//! lark-tools: tool descriptors, the tool registry, and built-in tools.

pub mod builtin;
pub mod descriptor;
mod error;
mod path_guard;
pub mod registry;

pub use builtin::register_all;
pub use descriptor::{Arguments, InvokeFn, ParamType, Parameter, ToolDescriptor, ToolKind};
pub use error::ToolError;
pub use path_guard::PathGuard;
pub use registry::{global, ToolRegistry};
