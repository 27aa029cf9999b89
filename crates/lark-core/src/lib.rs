//! lark-core: user configuration and the runtime tying providers to tools.

pub mod config;
mod error;
pub mod runtime;

pub use config::{Config, ConfigFile};
pub use error::LarkError;
pub use runtime::{to_tool_definition, Runtime};
