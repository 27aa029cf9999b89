//! Provider implementations.

pub mod chat;
pub mod echo;
pub mod hosted;
pub mod openai_compat;

pub use chat::{ChatProvider, ProviderSpec};
pub use hosted::register_builtin;
