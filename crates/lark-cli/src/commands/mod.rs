//! Command implementations.

pub mod chat;
pub mod providers;
pub mod tools;
