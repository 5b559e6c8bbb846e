//! CLI command handlers.

pub mod config;
pub mod multi;
pub mod single;
