//! mcphost: connects to several MCP servers, aggregates their tools under
//! collision-free names and routes a language model's tool calls back to them

pub mod cli;
pub mod config;
pub mod core;
pub mod llm;
pub mod transport;
pub mod utils;

pub use crate::config::Config;
pub use crate::core::Host;
pub use utils::errors::{HostError, HostResult};
