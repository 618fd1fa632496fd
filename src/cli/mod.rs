pub mod args;
pub mod commands;

pub use args::{Cli, Command, RunArgs, ToolsArgs};
