//! CLI argument types - shared between binary and tests

use clap::{Args, Parser, Subcommand};

pub const DEFAULT_CONFIG_PATH: &str = "~/.config/mcphost/config.toml";

#[derive(Parser, Debug)]
#[command(name = "mcphost")]
#[command(about = "mcphost - aggregate MCP servers and route model tool calls to them")]
#[command(version)]
pub struct Cli {
    /// Configuration file path (TOML, YAML or JSON)
    #[arg(short, long, global = true, env = "MCPHOST_CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    pub config: String,
    /// Log level, overrides the config file
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Send a prompt to the model with every provider's tools attached
    Run(RunArgs),
    /// Connect to all providers and list the aggregated tool catalogue
    Tools(ToolsArgs),
    /// Connect to all providers and probe each once
    Status,
    /// Validate configuration file
    Validate,
    /// Print the configuration JSON schema
    Schema,
}

#[derive(Args, Debug)]
pub struct RunArgs {
    /// Prompt for the language model
    #[arg(short, long)]
    pub prompt: String,
    /// Keep connections and health checks running until Ctrl+C
    #[arg(long)]
    pub keep_alive: bool,
}

#[derive(Args, Debug)]
pub struct ToolsArgs {
    /// Print the catalogue as JSON
    #[arg(long)]
    pub json: bool,
}
