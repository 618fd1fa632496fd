use clap::Parser;
use mcphost::cli::commands;
use mcphost::cli::{Cli, Command};
use mcphost::config::{ConfigManager, LoggingConfig};
use mcphost::utils::init_logging;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Schema => {
            commands::schema();
            return Ok(());
        }
        Command::Validate => {
            init_logging(&LoggingConfig {
                level: cli.log_level.unwrap_or_else(|| "warn".to_string()),
                ..LoggingConfig::default()
            });
            return commands::validate(&cli.config);
        }
        _ => {}
    }

    let manager = ConfigManager::load(&cli.config)?;
    let mut config = manager.get_config();
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }
    init_logging(&config.logging);

    match cli.command {
        Command::Run(args) => commands::run(config, args).await,
        Command::Tools(args) => commands::tools(config, args).await,
        Command::Status => commands::status(config).await,
        Command::Validate | Command::Schema => Ok(()),
    }
}
