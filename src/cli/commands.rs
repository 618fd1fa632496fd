//! Subcommand handlers

use crate::cli::args::{RunArgs, ToolsArgs};
use crate::config::{Config, ConfigFormat, ConfigValidator};
use crate::core::Host;
use crate::llm::OpenAiModel;
use crate::utils::shutdown::ShutdownCoordinator;
use anyhow::Context;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

async fn connect_host(config: Config, shutdown: &ShutdownCoordinator) -> anyhow::Result<Host> {
    let host = Host::new(config);
    let connected = host.connect_all(&shutdown.token()).await;
    if connected.is_empty() {
        warn!("No providers connected");
    }
    Ok(host)
}

pub async fn run(config: Config, args: RunArgs) -> anyhow::Result<()> {
    let shutdown = Arc::new(ShutdownCoordinator::new());
    let signals = {
        let shutdown = shutdown.clone();
        tokio::spawn(async move { shutdown.wait_for_shutdown_signal().await })
    };

    let model = Arc::new(OpenAiModel::new(&config.llm)?);
    let host = connect_host(config, &shutdown).await?;
    let monitor = host.start_health_monitor(shutdown.token());

    let outcome = host.orchestrator(model).run(&args.prompt, &shutdown.token()).await;
    match &outcome {
        Ok(outcome) => {
            println!("{}", outcome.content);
            println!("{}", serde_json::to_string_pretty(&outcome.results)?);
        }
        Err(e) => warn!("Completion failed: {}", e),
    }

    if args.keep_alive && outcome.is_ok() {
        info!("Keeping connections alive, press Ctrl+C to exit");
        shutdown.token().cancelled().await;
    } else {
        shutdown.shutdown();
    }

    if let Some(monitor) = monitor {
        if let Err(e) = monitor.await {
            warn!("Health monitor task failed: {}", e);
        }
    }
    let _ = signals.await;
    host.close().await;

    outcome?;
    Ok(())
}

pub async fn tools(config: Config, args: ToolsArgs) -> anyhow::Result<()> {
    let shutdown = ShutdownCoordinator::new();
    let host = connect_host(config, &shutdown).await?;

    let mut catalogue = host.dispatcher().build_catalogue().await;
    catalogue.sort_by(|a, b| a.name.cmp(&b.name));

    if args.json {
        println!("{}", serde_json::to_string_pretty(&catalogue)?);
    } else if catalogue.is_empty() {
        println!("No tools available");
    } else {
        for tool in &catalogue {
            println!("{:<40} {}", tool.name, tool.description);
        }
    }

    host.close().await;
    Ok(())
}

pub async fn status(config: Config) -> anyhow::Result<()> {
    let shutdown = ShutdownCoordinator::new();
    let host = connect_host(config, &shutdown).await?;

    let statuses = host.health().ping_all(&shutdown.token()).await?;
    let mut names: Vec<_> = statuses.keys().cloned().collect();
    names.sort();

    for name in names {
        if let Some(status) = statuses.get(&name) {
            if status.last_probe_succeeded {
                println!("{:<20} healthy    {}", name, status.last_probe_time);
            } else {
                println!(
                    "{:<20} unhealthy  {}  {}",
                    name, status.last_probe_time, status.last_error
                );
            }
        }
    }

    host.close().await;
    Ok(())
}

pub fn validate(path: &str) -> anyhow::Result<()> {
    let expanded = shellexpand::tilde(path).to_string();
    let content = std::fs::read_to_string(&expanded)
        .with_context(|| format!("Failed to read {}", expanded))?;

    let format = ConfigFormat::from_path(Path::new(&expanded));
    match ConfigValidator::new().validate_str(&content, format) {
        Ok(config) => {
            println!("{} is valid ({} providers)", expanded, config.providers.len());
            Ok(())
        }
        Err(errors) => {
            for error in &errors {
                println!("  {}", error);
            }
            anyhow::bail!("{} has {} validation errors", expanded, errors.len())
        }
    }
}

pub fn schema() {
    println!("{}", ConfigValidator::new().export_schema());
}
