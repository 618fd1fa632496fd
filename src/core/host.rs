use crate::config::Config;
use crate::core::connection::{ConnectionFactory, SseConnectionFactory};
use crate::core::dispatcher::Dispatcher;
use crate::core::health::HealthMonitor;
use crate::core::orchestrator::CompletionOrchestrator;
use crate::core::protocol::Implementation;
use crate::core::registry::Registry;
use crate::llm::LanguageModel;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Owns the registry and the components that share it
pub struct Host {
    config: Config,
    registry: Arc<Registry>,
    dispatcher: Arc<Dispatcher>,
    health: Arc<HealthMonitor>,
}

impl Host {
    /// Host talking to providers over SSE
    pub fn new(config: Config) -> Self {
        let factory = Arc::new(SseConnectionFactory::new(&config.transport));
        Self::with_factory(config, factory)
    }

    pub fn with_factory(config: Config, factory: Arc<dyn ConnectionFactory>) -> Self {
        let client = Implementation::new(config.client.name.clone(), config.client.version.clone());
        let registry = Arc::new(Registry::new(factory, client));
        let dispatcher = Arc::new(Dispatcher::new(registry.clone()));
        let health = Arc::new(HealthMonitor::new(registry.clone()));

        Self {
            config,
            registry,
            dispatcher,
            health,
        }
    }

    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    pub fn health(&self) -> &Arc<HealthMonitor> {
        &self.health
    }

    pub fn orchestrator(&self, model: Arc<dyn LanguageModel>) -> CompletionOrchestrator {
        CompletionOrchestrator::new(self.dispatcher.clone(), model)
    }

    /// Register and connect every configured provider.
    ///
    /// Individual failures are logged; returns the providers that connected.
    pub async fn connect_all(&self, token: &CancellationToken) -> Vec<String> {
        let mut connected = Vec::new();

        for provider in self.config.providers.clone() {
            let name = provider.name.clone();
            if let Err(e) = self.registry.add_provider(provider).await {
                error!("Failed to add provider {}: {}", name, e);
                continue;
            }
            if token.is_cancelled() {
                break;
            }
            match self.registry.connect(&name, token).await {
                Ok(()) => {
                    info!("Successfully connected to provider: {}", name);
                    connected.push(name);
                }
                Err(e) => error!("Failed to connect to provider {}: {}", name, e),
            }
        }

        connected
    }

    /// Start periodic probing if enabled in config
    pub fn start_health_monitor(&self, token: CancellationToken) -> Option<JoinHandle<()>> {
        if !self.config.health.enabled {
            return None;
        }
        let period = Duration::from_secs(self.config.health.interval_secs.max(1));
        Some(self.health.clone().spawn(period, token))
    }

    pub async fn close(&self) {
        self.registry.close_all().await;
    }
}
