//! Provider registry
//!
//! One reader/writer lock guards every shared map. Network calls (connect,
//! initialize, capability listing) run with the lock released; the lock is
//! only re-taken to publish their outcome.

use crate::config::ProviderConfig;
use crate::core::connection::{ConnectionFactory, ProviderConnection};
use crate::core::protocol::{
    Implementation, InitializeResult, PromptDescriptor, ResourceDescriptor, ToolDescriptor,
};
use crate::utils::errors::{HostError, HostResult};
use crate::utils::shutdown::cancellable;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Last-known capabilities of one provider, replaced wholesale on sync
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CapabilitySnapshot {
    pub tools: Vec<ToolDescriptor>,
    pub resources: Vec<ResourceDescriptor>,
    pub prompts: Vec<PromptDescriptor>,
}

/// Outcome of the most recent liveness probe
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthRecord {
    pub last_probe_time: DateTime<Utc>,
    pub last_probe_succeeded: bool,
    pub last_error: String,
}

impl HealthRecord {
    pub fn from_probe(result: &HostResult<()>) -> Self {
        Self {
            last_probe_time: Utc::now(),
            last_probe_succeeded: result.is_ok(),
            last_error: result.as_ref().err().map(ToString::to_string).unwrap_or_default(),
        }
    }
}

#[derive(Default)]
pub(crate) struct RegistryState {
    pub(crate) configs: HashMap<String, ProviderConfig>,
    pub(crate) connections: HashMap<String, Arc<dyn ProviderConnection>>,
    pub(crate) server_info: HashMap<String, InitializeResult>,
    pub(crate) tools: HashMap<String, Vec<ToolDescriptor>>,
    pub(crate) resources: HashMap<String, Vec<ResourceDescriptor>>,
    pub(crate) prompts: HashMap<String, Vec<PromptDescriptor>>,
    pub(crate) health: HashMap<String, HealthRecord>,
}

impl RegistryState {
    fn publish_snapshot(&mut self, name: &str, snapshot: CapabilitySnapshot) {
        self.tools.insert(name.to_string(), snapshot.tools);
        self.resources.insert(name.to_string(), snapshot.resources);
        self.prompts.insert(name.to_string(), snapshot.prompts);
    }
}

/// Concurrent-safe store of providers, their connections and cached capabilities
pub struct Registry {
    state: RwLock<RegistryState>,
    factory: Arc<dyn ConnectionFactory>,
    client_info: Implementation,
}

impl Registry {
    pub fn new(factory: Arc<dyn ConnectionFactory>, client_info: Implementation) -> Self {
        Self {
            state: RwLock::new(RegistryState::default()),
            factory,
            client_info,
        }
    }

    pub(crate) async fn read_state(&self) -> RwLockReadGuard<'_, RegistryState> {
        self.state.read().await
    }

    pub(crate) async fn write_state(&self) -> RwLockWriteGuard<'_, RegistryState> {
        self.state.write().await
    }

    /// Store (or overwrite) a provider's configuration. Does not connect.
    pub async fn add_provider(&self, config: ProviderConfig) -> HostResult<()> {
        config.check()?;
        info!("Adding provider: {} ({})", config.name, config.endpoint);

        let mut state = self.state.write().await;
        state.configs.insert(config.name.clone(), config);
        Ok(())
    }

    /// Open, initialize and catalogue a provider.
    ///
    /// All-or-nothing: the connection, server info and capability snapshot
    /// are published together, or the registry is left untouched.
    pub async fn connect(&self, name: &str, token: &CancellationToken) -> HostResult<()> {
        let config = {
            let state = self.state.read().await;
            state
                .configs
                .get(name)
                .cloned()
                .ok_or_else(|| HostError::NotFound(name.to_string()))?
        };

        if !config.enabled {
            return Err(HostError::Disabled(name.to_string()));
        }

        let connection = self
            .factory
            .create(&config)
            .map_err(|e| HostError::ConnectFailed {
                provider: name.to_string(),
                reason: e.to_string(),
            })?;

        let (server_info, snapshot) =
            match cancellable(token, self.open(name, connection.as_ref())).await {
                Ok(opened) => opened,
                Err(e) => {
                    warn!("Connecting to {} failed: {}", name, e);
                    close_quietly(name, connection.as_ref()).await;
                    return Err(e);
                }
            };

        let tool_count = snapshot.tools.len();
        let previous = {
            let mut state = self.state.write().await;
            state.server_info.insert(name.to_string(), server_info);
            state.publish_snapshot(name, snapshot);
            state.connections.insert(name.to_string(), connection)
        };

        if let Some(previous) = previous {
            debug!("Replaced existing connection for {}", name);
            close_quietly(name, previous.as_ref()).await;
        }

        info!("Connected to provider {} ({} tools)", name, tool_count);
        Ok(())
    }

    async fn open(
        &self,
        name: &str,
        connection: &dyn ProviderConnection,
    ) -> HostResult<(InitializeResult, CapabilitySnapshot)> {
        connection
            .connect()
            .await
            .map_err(|e| HostError::ConnectFailed {
                provider: name.to_string(),
                reason: e.to_string(),
            })?;

        let server_info = connection
            .initialize(&self.client_info)
            .await
            .map_err(|e| HostError::InitFailed {
                provider: name.to_string(),
                reason: e.to_string(),
            })?;

        let snapshot = fetch_capabilities(name, connection).await?;
        Ok((server_info, snapshot))
    }

    /// Refresh a live connection's capabilities.
    ///
    /// On failure the previous snapshot stays in place.
    pub async fn sync_capabilities(
        &self,
        name: &str,
        token: &CancellationToken,
    ) -> HostResult<()> {
        let connection = self.get_connection(name).await?;
        let snapshot = cancellable(token, fetch_capabilities(name, connection.as_ref())).await?;

        let mut state = self.state.write().await;
        match state.connections.get(name) {
            Some(current) if Arc::ptr_eq(current, &connection) => {
                state.publish_snapshot(name, snapshot);
                debug!("Refreshed capabilities for {}", name);
                Ok(())
            }
            // Disconnected or replaced while we were listing.
            _ => Err(HostError::NotFound(name.to_string())),
        }
    }

    /// Close and forget a provider's connection. Returns whether one existed.
    pub async fn disconnect(&self, name: &str) -> bool {
        let removed = self.state.write().await.connections.remove(name);
        match removed {
            Some(connection) => {
                close_quietly(name, connection.as_ref()).await;
                info!("Disconnected provider {}", name);
                true
            }
            None => false,
        }
    }

    pub async fn get_connection(&self, name: &str) -> HostResult<Arc<dyn ProviderConnection>> {
        self.state
            .read()
            .await
            .connections
            .get(name)
            .cloned()
            .ok_or_else(|| HostError::NotFound(name.to_string()))
    }

    /// Close every connection; used at shutdown
    pub async fn close_all(&self) {
        let connections = std::mem::take(&mut self.state.write().await.connections);
        for (name, connection) in connections {
            close_quietly(&name, connection.as_ref()).await;
        }
        info!("Closed all provider connections");
    }

    /// Configured provider names
    pub async fn providers(&self) -> Vec<String> {
        self.state.read().await.configs.keys().cloned().collect()
    }

    pub async fn connected_providers(&self) -> Vec<String> {
        self.state.read().await.connections.keys().cloned().collect()
    }

    pub async fn is_connected(&self, name: &str) -> bool {
        self.state.read().await.connections.contains_key(name)
    }

    pub async fn server_info(&self, name: &str) -> HostResult<InitializeResult> {
        self.state
            .read()
            .await
            .server_info
            .get(name)
            .cloned()
            .ok_or_else(|| HostError::NotFound(name.to_string()))
    }

    pub async fn tools(&self, name: &str) -> HostResult<Vec<ToolDescriptor>> {
        lookup(&self.state.read().await.tools, name)
    }

    pub async fn resources(&self, name: &str) -> HostResult<Vec<ResourceDescriptor>> {
        lookup(&self.state.read().await.resources, name)
    }

    pub async fn prompts(&self, name: &str) -> HostResult<Vec<PromptDescriptor>> {
        lookup(&self.state.read().await.prompts, name)
    }

    pub async fn health(&self, name: &str) -> HostResult<HealthRecord> {
        lookup(&self.state.read().await.health, name)
    }

    pub async fn all_health(&self) -> HashMap<String, HealthRecord> {
        self.state.read().await.health.clone()
    }
}

fn lookup<T: Clone>(map: &HashMap<String, T>, name: &str) -> HostResult<T> {
    map.get(name)
        .cloned()
        .ok_or_else(|| HostError::NotFound(name.to_string()))
}

/// List tools, resources and prompts. Any single failure fails the whole sync.
async fn fetch_capabilities(
    name: &str,
    connection: &dyn ProviderConnection,
) -> HostResult<CapabilitySnapshot> {
    let sync_failed = |what: &str, e: HostError| HostError::SyncFailed {
        provider: name.to_string(),
        reason: format!("{} listing failed: {}", what, e),
    };

    let tools = connection
        .list_tools()
        .await
        .map_err(|e| sync_failed("tools", e))?;
    let resources = connection
        .list_resources()
        .await
        .map_err(|e| sync_failed("resources", e))?;
    let prompts = connection
        .list_prompts()
        .await
        .map_err(|e| sync_failed("prompts", e))?;

    Ok(CapabilitySnapshot {
        tools,
        resources,
        prompts,
    })
}

async fn close_quietly(name: &str, connection: &dyn ProviderConnection) {
    if let Err(e) = connection.close().await {
        warn!("Failed to close connection to {}: {}", name, e);
    }
}
