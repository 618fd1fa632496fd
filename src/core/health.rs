//! Provider liveness probing
//!
//! Health is observational: a failed probe is recorded and logged, it never
//! disconnects the provider.

use crate::core::registry::{HealthRecord, Registry};
use crate::utils::errors::{HostError, HostResult};
use crate::utils::shutdown::cancellable;
use futures::future::join_all;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

pub struct HealthMonitor {
    registry: Arc<Registry>,
}

impl HealthMonitor {
    pub fn new(registry: Arc<Registry>) -> Self {
        Self { registry }
    }

    /// Probe one provider without touching shared health state
    pub async fn ping_one(&self, name: &str, token: &CancellationToken) -> HostResult<()> {
        let connection = self.registry.get_connection(name).await?;
        cancellable(token, async {
            connection.ping().await.map_err(|e| HostError::ProbeFailed {
                provider: name.to_string(),
                reason: e.to_string(),
            })
        })
        .await
    }

    /// Probe every connected provider and record the outcomes.
    ///
    /// Holds the exclusive lock for the whole round so status readers see
    /// either the previous round or this one, never a mix. Cancellation
    /// writes nothing.
    pub async fn ping_all(
        &self,
        token: &CancellationToken,
    ) -> HostResult<HashMap<String, HealthRecord>> {
        let mut state = self.registry.write_state().await;

        let probes = state.connections.iter().map(|(name, connection)| async move {
            let result = connection.ping().await;
            if let Err(e) = &result {
                warn!("Ping failed for provider {}: {}", name, e);
            }
            (name.clone(), HealthRecord::from_probe(&result))
        });
        let records = cancellable(token, async { Ok(join_all(probes).await) }).await?;

        for (name, record) in records {
            state.health.insert(name, record);
        }
        Ok(state.health.clone())
    }

    /// Run [`ping_all`](Self::ping_all) every `period` until `token` is cancelled
    pub fn spawn(self: Arc<Self>, period: Duration, token: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!("Health monitor started (every {:?})", period);

            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        match self.ping_all(&token).await {
                            Ok(statuses) => log_statuses(&statuses),
                            Err(HostError::Cancelled) => break,
                            Err(e) => warn!("Health check round failed: {}", e),
                        }
                    }
                }
            }

            info!("Health monitor stopped");
        })
    }
}

fn log_statuses(statuses: &HashMap<String, HealthRecord>) {
    for (name, status) in statuses {
        if status.last_probe_succeeded {
            debug!("Provider {} is healthy (probed {})", name, status.last_probe_time);
        } else {
            warn!(
                "Provider {} is unhealthy (probed {}): {}",
                name, status.last_probe_time, status.last_error
            );
        }
    }
}
