//! Graceful shutdown and cancellation
//!
//! SIGTERM/SIGINT cancel a root [`CancellationToken`]; every blocking host
//! operation runs under a child of that token.

use crate::utils::errors::{HostError, HostResult};
use std::future::Future;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Run `fut` unless `token` is cancelled first.
///
/// The future is dropped on cancellation, so nothing it would have published
/// after its last await point is ever written.
pub async fn cancellable<F, T>(token: &CancellationToken, fut: F) -> HostResult<T>
where
    F: Future<Output = HostResult<T>>,
{
    tokio::select! {
        biased;
        _ = token.cancelled() => Err(HostError::Cancelled),
        result = fut => result,
    }
}

/// Graceful shutdown coordinator
pub struct ShutdownCoordinator {
    root: CancellationToken,
}

impl ShutdownCoordinator {
    pub fn new() -> Self {
        Self {
            root: CancellationToken::new(),
        }
    }

    /// Token cancelled when shutdown starts
    pub fn token(&self) -> CancellationToken {
        self.root.child_token()
    }

    /// Trigger shutdown
    pub fn shutdown(&self) {
        info!("Shutdown signal sent");
        self.root.cancel();
    }

    pub fn is_shutting_down(&self) -> bool {
        self.root.is_cancelled()
    }

    /// Wait for SIGTERM, SIGINT or a manual trigger, then cancel the root token
    pub async fn wait_for_shutdown_signal(&self) {
        let ctrl_c = async {
            if let Err(e) = signal::ctrl_c().await {
                warn!("Failed to install Ctrl+C handler: {}", e);
                std::future::pending::<()>().await;
            }
        };

        #[cfg(unix)]
        let terminate = async {
            match signal::unix::signal(signal::unix::SignalKind::terminate()) {
                Ok(mut sig) => {
                    sig.recv().await;
                }
                Err(e) => {
                    warn!("Failed to install SIGTERM handler: {}", e);
                    std::future::pending::<()>().await;
                }
            }
        };

        #[cfg(not(unix))]
        let terminate = std::future::pending::<()>();

        tokio::select! {
            _ = ctrl_c => {
                info!("Received Ctrl+C, starting graceful shutdown");
            }
            _ = terminate => {
                info!("Received SIGTERM, starting graceful shutdown");
            }
            _ = self.root.cancelled() => {}
        }

        self.shutdown();
    }
}

impl Default for ShutdownCoordinator {
    fn default() -> Self {
        Self::new()
    }
}
