// src/services/sweeper.rs
//! Background removal of expired challenges.
//!
//! Expiry is enforced synchronously by [`AuthService::authenticate`]; the
//! sweeper only keeps abandoned challenges from accumulating.

use crate::services::authenticator::AuthService;
use log::{debug, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Default time between two sweeps.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(5 * 60);

/// Handle to a running sweeper task.
///
/// Dropping the handle also stops the task at its next wake-up.
pub struct SweeperHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl SweeperHandle {
    /// Starts sweeping `auth`'s challenge store every `interval`.
    ///
    /// The first sweep happens one full interval after start.
    pub fn start(auth: Arc<AuthService>, interval: Duration) -> Self {
        let (shutdown, mut shutdown_rx) = watch::channel(false);
        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // tick it once to clear the initial tick
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        let removed = auth.sweep_expired();
                        debug!("challenge sweep removed {}", removed);
                    }
                    _ = shutdown_rx.changed() => break,
                }
            }
            info!("challenge sweeper stopped");
        });
        SweeperHandle { shutdown, task }
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    /// Signals the task to stop and waits for it to exit.
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        if let Err(err) = self.task.await {
            warn!("challenge sweeper task failed: {}", err);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contracts::memory_registry::InMemoryRegistry;
    use crate::services::challenge_store::InMemoryChallengeStore;
    use crate::services::document_builder::DocumentBuilder;
    use crate::services::identity_manager::IdentityManager;
    use crate::services::registry_client::RegistryClient;
    use crate::utils::clock::ManualClock;
    use chrono::Utc;

    fn auth_service(clock: Arc<ManualClock>) -> Arc<AuthService> {
        let client = RegistryClient::new(
            Arc::new(InMemoryRegistry::new()),
            "ethr",
            "sepolia",
            Duration::from_secs(5),
        );
        let builder = DocumentBuilder::new("https://id.example/profile", clock.clone());
        let identities = Arc::new(IdentityManager::new(client, builder, clock.clone()));
        Arc::new(AuthService::new(
            identities,
            Arc::new(InMemoryChallengeStore::new()),
            clock,
            chrono::Duration::minutes(15),
            "Test Relying Party",
        ))
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeps_on_interval() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let auth = auth_service(clock.clone());
        auth.generate_challenge("0x0000000000000000000000000000000000000001").unwrap();
        clock.advance(chrono::Duration::minutes(16));

        let handle = SweeperHandle::start(auth.clone(), Duration::from_secs(300));

        tokio::time::sleep(Duration::from_secs(299)).await;
        assert_eq!(auth.store().len(), 1);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(auth.store().is_empty());

        handle.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_keeps_live_challenges() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let auth = auth_service(clock.clone());
        auth.generate_challenge("0x0000000000000000000000000000000000000001").unwrap();

        let handle = SweeperHandle::start(auth.clone(), Duration::from_secs(300));
        tokio::time::sleep(Duration::from_secs(301)).await;
        assert_eq!(auth.store().len(), 1);
        handle.stop().await;
    }

    #[tokio::test]
    async fn test_stop_terminates_task() {
        let clock = Arc::new(ManualClock::new(Utc::now()));
        let handle = SweeperHandle::start(auth_service(clock), DEFAULT_SWEEP_INTERVAL);
        assert!(handle.is_running());
        tokio::time::timeout(Duration::from_secs(5), handle.stop())
            .await
            .expect("sweeper did not stop");
    }
}
