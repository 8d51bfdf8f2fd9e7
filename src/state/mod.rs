/// Contest clock and status resolution.
pub mod clock;
/// Access gate deciding whether a team may act right now.
pub mod gate;
/// Submission and retry workflow transitions.
pub mod submission;

use std::sync::Arc;

use tokio::sync::{RwLock, watch};

use crate::{
    config::AppConfig, dao::contest_store::ContestStore, error::ServiceError,
    services::broadcast::BroadcastEngine,
};

pub type SharedState = Arc<AppState>;

/// Central application state storing viewer connections, the broadcast
/// engine and the database handle.
pub struct AppState {
    config: AppConfig,
    store: RwLock<Option<Arc<dyn ContestStore>>>,
    broadcast: BroadcastEngine,
    degraded: watch::Sender<bool>,
}

impl AppState {
    /// Construct a new [`AppState`] wrapped in an [`Arc`] so it can be cloned cheaply.
    ///
    /// The application starts in degraded mode until a storage backend is installed.
    pub fn new(config: AppConfig) -> SharedState {
        let (degraded_tx, _rx) = watch::channel(true);
        Arc::new(Self {
            config,
            store: RwLock::new(None),
            broadcast: BroadcastEngine::new(),
            degraded: degraded_tx,
        })
    }

    /// Runtime configuration shared across services.
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    /// Obtain a handle to the current store, if one is installed.
    pub async fn store(&self) -> Option<Arc<dyn ContestStore>> {
        let guard = self.store.read().await;
        guard.as_ref().cloned()
    }

    /// Obtain a handle to the current store, failing when the application
    /// runs degraded. Mutating operations go through this so they fail
    /// closed while storage is down.
    pub async fn require_store(&self) -> Result<Arc<dyn ContestStore>, ServiceError> {
        self.store().await.ok_or(ServiceError::Degraded)
    }

    /// Install a new store implementation and leave degraded mode.
    pub async fn install_store(&self, store: Arc<dyn ContestStore>) {
        {
            let mut guard = self.store.write().await;
            *guard = Some(store);
        }
        self.update_degraded(false).await;
    }

    /// Remove the current store and enter degraded mode.
    pub async fn clear_store(&self) {
        {
            let mut guard = self.store.write().await;
            guard.take();
        }
        self.update_degraded(true).await;
    }

    /// Current degraded flag.
    pub async fn is_degraded(&self) -> bool {
        let guard = self.store.read().await;
        guard.is_none()
    }

    /// Subscribe to degraded mode updates.
    pub fn degraded_watcher(&self) -> watch::Receiver<bool> {
        self.degraded.subscribe()
    }

    /// Registry and fan-out engine for viewer connections.
    pub fn broadcast(&self) -> &BroadcastEngine {
        &self.broadcast
    }

    /// Update and broadcast the degraded flag when the value changes.
    async fn update_degraded(&self, value: bool) {
        if self.is_degraded().await == value {
            return;
        }

        let _ = self.degraded.send(value);
    }
}
