// crates/server/src/state.rs
//! Application state for the Axum server.

use std::sync::Arc;
use std::time::Instant;

use leveling_sync_core::{Checklist, JsonProgressStore, SyncConfig};

use crate::sync::SyncManager;

/// Shared application state accessible from all route handlers.
pub struct AppState {
    /// Server start time for uptime tracking.
    pub start_time: Instant,
    /// The checklist, progress store and active sync session.
    pub sync: SyncManager,
}

impl AppState {
    /// Create a new application state wrapped in an Arc for sharing.
    pub fn new(config: SyncConfig, checklist: Arc<Checklist>, progress: JsonProgressStore) -> Arc<Self> {
        Arc::new(Self {
            start_time: Instant::now(),
            sync: SyncManager::new(config, checklist, progress),
        })
    }

    /// Get the server uptime in seconds.
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
