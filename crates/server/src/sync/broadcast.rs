//! Bridges engine notifications to SSE clients and the status snapshot.

use std::sync::RwLock;

use leveling_sync_core::{status_label, SyncObserver};
use leveling_sync_types::{EndReason, StageId, StepRef, SyncEvent, SyncStatus};
use tokio::sync::broadcast;

/// Capacity of the SSE fan-out channel. Lagging clients get the status
/// snapshot re-sent instead of the missed events.
const CHANNEL_CAPACITY: usize = 64;

/// Holds the current [`SyncStatus`] and fans events out to subscribers.
///
/// The snapshot uses `std::sync::RwLock`: writes come from the poll task's
/// synchronous completion and are never held across an `.await`.
pub struct SyncBroadcaster {
    tx: broadcast::Sender<SyncEvent>,
    status: RwLock<SyncStatus>,
}

impl SyncBroadcaster {
    pub fn new() -> Self {
        Self {
            tx: broadcast::channel(CHANNEL_CAPACITY).0,
            status: RwLock::new(SyncStatus::default()),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SyncEvent> {
        self.tx.subscribe()
    }

    pub fn status(&self) -> SyncStatus {
        self.status.read().map(|s| s.clone()).unwrap_or_default()
    }

    /// A session started on `path`.
    pub fn set_attached(&self, path: &str) {
        if let Ok(mut status) = self.status.write() {
            *status = SyncStatus {
                active: true,
                path: Some(path.to_string()),
                ..SyncStatus::default()
            };
        }
    }

    /// Stamp the last completed poll.
    pub fn mark_polled(&self) {
        if let Ok(mut status) = self.status.write() {
            status.last_poll_at = Some(chrono::Utc::now().to_rfc3339());
        }
    }

    fn send(&self, event: SyncEvent) {
        // No subscribers is fine; the snapshot still carries the state.
        let _ = self.tx.send(event);
    }
}

impl Default for SyncBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

impl SyncObserver for SyncBroadcaster {
    fn on_step_reached(&self, step: StepRef, text: &str, completed: &[StepRef]) {
        if let Ok(mut status) = self.status.write() {
            status.reached = Some(step);
        }
        crate::metrics::record_steps_completed(completed.len());
        self.send(SyncEvent::StepReached {
            step,
            text: text.to_string(),
            completed: completed.to_vec(),
        });
    }

    fn on_status_changed(&self, location: &str, stage: Option<StageId>) {
        let label = status_label(stage, location);
        if let Ok(mut status) = self.status.write() {
            status.stage = stage;
            status.location = Some(location.to_string());
            status.label = Some(label.clone());
        }
        self.send(SyncEvent::StatusChanged {
            location: location.to_string(),
            stage,
            label,
        });
    }

    fn on_source_ended(&self, reason: EndReason) {
        if let Ok(mut status) = self.status.write() {
            *status = SyncStatus::default();
        }
        self.send(SyncEvent::SourceEnded { reason });
    }
}
