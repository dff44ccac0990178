// crates/core/src/engine.rs
//! The synchronous half of a sync session: text in, completions out.
//!
//! [`SyncEngine`] owns the extractor and the inference state and runs the
//! pipeline `extract → apply → locate → cascade` over one chunk of log text.
//! It performs no IO of its own besides flushing the progress store; the
//! async poll loop lives in the server crate.

use std::time::Duration;

use leveling_sync_types::{EndReason, StageId, StepRef};

use crate::cascade;
use crate::checklist::Checklist;
use crate::events::{EventExtractor, LogEvent};
use crate::inference::{self, InferenceState};
use crate::locator;
use crate::progress::ProgressStore;
use crate::tail::DEFAULT_TAIL_WINDOW;

/// Default poll interval for the session timer.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// Session tuning knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncConfig {
    pub poll_interval: Duration,
    /// Trailing bytes read on attach to recover the latest act and zone.
    pub tail_window: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            tail_window: DEFAULT_TAIL_WINDOW,
        }
    }
}

/// Receives what the engine observed. Implemented by the UI bridge.
pub trait SyncObserver {
    /// A new location resolved to `step`. `completed` lists the steps that
    /// were newly marked (possibly empty if all were already done).
    fn on_step_reached(&self, step: StepRef, text: &str, completed: &[StepRef]);

    /// The player's location changed, whether or not it resolved.
    fn on_status_changed(&self, location: &str, stage: Option<StageId>);

    /// Syncing ended; fired by whoever owns the session.
    fn on_source_ended(&self, reason: EndReason);
}

/// What one call to [`SyncEngine::ingest`] did.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub events: Vec<LogEvent>,
    pub location_changed: bool,
    pub reached: Option<StepRef>,
    pub completed: Vec<StepRef>,
    /// The progress store could not be saved. It stays dirty and is flushed
    /// again the next time a step is reached.
    pub save_failed: bool,
}

/// Human-readable position, e.g. `[act2] The Riverways` or `[?] Oriath`.
pub fn status_label(stage: Option<StageId>, location: &str) -> String {
    match stage {
        Some(stage) => format!("[{stage}] {location}"),
        None => format!("[?] {location}"),
    }
}

pub struct SyncEngine {
    extractor: EventExtractor,
    state: InferenceState,
}

impl SyncEngine {
    pub fn new() -> Self {
        Self {
            extractor: EventExtractor::new(),
            state: InferenceState::default(),
        }
    }

    pub fn state(&self) -> &InferenceState {
        &self.state
    }

    /// Back to "no stage, no location" (on stop).
    pub fn reset(&mut self) {
        self.state = InferenceState::default();
    }

    /// Extract events from `text` and act on them.
    pub fn ingest<S, O>(
        &mut self,
        text: &str,
        checklist: &Checklist,
        store: &mut S,
        observer: &O,
    ) -> IngestReport
    where
        S: ProgressStore + ?Sized,
        O: SyncObserver + ?Sized,
    {
        let events = self.extractor.extract(text);
        self.apply_events(events, checklist, store, observer)
    }

    /// Fold `events` into the state; on a location change, resolve it, cascade
    /// and notify.
    ///
    /// `on_status_changed` fires once per changed location and
    /// `on_step_reached` at most once, for the latest location of the batch.
    /// A failed save is logged and reported, never allowed to swallow the
    /// notification.
    pub fn apply_events<S, O>(
        &mut self,
        events: Vec<LogEvent>,
        checklist: &Checklist,
        store: &mut S,
        observer: &O,
    ) -> IngestReport
    where
        S: ProgressStore + ?Sized,
        O: SyncObserver + ?Sized,
    {
        let (next, location_changed) = inference::apply(self.state.clone(), &events);
        self.state = next;

        let mut report = IngestReport {
            events,
            location_changed,
            ..IngestReport::default()
        };
        if !location_changed {
            return report;
        }

        let stage = self.state.current_stage;
        let Some(location) = self.state.current_location.as_deref() else {
            return report;
        };
        observer.on_status_changed(location, stage);

        let Some(target) = locator::locate(stage, location, checklist) else {
            tracing::debug!(
                stage = ?stage,
                location,
                "Location is not on the checklist"
            );
            return report;
        };

        let completed = cascade::complete(target, checklist, store);
        // No-op for a clean store; retries an earlier failed save otherwise.
        if let Err(e) = store.flush() {
            tracing::warn!(error = %e, step = %target, "Failed to save progress; will retry");
            report.save_failed = true;
        }
        tracing::info!(
            step = %target,
            location,
            newly_completed = completed.len(),
            "Reached checklist step"
        );

        let text = checklist.step(target).map(|s| s.text.as_str()).unwrap_or_default();
        observer.on_step_reached(target, text, &completed);

        report.reached = Some(target);
        report.completed = completed;
        report
    }
}

impl Default for SyncEngine {
    fn default() -> Self {
        Self::new()
    }
}
