// crates/core/src/inference.rs
//! "Where is the player?" state machine.
//!
//! Holds the latest act and location seen in the log. State is an explicit
//! value threaded through [`apply`], so replaying a log is just folding its
//! events.

use leveling_sync_types::StageId;

use crate::events::LogEvent;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InferenceState {
    pub current_stage: Option<StageId>,
    pub current_location: Option<String>,
}

impl InferenceState {
    pub fn is_empty(&self) -> bool {
        self.current_stage.is_none() && self.current_location.is_none()
    }
}

/// Fold `events` into `state` left to right.
///
/// Stage markers always overwrite the stage. Location events overwrite the
/// location; the returned flag is `true` only when the location after the
/// batch differs from the one before it, so repeated scene lines (or a brief
/// detour that ends where it started) cause no downstream work.
pub fn apply(state: InferenceState, events: &[LogEvent]) -> (InferenceState, bool) {
    let before = state.current_location.clone();
    let mut next = state;

    for event in events {
        match event {
            LogEvent::StageTransition(n) => next.current_stage = Some(StageId::Act(*n)),
            LogEvent::LocationEntered(location) => {
                if next.current_location.as_deref() != Some(location.as_str()) {
                    next.current_location = Some(location.clone());
                }
            }
        }
    }

    let changed = next.current_location.is_some() && next.current_location != before;
    (next, changed)
}
