// crates/core/src/cascade.rs
//! Cascade completion: reaching a step means every earlier step is done.

use leveling_sync_types::StepRef;

use crate::checklist::Checklist;
use crate::progress::ProgressStore;

/// Mark `target` and every step before it (in global order, across all
/// stages) complete. Steps after the target are never touched and nothing
/// is ever un-marked, so calling this again with the same or an earlier
/// target changes nothing.
///
/// Returns the steps that were newly marked, in global order. A target that
/// is not in the checklist marks nothing.
pub fn complete<S: ProgressStore + ?Sized>(
    target: StepRef,
    checklist: &Checklist,
    store: &mut S,
) -> Vec<StepRef> {
    if checklist.step(target).is_none() {
        tracing::warn!(step = %target, "Cascade target is not in the checklist");
        return Vec::new();
    }

    let mut newly = Vec::new();
    for (step, _) in checklist.iter_global() {
        if !store.is_complete(step) {
            store.set_complete(step);
            newly.push(step);
        }
        if step == target {
            break;
        }
    }
    newly
}
