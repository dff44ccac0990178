// crates/core/src/locator.rs
//! Resolve "act N, location L" to a checklist step.

use leveling_sync_types::{StageId, StepRef};

use crate::checklist::Checklist;

/// Whether a step tag names `location`.
///
/// The log can report sub-areas as suffixed names (`Prisoner's Gate_2`) while
/// the guide tags only the base name, so a tag matches when it is the whole
/// location or a prefix ending at a token boundary: the next character must
/// not be alphanumeric. `Prisoner's Gate` matches `Prisoner's Gate_2` and
/// `Prisoner's Gate (A8)` but not `Prisoner's GateX`.
pub fn tag_matches(tag: &str, location: &str) -> bool {
    if tag.is_empty() {
        return false;
    }
    match location.strip_prefix(tag) {
        Some(rest) => rest.chars().next().map_or(true, |c| !c.is_alphanumeric()),
        None => false,
    }
}

/// First step of `stage` with a tag matching `location`.
///
/// Without a known stage nothing is resolved: the same zone name exists in
/// several acts and guessing would cascade completion across the wrong act.
/// An unknown stage or an untagged location is an ordinary miss, not an error.
pub fn locate(stage: Option<StageId>, location: &str, checklist: &Checklist) -> Option<StepRef> {
    let stage = stage?;
    checklist
        .steps_of(stage)
        .iter()
        .position(|step| step.zones.iter().any(|tag| tag_matches(tag, location)))
        .map(|index| StepRef::new(stage, index))
}
