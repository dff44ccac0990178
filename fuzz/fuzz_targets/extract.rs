#![no_main]
//! Arbitrary log text through extraction, inference, lookup and cascade.
//! Must never panic, and stage transitions must always carry a positive act.

use leveling_sync_core::{
    Checklist, EventExtractor, LogEvent, MemoryProgress, Stage, Step, SyncEngine, SyncObserver,
};
use leveling_sync_types::{EndReason, StageId, StepRef};
use libfuzzer_sys::fuzz_target;

struct Discard;

impl SyncObserver for Discard {
    fn on_step_reached(&self, _: StepRef, _: &str, _: &[StepRef]) {}
    fn on_status_changed(&self, _: &str, _: Option<StageId>) {}
    fn on_source_ended(&self, _: EndReason) {}
}

fuzz_target!(|data: &[u8]| {
    let text = String::from_utf8_lossy(data);

    for event in EventExtractor::new().extract(&text) {
        if let LogEvent::StageTransition(n) = event {
            assert!(n > 0);
        }
    }

    let checklist = Checklist::from_stages(vec![
        Stage::new(StageId::Act(1), vec![Step::new("a").with_zones(["The Coast"])]),
        Stage::new(StageId::Act(2), vec![Step::new("b").with_zones(["The Crossroads"])]),
    ])
    .unwrap();
    let mut store = MemoryProgress::new();
    let _ = SyncEngine::new().ingest(&text, &checklist, &mut store, &Discard);
});
