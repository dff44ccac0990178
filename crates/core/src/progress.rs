// crates/core/src/progress.rs
//! Checkbox state: which steps the user has completed.
//!
//! The sync core only ever reads flags and sets missing ones through
//! [`ProgressStore`]. Manual edits (unchecking, clearing for a new league)
//! go through the inherent methods on the concrete stores, which the HTTP
//! layer calls directly.
//!
//! [`JsonProgressStore`] reads and writes with `std::fs`; async callers run
//! it on the blocking pool.

use std::collections::{BTreeMap, BTreeSet};
use std::io::Write;
use std::path::PathBuf;

use leveling_sync_types::{StageId, StageProgress, StepRef};

use crate::checklist::Checklist;
use crate::error::ProgressError;

/// Completion flags as seen by the sync core.
pub trait ProgressStore {
    fn is_complete(&self, step: StepRef) -> bool;

    /// Mark a step complete. Re-marking a complete step is a no-op.
    fn set_complete(&mut self, step: StepRef);

    /// Persist pending changes, if the store is persistent.
    fn flush(&mut self) -> Result<(), ProgressError> {
        Ok(())
    }
}

/// Checked/total counts for one stage.
pub fn stage_progress<S: ProgressStore + ?Sized>(
    store: &S,
    checklist: &Checklist,
    stage: StageId,
) -> StageProgress {
    let total = checklist.steps_of(stage).len();
    let checked = (0..total)
        .filter(|&index| store.is_complete(StepRef::new(stage, index)))
        .count();
    StageProgress {
        stage,
        checked: checked as u32,
        total: total as u32,
    }
}

// =============================================================================
// In-memory store
// =============================================================================

/// Non-persistent store, for tests and embedding.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryProgress {
    complete: BTreeSet<StepRef>,
}

impl MemoryProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn completed(&self) -> impl Iterator<Item = StepRef> + '_ {
        self.complete.iter().copied()
    }
}

impl ProgressStore for MemoryProgress {
    fn is_complete(&self, step: StepRef) -> bool {
        self.complete.contains(&step)
    }

    fn set_complete(&mut self, step: StepRef) {
        self.complete.insert(step);
    }
}

// =============================================================================
// JSON file store
// =============================================================================

/// Persistent store using the browser's `checks` format: a flat JSON object
/// from step key (`act2-5`) to `true`/`false`.
///
/// Keys that do not parse as step ids are kept as-is and written back, so a
/// file shared with another version of the guide loses nothing.
#[derive(Debug)]
pub struct JsonProgressStore {
    path: PathBuf,
    checks: BTreeMap<String, bool>,
    dirty: bool,
}

impl JsonProgressStore {
    /// Load the store at `path`. A missing file is an empty store.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, ProgressError> {
        let path = path.into();
        let checks = match std::fs::read_to_string(&path) {
            Ok(json) => serde_json::from_str::<BTreeMap<String, bool>>(&json).map_err(|e| {
                ProgressError::MalformedJson {
                    path: path.clone(),
                    message: e.to_string(),
                }
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(ProgressError::io(&path, e)),
        };
        tracing::debug!(path = %path.display(), entries = checks.len(), "Loaded progress");
        Ok(Self {
            path,
            checks,
            dirty: false,
        })
    }

    /// Manual checkbox edit from the user.
    pub fn set_checked(&mut self, step: StepRef, checked: bool) {
        let key = step.to_string();
        if self.checks.get(&key).copied().unwrap_or(false) == checked {
            return;
        }
        if checked {
            self.checks.insert(key, true);
        } else {
            self.checks.remove(&key);
        }
        self.dirty = true;
    }

    /// Forget all progress ("clear all" / "new league").
    pub fn clear(&mut self) {
        if !self.checks.is_empty() {
            self.checks.clear();
            self.dirty = true;
        }
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Write the file atomically: serialize to a sibling temp file, then
    /// rename over the original.
    fn write_atomic(&self) -> Result<(), ProgressError> {
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir).map_err(|e| ProgressError::io(&dir, e))?;

        let json = serde_json::to_vec_pretty(&self.checks).map_err(|e| {
            ProgressError::MalformedJson {
                path: self.path.clone(),
                message: e.to_string(),
            }
        })?;

        let mut tmp =
            tempfile::NamedTempFile::new_in(&dir).map_err(|e| ProgressError::io(&dir, e))?;
        tmp.write_all(&json)
            .and_then(|_| tmp.as_file().sync_all())
            .map_err(|e| ProgressError::io(tmp.path(), e))?;
        tmp.persist(&self.path)
            .map_err(|e| ProgressError::io(&self.path, e.error))?;
        Ok(())
    }
}

impl ProgressStore for JsonProgressStore {
    fn is_complete(&self, step: StepRef) -> bool {
        self.checks.get(&step.to_string()).copied().unwrap_or(false)
    }

    fn set_complete(&mut self, step: StepRef) {
        let key = step.to_string();
        if self.checks.get(&key).copied() != Some(true) {
            self.checks.insert(key, true);
            self.dirty = true;
        }
    }

    fn flush(&mut self) -> Result<(), ProgressError> {
        if !self.dirty {
            return Ok(());
        }
        self.write_atomic()?;
        self.dirty = false;
        tracing::debug!(path = %self.path.display(), entries = self.checks.len(), "Saved progress");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::checklist::{Stage, Step};
    use pretty_assertions::assert_eq;

    fn act(n: u32, idx: usize) -> StepRef {
        StepRef::new(StageId::Act(n), idx)
    }

    #[test]
    fn memory_store_set_complete_is_idempotent() {
        let mut store = MemoryProgress::new();
        store.set_complete(act(1, 0));
        store.set_complete(act(1, 0));
        assert!(store.is_complete(act(1, 0)));
        assert_eq!(store.completed().count(), 1);
    }

    #[test]
    fn missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonProgressStore::load(dir.path().join("progress.json")).unwrap();
        assert!(!store.is_complete(act(1, 0)));
        assert!(!store.is_dirty());
    }

    #[test]
    fn reads_browser_checks_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("progress.json");
        std::fs::write(&path, r#"{"general-0":true,"act1-2":true,"act1-3":false,"legacy":true}"#)
            .unwrap();
        let store = JsonProgressStore::load(&path).unwrap();
        assert!(store.is_complete(StepRef::new(StageId::General, 0)));
        assert!(store.is_complete(act(1, 2)));
        assert!(!store.is_complete(act(1, 3)));
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("progress.json");
        std::fs::write(&path, "[1,2,3]").unwrap();
        let err = JsonProgressStore::load(&path).unwrap_err();
        assert!(matches!(err, ProgressError::MalformedJson { .. }));
    }

    #[test]
    fn flush_round_trips_and_keeps_unknown_keys() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("progress.json");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, r#"{"legacy":true}"#).unwrap();

        let mut store = JsonProgressStore::load(&path).unwrap();
        store.set_complete(act(2, 1));
        assert!(store.is_dirty());
        store.flush().unwrap();
        assert!(!store.is_dirty());

        let raw: BTreeMap<String, bool> =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw.get("act2-1"), Some(&true));
        assert_eq!(raw.get("legacy"), Some(&true));

        let reloaded = JsonProgressStore::load(&path).unwrap();
        assert!(reloaded.is_complete(act(2, 1)));
    }

    #[test]
    fn flush_creates_missing_parent_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a").join("b").join("progress.json");
        let mut store = JsonProgressStore::load(&path).unwrap();
        store.set_complete(act(1, 0));
        store.flush().unwrap();
        assert!(path.exists());
    }

    #[test]
    fn set_complete_on_complete_step_stays_clean() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("progress.json");
        std::fs::write(&path, r#"{"act1-0":true}"#).unwrap();
        let mut store = JsonProgressStore::load(&path).unwrap();
        store.set_complete(act(1, 0));
        assert!(!store.is_dirty());
    }

    #[test]
    fn manual_uncheck_and_clear() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = JsonProgressStore::load(dir.path().join("progress.json")).unwrap();
        store.set_checked(act(1, 0), true);
        store.set_checked(act(1, 1), true);
        store.set_checked(act(1, 0), false);
        assert!(!store.is_complete(act(1, 0)));
        assert!(store.is_complete(act(1, 1)));

        store.clear();
        assert!(!store.is_complete(act(1, 1)));
        assert!(store.is_dirty());
    }

    #[test]
    fn stage_progress_counts_checked_steps() {
        let checklist = Checklist::from_stages(vec![Stage::new(
            StageId::Act(1),
            vec![Step::new("a"), Step::new("b"), Step::new("c")],
        )])
        .unwrap();
        let mut store = MemoryProgress::new();
        store.set_complete(act(1, 0));
        store.set_complete(act(1, 2));
        store.set_complete(act(2, 0));

        let progress = stage_progress(&store, &checklist, StageId::Act(1));
        assert_eq!(progress.checked, 2);
        assert_eq!(progress.total, 3);

        let empty = stage_progress(&store, &checklist, StageId::Act(9));
        assert_eq!((empty.checked, empty.total), (0, 0));
    }
}
