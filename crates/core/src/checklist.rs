// crates/core/src/checklist.rs
//! The guide's checklist model: ordered stages of ordered steps.
//!
//! Loaded from the same JSON document the browser renders:
//!
//! ```json
//! {
//!   "general": { "title": "General", "tips": [], "steps": ["Pick a build"] },
//!   "acts": [
//!     { "id": 1, "title": "Act 1", "tips": [],
//!       "steps": [{ "text": "Kill Hillock", "zones": ["The Twilight Strand"] }] }
//!   ]
//! }
//! ```
//!
//! Steps are either plain strings (untagged) or objects carrying zone tags.
//! Stage order is `general` first, then acts as listed in the document. The
//! global order is [`Checklist::iter_global`]; act numbers only name stages
//! and say nothing about position.

use std::collections::HashSet;
use std::path::Path;

use leveling_sync_types::{StageId, StepRef};
use serde::Deserialize;

use crate::error::ChecklistError;

/// One checklist item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub text: String,
    /// Location tags; matched against log locations by the locator.
    pub zones: Vec<String>,
}

impl Step {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            zones: Vec::new(),
        }
    }

    pub fn with_zones<I, S>(mut self, zones: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.zones = zones.into_iter().map(Into::into).collect();
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stage {
    pub id: StageId,
    pub title: String,
    pub tips: Vec<String>,
    pub steps: Vec<Step>,
}

impl Stage {
    pub fn new(id: StageId, steps: Vec<Step>) -> Self {
        let title = match id {
            StageId::General => "General".to_string(),
            StageId::Act(n) => format!("Act {n}"),
        };
        Self {
            id,
            title,
            tips: Vec::new(),
            steps,
        }
    }
}

/// Ordered, immutable checklist. Owned by the application and shared with
/// the sync session for its lifetime, so the global order never changes
/// mid-session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Checklist {
    stages: Vec<Stage>,
}

// =============================================================================
// Raw document structs (deserialized from the guide JSON)
// =============================================================================

#[derive(Debug, Deserialize)]
struct GuideDocument {
    #[serde(default)]
    general: Option<RawSection>,
    #[serde(default)]
    acts: Vec<RawAct>,
}

#[derive(Debug, Deserialize)]
struct RawSection {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    tips: Vec<String>,
    #[serde(default)]
    steps: Vec<RawStep>,
}

#[derive(Debug, Deserialize)]
struct RawAct {
    id: u32,
    #[serde(flatten)]
    section: RawSection,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawStep {
    Plain(String),
    Tagged {
        text: String,
        #[serde(default)]
        zones: Vec<String>,
    },
}

impl From<RawStep> for Step {
    fn from(raw: RawStep) -> Self {
        match raw {
            RawStep::Plain(text) => Step::new(text),
            RawStep::Tagged { text, zones } => Step::new(text).with_zones(zones),
        }
    }
}

fn build_stage(id: StageId, section: RawSection) -> Stage {
    let mut stage = Stage::new(id, section.steps.into_iter().map(Step::from).collect());
    if let Some(title) = section.title {
        stage.title = title;
    }
    stage.tips = section.tips;
    stage
}

impl Checklist {
    /// Build a checklist from stages, keeping the given order.
    pub fn from_stages(stages: Vec<Stage>) -> Result<Self, ChecklistError> {
        let mut seen = HashSet::new();
        for stage in &stages {
            if stage.id == StageId::Act(0) {
                return Err(ChecklistError::ZeroStage);
            }
            if !seen.insert(stage.id) {
                return Err(match stage.id {
                    StageId::Act(id) => ChecklistError::DuplicateStage { id },
                    StageId::General => ChecklistError::MalformedJson {
                        message: "more than one general section".into(),
                    },
                });
            }
        }
        Ok(Self { stages })
    }

    /// Parse a guide document.
    pub fn from_json_str(json: &str) -> Result<Self, ChecklistError> {
        let doc: GuideDocument =
            serde_json::from_str(json).map_err(|e| ChecklistError::MalformedJson {
                message: e.to_string(),
            })?;

        let mut stages = Vec::with_capacity(doc.acts.len() + 1);
        if let Some(general) = doc.general {
            stages.push(build_stage(StageId::General, general));
        }
        for act in doc.acts {
            if act.id == 0 {
                return Err(ChecklistError::ZeroStage);
            }
            stages.push(build_stage(StageId::Act(act.id), act.section));
        }
        Self::from_stages(stages)
    }

    /// Read and parse a guide document from disk.
    pub async fn load(path: &Path) -> Result<Self, ChecklistError> {
        let json = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| ChecklistError::io(path, e))?;
        let checklist = Self::from_json_str(&json)?;
        tracing::info!(
            path = %path.display(),
            stages = checklist.stages.len(),
            steps = checklist.len(),
            "Loaded checklist"
        );
        Ok(checklist)
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn stage(&self, id: StageId) -> Option<&Stage> {
        self.stages.iter().find(|s| s.id == id)
    }

    /// Steps of a stage; empty for an unknown stage.
    pub fn steps_of(&self, id: StageId) -> &[Step] {
        self.stage(id).map(|s| s.steps.as_slice()).unwrap_or(&[])
    }

    pub fn step(&self, step: StepRef) -> Option<&Step> {
        self.stage(step.stage).and_then(|s| s.steps.get(step.index))
    }

    /// Location tags of a step; empty for an unknown step.
    pub fn tags_of(&self, step: StepRef) -> &[String] {
        self.step(step).map(|s| s.zones.as_slice()).unwrap_or(&[])
    }

    /// Every step in global order.
    pub fn iter_global(&self) -> impl Iterator<Item = (StepRef, &Step)> + '_ {
        self.stages.iter().flat_map(|stage| {
            stage
                .steps
                .iter()
                .enumerate()
                .map(move |(index, step)| (StepRef::new(stage.id, index), step))
        })
    }

    /// Total number of steps across all stages.
    pub fn len(&self) -> usize {
        self.stages.iter().map(|s| s.steps.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
