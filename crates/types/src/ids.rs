//! Stage and step identifiers.
//!
//! Both identifiers round-trip through the string keys the browser app has
//! always persisted: sections are `general` or `act<N>`, steps are
//! `<section>-<index>` (e.g. `act3-12`).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Error returned when a stage or step key cannot be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdParseError {
    #[error("invalid stage id: {0:?}")]
    Stage(String),

    #[error("invalid step id: {0:?}")]
    Step(String),
}

/// One top-level phase of the guide.
///
/// `General` is the sentinel section shown before the numbered acts. The act
/// number is a name, not a position: the checklist decides stage order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum StageId {
    General,
    Act(u32),
}

impl fmt::Display for StageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageId::General => f.write_str("general"),
            StageId::Act(n) => write!(f, "act{n}"),
        }
    }
}

impl FromStr for StageId {
    type Err = IdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "general" {
            return Ok(StageId::General);
        }
        s.strip_prefix("act")
            .and_then(|n| n.parse::<u32>().ok())
            .filter(|n| *n > 0)
            .map(StageId::Act)
            .ok_or_else(|| IdParseError::Stage(s.to_string()))
    }
}

impl From<StageId> for String {
    fn from(id: StageId) -> Self {
        id.to_string()
    }
}

impl TryFrom<String> for StageId {
    type Error = IdParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

/// Position of a step in the guide: its stage and its index within that
/// stage. The derived `Ord` is a stable key order for sets and maps only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct StepRef {
    pub stage: StageId,
    pub index: usize,
}

impl StepRef {
    pub fn new(stage: StageId, index: usize) -> Self {
        Self { stage, index }
    }
}

impl fmt::Display for StepRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.stage, self.index)
    }
}

impl FromStr for StepRef {
    type Err = IdParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || IdParseError::Step(s.to_string());
        let (stage, index) = s.rsplit_once('-').ok_or_else(invalid)?;
        let stage = stage.parse::<StageId>().map_err(|_| invalid())?;
        let index = index.parse::<usize>().map_err(|_| invalid())?;
        Ok(StepRef { stage, index })
    }
}

impl From<StepRef> for String {
    fn from(step: StepRef) -> Self {
        step.to_string()
    }
}

impl TryFrom<String> for StepRef {
    type Error = IdParseError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}
