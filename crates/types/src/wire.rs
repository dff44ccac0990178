//! Wire types (serialized to the browser via REST and SSE).

use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::ids::{StageId, StepRef};

/// Why a sync session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../web/src/types/generated/"))]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    /// The user stopped syncing (or attached a different file).
    Stopped,
    /// The log file became unreadable; the user must re-attach.
    SourceUnavailable,
}

/// Real-time sync notification broadcast to connected SSE clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../web/src/types/generated/"))]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SyncEvent {
    /// A new location resolved to a checklist step; everything up to and
    /// including it has been marked complete. The UI scrolls/highlights it.
    #[serde(rename_all = "camelCase")]
    StepReached {
        #[ts(type = "string")]
        step: StepRef,
        text: String,
        /// Steps newly marked complete by this resolution.
        #[ts(type = "Array<string>")]
        completed: Vec<StepRef>,
    },
    /// The player entered a different location.
    #[serde(rename_all = "camelCase")]
    StatusChanged {
        location: String,
        #[ts(type = "string | null")]
        stage: Option<StageId>,
        label: String,
    },
    /// The session ended; the UI reverts to "not syncing".
    #[serde(rename_all = "camelCase")]
    SourceEnded { reason: EndReason },
}

/// Snapshot of the sync session, served by `GET /api/sync/status` and sent as
/// the first SSE event on connect.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../web/src/types/generated/"))]
#[serde(rename_all = "camelCase")]
pub struct SyncStatus {
    pub active: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(type = "string | null")]
    pub stage: Option<StageId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    /// Human-readable position, e.g. `[act2] The Riverways`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Last step resolved from the log (the highlighted step).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[ts(type = "string | null")]
    pub reached: Option<StepRef>,
    /// RFC 3339 timestamp of the last completed poll.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_poll_at: Option<String>,
}

/// Checked/total counts for one section's progress bar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../web/src/types/generated/"))]
#[serde(rename_all = "camelCase")]
pub struct StageProgress {
    #[ts(type = "string")]
    pub stage: StageId,
    pub checked: u32,
    pub total: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../web/src/types/generated/"))]
#[serde(rename_all = "camelCase")]
pub struct StepView {
    #[ts(type = "string")]
    pub id: StepRef,
    pub text: String,
    pub zones: Vec<String>,
    pub checked: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../web/src/types/generated/"))]
#[serde(rename_all = "camelCase")]
pub struct StageView {
    #[ts(type = "string")]
    pub id: StageId,
    pub title: String,
    pub tips: Vec<String>,
    pub steps: Vec<StepView>,
    pub progress: StageProgress,
}

/// Body of `POST /api/progress/{step_id}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../web/src/types/generated/"))]
pub struct SetCheckedRequest {
    pub checked: bool,
}

/// Body of `POST /api/sync/attach`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "codegen", ts(export, export_to = "../../web/src/types/generated/"))]
pub struct AttachRequest {
    pub path: String,
}
