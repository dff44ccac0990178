// crates/server/src/routes/checklist.rs
//! Checklist and manual progress endpoints.
//!
//! - `GET  /api/checklist`            -- every stage with steps, checks and progress
//! - `POST /api/progress/{step_id}`   -- check or uncheck one step
//! - `POST /api/progress/clear`       -- forget all progress (new league)

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use leveling_sync_core::{stage_progress, Checklist, ProgressStore};
use leveling_sync_types::{SetCheckedRequest, StageProgress, StageView, StepRef, StepView};

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/checklist", get(get_checklist))
        .route("/progress/clear", post(clear_progress))
        .route("/progress/{step_id}", post(set_checked))
}

fn build_views<S: ProgressStore + ?Sized>(checklist: &Checklist, store: &S) -> Vec<StageView> {
    checklist
        .stages()
        .iter()
        .map(|stage| StageView {
            id: stage.id,
            title: stage.title.clone(),
            tips: stage.tips.clone(),
            steps: stage
                .steps
                .iter()
                .enumerate()
                .map(|(index, step)| {
                    let id = StepRef::new(stage.id, index);
                    StepView {
                        id,
                        text: step.text.clone(),
                        zones: step.zones.clone(),
                        checked: store.is_complete(id),
                    }
                })
                .collect(),
            progress: stage_progress(store, checklist, stage.id),
        })
        .collect()
}

/// GET /api/checklist
async fn get_checklist(State(state): State<Arc<AppState>>) -> Json<Vec<StageView>> {
    let store = state.sync.progress();
    Json(build_views(state.sync.checklist(), &*store))
}

/// POST /api/progress/{step_id} -- manual checkbox edit. Returns the stage's
/// updated progress.
async fn set_checked(
    State(state): State<Arc<AppState>>,
    Path(step_id): Path<String>,
    Json(body): Json<SetCheckedRequest>,
) -> ApiResult<Json<StageProgress>> {
    let step: StepRef = step_id
        .parse()
        .map_err(|_| ApiError::StepNotFound(step_id.clone()))?;
    if state.sync.checklist().step(step).is_none() {
        return Err(ApiError::StepNotFound(step_id));
    }

    // Saving writes the progress file (blocking I/O)
    let progress = tokio::task::spawn_blocking(move || {
        let mut store = state.sync.progress();
        store.set_checked(step, body.checked);
        store.flush()?;
        tracing::debug!(step = %step, checked = body.checked, "Progress edited");
        Ok::<StageProgress, ApiError>(stage_progress(&*store, state.sync.checklist(), step.stage))
    })
    .await
    .map_err(|e| ApiError::Internal(format!("Task join error: {e}")))??;

    Ok(Json(progress))
}

/// POST /api/progress/clear
async fn clear_progress(State(state): State<Arc<AppState>>) -> ApiResult<StatusCode> {
    tokio::task::spawn_blocking(move || {
        let mut store = state.sync.progress();
        store.clear();
        store.flush()
    })
    .await
    .map_err(|e| ApiError::Internal(format!("Task join error: {e}")))??;

    tracing::info!("Progress cleared");
    Ok(StatusCode::NO_CONTENT)
}
