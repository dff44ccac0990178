//! Log sync endpoints (REST + SSE).
//!
//! - `POST /api/sync/attach`  -- start syncing a log file
//! - `POST /api/sync/stop`    -- stop syncing
//! - `POST /api/sync/poll`    -- poll now instead of waiting for the timer
//! - `GET  /api/sync/status`  -- current status snapshot
//! - `GET  /api/sync/stream`  -- SSE stream of sync events

use std::convert::Infallible;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::State,
    http::StatusCode,
    response::sse::{Event, KeepAlive, Sse},
    routing::{get, post},
    Json, Router,
};
use leveling_sync_types::{AttachRequest, SyncEvent, SyncStatus};
use tokio::sync::broadcast::error::RecvError;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/sync/attach", post(attach))
        .route("/sync/stop", post(stop))
        .route("/sync/poll", post(poll_now))
        .route("/sync/status", get(status))
        .route("/sync/stream", get(stream))
}

/// POST /api/sync/attach -- replaces an active session.
async fn attach(
    State(state): State<Arc<AppState>>,
    Json(body): Json<AttachRequest>,
) -> ApiResult<Json<SyncStatus>> {
    let path = body.path.trim();
    if path.is_empty() {
        return Err(ApiError::BadRequest("path must not be empty".into()));
    }
    let status = state.sync.attach(&PathBuf::from(path)).await?;
    Ok(Json(status))
}

/// POST /api/sync/stop
async fn stop(State(state): State<Arc<AppState>>) -> ApiResult<StatusCode> {
    state.sync.stop().await?;
    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/sync/poll -- 409 when a poll is already running.
async fn poll_now(State(state): State<Arc<AppState>>) -> ApiResult<Json<SyncStatus>> {
    Ok(Json(state.sync.poll_now().await?))
}

/// GET /api/sync/status
async fn status(State(state): State<Arc<AppState>>) -> Json<SyncStatus> {
    Json(state.sync.status())
}

fn status_event(status: &SyncStatus) -> Event {
    Event::default()
        .event("status")
        .data(serde_json::to_string(status).unwrap_or_default())
}

/// GET /api/sync/stream -- SSE stream of sync events.
///
/// # Events
///
/// | Event name       | When emitted                               |
/// |------------------|--------------------------------------------|
/// | `status`         | On connect, and when a client lags         |
/// | `step_reached`   | A new location resolved to a step          |
/// | `status_changed` | The player entered a different location    |
/// | `source_ended`   | Syncing stopped or the log became unusable |
/// | `heartbeat`      | Every 15 seconds                           |
async fn stream(
    State(state): State<Arc<AppState>>,
) -> Sse<impl tokio_stream::Stream<Item = Result<Event, Infallible>>> {
    let mut rx = state.sync.broadcaster().subscribe();

    let stream = async_stream::stream! {
        yield Ok(status_event(&state.sync.status()));

        let mut heartbeat_interval = tokio::time::interval(Duration::from_secs(15));
        heartbeat_interval.tick().await;
        loop {
            tokio::select! {
                event = rx.recv() => {
                    match event {
                        Ok(sync_event) => {
                            let name = match &sync_event {
                                SyncEvent::StepReached { .. } => "step_reached",
                                SyncEvent::StatusChanged { .. } => "status_changed",
                                SyncEvent::SourceEnded { .. } => "source_ended",
                            };
                            yield Ok(Event::default().event(name).data(
                                serde_json::to_string(&sync_event).unwrap_or_default()
                            ));
                        }
                        Err(RecvError::Lagged(n)) => {
                            tracing::warn!(skipped = n, "SSE client lagged; re-sending status");
                            yield Ok(status_event(&state.sync.status()));
                        }
                        Err(RecvError::Closed) => break,
                    }
                }
                _ = heartbeat_interval.tick() => {
                    yield Ok(Event::default().event("heartbeat").data("{}"));
                }
            }
        }
    };

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("heartbeat"),
    )
}
