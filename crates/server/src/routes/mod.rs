//! API route handlers for the leveling-sync server.

pub mod checklist;
pub mod health;
pub mod metrics;
pub mod sync;

use std::sync::Arc;

use axum::Router;

use crate::state::AppState;

/// Create the combined router: API routes under `/api`, plus `/metrics`.
///
/// Routes:
/// - GET  /api/health - Health check
/// - GET  /api/checklist - Stages with steps, checks and progress
/// - POST /api/progress/{step_id} - Check or uncheck a step
/// - POST /api/progress/clear - Clear all progress
/// - POST /api/sync/attach - Start syncing a log file
/// - POST /api/sync/stop - Stop syncing
/// - POST /api/sync/poll - Poll immediately
/// - GET  /api/sync/status - Sync status snapshot
/// - GET  /api/sync/stream - SSE stream of sync events
/// - GET  /metrics - Prometheus metrics
pub fn api_routes(state: Arc<AppState>) -> Router {
    Router::new()
        .nest("/api", health::router())
        .nest("/api", checklist::router())
        .nest("/api", sync::router())
        .merge(metrics::router())
        .with_state(state)
}
