use axum::{extract::State, Json};
use std::sync::Arc;

use crate::recorder::RecorderStatus;
use crate::AppState;

// ─── GET /api/status ─────────────────────────────────────────────

pub async fn recorder_status(State(state): State<Arc<AppState>>) -> Json<RecorderStatus> {
    Json(state.recorder.status())
}
