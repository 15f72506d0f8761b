use axum::{extract::State, Json};
use std::sync::Arc;

use super::AppError;
use crate::AppState;

// ─── GET /ticks ──────────────────────────────────────────────────
/// Every stored tick, oldest first, rendered in the configured time zone.
/// Ticks still sitting in the buffer are not included.
pub async fn list_ticks(State(state): State<Arc<AppState>>) -> Result<Json<Vec<String>>, AppError> {
    let ticks = state.store.fetch_all().await?;
    let body = ticks
        .iter()
        .map(|tick| tick.present(&state.time_zone))
        .collect();
    Ok(Json(body))
}
