use axum::{middleware as axum_mw, routing::get, Router};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::metrics::stream;
use crate::middleware::timing;
use crate::AppState;

/// Read-side router: stored ticks, recorder status and metrics.
pub fn create_router(state: Arc<AppState>) -> Router {
    Router::new()
        // ── Stored ticks ────────────────────────────────────────
        .route("/ticks", get(handlers::ticks::list_ticks))
        // ── Recorder state ──────────────────────────────────────
        .route("/api/status", get(handlers::status::recorder_status))
        // ── Metrics ─────────────────────────────────────────────
        .route("/api/metrics", get(stream::get_metrics))
        .route("/api/metrics/stream", get(stream::metrics_stream))
        .with_state(state)
        // ── Global middleware (applied bottom-up) ───────────────
        .layer(axum_mw::from_fn(timing::timing_middleware))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
