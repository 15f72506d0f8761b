use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;

use tick_recorder::handlers::{status, ticks, AppError};
use tick_recorder::metrics::MetricsCollector;
use tick_recorder::{
    AppState, ConnectivityState, MemoryTickStore, PresentationZone, Recorder, RecorderConfig,
    StoreError, Tick,
};

fn state_with(store: Arc<MemoryTickStore>, zone: &str) -> Arc<AppState> {
    let metrics = Arc::new(MetricsCollector::new());
    let recorder = Arc::new(Recorder::new(
        RecorderConfig::default(),
        store.clone(),
        metrics.clone(),
    ));
    Arc::new(AppState {
        recorder,
        store,
        metrics,
        time_zone: zone.parse().unwrap(),
    })
}

#[tokio::test]
async fn lists_stored_ticks_in_presentation_offset() {
    let store = Arc::new(MemoryTickStore::new());
    store.seed([
        Tick::from_epoch_secs(1_757_894_401).unwrap(),
        Tick::from_epoch_secs(1_757_894_400).unwrap(),
    ]);
    let state = state_with(store, "+03:00");

    let body = ticks::list_ticks(State(state)).await.unwrap().0;

    assert_eq!(
        body,
        vec!["2025-09-15T03:00:00+03:00", "2025-09-15T03:00:01+03:00"]
    );
}

#[tokio::test]
async fn lists_stored_ticks_in_named_zone() {
    let store = Arc::new(MemoryTickStore::new());
    // 2025-03-30 00:59:59Z and 01:00:00Z straddle the CET -> CEST switch.
    store.seed([
        Tick::from_epoch_secs(1_743_296_399).unwrap(),
        Tick::from_epoch_secs(1_743_296_400).unwrap(),
    ]);
    let state = state_with(store, "Europe/Berlin");
    assert!(matches!(state.time_zone, PresentationZone::Named(_)));

    let body = ticks::list_ticks(State(state)).await.unwrap().0;

    assert_eq!(
        body,
        vec!["2025-03-30T01:59:59+01:00", "2025-03-30T03:00:00+02:00"]
    );
}

#[tokio::test]
async fn unreachable_store_maps_to_503() {
    let store = Arc::new(MemoryTickStore::new());
    store.set_available(false);
    let state = state_with(store, "UTC");

    let err = ticks::list_ticks(State(state)).await.unwrap_err();
    assert_eq!(err.into_response().status(), StatusCode::SERVICE_UNAVAILABLE);

    let unexpected = AppError::from(StoreError::Unexpected("bad reply".into()));
    assert_eq!(
        unexpected.into_response().status(),
        StatusCode::INTERNAL_SERVER_ERROR
    );
}

#[tokio::test]
async fn status_reports_buffer_and_connectivity() {
    let store = Arc::new(MemoryTickStore::new());
    let state = state_with(store, "UTC");
    state.recorder.record_tick(Tick::from_epoch_secs(1_757_894_400).unwrap());

    let body = status::recorder_status(State(state)).await.0;

    assert_eq!(body.connectivity, ConnectivityState::Up);
    assert_eq!(body.buffered, 1);
    assert_eq!(body.capacity, 100_000);
    assert_eq!(body.dropped, 0);
    assert_eq!(body.store, "memory");
    assert!(body.secs_since_last_probe.is_none());
}
