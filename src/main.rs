use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

use tick_recorder::metrics::MetricsCollector;
use tick_recorder::{
    server, AppState, Args, MemoryTickStore, Recorder, RecorderConfig, RedisTickStore, Scheduler,
    StoreKind, TickStore,
};

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // ── 1. Logging ───────────────────────────────────────────────
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(args.log_level.as_str()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    // ── 2. Config ────────────────────────────────────────────────
    let config = args.recorder_config().context("invalid configuration")?;

    // ── 3. Worker pool ───────────────────────────────────────────
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(args.worker_threads)
        .thread_name("sched")
        .enable_all()
        .build()
        .context("failed to build runtime")?;

    runtime.block_on(run(args, config))
}

async fn run(args: Args, config: RecorderConfig) -> anyhow::Result<()> {
    info!("tick-recorder v{}", env!("CARGO_PKG_VERSION"));

    // ── Store ────────────────────────────────────────────────────
    let store: Arc<dyn TickStore> = match args.store {
        StoreKind::Redis => {
            info!(url = %args.redis_url, key = %args.ticks_key, "using Redis store");
            Arc::new(
                RedisTickStore::open(&args.redis_url, args.ticks_key.clone(), args.store_timeout())
                    .context("cannot set up Redis store")?,
            )
        }
        StoreKind::Memory => {
            info!("using in-memory store; ticks are lost on exit");
            Arc::new(MemoryTickStore::new())
        }
    };

    // ── Core + schedules ─────────────────────────────────────────
    let metrics = Arc::new(MetricsCollector::new());
    let recorder = Arc::new(Recorder::new(config, store.clone(), metrics.clone()));
    let scheduler = Scheduler::start(recorder.clone());

    // ── HTTP read API ────────────────────────────────────────────
    let state = Arc::new(AppState {
        recorder,
        store,
        metrics,
        time_zone: args.time_zone,
    });
    let app = server::create_router(state);

    let listener = tokio::net::TcpListener::bind(&args.bind)
        .await
        .with_context(|| format!("failed to bind {}", args.bind))?;
    info!(zone = %args.time_zone, "listening on http://{}", args.bind);
    info!("stored ticks → http://{}/ticks", args.bind);

    let mut stop_rx = scheduler.subscribe();
    let server = tokio::spawn(async move {
        axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                let _ = stop_rx.wait_for(|stop| *stop).await;
            })
            .await
    });

    shutdown_signal().await;
    info!("shutdown requested");

    let residual = scheduler.shutdown().await;
    info!(residual, "recorder stopped");

    server
        .await
        .context("HTTP server task failed")?
        .context("HTTP server exited with error")?;
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
