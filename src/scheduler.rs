use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::recorder::Recorder;

/// Shortest period a task is scheduled at; `tokio::time::interval` rejects zero.
const MIN_PERIOD: Duration = Duration::from_millis(1);

/// Drives the recorder's periodic entry points as independent tasks on the
/// runtime's worker pool.
///
/// Tasks stop between iterations once shutdown is signalled; an iteration
/// that has started always runs to completion.
pub struct Scheduler {
    recorder: Arc<Recorder>,
    shutdown: watch::Sender<bool>,
    handles: Vec<JoinHandle<()>>,
}

impl Scheduler {
    /// Spawns the tick, flush and reconnect tasks. Must be called from
    /// within a tokio runtime.
    pub fn start(recorder: Arc<Recorder>) -> Self {
        let (shutdown, shutdown_rx) = watch::channel(false);
        let config = recorder.config().clone();

        let tick = {
            let recorder = recorder.clone();
            spawn_periodic(
                "tick",
                config.tick_interval,
                MissedTickBehavior::Burst,
                shutdown_rx.clone(),
                move || {
                    recorder.generate_tick();
                    async {}
                },
            )
        };

        let flush = {
            let recorder = recorder.clone();
            spawn_periodic(
                "flush",
                config.flush_interval,
                MissedTickBehavior::Delay,
                shutdown_rx.clone(),
                move || {
                    let recorder = recorder.clone();
                    async move { recorder.background_flush().await }
                },
            )
        };

        let reconnect = {
            let recorder = recorder.clone();
            spawn_periodic(
                "reconnect",
                config.probe_interval,
                MissedTickBehavior::Delay,
                shutdown_rx,
                move || {
                    let recorder = recorder.clone();
                    async move {
                        recorder.reconnect_loop().await;
                    }
                },
            )
        };

        info!(
            tick_ms = config.tick_interval.as_millis() as u64,
            flush_ms = config.flush_interval.as_millis() as u64,
            probe_ms = config.probe_interval.as_millis() as u64,
            "scheduler started"
        );

        Self {
            recorder,
            shutdown,
            handles: vec![tick, flush, reconnect],
        }
    }

    /// A receiver that flips to `true` when shutdown begins, for other
    /// components (the HTTP server) to follow.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.shutdown.subscribe()
    }

    /// Stops every task, waits for them, then runs the shutdown drain.
    /// Returns the number of ticks left unflushed.
    pub async fn shutdown(self) -> usize {
        let _ = self.shutdown.send(true);
        for handle in self.handles {
            if let Err(err) = handle.await {
                debug!(%err, "periodic task ended abnormally");
            }
        }
        self.recorder.shutdown_drain().await
    }
}

fn spawn_periodic<F, Fut>(
    name: &'static str,
    period: Duration,
    missed: MissedTickBehavior,
    mut shutdown: watch::Receiver<bool>,
    mut job: F,
) -> JoinHandle<()>
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    if period < MIN_PERIOD {
        warn!(task = name, ?period, "period below 1 ms, clamping");
    }
    let period = period.max(MIN_PERIOD);

    tokio::spawn(async move {
        let mut timer = interval(period);
        timer.set_missed_tick_behavior(missed);

        loop {
            if *shutdown.borrow() {
                break;
            }
            tokio::select! {
                _ = timer.tick() => job().await,
                changed = shutdown.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }
        debug!(task = name, "periodic task stopped");
    })
}
