use tracing::{info, warn};

use super::Recorder;
use crate::store::StoreError;

/// Result of one monitor invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeOutcome {
    /// Store is up; nothing to do.
    NotNeeded,
    /// Down, but the last probe was less than one cooldown ago.
    CoolingDown,
    /// Probe succeeded; state is Up and a flush was triggered.
    Recovered,
    /// Probe failed; still Down.
    StillDown,
}

impl Recorder {
    /// Periodic entry point. Probes the store while offline, at most once per
    /// cooldown, and replays the buffer as soon as a probe succeeds.
    pub async fn reconnect_loop(&self) -> ProbeOutcome {
        if self.connectivity.is_up() {
            return ProbeOutcome::NotNeeded;
        }
        if !self.connectivity.try_claim_probe() {
            return ProbeOutcome::CoolingDown;
        }

        let cooldown_secs = self.connectivity.cooldown().as_secs_f64();
        match self.store.probe_liveness().await {
            Ok(()) => {
                self.connectivity.mark_up();
                self.metrics.record_probe(true);
                info!(
                    buffered = self.buffer.len(),
                    "store reachable again, replaying buffered ticks"
                );
                self.flush_if_possible().await;
                ProbeOutcome::Recovered
            }
            Err(StoreError::Unavailable(cause)) => {
                self.metrics.record_probe(false);
                warn!(%cause, "store still unavailable, next probe in {cooldown_secs}s");
                ProbeOutcome::StillDown
            }
            Err(StoreError::Unexpected(cause)) => {
                self.metrics.record_probe(false);
                warn!(%cause, "unexpected error probing store, next probe in {cooldown_secs}s");
                ProbeOutcome::StillDown
            }
        }
    }
}
