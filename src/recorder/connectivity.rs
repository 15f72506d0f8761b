use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;

const NEVER: u64 = u64::MAX;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectivityState {
    /// Flushing permitted, no probing.
    Up,
    /// Flushing suppressed, probed at most once per cooldown.
    Down,
}

/// Two-state store health flag plus the probe rate limiter.
///
/// Only the flusher moves Up→Down and only the monitor moves Down→Up.
/// Times are milliseconds since construction on tokio's clock, so paused
/// test time drives the cooldown.
pub struct Connectivity {
    up: AtomicBool,
    anchor: Instant,
    last_probe_ms: AtomicU64,
    cooldown: Duration,
}

impl Connectivity {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            up: AtomicBool::new(true),
            anchor: Instant::now(),
            last_probe_ms: AtomicU64::new(NEVER),
            cooldown,
        }
    }

    pub fn state(&self) -> ConnectivityState {
        if self.is_up() {
            ConnectivityState::Up
        } else {
            ConnectivityState::Down
        }
    }

    pub fn is_up(&self) -> bool {
        self.up.load(Ordering::Acquire)
    }

    pub fn cooldown(&self) -> Duration {
        self.cooldown
    }

    /// Returns true if this call performed the Up→Down transition.
    pub(crate) fn mark_down(&self) -> bool {
        self.up.swap(false, Ordering::AcqRel)
    }

    /// Returns true if this call performed the Down→Up transition.
    pub(crate) fn mark_up(&self) -> bool {
        !self.up.swap(true, Ordering::AcqRel)
    }

    /// Claims the current probe window. At most one caller wins per
    /// cooldown, however many race for it.
    pub(crate) fn try_claim_probe(&self) -> bool {
        let now = self.now_ms();
        let last = self.last_probe_ms.load(Ordering::Acquire);
        if last != NEVER && now.saturating_sub(last) < self.cooldown.as_millis() as u64 {
            return false;
        }
        self.last_probe_ms
            .compare_exchange(last, now, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Time since the last probe attempt, if any was made.
    pub fn since_last_probe(&self) -> Option<Duration> {
        match self.last_probe_ms.load(Ordering::Acquire) {
            NEVER => None,
            last => Some(Duration::from_millis(self.now_ms().saturating_sub(last))),
        }
    }

    fn now_ms(&self) -> u64 {
        self.anchor.elapsed().as_millis() as u64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_up_and_transitions_once() {
        let c = Connectivity::new(Duration::from_secs(5));
        assert_eq!(c.state(), ConnectivityState::Up);
        assert!(c.mark_down());
        assert!(!c.mark_down());
        assert_eq!(c.state(), ConnectivityState::Down);
        assert!(c.mark_up());
        assert!(!c.mark_up());
    }

    #[tokio::test(start_paused = true)]
    async fn probe_window_is_claimed_once_per_cooldown() {
        let c = Connectivity::new(Duration::from_secs(5));
        assert!(c.since_last_probe().is_none());
        assert!(c.try_claim_probe());
        assert!(!c.try_claim_probe());

        tokio::time::advance(Duration::from_millis(4_999)).await;
        assert!(!c.try_claim_probe());

        tokio::time::advance(Duration::from_millis(1)).await;
        assert!(c.try_claim_probe());
        assert_eq!(c.since_last_probe(), Some(Duration::ZERO));
    }
}
