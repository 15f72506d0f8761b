use std::time::Duration;

use clap::{Parser, ValueEnum};
use thiserror::Error;

use crate::tick::PresentationZone;

/// Records a one-second clock tick into a store, buffering through outages.
#[derive(Parser, Debug, Clone)]
#[command(name = "tick-recorder")]
#[command(version)]
pub struct Args {
    /// Backing store
    #[arg(long, env = "TICK_STORE", value_enum, default_value = "redis")]
    pub store: StoreKind,

    /// Redis connection URL
    #[arg(long, env = "TICK_REDIS_URL", default_value = "redis://127.0.0.1:6379/")]
    pub redis_url: String,

    /// Sorted-set key the ticks are written to
    #[arg(long, env = "TICK_TICKS_KEY", default_value = "ticks")]
    pub ticks_key: String,

    /// Upper bound on any single store call
    #[arg(long, env = "TICK_STORE_TIMEOUT_MS", default_value_t = 2_000)]
    pub store_timeout_ms: u64,

    /// HTTP listen address for the read API
    #[arg(long, env = "TICK_BIND", default_value = "0.0.0.0:3000")]
    pub bind: String,

    /// Max ticks held in memory while the store is behind
    #[arg(long, env = "TICK_BUFFER_CAPACITY", default_value_t = 100_000)]
    pub buffer_capacity: usize,

    #[arg(long, env = "TICK_TICK_INTERVAL_MS", default_value_t = 1_000)]
    pub tick_interval_ms: u64,

    #[arg(long, env = "TICK_FLUSH_INTERVAL_MS", default_value_t = 200)]
    pub flush_interval_ms: u64,

    /// Ticks per store submission
    #[arg(long, env = "TICK_FLUSH_BATCH_SIZE", default_value_t = 500)]
    pub flush_batch_size: usize,

    /// Ticks drained per flush cycle before yielding
    #[arg(long, env = "TICK_MAX_DRAIN_PER_CYCLE", default_value_t = 2_000)]
    pub max_drain_per_cycle: usize,

    #[arg(long, env = "TICK_PROBE_INTERVAL_MS", default_value_t = 1_000)]
    pub probe_interval_ms: u64,

    /// Minimum gap between liveness probes while offline
    #[arg(long, env = "TICK_RECONNECT_COOLDOWN_MS", default_value_t = 5_000)]
    pub reconnect_cooldown_ms: u64,

    /// Scheduler worker pool size
    #[arg(long, env = "TICK_WORKER_THREADS", default_value_t = 4)]
    pub worker_threads: usize,

    /// Zone used when presenting ticks: an IANA name (Europe/Berlin) or an offset (+03:00)
    #[arg(
        long,
        visible_alias = "utc-offset",
        env = "TICK_TIME_ZONE",
        default_value = "UTC",
        value_parser = parse_zone
    )]
    pub time_zone: PresentationZone,

    /// Log level (trace, debug, info, warn, error); RUST_LOG takes precedence
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StoreKind {
    Redis,
    Memory,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} must be greater than zero")]
    Zero(&'static str),
    #[error("flush batch size ({batch}) exceeds max drained per cycle ({cap})")]
    BatchExceedsCycle { batch: usize, cap: usize },
}

/// Tuning for the buffering core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecorderConfig {
    pub buffer_capacity: usize,
    pub tick_interval: Duration,
    pub flush_interval: Duration,
    pub flush_batch_size: usize,
    pub max_drain_per_cycle: usize,
    pub probe_interval: Duration,
    pub reconnect_cooldown: Duration,
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            buffer_capacity: 100_000,
            tick_interval: Duration::from_millis(1_000),
            flush_interval: Duration::from_millis(200),
            flush_batch_size: 500,
            max_drain_per_cycle: 2_000,
            probe_interval: Duration::from_millis(1_000),
            reconnect_cooldown: Duration::from_millis(5_000),
        }
    }
}

impl RecorderConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let checks = [
            ("buffer capacity", self.buffer_capacity as u128),
            ("tick interval", self.tick_interval.as_millis()),
            ("flush interval", self.flush_interval.as_millis()),
            ("flush batch size", self.flush_batch_size as u128),
            ("max drained per cycle", self.max_drain_per_cycle as u128),
            ("probe interval", self.probe_interval.as_millis()),
        ];
        if let Some(&(name, _)) = checks.iter().find(|(_, v)| *v == 0) {
            return Err(ConfigError::Zero(name));
        }
        if self.flush_batch_size > self.max_drain_per_cycle {
            return Err(ConfigError::BatchExceedsCycle {
                batch: self.flush_batch_size,
                cap: self.max_drain_per_cycle,
            });
        }
        Ok(())
    }
}

impl Args {
    pub fn recorder_config(&self) -> Result<RecorderConfig, ConfigError> {
        if self.worker_threads == 0 {
            return Err(ConfigError::Zero("worker threads"));
        }
        let config = RecorderConfig {
            buffer_capacity: self.buffer_capacity,
            tick_interval: Duration::from_millis(self.tick_interval_ms),
            flush_interval: Duration::from_millis(self.flush_interval_ms),
            flush_batch_size: self.flush_batch_size,
            max_drain_per_cycle: self.max_drain_per_cycle,
            probe_interval: Duration::from_millis(self.probe_interval_ms),
            reconnect_cooldown: Duration::from_millis(self.reconnect_cooldown_ms),
        };
        config.validate()?;
        Ok(config)
    }

    pub fn store_timeout(&self) -> Duration {
        Duration::from_millis(self.store_timeout_ms)
    }
}

fn parse_zone(s: &str) -> Result<PresentationZone, String> {
    s.parse()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cli_defaults_match_recorder_defaults() {
        let args = Args::try_parse_from(["tick-recorder"]).unwrap();
        assert_eq!(args.recorder_config().unwrap(), RecorderConfig::default());
        assert_eq!(args.store, StoreKind::Redis);
        assert_eq!(args.worker_threads, 4);
        assert_eq!(args.time_zone, PresentationZone::utc());
    }

    #[test]
    fn overrides_are_applied() {
        let args = Args::try_parse_from([
            "tick-recorder",
            "--store",
            "memory",
            "--buffer-capacity",
            "3",
            "--utc-offset",
            "+03:00",
        ])
        .unwrap();
        assert_eq!(args.store, StoreKind::Memory);
        assert_eq!(args.recorder_config().unwrap().buffer_capacity, 3);
        assert_eq!(
            args.time_zone,
            PresentationZone::Fixed(chrono::FixedOffset::east_opt(3 * 3600).unwrap())
        );
    }

    #[test]
    fn rejects_zero_sizes() {
        let config = RecorderConfig {
            flush_batch_size: 0,
            ..RecorderConfig::default()
        };
        assert_eq!(config.validate(), Err(ConfigError::Zero("flush batch size")));
    }

    #[test]
    fn rejects_batch_larger_than_cycle_cap() {
        let config = RecorderConfig {
            flush_batch_size: 3_000,
            ..RecorderConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::BatchExceedsCycle { batch: 3_000, cap: 2_000 })
        ));
    }

    #[test]
    fn accepts_iana_zone_names() {
        let args = Args::try_parse_from(["tick-recorder", "--time-zone", "Europe/Berlin"]).unwrap();
        assert_eq!(args.time_zone, PresentationZone::Named(chrono_tz::Europe::Berlin));

        let args = Args::try_parse_from(["tick-recorder", "--utc-offset", "Asia/Tokyo"]).unwrap();
        assert_eq!(args.time_zone, PresentationZone::Named(chrono_tz::Asia::Tokyo));
    }

    #[test]
    fn bad_offset_is_a_parse_error() {
        assert!(Args::try_parse_from(["tick-recorder", "--utc-offset", "noon"]).is_err());
    }
}
