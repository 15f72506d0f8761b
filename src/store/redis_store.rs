use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{ErrorKind, RedisError};
use tokio::sync::Mutex;
use tracing::{debug, info};

use super::{BatchReport, InsertOutcome, StoreError, TickStore};
use crate::tick::Tick;

/// Ticks stored in one Redis sorted set: member and score are both the
/// epoch second, so `ZADD NX` gives per-instant uniqueness for free and
/// `ZRANGE` lists them in time order.
///
/// The `ConnectionManager` is opened on first use and then cached; it
/// reconnects by itself after that. Opening lazily lets the process start
/// while Redis is still down.
pub struct RedisTickStore {
    client: redis::Client,
    conn: Mutex<Option<ConnectionManager>>,
    key: String,
    timeout: Duration,
}

impl RedisTickStore {
    /// Fails only on a malformed URL; no connection is attempted here.
    pub fn open(url: &str, key: impl Into<String>, timeout: Duration) -> Result<Self, StoreError> {
        let client = redis::Client::open(url)
            .map_err(|e| StoreError::Unexpected(format!("invalid Redis URL \"{url}\": {e}")))?;
        Ok(Self {
            client,
            conn: Mutex::new(None),
            key: key.into(),
            timeout,
        })
    }

    async fn connection(&self) -> Result<ConnectionManager, StoreError> {
        let mut guard = self.conn.lock().await;
        if let Some(conn) = guard.as_ref() {
            return Ok(conn.clone());
        }

        let conn = self
            .bounded(ConnectionManager::new(self.client.clone()))
            .await?;
        info!(key = %self.key, "connected to Redis");
        *guard = Some(conn.clone());
        Ok(conn)
    }

    /// Runs a Redis future under the adapter timeout and classifies its error.
    async fn bounded<T, F>(&self, fut: F) -> Result<T, StoreError>
    where
        F: Future<Output = redis::RedisResult<T>>,
    {
        match tokio::time::timeout(self.timeout, fut).await {
            Ok(result) => result.map_err(classify),
            Err(_) => Err(StoreError::Unavailable(format!(
                "no reply within {}ms",
                self.timeout.as_millis()
            ))),
        }
    }
}

/// Connection-level failures and "try later" server states are outages;
/// everything else is unexpected.
pub(crate) fn classify(err: RedisError) -> StoreError {
    let outage = err.is_io_error()
        || err.is_connection_refusal()
        || err.is_connection_dropped()
        || err.is_timeout()
        || matches!(
            err.kind(),
            ErrorKind::BusyLoadingError
                | ErrorKind::TryAgain
                | ErrorKind::ClusterDown
                | ErrorKind::MasterDown
        );

    if outage {
        StoreError::Unavailable(err.to_string())
    } else {
        StoreError::Unexpected(err.to_string())
    }
}

fn outcome(added: i64) -> InsertOutcome {
    if added > 0 {
        InsertOutcome::Inserted
    } else {
        InsertOutcome::Duplicate
    }
}

#[async_trait]
impl TickStore for RedisTickStore {
    async fn insert_one(&self, tick: Tick) -> Result<InsertOutcome, StoreError> {
        let mut conn = self.connection().await?;
        let secs = tick.epoch_secs();
        let mut cmd = redis::cmd("ZADD");
        cmd.arg(&self.key).arg("NX").arg(secs).arg(secs);
        let added: i64 = self.bounded(cmd.query_async(&mut conn)).await?;
        Ok(outcome(added))
    }

    async fn insert_batch(&self, ticks: &[Tick]) -> Result<BatchReport, StoreError> {
        let mut report = BatchReport::default();
        if ticks.is_empty() {
            return Ok(report);
        }

        let mut conn = self.connection().await?;
        let mut pipe = redis::pipe();
        for tick in ticks {
            let secs = tick.epoch_secs();
            pipe.cmd("ZADD").arg(&self.key).arg("NX").arg(secs).arg(secs);
        }

        let added: Vec<i64> = self.bounded(pipe.query_async(&mut conn)).await?;
        for n in added {
            report.record(outcome(n));
        }

        debug!(
            total = ticks.len(),
            inserted = report.inserted,
            duplicates = report.duplicates,
            "batch written"
        );
        Ok(report)
    }

    async fn probe_liveness(&self) -> Result<(), StoreError> {
        let mut conn = self.connection().await?;
        let mut cmd = redis::cmd("ZCARD");
        cmd.arg(&self.key);
        let _count: u64 = self.bounded(cmd.query_async(&mut conn)).await?;
        Ok(())
    }

    async fn fetch_all(&self) -> Result<Vec<Tick>, StoreError> {
        let mut conn = self.connection().await?;
        let mut cmd = redis::cmd("ZRANGE");
        cmd.arg(&self.key).arg(0).arg(-1);
        let members: Vec<i64> = self.bounded(cmd.query_async(&mut conn)).await?;
        Ok(members.into_iter().filter_map(Tick::from_epoch_secs).collect())
    }

    fn name(&self) -> &'static str {
        "redis"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connection_failures_are_outages() {
        let refused = RedisError::from(std::io::Error::new(
            std::io::ErrorKind::ConnectionRefused,
            "connection refused",
        ));
        assert!(matches!(classify(refused), StoreError::Unavailable(_)));

        let loading = RedisError::from((ErrorKind::BusyLoadingError, "loading dataset"));
        assert!(matches!(classify(loading), StoreError::Unavailable(_)));
    }

    #[test]
    fn command_errors_are_unexpected() {
        let wrong_type = RedisError::from((ErrorKind::TypeError, "WRONGTYPE"));
        assert!(matches!(classify(wrong_type), StoreError::Unexpected(_)));
    }

    #[test]
    fn zadd_reply_maps_to_outcome() {
        assert_eq!(outcome(1), InsertOutcome::Inserted);
        assert_eq!(outcome(0), InsertOutcome::Duplicate);
    }

    #[test]
    fn malformed_url_is_rejected_without_connecting() {
        assert!(RedisTickStore::open("not a url", "ticks", Duration::from_secs(1)).is_err());
        assert!(RedisTickStore::open("redis://127.0.0.1:6379/", "ticks", Duration::from_secs(1)).is_ok());
    }
}
