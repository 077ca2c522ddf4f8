//! Retry/recovery layer for access to the live database
//!
//! Every ledger read and write goes through [`Recovery`]. When an operation
//! fails with a transient handle error, the layer waits `base × attempt`,
//! asks the coordinator for a remount, waits for it to resolve and tries
//! again, at most `max_retries` times.
//!
//! Exhausted reads log and yield `T::default()`, so views degrade to empty
//! rather than erroring. Exhausted writes surface
//! [`LedgerError::Unavailable`].

use std::sync::Arc;
use std::time::Duration;

use rusqlite::Connection;
use tracing::{debug, error, warn};

use crate::config::settings::RecoverySettings;
use crate::db::LiveDatabase;
use crate::error::{LedgerError, LedgerResult};

/// Bounded retry schedule
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub base_delay: Duration,
    pub max_retries: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RecoverySettings::default())
    }
}

impl From<&RecoverySettings> for RetryPolicy {
    fn from(settings: &RecoverySettings) -> Self {
        Self {
            base_delay: Duration::from_millis(settings.retry_base_delay_ms),
            max_retries: settings.max_retries,
        }
    }
}

impl RetryPolicy {
    /// Delay before retry number `attempt` (1-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay * attempt
    }
}

/// Live database access with remount-and-retry on transient failures
#[derive(Clone)]
pub struct Recovery {
    db: Arc<LiveDatabase>,
    policy: RetryPolicy,
}

impl Recovery {
    pub fn new(db: Arc<LiveDatabase>, policy: RetryPolicy) -> Self {
        Self { db, policy }
    }

    pub fn database(&self) -> &Arc<LiveDatabase> {
        &self.db
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    async fn run<T, F>(&self, op_name: &str, op: &F) -> LedgerResult<T>
    where
        F: Fn(&mut Connection) -> LedgerResult<T>,
    {
        let mut attempt = 0;
        loop {
            match self.db.with_conn(|conn| op(conn)).await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_transient() && attempt < self.policy.max_retries => {
                    attempt += 1;
                    warn!(op = op_name, attempt, error = %e, "transient database failure; remounting");
                    tokio::time::sleep(self.policy.delay_for(attempt)).await;
                    let remounted = self.db.coordinator().request_remount().await;
                    debug!(op = op_name, attempt, remounted, "remount resolved; retrying");
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Run a read; any failure left after the retries yields `T::default()`
    pub async fn read<T, F>(&self, op_name: &str, op: F) -> T
    where
        T: Default,
        F: Fn(&mut Connection) -> LedgerResult<T>,
    {
        match self.run(op_name, &op).await {
            Ok(value) => value,
            Err(e) => {
                error!(op = op_name, error = %e, "read failed; returning empty result");
                T::default()
            }
        }
    }

    /// Run a write; exhausted transient failures become
    /// [`LedgerError::Unavailable`], anything else propagates unchanged
    pub async fn write<T, F>(&self, op_name: &str, op: F) -> LedgerResult<T>
    where
        F: Fn(&mut Connection) -> LedgerResult<T>,
    {
        match self.run(op_name, &op).await {
            Ok(value) => Ok(value),
            Err(e) if e.is_transient() => {
                error!(op = op_name, error = %e, "write failed after retries");
                Err(LedgerError::Unavailable(e.to_string()))
            }
            Err(e) => Err(e),
        }
    }
}
