//! Period lock administration.
//!
//! The guard itself (`assert_unlocked`) runs inside the repository's
//! mutation transactions; this service only creates, releases, and lists
//! locks.

use std::sync::Arc;

use super::SettlementError;
use crate::db::Repository;
use crate::domain::{PeriodLock, TimeMs, UserId};

#[derive(Clone)]
pub struct PeriodLockGuard {
    repo: Arc<Repository>,
}

impl PeriodLockGuard {
    pub fn new(repo: Arc<Repository>) -> Self {
        Self { repo }
    }

    /// Create an active lock over the inclusive interval [from, to]. Locks
    /// live on one global timeline: overlapping an existing active lock is
    /// refused.
    pub async fn create(
        &self,
        from: TimeMs,
        to: TimeMs,
        reason: &str,
        created_by: &UserId,
    ) -> Result<PeriodLock, SettlementError> {
        if from > to {
            return Err(SettlementError::InvalidState(format!(
                "periodFrom {from} is after periodTo {to}"
            )));
        }
        if reason.trim().is_empty() {
            return Err(SettlementError::InvalidState(
                "a period lock requires a reason".to_string(),
            ));
        }

        self.repo
            .create_lock_tx(from, to, reason, created_by, TimeMs::now())
            .await
    }

    /// Release an active lock.
    pub async fn release(
        &self,
        lock_id: i64,
        released_by: &UserId,
    ) -> Result<PeriodLock, SettlementError> {
        self.repo
            .release_lock_tx(lock_id, released_by, TimeMs::now())
            .await
    }

    /// All locks, newest first.
    pub async fn list(&self) -> Result<Vec<PeriodLock>, SettlementError> {
        Ok(self.repo.query_locks().await?)
    }
}
