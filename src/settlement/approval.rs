//! Maker-checker approval workflow over pending snapshots.

use std::sync::Arc;

use super::SettlementError;
use crate::db::Repository;
use crate::domain::{CommissionSnapshot, TimeMs, UserId};

/// Drives PENDING_APPROVAL snapshots to APPROVED or REJECTED. The maker of a
/// snapshot can never be its approver, and both decisions honor period locks.
#[derive(Clone)]
pub struct ApprovalWorkflow {
    repo: Arc<Repository>,
}

impl ApprovalWorkflow {
    pub fn new(repo: Arc<Repository>) -> Self {
        Self { repo }
    }

    /// Approve a pending snapshot and post its allocation credit.
    pub async fn approve(
        &self,
        snapshot_id: i64,
        approver_id: &UserId,
        note: Option<&str>,
    ) -> Result<CommissionSnapshot, SettlementError> {
        self.repo
            .approve_snapshot_tx(snapshot_id, approver_id, note, TimeMs::now())
            .await
    }

    /// Reject a pending snapshot; no money is posted.
    pub async fn reject(
        &self,
        snapshot_id: i64,
        approver_id: &UserId,
        note: Option<&str>,
    ) -> Result<CommissionSnapshot, SettlementError> {
        self.repo
            .reject_snapshot_tx(snapshot_id, approver_id, note, TimeMs::now())
            .await
    }

    /// Snapshots awaiting review, oldest first.
    pub async fn pending(&self) -> Result<Vec<CommissionSnapshot>, SettlementError> {
        Ok(self.repo.query_pending_snapshots().await?)
    }
}
