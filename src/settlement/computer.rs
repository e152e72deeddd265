//! Snapshot computation: turns a closed deal's pool into a pending split.

use std::sync::Arc;

use super::SettlementError;
use crate::db::Repository;
use crate::domain::{Currency, DealId, MinorAmount, RoleBeneficiaries, TimeMs, UserId};

pub use crate::db::repo::ComputedSnapshot;

/// Computes commission snapshots from a deal's sale pool, using the policy
/// effective at compute time and the rounding engine.
#[derive(Clone)]
pub struct SnapshotComputer {
    repo: Arc<Repository>,
}

impl SnapshotComputer {
    pub fn new(repo: Arc<Repository>) -> Self {
        Self { repo }
    }

    /// Compute the next snapshot version for a deal.
    ///
    /// Idempotent per (deal, pool, effective policy): while an open snapshot
    /// with identical inputs exists it is returned unchanged. Recomputation
    /// is a mutation, so an active period lock covering now refuses it.
    pub async fn compute(
        &self,
        deal_id: &DealId,
        pool_amount: MinorAmount,
        currency: &Currency,
        maker_id: &UserId,
        beneficiaries: &RoleBeneficiaries,
    ) -> Result<ComputedSnapshot, SettlementError> {
        if !pool_amount.is_positive() {
            return Err(SettlementError::InvalidState(format!(
                "pool amount must be positive, got {pool_amount}"
            )));
        }

        self.repo
            .compute_snapshot_tx(
                deal_id,
                pool_amount,
                currency,
                maker_id,
                beneficiaries,
                TimeMs::now(),
            )
            .await
    }
}
