//! Full and partial reversal of approved snapshots.

use std::sync::Arc;

use super::SettlementError;
use crate::db::Repository;
use crate::domain::{MinorAmount, TimeMs, UserId};

pub use crate::db::repo::ReversalOutcome;

/// Reverses all or part of an approved snapshot's outstanding balance,
/// posting offsetting ledger debits.
#[derive(Clone)]
pub struct ReversalProcessor {
    repo: Arc<Repository>,
}

impl ReversalProcessor {
    pub fn new(repo: Arc<Repository>) -> Self {
        Self { repo }
    }

    /// Reverse a snapshot. With `amount` omitted the full outstanding
    /// balance of every allocation is reversed; otherwise the amount is
    /// spread proportionally over current outstanding balances.
    pub async fn reverse(
        &self,
        snapshot_id: i64,
        actor_id: &UserId,
        reason: &str,
        amount: Option<MinorAmount>,
    ) -> Result<ReversalOutcome, SettlementError> {
        if let Some(amount) = amount {
            if !amount.is_positive() {
                return Err(SettlementError::InvalidState(format!(
                    "reversal amount must be positive, got {amount}"
                )));
            }
        }
        if reason.trim().is_empty() {
            return Err(SettlementError::InvalidState(
                "a reversal requires a reason".to_string(),
            ));
        }

        self.repo
            .reverse_snapshot_tx(snapshot_id, actor_id, reason, amount, TimeMs::now())
            .await
    }
}
