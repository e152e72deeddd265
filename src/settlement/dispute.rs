//! Dispute lifecycle with SLA-bound escalation.

use std::sync::Arc;
use tracing::info;

use super::SettlementError;
use crate::config::Config;
use crate::db::Repository;
use crate::domain::{DealId, Dispute, DisputeStatus, DisputeType, TimeMs, UserId};

/// Opens and transitions disputes tied to a deal or snapshot. Disputes never
/// touch the ledger; a resolution implying money moves through the reversal
/// processor or a fresh snapshot instead.
#[derive(Clone)]
pub struct DisputeManager {
    repo: Arc<Repository>,
    sla_window_ms: i64,
}

impl DisputeManager {
    pub fn new(repo: Arc<Repository>, config: &Config) -> Self {
        Self {
            repo,
            sla_window_ms: config.dispute_sla_hours * 60 * 60 * 1000,
        }
    }

    /// Open a dispute; its SLA deadline is now + the configured window.
    pub async fn open(
        &self,
        deal_id: &DealId,
        snapshot_id: Option<i64>,
        opener_id: &UserId,
        against_user_id: Option<&UserId>,
        dispute_type: DisputeType,
        note: Option<&str>,
    ) -> Result<Dispute, SettlementError> {
        let now = TimeMs::now();
        let sla_due_at = TimeMs::new(now.as_i64() + self.sla_window_ms);

        let dispute = self
            .repo
            .insert_dispute(
                deal_id,
                snapshot_id,
                opener_id,
                against_user_id,
                dispute_type,
                note,
                sla_due_at,
                now,
            )
            .await?;

        info!(
            dispute_id = dispute.id,
            deal_id = %deal_id,
            dispute_type = %dispute_type,
            sla_due_at = %sla_due_at,
            "dispute opened"
        );
        Ok(dispute)
    }

    /// Move a dispute along one of the allowed workflow edges.
    pub async fn set_status(
        &self,
        dispute_id: i64,
        new_status: DisputeStatus,
        note: Option<&str>,
    ) -> Result<Dispute, SettlementError> {
        self.repo
            .set_dispute_status_tx(dispute_id, new_status, note)
            .await
    }

    /// Escalate every OPEN / UNDER_REVIEW dispute past its SLA deadline.
    /// Safe to call repeatedly and concurrently; already-ESCALATED disputes
    /// are untouched.
    pub async fn escalate_overdue(&self, now: TimeMs) -> Result<u64, SettlementError> {
        let escalated = self.repo.escalate_overdue_disputes(now).await?;
        if escalated > 0 {
            info!(escalated, "overdue disputes escalated");
        }
        Ok(escalated)
    }
}
