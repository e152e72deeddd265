//! Payout application against approved allocations.

use serde::Deserialize;
use std::sync::Arc;

use super::SettlementError;
use crate::db::Repository;
use crate::domain::{MinorAmount, Payout, PayoutAllocationLink, PayoutMethod, TimeMs, UserId};

/// One requested link of a payout to an allocation.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PayoutLinkRequest {
    pub allocation_id: i64,
    pub amount_minor: MinorAmount,
}

/// A recorded payout with its persisted links.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedPayout {
    pub payout: Payout,
    pub links: Vec<PayoutAllocationLink>,
}

impl RecordedPayout {
    pub fn total_minor(&self) -> MinorAmount {
        self.links.iter().map(|l| l.amount_minor).sum()
    }
}

/// Applies payouts against approved allocations: partial-fill aware, never
/// overpaying, the whole request one atomic batch.
#[derive(Clone)]
pub struct PayoutProcessor {
    repo: Arc<Repository>,
}

impl PayoutProcessor {
    pub fn new(repo: Arc<Repository>) -> Self {
        Self { repo }
    }

    /// Record one payout. Any single failing link (unknown allocation,
    /// unapproved snapshot, overpayment, locked period) aborts the batch;
    /// nothing is partially applied.
    pub async fn record(
        &self,
        paid_at: TimeMs,
        method: PayoutMethod,
        reference_no: Option<&str>,
        links: &[PayoutLinkRequest],
        created_by: &UserId,
    ) -> Result<RecordedPayout, SettlementError> {
        if links.is_empty() {
            return Err(SettlementError::InvalidState(
                "a payout requires at least one allocation link".to_string(),
            ));
        }
        for link in links {
            if !link.amount_minor.is_positive() {
                return Err(SettlementError::InvalidState(format!(
                    "payout link amount must be positive, got {} for allocation {}",
                    link.amount_minor, link.allocation_id
                )));
            }
        }

        let link_pairs: Vec<(i64, MinorAmount)> = links
            .iter()
            .map(|l| (l.allocation_id, l.amount_minor))
            .collect();

        let (payout, links) = self
            .repo
            .record_payout_tx(
                paid_at,
                method,
                reference_no,
                &link_pairs,
                created_by,
                TimeMs::now(),
            )
            .await?;

        Ok(RecordedPayout { payout, links })
    }
}
