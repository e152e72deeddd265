use axum::extract::{Path, State};
use axum::Json;
use futures::future::try_join_all;
use serde::Serialize;

use crate::api::AppState;
use crate::domain::{
    CommissionAllocation, CommissionSnapshot, DealId, LedgerEntry, MinorAmount, PayoutMethod,
    TimeMs, UserId,
};
use crate::error::AppError;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotWithAllocations {
    #[serde(flatten)]
    pub snapshot: CommissionSnapshot,
    pub allocations: Vec<CommissionAllocation>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PayoutLinkDto {
    pub payout_key: String,
    pub paid_at: TimeMs,
    pub method: PayoutMethod,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference_no: Option<String>,
    pub created_by: UserId,
    pub allocation_id: i64,
    pub amount_minor: MinorAmount,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DealCommissionResponse {
    pub deal_id: DealId,
    pub snapshots: Vec<SnapshotWithAllocations>,
    pub ledger: Vec<LedgerEntry>,
    pub payout_links: Vec<PayoutLinkDto>,
}

/// Full commission detail of one deal: every snapshot version with its
/// allocations (newest first), the deal's ledger, and all payout links.
pub async fn get_deal_commission(
    Path(deal_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<DealCommissionResponse>, AppError> {
    let deal_id = DealId::new(deal_id);

    let snapshots = state.repo.query_snapshots_for_deal(&deal_id).await?;
    let allocations = try_join_all(
        snapshots
            .iter()
            .map(|s| state.repo.query_allocations_for_snapshot(s.id)),
    )
    .await?;

    let snapshots: Vec<SnapshotWithAllocations> = snapshots
        .into_iter()
        .zip(allocations)
        .map(|(snapshot, allocations)| SnapshotWithAllocations {
            snapshot,
            allocations,
        })
        .collect();

    let ledger = state.repo.query_ledger_for_deal(&deal_id).await?;
    let payout_links = state
        .repo
        .query_payout_links_for_deal(&deal_id)
        .await?
        .into_iter()
        .map(|row| PayoutLinkDto {
            payout_key: row.payout.payout_key,
            paid_at: row.payout.paid_at,
            method: row.payout.method,
            reference_no: row.payout.reference_no,
            created_by: row.payout.created_by,
            allocation_id: row.link.allocation_id,
            amount_minor: row.link.amount_minor,
        })
        .collect();

    Ok(Json(DealCommissionResponse {
        deal_id,
        snapshots,
        ledger,
        payout_links,
    }))
}
