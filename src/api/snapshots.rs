use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::AppState;
use crate::domain::{
    CommissionAllocation, CommissionSnapshot, Currency, DealId, LedgerEntry, MinorAmount,
    RoleBeneficiaries, UserId,
};
use crate::error::AppError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComputeSnapshotRequest {
    pub pool_amount_minor: MinorAmount,
    pub currency: Option<String>,
    pub maker_id: String,
    #[serde(default)]
    pub beneficiaries: RoleBeneficiaries,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotResponse {
    #[serde(flatten)]
    pub snapshot: CommissionSnapshot,
    pub allocations: Vec<CommissionAllocation>,
    pub reused: bool,
}

/// Compute the next commission snapshot for a deal from its sale pool.
pub async fn compute_snapshot(
    Path(deal_id): Path<String>,
    State(state): State<AppState>,
    Json(req): Json<ComputeSnapshotRequest>,
) -> Result<Json<SnapshotResponse>, AppError> {
    if !req.pool_amount_minor.is_positive() {
        return Err(AppError::BadRequest(
            "poolAmountMinor must be a positive minor-unit amount".into(),
        ));
    }
    if req.maker_id.trim().is_empty() {
        return Err(AppError::BadRequest("makerId must not be empty".into()));
    }

    let currency = Currency::new(
        req.currency
            .unwrap_or_else(|| state.config.default_currency.clone()),
    );
    let computed = state
        .computer
        .compute(
            &DealId::new(deal_id),
            req.pool_amount_minor,
            &currency,
            &UserId::new(req.maker_id),
            &req.beneficiaries,
        )
        .await?;

    Ok(Json(SnapshotResponse {
        snapshot: computed.snapshot,
        allocations: computed.allocations,
        reused: computed.reused,
    }))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingApprovalsResponse {
    pub count: i64,
    pub snapshots: Vec<CommissionSnapshot>,
}

/// Snapshots awaiting review, oldest first, with maker identity.
pub async fn get_pending_approvals(
    State(state): State<AppState>,
) -> Result<Json<PendingApprovalsResponse>, AppError> {
    let snapshots = state.approvals.pending().await?;
    Ok(Json(PendingApprovalsResponse {
        count: snapshots.len() as i64,
        snapshots,
    }))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewRequest {
    pub approver_id: String,
    pub note: Option<String>,
}

pub async fn approve_snapshot(
    Path(id): Path<i64>,
    State(state): State<AppState>,
    Json(req): Json<ReviewRequest>,
) -> Result<Json<CommissionSnapshot>, AppError> {
    if req.approver_id.trim().is_empty() {
        return Err(AppError::BadRequest("approverId must not be empty".into()));
    }

    let snapshot = state
        .approvals
        .approve(id, &UserId::new(req.approver_id), req.note.as_deref())
        .await?;
    Ok(Json(snapshot))
}

pub async fn reject_snapshot(
    Path(id): Path<i64>,
    State(state): State<AppState>,
    Json(req): Json<ReviewRequest>,
) -> Result<Json<CommissionSnapshot>, AppError> {
    if req.approver_id.trim().is_empty() {
        return Err(AppError::BadRequest("approverId must not be empty".into()));
    }

    let snapshot = state
        .approvals
        .reject(id, &UserId::new(req.approver_id), req.note.as_deref())
        .await?;
    Ok(Json(snapshot))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReverseRequest {
    pub actor_id: String,
    pub reason: String,
    pub amount_minor: Option<MinorAmount>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReverseResponse {
    #[serde(flatten)]
    pub snapshot: CommissionSnapshot,
    pub entries: Vec<LedgerEntry>,
}

/// Reverse all (no amount) or part (amount) of a snapshot's outstanding
/// balance.
pub async fn reverse_snapshot(
    Path(id): Path<i64>,
    State(state): State<AppState>,
    Json(req): Json<ReverseRequest>,
) -> Result<Json<ReverseResponse>, AppError> {
    if req.actor_id.trim().is_empty() {
        return Err(AppError::BadRequest("actorId must not be empty".into()));
    }

    let outcome = state
        .reversals
        .reverse(
            id,
            &UserId::new(req.actor_id),
            &req.reason,
            req.amount_minor,
        )
        .await?;

    Ok(Json(ReverseResponse {
        snapshot: outcome.snapshot,
        entries: outcome.entries,
    }))
}
