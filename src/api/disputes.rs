use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::AppState;
use crate::domain::{DealId, Dispute, DisputeStatus, DisputeType, TimeMs, UserId};
use crate::error::AppError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenDisputeRequest {
    pub deal_id: String,
    pub snapshot_id: Option<i64>,
    pub opener_id: String,
    pub against_user_id: Option<String>,
    #[serde(rename = "type")]
    pub dispute_type: DisputeType,
    pub note: Option<String>,
}

/// Open a dispute against a deal (and optionally one of its snapshots). The
/// SLA clock starts now.
pub async fn open_dispute(
    State(state): State<AppState>,
    Json(req): Json<OpenDisputeRequest>,
) -> Result<Json<Dispute>, AppError> {
    if req.deal_id.trim().is_empty() {
        return Err(AppError::BadRequest("dealId must not be empty".into()));
    }
    if req.opener_id.trim().is_empty() {
        return Err(AppError::BadRequest("openerId must not be empty".into()));
    }

    let dispute = state
        .disputes
        .open(
            &DealId::new(req.deal_id),
            req.snapshot_id,
            &UserId::new(req.opener_id),
            req.against_user_id.map(UserId::new).as_ref(),
            req.dispute_type,
            req.note.as_deref(),
        )
        .await?;

    Ok(Json(dispute))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetDisputeStatusRequest {
    pub status: DisputeStatus,
    pub note: Option<String>,
}

/// Move a dispute along one of the allowed workflow edges. Never touches the
/// ledger; monetary corrections go through reversal or recomputation.
pub async fn set_dispute_status(
    Path(id): Path<i64>,
    State(state): State<AppState>,
    Json(req): Json<SetDisputeStatusRequest>,
) -> Result<Json<Dispute>, AppError> {
    let dispute = state
        .disputes
        .set_status(id, req.status, req.note.as_deref())
        .await?;
    Ok(Json(dispute))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EscalateOverdueResponse {
    pub escalated: u64,
}

/// Escalate every OPEN / UNDER_REVIEW dispute past its SLA deadline.
/// Idempotent: a second call with no newly overdue disputes reports zero.
pub async fn escalate_overdue(
    State(state): State<AppState>,
) -> Result<Json<EscalateOverdueResponse>, AppError> {
    let escalated = state.disputes.escalate_overdue(TimeMs::now()).await?;
    Ok(Json(EscalateOverdueResponse { escalated }))
}
