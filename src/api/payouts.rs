use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::AppState;
use crate::domain::{MinorAmount, PayoutMethod, TimeMs, UserId};
use crate::error::AppError;
use crate::settlement::PayoutLinkRequest;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordPayoutRequest {
    pub paid_at: TimeMs,
    pub method: PayoutMethod,
    pub reference_no: Option<String>,
    pub allocations: Vec<PayoutLinkRequest>,
    pub created_by: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordPayoutResponse {
    pub payout_id: String,
    pub total_minor: MinorAmount,
    pub link_count: i64,
}

/// Record one payout against one or more allocations; all links apply
/// atomically or the whole payout is refused.
pub async fn record_payout(
    State(state): State<AppState>,
    Json(req): Json<RecordPayoutRequest>,
) -> Result<Json<RecordPayoutResponse>, AppError> {
    if req.created_by.trim().is_empty() {
        return Err(AppError::BadRequest("createdBy must not be empty".into()));
    }
    if req.allocations.is_empty() {
        return Err(AppError::BadRequest(
            "a payout requires at least one allocation".into(),
        ));
    }

    let recorded = state
        .payouts
        .record(
            req.paid_at,
            req.method,
            req.reference_no.as_deref(),
            &req.allocations,
            &UserId::new(req.created_by),
        )
        .await?;

    Ok(Json(RecordPayoutResponse {
        total_minor: recorded.total_minor(),
        link_count: recorded.links.len() as i64,
        payout_id: recorded.payout.payout_key,
    }))
}
