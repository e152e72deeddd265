use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;

use crate::api::AppState;
use crate::domain::{DealId, MinorAmount, Role, SnapshotStatus, UserId};
use crate::error::AppError;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommissionSummaryItem {
    pub deal_id: DealId,
    pub snapshot_id: i64,
    pub version: i64,
    pub status: SnapshotStatus,
    pub role: Role,
    pub basis_points: u32,
    pub amount_minor: MinorAmount,
    pub paid_minor: MinorAmount,
    pub reversed_minor: MinorAmount,
    pub outstanding_minor: MinorAmount,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommissionSummaryResponse {
    pub user_id: UserId,
    pub earned_minor: MinorAmount,
    pub paid_minor: MinorAmount,
    pub reversed_minor: MinorAmount,
    pub outstanding_minor: MinorAmount,
    pub items: Vec<CommissionSummaryItem>,
}

/// Per-user earnings across authoritative settled snapshots: total earned,
/// paid, reversed, and still outstanding, with one item per allocation.
pub async fn get_commission_summary(
    Path(user_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<CommissionSummaryResponse>, AppError> {
    let user_id = UserId::new(user_id);
    let rows = state.repo.query_user_commission_items(&user_id).await?;

    let mut earned = MinorAmount::zero();
    let mut paid = MinorAmount::zero();
    let mut reversed = MinorAmount::zero();
    let mut outstanding = MinorAmount::zero();

    let items = rows
        .into_iter()
        .map(|row| {
            earned += row.amount_minor;
            paid += row.paid_minor;
            reversed += row.reversed_minor;
            outstanding += row.outstanding_minor();

            CommissionSummaryItem {
                outstanding_minor: row.outstanding_minor(),
                deal_id: row.deal_id,
                snapshot_id: row.snapshot_id,
                version: row.version,
                status: row.status,
                role: row.role,
                basis_points: row.basis_points,
                amount_minor: row.amount_minor,
                paid_minor: row.paid_minor,
                reversed_minor: row.reversed_minor,
            }
        })
        .collect();

    Ok(Json(CommissionSummaryResponse {
        user_id,
        earned_minor: earned,
        paid_minor: paid,
        reversed_minor: reversed,
        outstanding_minor: outstanding,
        items,
    }))
}
