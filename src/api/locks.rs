use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::AppState;
use crate::domain::{PeriodLock, TimeMs, UserId};
use crate::error::AppError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateLockRequest {
    pub period_from: TimeMs,
    pub period_to: TimeMs,
    pub reason: String,
    pub created_by: String,
}

/// Freeze the inclusive interval [periodFrom, periodTo]. Approvals, payouts,
/// and reversals inside the frozen window are refused until release.
pub async fn create_lock(
    State(state): State<AppState>,
    Json(req): Json<CreateLockRequest>,
) -> Result<Json<PeriodLock>, AppError> {
    if req.created_by.trim().is_empty() {
        return Err(AppError::BadRequest("createdBy must not be empty".into()));
    }

    let lock = state
        .locks
        .create(
            req.period_from,
            req.period_to,
            &req.reason,
            &UserId::new(req.created_by),
        )
        .await?;
    Ok(Json(lock))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseLockRequest {
    pub released_by: String,
}

pub async fn release_lock(
    Path(id): Path<i64>,
    State(state): State<AppState>,
    Json(req): Json<ReleaseLockRequest>,
) -> Result<Json<PeriodLock>, AppError> {
    if req.released_by.trim().is_empty() {
        return Err(AppError::BadRequest("releasedBy must not be empty".into()));
    }

    let lock = state
        .locks
        .release(id, &UserId::new(req.released_by))
        .await?;
    Ok(Json(lock))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LocksResponse {
    pub count: i64,
    pub locks: Vec<PeriodLock>,
}

pub async fn list_locks(State(state): State<AppState>) -> Result<Json<LocksResponse>, AppError> {
    let locks = state.locks.list().await?;
    Ok(Json(LocksResponse {
        count: locks.len() as i64,
        locks,
    }))
}
