use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::api::AppState;
use crate::domain::{CommissionPolicy, NewPolicy};
use crate::error::AppError;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PoliciesResponse {
    pub count: i64,
    pub policies: Vec<CommissionPolicy>,
}

/// Create a new policy version. Splits are validated to total exactly
/// 10000 bp before anything is persisted.
pub async fn upsert_policy(
    State(state): State<AppState>,
    Json(input): Json<NewPolicy>,
) -> Result<Json<CommissionPolicy>, AppError> {
    if input.name.trim().is_empty() {
        return Err(AppError::BadRequest("policy name must not be empty".into()));
    }

    let policy = state.policies.upsert(input).await?;
    Ok(Json(policy))
}

pub async fn list_policies(
    State(state): State<AppState>,
) -> Result<Json<PoliciesResponse>, AppError> {
    let policies = state.policies.list().await?;
    Ok(Json(PoliciesResponse {
        count: policies.len() as i64,
        policies,
    }))
}
