use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::settlement::SettlementError;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Internal server error: {0}")]
    Internal(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Bad request: {0}")]
    BadRequest(String),
    #[error(transparent)]
    Settlement(#[from] SettlementError),
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, kind, message) = match self {
            AppError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL", msg),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg),
            AppError::Settlement(err) => {
                let status = match &err {
                    SettlementError::InvalidSplit(_) | SettlementError::InvalidPolicy(_) => {
                        StatusCode::BAD_REQUEST
                    }
                    SettlementError::NoActivePolicy(_)
                    | SettlementError::SelfApproval(_)
                    | SettlementError::InvalidState(_)
                    | SettlementError::InvalidTransition { .. }
                    | SettlementError::OverlappingLock { .. } => StatusCode::CONFLICT,
                    SettlementError::PeriodLocked { .. } => StatusCode::LOCKED,
                    SettlementError::Overpayment { .. }
                    | SettlementError::Overreversal { .. } => StatusCode::UNPROCESSABLE_ENTITY,
                    SettlementError::NotFound(_) => StatusCode::NOT_FOUND,
                    SettlementError::Db(_) => StatusCode::INTERNAL_SERVER_ERROR,
                };
                (status, err.kind(), err.to_string())
            }
        };

        let body = Json(json!({
            "error": message,
            "kind": kind,
        }));

        (status, body).into_response()
    }
}
