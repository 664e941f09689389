//! Error responses
//!
//! Every failure is answered with `{"error": message}`.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::error;

use crate::error::ScoringError;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Scoring(#[from] ScoringError),

    /// Request shape the handler cannot act on
    #[error("{0}")]
    BadRequest(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Scoring(err) => match err {
                ScoringError::ModalityNotFound { .. } | ScoringError::TeamNotFound { .. } => {
                    StatusCode::NOT_FOUND
                }
                ScoringError::DuplicateFinalHeat { .. } => StatusCode::CONFLICT,
                ScoringError::HeatsDisabled { .. } | ScoringError::FinalHeatNotAllowed { .. } => {
                    StatusCode::UNPROCESSABLE_ENTITY
                }
                ScoringError::InvalidInput(_) => StatusCode::BAD_REQUEST,
                ScoringError::LookupFailed { .. } | ScoringError::PersistenceFailed { .. } => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!("Request failed: {}", self);
        }

        let body = Json(json!({
            "error": self.to_string(),
        }));

        (status, body).into_response()
    }
}
