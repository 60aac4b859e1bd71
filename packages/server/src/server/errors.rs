//! API error taxonomy and response mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

use crate::domains::extraction::QueueError;
use crate::domains::research::StateError;

#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed or incomplete request payload.
    #[error("{0}")]
    Validation(String),
    /// The request is valid but the job is in the wrong state for it.
    #[error("{0}")]
    Conflict(String),
    #[error("{0}")]
    NotFound(String),
    #[error("unauthorized")]
    Unauthorized,
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        // Internal failures are logged in full but never leak details.
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!(error = %self, "Request failed");
            "internal server error".to_string()
        } else {
            self.to_string()
        };
        (status, Json(json!({ "error": message }))).into_response()
    }
}

impl From<StateError> for ApiError {
    fn from(e: StateError) -> Self {
        match e {
            StateError::SelectionNotAllowed(_) => ApiError::Conflict(e.to_string()),
            StateError::MissingSelection => ApiError::Validation(e.to_string()),
        }
    }
}

impl From<QueueError> for ApiError {
    fn from(e: QueueError) -> Self {
        match e {
            QueueError::JobNotFound(_) | QueueError::ItemNotFound(_) => {
                ApiError::NotFound(e.to_string())
            }
            QueueError::AlreadyTerminal(_, _) | QueueError::AlreadyReported(_) => {
                ApiError::Conflict(e.to_string())
            }
            QueueError::Store(inner) => ApiError::Internal(inner),
        }
    }
}
