use crate::error::AnalyticsError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Analytics(#[from] AnalyticsError),

    #[error(transparent)]
    BadQuery(#[from] axum::extract::rejection::QueryRejection),

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Analytics(AnalyticsError::NotFound(details)) => {
                (StatusCode::NOT_FOUND, details)
            }
            ApiError::Analytics(e @ AnalyticsError::InvalidParameter { .. }) => {
                (StatusCode::BAD_REQUEST, e.to_string())
            }
            ApiError::BadQuery(rejection) => (StatusCode::BAD_REQUEST, rejection.body_text()),
            // Storage, computation and task failures all surface as 500; the
            // details stay in the server log.
            ref e => {
                tracing::error!("Internal server error: {}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "An unexpected error occurred".to_string(),
                )
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
