use crate::services::storage::StorageError;
use crate::utils::validation::ValidationFailures;
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Validation failed")]
    Validation(ValidationFailures),

    #[error("Bad Request: {0}")]
    BadRequest(String),

    #[error("Payload Too Large: {0}")]
    PayloadTooLarge(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            AppError::Validation(failures) => {
                return (
                    StatusCode::BAD_REQUEST,
                    Json(json!({ "errors": failures })),
                )
                    .into_response();
            }
            AppError::Storage(StorageError::InvalidUri(msg)) => (StatusCode::BAD_REQUEST, msg),
            AppError::Storage(StorageError::Connection(msg)) => {
                tracing::error!("Storage connection error: {}", msg);
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "Storage unavailable".to_string(),
                )
            }
            AppError::Storage(StorageError::Transfer(msg)) => {
                tracing::error!("Storage transfer error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal Server Error".to_string(),
                )
            }
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            AppError::PayloadTooLarge(msg) => (StatusCode::PAYLOAD_TOO_LARGE, msg),
        };

        let body = Json(json!({
            "error": message
        }));

        (status, body).into_response()
    }
}
