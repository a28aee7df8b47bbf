use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::models::ServiceError;

/// HTTP mapping for service failures.
///
/// Validation problems echo their reason back to the caller; storage
/// problems are logged in full and answered with a generic message.
#[derive(Debug, Error)]
#[error(transparent)]
pub struct ApiError(#[from] ServiceError);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self.0 {
            ServiceError::Validation { reason } => (StatusCode::BAD_REQUEST, reason.clone()),
            ServiceError::NotFound { .. } => (StatusCode::NOT_FOUND, self.0.to_string()),
            ServiceError::Storage(cause) => {
                error!("Storage failure: {cause}");
                (StatusCode::INTERNAL_SERVER_ERROR, "Operation failed".to_string())
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}
