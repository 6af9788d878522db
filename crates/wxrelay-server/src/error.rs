//! Mapping from `AppError` to HTTP responses.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

use wxrelay_core::AppError;

/// Response wrapper for handler errors.
#[derive(Debug)]
pub struct ApiError(pub AppError);

impl<E> From<E> for ApiError
where
    E: Into<AppError>,
{
    fn from(e: E) -> Self {
        ApiError(e.into())
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            AppError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Provider(_) => StatusCode::BAD_GATEWAY,
            AppError::InvalidFilter(_) | AppError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            // An empty result is not a failure.
            AppError::NotFound(_) => StatusCode::OK,
            AppError::Config(_) | AppError::Io(_) | AppError::Other(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Text sent to the client. Internal failures only expose the generic
    /// user message.
    pub fn message(&self) -> String {
        match &self.0 {
            AppError::Provider(_)
            | AppError::InvalidFilter(_)
            | AppError::InvalidRequest(_)
            | AppError::NotFound(_) => self.0.to_string(),
            other => other.user_message().to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.message();

        if let AppError::NotFound(_) = self.0 {
            return (status, Json(json!({ "message": message }))).into_response();
        }

        if status.is_server_error() {
            tracing::error!("Request failed with {}: {}", status, self.0);
        } else {
            tracing::debug!("Request rejected with {}: {}", status, self.0);
        }

        (status, Json(json!({ "error": message }))).into_response()
    }
}
