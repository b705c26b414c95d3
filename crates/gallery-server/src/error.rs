//! Conversion of library errors into HTTP responses.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use lora_gallery::GalleryError;
use serde_json::json;
use tracing::error;

/// Handler error: a [`GalleryError`] rendered as
/// `{"status": "error", "message": ...}`.
#[derive(Debug)]
pub struct ApiError(pub GalleryError);

pub type ApiResult<T> = std::result::Result<T, ApiError>;

impl From<GalleryError> for ApiError {
    fn from(err: GalleryError) -> Self {
        ApiError(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError(GalleryError::invalid("body", rejection.body_text()))
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError(GalleryError::invalid("query", rejection.body_text()))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        if status.is_server_error() {
            error!("Request failed: {}", self.0);
        }

        let body = json!({
            "status": "error",
            "message": self.0.to_string(),
        });
        (status, Json(body)).into_response()
    }
}
