use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Failures surfaced by the recognition layer, the library store and the HTTP API.
///
/// A reply that cannot be parsed is intentionally absent: the normalizer turns
/// it into a low-confidence result instead of an error.
#[derive(Error, Debug)]
pub enum CoverscanError {
    #[error("Database error: {0}")]
    Database(#[from] libsql::Error),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal server error: {0}")]
    Internal(String),

    #[error("Upload error: {0}")]
    Upload(String),

    #[error("Image error: {0}")]
    Image(String),

    #[error("Unsupported provider: {0}")]
    UnsupportedProvider(String),

    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("Provider transport error: {0}")]
    ProviderTransport(String),

    #[error("Provider authentication error: {0}")]
    ProviderAuth(String),
}

impl CoverscanError {
    /// Per-provider faults degrade a single result instead of failing a request.
    pub fn is_provider_fault(&self) -> bool {
        matches!(
            self,
            CoverscanError::ProviderUnavailable(_)
                | CoverscanError::ProviderTransport(_)
                | CoverscanError::ProviderAuth(_)
                | CoverscanError::Image(_)
        )
    }
}

impl IntoResponse for CoverscanError {
    fn into_response(self) -> Response {
        let (status, message) = match &self {
            CoverscanError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            CoverscanError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            CoverscanError::Database(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
            CoverscanError::Http(e) => (StatusCode::BAD_GATEWAY, e.to_string()),
            CoverscanError::Json(e) => (StatusCode::BAD_REQUEST, e.to_string()),
            CoverscanError::Io(e) => (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()),
            CoverscanError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg.clone()),
            CoverscanError::Upload(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            CoverscanError::Image(msg) => (StatusCode::UNPROCESSABLE_ENTITY, msg.clone()),
            CoverscanError::UnsupportedProvider(id) => (
                StatusCode::BAD_REQUEST,
                format!("Unsupported provider: {id}"),
            ),
            CoverscanError::ProviderUnavailable(msg) => {
                (StatusCode::SERVICE_UNAVAILABLE, msg.clone())
            }
            CoverscanError::ProviderTransport(msg) => (StatusCode::BAD_GATEWAY, msg.clone()),
            CoverscanError::ProviderAuth(msg) => (StatusCode::BAD_GATEWAY, msg.clone()),
        };

        let body = Json(json!({
            "error": message,
            "code": status.as_u16()
        }));

        (status, body).into_response()
    }
}

pub type Result<T> = std::result::Result<T, CoverscanError>;
