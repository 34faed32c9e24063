use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};

use crate::error::CoverscanError;
use crate::storage::PUBLIC_PREFIX;

use super::AppState;

/// `GET /uploads/{fileName}` serves a stored cover image.
pub async fn serve_cover(
    State(state): State<AppState>,
    Path(file_name): Path<String>,
) -> Response {
    let public_path = format!("{PUBLIC_PREFIX}{file_name}");

    match state.uploads.read(&public_path).await {
        Ok(bytes) => {
            let mime = mime_guess::from_path(&file_name).first_or_octet_stream();
            let mut response = Response::new(Body::from(bytes));
            if let Ok(value) = HeaderValue::from_str(mime.as_ref()) {
                response.headers_mut().insert(header::CONTENT_TYPE, value);
            }
            response.headers_mut().insert(
                header::CACHE_CONTROL,
                HeaderValue::from_static("public, max-age=31536000, immutable"),
            );
            response
        }
        Err(CoverscanError::NotFound(_)) => StatusCode::NOT_FOUND.into_response(),
        Err(CoverscanError::Validation(_)) => StatusCode::BAD_REQUEST.into_response(),
        Err(e) => {
            tracing::error!(error = %e, file = %file_name, "Failed to read cover image");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
