use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, State};

use crate::api::v1::dto::UploadResponse;
use crate::api::v1::response::{ApiError, ApiResponse, ErrorCode};
use crate::api::AppState;

/// `POST /api/v1/uploads`
///
/// Accepts a multipart form with a single `file` field holding a cover image
/// and stores it. The returned path can be passed to `POST /api/v1/recognitions`
/// or used as `coverImage` when saving a book.
#[utoipa::path(
    post,
    path = "/api/v1/uploads",
    tag = "uploads",
    operation_id = "uploads.create",
    request_body(content_type = "multipart/form-data", content = String, description = "Image file in the `file` field"),
    responses(
        (status = 201, description = "Image stored", body = UploadResponse),
        (status = 400, description = "Missing, empty, oversize or non-image file", body = ApiError),
    )
)]
pub async fn upload_cover(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResponse<UploadResponse> {
    let mut multipart = match multipart {
        Ok(m) => m,
        Err(rejection) => return crate::error::CoverscanError::from(rejection).into(),
    };

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(e) => {
                return ApiResponse::error(
                    ErrorCode::InvalidRequest,
                    format!("Malformed multipart body: {e}"),
                );
            }
        };

        if field.name() != Some("file") {
            continue;
        }

        let file_name = field.file_name().unwrap_or("cover").to_string();
        let bytes = match field.bytes().await {
            Ok(b) => b,
            Err(e) => {
                return ApiResponse::error(
                    ErrorCode::InvalidRequest,
                    format!("Failed to read file: {e}"),
                );
            }
        };

        return match state.uploads.save(&file_name, &bytes).await {
            Ok(file_path) => ApiResponse::created(UploadResponse { file_path }),
            Err(e) => e.into(),
        };
    }

    ApiResponse::error(ErrorCode::InvalidRequest, "No file provided")
}
