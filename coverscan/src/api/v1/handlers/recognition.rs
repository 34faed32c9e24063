//! v1 recognition handlers.
//!
//! Both endpoints only fail for request problems (unknown provider, missing
//! image, malformed form). A provider that errors, times out or is not
//! configured yields a degraded result in place of the failed image.

use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, State};
use validator::Validate;

use crate::api::extractors::AppJson;
use crate::api::routes::MAX_BATCH_FILES;
use crate::api::v1::dto::{BatchRecognitionItem, BatchRecognitionResponse, RecognizeRequest};
use crate::api::v1::response::{ApiError, ApiResponse, ErrorCode};
use crate::api::AppState;
use crate::error::CoverscanError;
use crate::models::RecognitionResult;
use crate::recognition::UploadedImage;

use super::validation_error;

/// `POST /api/v1/recognitions`
///
/// Recognizes a cover previously stored through `POST /api/v1/uploads`.
#[utoipa::path(
    post,
    path = "/api/v1/recognitions",
    tag = "recognitions",
    operation_id = "recognitions.create",
    request_body = RecognizeRequest,
    responses(
        (status = 200, description = "Recognition result (degraded on provider failure)", body = RecognitionResult),
        (status = 400, description = "Invalid request or unsupported provider", body = ApiError),
        (status = 404, description = "Image not found", body = ApiError),
    )
)]
pub async fn recognize(
    State(state): State<AppState>,
    payload: Result<AppJson<RecognizeRequest>, CoverscanError>,
) -> ApiResponse<RecognitionResult> {
    let AppJson(req) = match payload {
        Ok(p) => p,
        Err(e) => return e.into(),
    };
    if let Err(errors) = req.validate() {
        return validation_error(errors).into();
    }

    match state
        .recognition
        .process_path(&req.image_path, &req.provider_id)
        .await
    {
        Ok(result) => ApiResponse::success(result),
        Err(e) => e.into(),
    }
}

/// `POST /api/v1/recognitions:batch`
///
/// Accepts a multipart form with one or more image files (`files`) and a
/// `providerId` (or `model`) field. Each image is stored, recognized and
/// saved as an unconfirmed library entry. Results follow the order of the
/// uploaded files.
#[utoipa::path(
    post,
    path = "/api/v1/recognitions:batch",
    tag = "recognitions",
    operation_id = "recognitions.batch",
    request_body(content_type = "multipart/form-data", content = String, description = "Image files in `files` plus a `providerId` field"),
    responses(
        (status = 200, description = "One result per uploaded file", body = BatchRecognitionResponse),
        (status = 400, description = "Invalid form or unsupported provider", body = ApiError),
    )
)]
pub async fn recognize_batch(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResponse<BatchRecognitionResponse> {
    let mut multipart = match multipart {
        Ok(m) => m,
        Err(rejection) => return CoverscanError::from(rejection).into(),
    };

    let mut images = Vec::new();
    let mut provider_id: Option<String> = None;

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

        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "files" | "files[]" | "file" => {
                if images.len() >= MAX_BATCH_FILES {
                    return ApiResponse::error(
                        ErrorCode::InvalidRequest,
                        format!("Too many files (max {MAX_BATCH_FILES})"),
                    );
                }
                let file_name = field.file_name().unwrap_or("cover").to_string();
                match field.bytes().await {
                    Ok(bytes) => images.push(UploadedImage {
                        file_name,
                        bytes: bytes.to_vec(),
                    }),
                    Err(e) => {
                        return ApiResponse::error(
                            ErrorCode::InvalidRequest,
                            format!("Failed to read file: {e}"),
                        );
                    }
                }
            }
            "providerId" | "provider_id" | "model" => match field.text().await {
                Ok(text) => provider_id = Some(text.trim().to_string()),
                Err(e) => {
                    return ApiResponse::error(
                        ErrorCode::InvalidRequest,
                        format!("Invalid providerId: {e}"),
                    );
                }
            },
            _ => {}
        }
    }

    let provider_id = match provider_id {
        Some(id) if !id.is_empty() => id,
        _ => return ApiResponse::error(ErrorCode::InvalidRequest, "Missing required 'providerId' field"),
    };
    if images.is_empty() {
        return ApiResponse::error(ErrorCode::InvalidRequest, "No files uploaded");
    }

    match state.recognition.process_uploads(images, &provider_id).await {
        Ok(covers) => ApiResponse::success(BatchRecognitionResponse {
            results: covers.into_iter().map(BatchRecognitionItem::from).collect(),
        }),
        Err(e) => e.into(),
    }
}
