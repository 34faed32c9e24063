use axum::extract::multipart::MultipartRejection;
use axum::extract::rejection::JsonRejection;
use axum::extract::FromRequest;

use crate::error::CoverscanError;

/// JSON body extractor whose rejection is a [`CoverscanError`], so malformed
/// bodies come back in the v1 error envelope.
#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(CoverscanError))]
pub struct AppJson<T>(pub T);

impl From<JsonRejection> for CoverscanError {
    fn from(rejection: JsonRejection) -> Self {
        map_json_rejection(rejection)
    }
}

impl From<MultipartRejection> for CoverscanError {
    fn from(rejection: MultipartRejection) -> Self {
        CoverscanError::Validation(format!("Expected a multipart form: {rejection}"))
    }
}

fn map_json_rejection(rejection: JsonRejection) -> CoverscanError {
    match rejection {
        JsonRejection::JsonDataError(err) => {
            let message = err.body_text();
            if let Some(field) = extract_missing_field(&message) {
                CoverscanError::Validation(format!("Missing required field: {field}"))
            } else {
                CoverscanError::Validation(format!("Invalid JSON: {message}"))
            }
        }
        JsonRejection::JsonSyntaxError(err) => {
            CoverscanError::Validation(format!("JSON syntax error: {err}"))
        }
        JsonRejection::MissingJsonContentType(_) => CoverscanError::Validation(
            "Missing `Content-Type: application/json` header".to_string(),
        ),
        JsonRejection::BytesRejection(_) => {
            CoverscanError::Upload("Failed to read request body".to_string())
        }
        _ => CoverscanError::Validation(rejection.to_string()),
    }
}

fn extract_missing_field(message: &str) -> Option<&str> {
    let prefix = "missing field `";
    let start = message.find(prefix)? + prefix.len();
    let remaining = message.get(start..)?;
    let end = remaining.find('`')?;
    remaining.get(..end)
}
