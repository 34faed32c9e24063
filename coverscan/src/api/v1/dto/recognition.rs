use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::recognition::ProcessedCover;

/// Recognize a previously uploaded cover.
#[derive(Debug, Clone, Deserialize, Validate, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecognizeRequest {
    /// Path returned by `POST /api/v1/uploads`.
    #[validate(length(min = 1, max = 512))]
    pub image_path: String,
    #[serde(alias = "model")]
    #[validate(length(min = 1, max = 64))]
    pub provider_id: String,
}

/// One entry of a batch recognition, positionally aligned with the uploaded files.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BatchRecognitionItem {
    /// Provisional library entry created for this cover. Absent when the
    /// file was rejected before recognition.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub book_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cover_image: Option<String>,
    pub title: String,
    pub author: String,
    pub confidence: f32,
}

impl From<ProcessedCover> for BatchRecognitionItem {
    fn from(cover: ProcessedCover) -> Self {
        Self {
            book_id: cover.entry_id,
            cover_image: cover.cover_image_path,
            title: cover.result.title,
            author: cover.result.author,
            confidence: cover.result.confidence,
        }
    }
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct BatchRecognitionResponse {
    pub results: Vec<BatchRecognitionItem>,
}
