use serde::{Deserialize, Serialize};

/// Placeholder used when a provider reply carries no usable title.
pub const UNKNOWN_TITLE: &str = "Unknown Title";
/// Placeholder used when a provider reply carries no usable author.
pub const UNKNOWN_AUTHOR: &str = "Unknown Author";

/// Confidence of a result produced after the provider call itself failed.
pub const DEGRADED_CONFIDENCE: f32 = 0.0;

/// A single cover image paired with the provider chosen to read it.
#[derive(Debug, Clone)]
pub struct RecognitionRequest {
    pub image_bytes: Vec<u8>,
    pub provider_id: String,
}

impl RecognitionRequest {
    pub fn new(image_bytes: Vec<u8>, provider_id: impl Into<String>) -> Self {
        Self {
            image_bytes,
            provider_id: provider_id.into(),
        }
    }
}

/// Canonical output of every recognition call.
///
/// `title` and `author` are never empty and `confidence` always lies in `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct RecognitionResult {
    pub title: String,
    pub author: String,
    pub confidence: f32,
}

impl RecognitionResult {
    /// Build a result, substituting sentinels for blank fields and clamping confidence.
    pub fn new(title: Option<&str>, author: Option<&str>, confidence: f32) -> Self {
        Self {
            title: non_empty_or(title, UNKNOWN_TITLE),
            author: non_empty_or(author, UNKNOWN_AUTHOR),
            confidence: clamp_confidence(confidence, DEGRADED_CONFIDENCE),
        }
    }

    /// Result reported when the provider call or image preparation failed.
    pub fn degraded() -> Self {
        Self::new(None, None, DEGRADED_CONFIDENCE)
    }

    pub fn is_unknown(&self) -> bool {
        self.title == UNKNOWN_TITLE && self.author == UNKNOWN_AUTHOR
    }
}

fn non_empty_or(value: Option<&str>, sentinel: &str) -> String {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => sentinel.to_string(),
    }
}

/// Clamp into `[0, 1]`, replacing non-finite values with `fallback`.
pub fn clamp_confidence(value: f32, fallback: f32) -> f32 {
    if value.is_finite() {
        value.clamp(0.0, 1.0)
    } else {
        fallback.clamp(0.0, 1.0)
    }
}

/// Static description of a selectable provider, used for UI enumeration only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProviderDescriptor {
    #[schema(value_type = String)]
    pub id: &'static str,
    #[schema(value_type = String)]
    pub display_name: &'static str,
    #[schema(value_type = String)]
    pub description: &'static str,
}
