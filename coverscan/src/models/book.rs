use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::RecognitionResult;

/// A book stored in the personal library.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LibraryEntry {
    pub id: String,
    pub title: String,
    pub author: String,
    pub cover_image_path: String,
    pub provider_id: String,
    pub confidence: Option<f32>,
    pub created_at: DateTime<Utc>,
    pub is_confirmed: bool,
}

/// Fields supplied by the caller when creating a library entry.
///
/// The store assigns `id` and `created_at`.
#[derive(Debug, Clone, PartialEq)]
pub struct NewLibraryEntry {
    pub title: String,
    pub author: String,
    pub cover_image_path: String,
    pub provider_id: String,
    pub confidence: Option<f32>,
    pub is_confirmed: bool,
}

impl NewLibraryEntry {
    /// Unconfirmed entry straight from a recognition pass, pending user review.
    pub fn provisional(
        result: &RecognitionResult,
        cover_image_path: impl Into<String>,
        provider_id: impl Into<String>,
    ) -> Self {
        Self {
            title: result.title.clone(),
            author: result.author.clone(),
            cover_image_path: cover_image_path.into(),
            provider_id: provider_id.into(),
            confidence: Some(result.confidence),
            is_confirmed: false,
        }
    }

    pub fn into_entry(self, id: String, created_at: DateTime<Utc>) -> LibraryEntry {
        LibraryEntry {
            id,
            title: self.title,
            author: self.author,
            cover_image_path: self.cover_image_path,
            provider_id: self.provider_id,
            confidence: self.confidence,
            created_at,
            is_confirmed: self.is_confirmed,
        }
    }
}

/// Partial update applied during review.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LibraryEntryUpdate {
    pub title: Option<String>,
    pub author: Option<String>,
    pub is_confirmed: Option<bool>,
}

impl LibraryEntryUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.author.is_none() && self.is_confirmed.is_none()
    }
}
