use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::{LibraryEntry, LibraryEntryUpdate, NewLibraryEntry};

/// A library entry as returned by the v1 API.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct BookResponse {
    pub id: String,
    pub title: String,
    pub author: String,
    pub cover_image: String,
    pub provider_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
    pub created_at: DateTime<Utc>,
    pub is_confirmed: bool,
}

impl From<LibraryEntry> for BookResponse {
    fn from(entry: LibraryEntry) -> Self {
        Self {
            id: entry.id,
            title: entry.title,
            author: entry.author,
            cover_image: entry.cover_image_path,
            provider_id: entry.provider_id,
            confidence: entry.confidence,
            created_at: entry.created_at,
            is_confirmed: entry.is_confirmed,
        }
    }
}

/// Save a reviewed book straight into the library as a confirmed entry.
#[derive(Debug, Clone, Deserialize, Validate, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookRequest {
    #[validate(length(min = 1, max = 500))]
    pub title: String,
    #[validate(length(min = 1, max = 500))]
    pub author: String,
    /// Must be a `/uploads/...` path returned by the upload endpoint.
    #[validate(length(min = 1, max = 512))]
    pub cover_image: String,
    #[serde(alias = "modelUsed")]
    #[validate(length(min = 1, max = 64))]
    pub provider_id: String,
    #[validate(range(min = 0.0, max = 1.0))]
    pub confidence: Option<f32>,
}

impl From<CreateBookRequest> for NewLibraryEntry {
    fn from(req: CreateBookRequest) -> Self {
        NewLibraryEntry {
            title: req.title.trim().to_string(),
            author: req.author.trim().to_string(),
            cover_image_path: req.cover_image,
            provider_id: req.provider_id,
            confidence: req.confidence,
            is_confirmed: true,
        }
    }
}

/// Review step: correct the recognized fields and/or confirm the entry.
#[derive(Debug, Clone, Default, Deserialize, Validate, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBookRequest {
    #[validate(length(min = 1, max = 500))]
    pub title: Option<String>,
    #[validate(length(min = 1, max = 500))]
    pub author: Option<String>,
    pub is_confirmed: Option<bool>,
}

impl From<UpdateBookRequest> for LibraryEntryUpdate {
    fn from(req: UpdateBookRequest) -> Self {
        LibraryEntryUpdate {
            title: req.title.map(|t| t.trim().to_string()),
            author: req.author.map(|a| a.trim().to_string()),
            is_confirmed: req.is_confirmed,
        }
    }
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct ListBooksResponse {
    pub books: Vec<BookResponse>,
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct DeleteBookResponse {
    pub id: String,
    pub deleted: bool,
}
