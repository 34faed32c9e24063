use serde::{Deserialize, Serialize};

/// Response of `POST /api/v1/uploads`.
#[derive(Debug, Clone, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct UploadResponse {
    /// Public path of the stored image, e.g. `/uploads/1700000000000-Ab3dE5gH-cover.jpg`.
    pub file_path: String,
}
