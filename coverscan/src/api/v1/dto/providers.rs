use serde::Serialize;

use crate::models::ProviderDescriptor;

/// A selectable recognition provider and whether it can be used right now.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ProviderResponse {
    pub id: String,
    pub display_name: String,
    pub description: String,
    /// `false` when credentials are missing or the backend failed to initialize.
    /// Requests to an unavailable provider return degraded results.
    pub available: bool,
}

impl ProviderResponse {
    pub fn new(descriptor: &ProviderDescriptor, available: bool) -> Self {
        Self {
            id: descriptor.id.to_string(),
            display_name: descriptor.display_name.to_string(),
            description: descriptor.description.to_string(),
            available,
        }
    }
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct ListProvidersResponse {
    pub providers: Vec<ProviderResponse>,
}
