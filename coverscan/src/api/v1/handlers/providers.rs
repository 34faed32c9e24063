use axum::extract::State;

use crate::api::v1::dto::{ListProvidersResponse, ProviderResponse};
use crate::api::v1::response::ApiResponse;
use crate::api::AppState;

/// `GET /api/v1/providers`
///
/// Lists every recognition provider in display order, with availability.
#[utoipa::path(
    get,
    path = "/api/v1/providers",
    tag = "providers",
    operation_id = "providers.list",
    responses(
        (status = 200, description = "Known providers", body = ListProvidersResponse),
    )
)]
pub async fn list_providers(State(state): State<AppState>) -> ApiResponse<ListProvidersResponse> {
    let providers = state
        .registry
        .descriptors()
        .iter()
        .map(|d| ProviderResponse::new(d, state.registry.is_available(d.id)))
        .collect();

    ApiResponse::success(ListProvidersResponse { providers })
}
