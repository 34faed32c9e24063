use axum::Json;
use utoipa::OpenApi;
use utoipa_redoc::{Redoc, Servable};

use super::dto;
use super::handlers;
use super::response;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Coverscan API",
        version = "1.0.0",
        description = "Book-cover recognition service. Upload a cover, pick a vision provider and save the recognized title and author to a personal library.",
    ),
    paths(
        handlers::health::health_check,
        handlers::providers::list_providers,
        handlers::uploads::upload_cover,
        handlers::recognition::recognize,
        handlers::recognition::recognize_batch,
        handlers::books::list_books,
        handlers::books::create_book,
        handlers::books::get_book,
        handlers::books::update_book,
        handlers::books::delete_book,
    ),
    components(schemas(
        // Response envelope
        response::ErrorCode,
        response::ApiError,
        response::ResponseMeta,
        // Recognition
        models::RecognitionResult,
        dto::RecognizeRequest,
        dto::BatchRecognitionItem,
        dto::BatchRecognitionResponse,
        // Providers
        dto::ProviderResponse,
        dto::ListProvidersResponse,
        // Uploads
        dto::UploadResponse,
        // Books
        dto::BookResponse,
        dto::CreateBookRequest,
        dto::UpdateBookRequest,
        dto::ListBooksResponse,
        dto::DeleteBookResponse,
        // Health (handler-local types)
        handlers::health::HealthData,
        handlers::health::DatabaseStatus,
        handlers::health::ProvidersStatus,
    )),
    tags(
        (name = "health", description = "Health check"),
        (name = "providers", description = "Available recognition providers"),
        (name = "uploads", description = "Cover image upload"),
        (name = "recognitions", description = "Single and batch cover recognition"),
        (name = "books", description = "Personal library CRUD and review"),
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            utoipa::openapi::security::SecurityScheme::Http(utoipa::openapi::security::Http::new(
                utoipa::openapi::security::HttpAuthScheme::Bearer,
            )),
        );
    }
}

pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

pub fn redoc_router<S: Clone + Send + Sync + 'static>() -> axum::Router<S> {
    Redoc::with_url("/docs", ApiDoc::openapi()).into()
}
