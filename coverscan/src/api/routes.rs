use axum::extract::DefaultBodyLimit;
use axum::routing::get;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use super::covers;
use super::v1;
use super::AppState;

/// Most files accepted in a single batch recognition form.
pub const MAX_BATCH_FILES: usize = 20;

/// Multipart framing and text fields on top of the file payloads.
const FORM_OVERHEAD: usize = 64 * 1024;

pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let body_limit = state.config.uploads.max_file_size * MAX_BATCH_FILES + FORM_OVERHEAD;
    let v1 = v1::router::v1_router(state.clone());

    Router::new()
        .nest("/api/v1", v1)
        .route("/uploads/{fileName}", get(covers::serve_cover))
        .layer(DefaultBodyLimit::disable())
        .layer(RequestBodyLimitLayer::new(body_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
