use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::api::state::AppState;

use super::handlers;
use super::middleware::v1_auth_middleware;

pub fn v1_router(state: AppState) -> Router<AppState> {
    let books = Router::new()
        .route(
            "/",
            get(handlers::books::list_books).post(handlers::books::create_book),
        )
        .route(
            "/{bookId}",
            get(handlers::books::get_book)
                .patch(handlers::books::update_book)
                .delete(handlers::books::delete_book),
        );

    let public_routes = Router::new()
        .route("/health", get(handlers::health_check))
        .route("/openapi.json", get(super::openapi::openapi_json))
        .merge(super::openapi::redoc_router());

    let protected_routes = Router::new()
        .route("/providers", get(handlers::providers::list_providers))
        .route("/uploads", post(handlers::uploads::upload_cover))
        .route("/recognitions", post(handlers::recognition::recognize))
        .route(
            "/recognitions:batch",
            post(handlers::recognition::recognize_batch),
        )
        .nest("/books", books)
        .route_layer(middleware::from_fn_with_state(state, v1_auth_middleware));

    Router::new().merge(public_routes).merge(protected_routes)
}
