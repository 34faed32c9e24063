//! v1 library handlers.
//!
//! Books created here are confirmed entries saved after the user reviewed a
//! recognition result. Provisional entries come from batch recognition and
//! are confirmed through `PATCH`.

use axum::extract::{Path, State};
use validator::Validate;

use crate::api::extractors::AppJson;
use crate::api::v1::dto::{
    BookResponse, CreateBookRequest, DeleteBookResponse, ListBooksResponse, UpdateBookRequest,
};
use crate::api::v1::response::{ApiError, ApiResponse, ErrorCode, ResponseMeta};
use crate::api::AppState;
use crate::error::CoverscanError;
use crate::models::{LibraryEntryUpdate, NewLibraryEntry};
use crate::storage::PUBLIC_PREFIX;

use super::validation_error;

/// `GET /api/v1/books`
///
/// Lists the library, newest first.
#[utoipa::path(
    get,
    path = "/api/v1/books",
    tag = "books",
    operation_id = "books.list",
    responses(
        (status = 200, description = "Library entries", body = ListBooksResponse),
    )
)]
pub async fn list_books(State(state): State<AppState>) -> ApiResponse<ListBooksResponse> {
    match state.db.list_library_entries().await {
        Ok(entries) => {
            let total = entries.len() as u64;
            ApiResponse::success_with_meta(
                ListBooksResponse {
                    books: entries.into_iter().map(Into::into).collect(),
                },
                ResponseMeta { total: Some(total) },
            )
        }
        Err(e) => e.into(),
    }
}

/// `POST /api/v1/books`
///
/// Saves a reviewed book as a confirmed library entry.
#[utoipa::path(
    post,
    path = "/api/v1/books",
    tag = "books",
    operation_id = "books.create",
    request_body = CreateBookRequest,
    responses(
        (status = 201, description = "Book saved", body = BookResponse),
        (status = 400, description = "Missing fields, foreign cover path or unknown provider", body = ApiError),
    )
)]
pub async fn create_book(
    State(state): State<AppState>,
    payload: Result<AppJson<CreateBookRequest>, CoverscanError>,
) -> ApiResponse<BookResponse> {
    let AppJson(req) = match payload {
        Ok(p) => p,
        Err(e) => return e.into(),
    };
    if let Err(errors) = req.validate() {
        return validation_error(errors).into();
    }
    if req.title.trim().is_empty() || req.author.trim().is_empty() {
        return ApiResponse::error(ErrorCode::InvalidRequest, "Title and author cannot be blank");
    }
    if !req.cover_image.starts_with(PUBLIC_PREFIX) {
        return ApiResponse::error(
            ErrorCode::InvalidRequest,
            format!("coverImage must be a path starting with {PUBLIC_PREFIX}"),
        );
    }
    if let Err(e) = state.registry.get_adapter(&req.provider_id) {
        return e.into();
    }

    match state
        .db
        .create_library_entry(NewLibraryEntry::from(req))
        .await
    {
        Ok(entry) => {
            tracing::info!(book_id = %entry.id, provider = %entry.provider_id, "Saved book");
            ApiResponse::created(entry.into())
        }
        Err(e) => e.into(),
    }
}

/// `GET /api/v1/books/{bookId}`
#[utoipa::path(
    get,
    path = "/api/v1/books/{bookId}",
    tag = "books",
    operation_id = "books.get",
    params(("bookId" = String, Path, description = "Book ID")),
    responses(
        (status = 200, description = "Book found", body = BookResponse),
        (status = 404, description = "Book not found", body = ApiError),
    )
)]
pub async fn get_book(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResponse<BookResponse> {
    match state.db.get_library_entry(&id).await {
        Ok(Some(entry)) => ApiResponse::success(entry.into()),
        Ok(None) => ApiResponse::error(ErrorCode::NotFound, format!("Book {id} not found")),
        Err(e) => e.into(),
    }
}

/// `PATCH /api/v1/books/{bookId}`
///
/// Corrects the recognized title or author and/or confirms the entry.
#[utoipa::path(
    patch,
    path = "/api/v1/books/{bookId}",
    tag = "books",
    operation_id = "books.update",
    params(("bookId" = String, Path, description = "Book ID")),
    request_body = UpdateBookRequest,
    responses(
        (status = 200, description = "Book updated", body = BookResponse),
        (status = 400, description = "Empty or invalid update", body = ApiError),
        (status = 404, description = "Book not found", body = ApiError),
    )
)]
pub async fn update_book(
    State(state): State<AppState>,
    Path(id): Path<String>,
    payload: Result<AppJson<UpdateBookRequest>, CoverscanError>,
) -> ApiResponse<BookResponse> {
    let AppJson(req) = match payload {
        Ok(p) => p,
        Err(e) => return e.into(),
    };
    if let Err(errors) = req.validate() {
        return validation_error(errors).into();
    }

    let update = LibraryEntryUpdate::from(req);
    if update.is_empty() {
        return ApiResponse::error(
            ErrorCode::InvalidRequest,
            "At least one of title, author or isConfirmed is required",
        );
    }

    match state.db.update_library_entry(&id, &update).await {
        Ok(Some(entry)) => ApiResponse::success(entry.into()),
        Ok(None) => ApiResponse::error(ErrorCode::NotFound, format!("Book {id} not found")),
        Err(e) => e.into(),
    }
}

/// `DELETE /api/v1/books/{bookId}`
///
/// Removes the entry. The stored cover image is left in place.
#[utoipa::path(
    delete,
    path = "/api/v1/books/{bookId}",
    tag = "books",
    operation_id = "books.delete",
    params(("bookId" = String, Path, description = "Book ID")),
    responses(
        (status = 200, description = "Book deleted", body = DeleteBookResponse),
        (status = 404, description = "Book not found", body = ApiError),
    )
)]
pub async fn delete_book(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResponse<DeleteBookResponse> {
    match state.db.delete_library_entry(&id).await {
        Ok(true) => ApiResponse::success(DeleteBookResponse { id, deleted: true }),
        Ok(false) => ApiResponse::error(ErrorCode::NotFound, format!("Book {id} not found")),
        Err(e) => e.into(),
    }
}
