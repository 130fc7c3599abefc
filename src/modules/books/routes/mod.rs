//! HTTP handlers for `/api/books`.

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use goweli_http::error::AppError;
use serde::Deserialize;
use serde_json::json;

use super::models::{Book, BookDraft, SearchField, UpdateBook};
use super::service::{describe_fields, Library, LibraryError};
use goweli_catalog::AcceptFirst;

impl From<LibraryError> for AppError {
    fn from(err: LibraryError) -> Self {
        match err {
            LibraryError::Validation(errors) => {
                let message = describe_fields(&errors);
                let details = errors
                    .into_iter()
                    .map(|e| json!({ "field": e.field, "error": e.error }))
                    .collect();
                AppError::validation(details, message)
            }
            LibraryError::NotFound(id) => AppError::not_found(format!("Book with ID {id} not found")),
            LibraryError::EmptyQuery | LibraryError::EmptyPatch | LibraryError::InvalidImport(_) => {
                AppError::bad_request(err.to_string())
            }
            LibraryError::Catalog(source) => match source.upstream_status() {
                Some(status) => AppError::upstream(status, source.to_string()),
                None => AppError::Internal(source.into()),
            },
            LibraryError::Export(source) => AppError::Internal(source.into()),
            LibraryError::Database(source) => AppError::Internal(source.into()),
        }
    }
}

pub fn router(library: Library) -> Router {
    Router::new()
        .route("/", get(list_books).post(create_book))
        .route("/health", get(health_check))
        .route("/search", get(search_books))
        .route("/export", get(export_books))
        .route("/import", axum::routing::post(import_books))
        .route(
            "/{id}",
            get(get_book).put(update_book).delete(delete_book),
        )
        .with_state(library)
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "books module is healthy"
}

async fn list_books(State(library): State<Library>) -> Result<Json<Vec<Book>>, AppError> {
    tracing::info!("getting all books");
    Ok(Json(library.list().await?))
}

async fn get_book(
    State(library): State<Library>,
    Path(id): Path<i64>,
) -> Result<Json<Book>, AppError> {
    tracing::info!(book_id = id, "getting book");
    Ok(Json(library.get(id).await?))
}

async fn create_book(
    State(library): State<Library>,
    Json(draft): Json<BookDraft>,
) -> Result<impl IntoResponse, AppError> {
    tracing::info!(title = %draft.book_title, "adding new book");
    // No catalog behind this library; browser clients run the cover
    // preview loop themselves through the proxy module
    let book = library.add(draft, &mut AcceptFirst).await?;
    let location = format!("/api/books/{}", book.id);
    Ok((StatusCode::CREATED, [(header::LOCATION, location)], Json(book)))
}

async fn update_book(
    State(library): State<Library>,
    Path(id): Path<i64>,
    Json(body): Json<UpdateBook>,
) -> Result<StatusCode, AppError> {
    if body.id.is_some_and(|body_id| body_id != id) {
        return Err(AppError::bad_request(format!(
            "book ID in body does not match path ID {id}"
        )));
    }

    tracing::info!(book_id = id, "updating book");
    library.replace(id, body.fields).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn delete_book(
    State(library): State<Library>,
    Path(id): Path<i64>,
) -> Result<StatusCode, AppError> {
    tracing::info!(book_id = id, "deleting book");
    library.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
struct SearchParams {
    #[serde(default)]
    field: SearchField,
    #[serde(default)]
    q: String,
}

async fn search_books(
    State(library): State<Library>,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<Book>>, AppError> {
    Ok(Json(library.search(params.field, &params.q).await?))
}

async fn export_books(State(library): State<Library>) -> Result<impl IntoResponse, AppError> {
    let body = library.export_json().await?;
    Ok(([(header::CONTENT_TYPE, "application/json")], body))
}

async fn import_books(
    State(library): State<Library>,
    body: String,
) -> Result<Json<serde_json::Value>, AppError> {
    let imported = library.import_json(&body).await?;
    Ok(Json(json!({ "imported": imported })))
}
