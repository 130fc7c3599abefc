//! HTTP handlers for `/api/proxy`: OpenLibrary search and cover passthrough.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::header,
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use goweli_catalog::{CatalogError, CoverCandidate, CoverCatalog, CoverKind, CoverSize, OpenLibraryClient};
use goweli_http::error::AppError;
use serde::{Deserialize, Serialize};

const UPSTREAM_MESSAGE: &str = "Error communicating with OpenLibrary API";
const COVER_MESSAGE: &str = "Error fetching book cover";

pub fn router(client: Arc<OpenLibraryClient>) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/search", get(search_books))
        .route("/covers", get(list_covers))
        .route("/validateCover", get(validate_cover))
        .route("/cover/{key}", get(cover_by_key))
        .route("/coverById/{id}", get(cover_by_id))
        .with_state(client)
}

/// Map a catalog failure onto the HTTP error envelope
fn catalog_error(err: CatalogError, message: &str) -> AppError {
    tracing::error!(error = %err, "{}", message);
    match err {
        CatalogError::Status { status, .. } => AppError::upstream(status, message),
        CatalogError::Transport { .. } => AppError::upstream(502, message),
        other => AppError::Internal(other.into()),
    }
}

/// Health check endpoint
async fn health_check() -> &'static str {
    "proxy module is healthy"
}

#[derive(Debug, Deserialize)]
struct SearchParams {
    #[serde(default)]
    title: String,
    limit: Option<u32>,
}

async fn search_books(
    State(client): State<Arc<OpenLibraryClient>>,
    Query(params): Query<SearchParams>,
) -> Result<impl IntoResponse, AppError> {
    if params.title.trim().is_empty() {
        return Err(AppError::bad_request("title is required"));
    }
    let limit = params.limit.unwrap_or_else(|| client.search_limit());

    let body = client
        .search_raw(&params.title, limit)
        .await
        .map_err(|err| catalog_error(err, UPSTREAM_MESSAGE))?;
    Ok(([(header::CONTENT_TYPE, "application/json")], body))
}

#[derive(Debug, Deserialize)]
struct CoversParams {
    #[serde(default)]
    title: String,
}

async fn list_covers(
    State(client): State<Arc<OpenLibraryClient>>,
    Query(params): Query<CoversParams>,
) -> Result<Json<Vec<CoverCandidate>>, AppError> {
    if params.title.trim().is_empty() {
        return Err(AppError::bad_request("title is required"));
    }

    let candidates = client
        .cover_candidates(&params.title)
        .await
        .map_err(|err| catalog_error(err, UPSTREAM_MESSAGE))?;

    if candidates.is_empty() {
        tracing::warn!(title = %params.title, "no book covers found");
        return Err(AppError::not_found("No book covers found"));
    }
    Ok(Json(candidates))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ValidateParams {
    #[serde(default)]
    cover_url: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ValidationResponse {
    is_valid: bool,
    /// Base64 image data, empty when invalid
    image_bytes: String,
}

async fn validate_cover(
    State(client): State<Arc<OpenLibraryClient>>,
    Query(params): Query<ValidateParams>,
) -> Result<Json<ValidationResponse>, AppError> {
    if params.cover_url.trim().is_empty() {
        return Err(AppError::bad_request("coverUrl is required"));
    }

    let validation = client
        .validate_cover(&params.cover_url)
        .await
        .map_err(|err| match err {
            CatalogError::Status { .. } | CatalogError::Transport { .. } => {
                tracing::warn!(url = %params.cover_url, error = %err, "cover URL rejected");
                AppError::bad_request("Invalid cover URL")
            }
            other => catalog_error(other, UPSTREAM_MESSAGE),
        })?;

    Ok(Json(ValidationResponse {
        is_valid: validation.is_valid,
        image_bytes: STANDARD.encode(&validation.image_bytes),
    }))
}

#[derive(Debug, Deserialize)]
struct SizeParams {
    size: Option<String>,
}

async fn cover_by_key(
    State(client): State<Arc<OpenLibraryClient>>,
    Path(key): Path<String>,
    Query(params): Query<SizeParams>,
) -> Result<impl IntoResponse, AppError> {
    cover_image(&client, CoverKind::Olid, &key, params.size.as_deref()).await
}

async fn cover_by_id(
    State(client): State<Arc<OpenLibraryClient>>,
    Path(id): Path<i64>,
    Query(params): Query<SizeParams>,
) -> Result<impl IntoResponse, AppError> {
    cover_image(&client, CoverKind::Id, &id.to_string(), params.size.as_deref()).await
}

async fn cover_image(
    client: &OpenLibraryClient,
    kind: CoverKind,
    key: &str,
    size: Option<&str>,
) -> Result<impl IntoResponse, AppError> {
    let size = CoverSize::lenient(size);
    let bytes = client
        .fetch_cover(kind, key, size)
        .await
        .map_err(|err| catalog_error(err, COVER_MESSAGE))?;
    Ok(([(header::CONTENT_TYPE, "image/jpeg")], bytes))
}
