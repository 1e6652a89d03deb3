//! HTTP routing layer: maps URLs onto catalog operations.
//!
//! This layer owns no catalog logic. Every handler parses its parameters,
//! hands the blocking filesystem work to [`tokio::task::spawn_blocking`],
//! and translates the typed [`CatalogError`] into a status code plus a JSON
//! error envelope:
//!
//! ```json
//! { "error": { "kind": "conflict", "message": "already exists: …" } }
//! ```
//!
//! `invalid_path` → 400, `not_found` → 404, `conflict` → 409, everything
//! else → 500. A panicking handler task surfaces as a generic 500 through
//! the join error — the process never goes down with a request.

use crate::catalog::{Catalog, CatalogError, mtime_secs};
use crate::{listing, search, store, thumbs};
use axum::extract::{Query, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::path::Path;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Handlers share the catalog behind an `Arc`; the write lock lives inside.
pub type SharedCatalog = Arc<Catalog>;

type ApiResult<T> = Result<T, ApiError>;

/// Build the full API router over a shared catalog.
pub fn router(catalog: SharedCatalog) -> Router {
    Router::new()
        .route("/api/data", get(data))
        .route("/api/search", get(search_units))
        .route("/api/thumbnail", get(thumbnail))
        .route("/api/image", get(original_image))
        .route(
            "/api/unit",
            get(get_unit)
                .post(create_unit)
                .put(update_unit)
                .delete(delete_unit),
        )
        .route("/api/folder", post(create_folder))
        .route("/api/folder/rename", put(rename_folder))
        .layer(TraceLayer::new_for_http())
        .with_state(catalog)
}

// =========================================================================
// Error envelope
// =========================================================================

/// A request failure: HTTP status plus the machine-readable kind.
#[derive(Debug)]
struct ApiError {
    status: StatusCode,
    kind: &'static str,
    message: String,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            kind: "invalid_request",
            message: message.into(),
        }
    }

    fn internal(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::INTERNAL_SERVER_ERROR,
            kind: "internal",
            message: message.into(),
        }
    }
}

impl From<CatalogError> for ApiError {
    fn from(err: CatalogError) -> Self {
        let status = match &err {
            CatalogError::InvalidPath(_) => StatusCode::BAD_REQUEST,
            CatalogError::NotFound(_) => StatusCode::NOT_FOUND,
            CatalogError::Conflict(_) => StatusCode::CONFLICT,
            CatalogError::Decode { .. }
            | CatalogError::Generation { .. }
            | CatalogError::Write(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Json(json!({
            "error": {
                "kind": self.kind,
                "message": self.message,
            }
        }));
        (self.status, body).into_response()
    }
}

/// Run blocking catalog work off the async runtime.
async fn blocking<T, F>(work: F) -> ApiResult<T>
where
    T: Send + 'static,
    F: FnOnce() -> Result<T, CatalogError> + Send + 'static,
{
    tokio::task::spawn_blocking(work)
        .await
        .map_err(|err| ApiError::internal(err.to_string()))?
        .map_err(ApiError::from)
}

// =========================================================================
// Tree + listing
// =========================================================================

#[derive(Debug, Deserialize)]
struct DataParams {
    #[serde(default)]
    path: String,
    page: Option<usize>,
    per_page: Option<usize>,
}

#[derive(Debug, Serialize)]
struct DataResponse {
    tree: Vec<listing::Folder>,
    units: Vec<listing::Unit>,
    pagination: listing::Pagination,
}

async fn data(
    State(catalog): State<SharedCatalog>,
    Query(params): Query<DataParams>,
) -> ApiResult<Json<DataResponse>> {
    let response = blocking(move || {
        let tree = listing::build_tree(&catalog);
        let (units, pagination) =
            listing::list_units(&catalog, &params.path, params.page, params.per_page)?;
        Ok(DataResponse {
            tree,
            units,
            pagination,
        })
    })
    .await?;
    Ok(Json(response))
}

// =========================================================================
// Search
// =========================================================================

#[derive(Debug, Deserialize)]
struct SearchParams {
    #[serde(default)]
    q: String,
}

async fn search_units(
    State(catalog): State<SharedCatalog>,
    Query(params): Query<SearchParams>,
) -> ApiResult<Json<Vec<search::SearchHit>>> {
    let hits = blocking(move || Ok(search::search(&catalog, &params.q))).await?;
    Ok(Json(hits))
}

// =========================================================================
// Bytes: thumbnail and original
// =========================================================================

#[derive(Debug, Deserialize)]
struct PathParam {
    #[serde(default)]
    path: String,
}

fn require_path(param: &PathParam) -> ApiResult<String> {
    if param.path.is_empty() {
        return Err(ApiError::bad_request("path parameter is required"));
    }
    Ok(param.path.clone())
}

async fn thumbnail(
    State(catalog): State<SharedCatalog>,
    Query(params): Query<PathParam>,
) -> ApiResult<Response> {
    let path = require_path(&params)?;
    let (bytes, modified) = blocking(move || {
        let entry = thumbs::get_or_create(&catalog, &path)?;
        let bytes = std::fs::read(&entry)?;
        Ok((bytes, mtime_secs(&entry)))
    })
    .await?;

    serve_bytes(bytes, "image/jpeg", "public, max-age=86400", modified)
}

async fn original_image(
    State(catalog): State<SharedCatalog>,
    Query(params): Query<PathParam>,
) -> ApiResult<Response> {
    let path = require_path(&params)?;
    let (bytes, content_type, modified) = blocking(move || {
        let full = catalog.resolve(&path)?;
        if !full.is_file() {
            return Err(CatalogError::NotFound(path));
        }
        let bytes = std::fs::read(&full)?;
        Ok((bytes, content_type_for(&full), mtime_secs(&full)))
    })
    .await?;

    serve_bytes(bytes, content_type, "public, max-age=3600", modified)
}

/// Content type by extension; units outside the well-known set serve as
/// opaque bytes.
fn content_type_for(path: &Path) -> &'static str {
    match path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .as_deref()
    {
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        Some("bmp") => "image/bmp",
        Some("gif") => "image/gif",
        _ => "application/octet-stream",
    }
}

fn serve_bytes(
    bytes: Vec<u8>,
    content_type: &'static str,
    cache_control: &'static str,
    modified: u64,
) -> ApiResult<Response> {
    let etag = header::HeaderValue::from_str(&format!("\"{modified}\""))
        .map_err(|err| ApiError::internal(err.to_string()))?;

    let headers = [
        (header::CONTENT_TYPE, header::HeaderValue::from_static(content_type)),
        (header::CACHE_CONTROL, header::HeaderValue::from_static(cache_control)),
        (header::ETAG, etag),
    ];
    Ok((headers, bytes).into_response())
}

// =========================================================================
// Unit CRUD
// =========================================================================

async fn get_unit(
    State(catalog): State<SharedCatalog>,
    Query(params): Query<PathParam>,
) -> ApiResult<Json<store::UnitDetails>> {
    let path = require_path(&params)?;
    let unit = blocking(move || store::get_unit(&catalog, &path)).await?;
    Ok(Json(unit))
}

#[derive(Debug, Deserialize)]
struct CreateUnitRequest {
    #[serde(default)]
    path: String,
    name: String,
    #[serde(default)]
    label: String,
    image_data: String,
}

async fn create_unit(
    State(catalog): State<SharedCatalog>,
    Json(req): Json<CreateUnitRequest>,
) -> ApiResult<(StatusCode, Json<serde_json::Value>)> {
    let name = req.name.trim().to_string();
    if name.is_empty() || req.image_data.is_empty() {
        return Err(ApiError::bad_request("name and image_data are required"));
    }
    let image_bytes = BASE64
        .decode(req.image_data.as_bytes())
        .map_err(|err| ApiError::bad_request(format!("image_data is not valid base64: {err}")))?;

    let rel = blocking(move || {
        store::create_unit(&catalog, &req.path, &name, req.label.trim(), &image_bytes)
    })
    .await?;
    Ok((StatusCode::CREATED, Json(json!({ "path": rel }))))
}

#[derive(Debug, Deserialize)]
struct UpdateUnitRequest {
    old_path: String,
    new_name: String,
    #[serde(default)]
    new_label: String,
}

async fn update_unit(
    State(catalog): State<SharedCatalog>,
    Json(req): Json<UpdateUnitRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    let new_name = req.new_name.trim().to_string();
    if req.old_path.is_empty() || new_name.is_empty() {
        return Err(ApiError::bad_request("old_path and new_name are required"));
    }

    let rel = blocking(move || {
        store::update_unit(&catalog, &req.old_path, &new_name, req.new_label.trim())
    })
    .await?;
    Ok(Json(json!({ "path": rel })))
}

async fn delete_unit(
    State(catalog): State<SharedCatalog>,
    Query(params): Query<PathParam>,
) -> ApiResult<StatusCode> {
    let path = require_path(&params)?;
    blocking(move || store::delete_unit(&catalog, &path)).await?;
    Ok(StatusCode::NO_CONTENT)
}

// =========================================================================
// Folder CRUD
// =========================================================================

#[derive(Debug, Deserialize)]
struct CreateFolderRequest {
    #[serde(default)]
    parent_path: String,
    name: String,
}

async fn create_folder(
    State(catalog): State<SharedCatalog>,
    Json(req): Json<CreateFolderRequest>,
) -> ApiResult<(StatusCode, Json<serde_json::Value>)> {
    let name = req.name.trim().to_string();
    if name.is_empty() {
        return Err(ApiError::bad_request("name is required"));
    }

    let rel = blocking(move || store::create_folder(&catalog, &req.parent_path, &name)).await?;
    Ok((StatusCode::CREATED, Json(json!({ "path": rel }))))
}

#[derive(Debug, Deserialize)]
struct RenameFolderRequest {
    old_path: String,
    new_path: String,
}

async fn rename_folder(
    State(catalog): State<SharedCatalog>,
    Json(req): Json<RenameFolderRequest>,
) -> ApiResult<Json<serde_json::Value>> {
    if req.old_path.is_empty() || req.new_path.is_empty() {
        return Err(ApiError::bad_request("old_path and new_path are required"));
    }

    let new_path = req.new_path.clone();
    blocking(move || store::rename_folder(&catalog, &req.old_path, &req.new_path)).await?;
    Ok(Json(json!({ "path": new_path })))
}
