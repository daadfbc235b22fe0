use axum::{
    Json,
    extract::{
        Multipart, Path, Query, State,
        multipart::MultipartRejection,
        rejection::{JsonRejection, QueryRejection},
    },
    http::{StatusCode, header},
    response::IntoResponse,
};
use std::collections::HashMap;
use tracing::info;

use super::{
    error::ApiError,
    models::{
        Base64UploadRequest, Base64UploadResponse, DetailResponse, HealthResponse, ObjectEntry,
        ThumbnailQuery,
    },
    state::AppState,
    utils::{read_model_upload, sanitize_file_name},
    validation::validate_base64_upload,
};
use crate::aps::types::{ScopeSet, ThumbnailSize};
use crate::error::GatewayError;
use crate::storage::ContentSource;

/// Viewer credential (GET /api/auth/token)
pub async fn viewer_token(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let credentials = state
        .credentials
        .credentials(ScopeSet::Viewer)
        .await
        .map_err(GatewayError::from)?;
    Ok(Json(credentials))
}

/// Read/write credential (GET /api/auth/full_token)
pub async fn full_token(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let credentials = state
        .credentials
        .credentials(ScopeSet::Full)
        .await
        .map_err(GatewayError::from)?;
    Ok(Json(credentials))
}

/// Objects stored under a folder (GET /api/files/{folder})
pub async fn list_folder(
    State(state): State<AppState>,
    Path(folder): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let objects = state.gateway.list_folder(&folder).await?;
    let entries: Vec<ObjectEntry> = objects.into_iter().map(ObjectEntry::from).collect();
    Ok(Json(entries))
}

/// Upload a file into a folder (POST /api/files/{folder})
pub async fn upload_to_folder(
    State(state): State<AppState>,
    Path(folder): Path<String>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let (file, _) = read_model_upload(multipart?).await?.require_file()?;
    let name = sanitize_file_name(&file.file_name).to_string();

    let source = ContentSource::Path(file.path.to_path_buf());
    let stored = state.gateway.upload(&folder, &name, source).await?;
    Ok(Json(ObjectEntry::from(stored)))
}

/// Signed download URL for an object (GET /api/files/urn/{urn}/detail)
///
/// Also mounted at GET /api/models/{urn}/detail.
pub async fn object_detail(
    State(state): State<AppState>,
    Path(urn): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let metadata = state.gateway.fetch_metadata_by_urn(&urn).await?;
    Ok(Json(DetailResponse {
        url: metadata.signed_url,
    }))
}

/// Every model in the bucket (GET /api/models)
pub async fn list_models(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let objects = state.gateway.list_models().await?;
    let entries: Vec<ObjectEntry> = objects.into_iter().map(ObjectEntry::from).collect();
    Ok(Json(entries))
}

/// Upload a model and start its translation (POST /api/models)
///
/// An optional `model-zip-entrypoint` field marks the upload as an archive
/// and names the root design inside it.
pub async fn upload_model(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let (file, entrypoint) = read_model_upload(multipart?).await?.require_file()?;
    let name = sanitize_file_name(&file.file_name).to_string();

    let source = ContentSource::Path(file.path.to_path_buf());
    let stored = state.gateway.upload_root(&name, source).await?;
    info!(key = %stored.key, spooled = file.size, "Stored model upload");
    state
        .translations
        .submit(stored.urn.as_str(), entrypoint.as_deref())
        .await?;

    Ok(Json(ObjectEntry::from(stored)))
}

/// Upload a base64 encoded model (POST /api/models/upload-base64)
pub async fn upload_base64(
    State(state): State<AppState>,
    payload: Result<Json<Base64UploadRequest>, JsonRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Json(request) = payload?;
    let upload =
        validate_base64_upload(request).map_err(|e| ApiError::InvalidPayload(e.to_string()))?;

    let stored = state
        .gateway
        .upload_named(&upload.object_name, ContentSource::Bytes(upload.data))
        .await?;

    Ok((
        StatusCode::OK,
        Json(Base64UploadResponse {
            message: "File uploaded successfully.".to_string(),
            object_key: stored.key,
            urn: stored.urn.into_string(),
            size: stored.size,
            location: stored.location,
        }),
    ))
}

/// Translation state of a model (GET /api/models/{urn}/status)
pub async fn model_status(
    State(state): State<AppState>,
    Path(urn): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let report = state.translations.status(&urn).await?;
    Ok(Json(report))
}

/// PNG preview of a translated model (GET /api/models/{urn}/thumbnail)
pub async fn model_thumbnail(
    State(state): State<AppState>,
    Path(urn): Path<String>,
    query: Result<Query<ThumbnailQuery>, QueryRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Query(query) = query?;
    let size = query
        .size
        .map(ThumbnailSize::try_from)
        .transpose()
        .map_err(ApiError::InvalidPayload)?;

    let png = state.translations.thumbnail(&urn, size).await?;
    info!(urn = %urn, bytes = png.len(), "Served thumbnail");

    Ok(([(header::CONTENT_TYPE, mime::IMAGE_PNG.to_string())], png))
}

/// Health check endpoint (GET /health)
pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let mut components = HashMap::new();
    components.insert("api".to_string(), "healthy".to_string());
    components.insert("bucket".to_string(), state.gateway.bucket().to_string());

    let response = HealthResponse {
        status: "healthy".to_string(),
        components,
        version: env!("CARGO_PKG_VERSION").to_string(),
        counters: state.metrics.snapshot(),
    };

    (StatusCode::OK, Json(response))
}
