//! HTTP routes.
//!
//! - `POST /`              identify every face in the uploaded `file`
//! - `GET /faces`          distinct enrolled labels
//! - `POST /faces?id=..`   enroll the single face in `file` under `id`
//! - `DELETE /faces?id=..` remove every enrollment labelled `id`
//! - `GET /status`         daemon status

use std::path::PathBuf;
use std::sync::Arc;

use axum::extract::multipart::MultipartRejection;
use axum::extract::{DefaultBodyLimit, Multipart, Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use facerec_core::{detect_faces, is_picture, Detection, EuclideanMatcher, Registry};
use serde::Deserialize;
use tokio::sync::RwLock;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::engine::EngineHandle;
use crate::error::ApiError;

/// State shared by all request handlers.
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<RwLock<Registry>>,
    pub engine: EngineHandle,
    pub faces_dir: PathBuf,
}

impl AppState {
    pub fn new(registry: Registry, engine: EngineHandle, faces_dir: PathBuf) -> Self {
        Self {
            registry: Arc::new(RwLock::new(registry)),
            engine,
            faces_dir,
        }
    }
}

/// Build the router with all routes and middleware.
pub fn router(state: AppState, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/", post(recognize))
        .route("/faces", get(list_faces).post(enroll_face).delete(remove_face))
        .route("/status", get(status))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[derive(Debug, Deserialize)]
pub struct FaceQuery {
    id: Option<String>,
}

impl FaceQuery {
    fn require_id(self) -> Result<String, ApiError> {
        self.id
            .filter(|id| !id.is_empty())
            .ok_or_else(|| ApiError::bad_request("identifier for the face was not given"))
    }
}

/// The uploaded `file` part of a multipart body.
struct Upload {
    filename: String,
    bytes: Vec<u8>,
}

async fn read_upload(multipart: Result<Multipart, MultipartRejection>) -> Result<Upload, ApiError> {
    let mut multipart = multipart.map_err(|_| ApiError::bad_request("missing file parameter"))?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::bad_request(format!("invalid multipart body: {e}")))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field.file_name().unwrap_or_default().to_string();
        if filename.is_empty() {
            return Err(ApiError::bad_request("given file is invalid"));
        }
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::bad_request(format!("invalid multipart body: {e}")))?;

        return Ok(Upload {
            filename,
            bytes: bytes.to_vec(),
        });
    }

    Err(ApiError::bad_request("missing file parameter"))
}

async fn recognize(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<Detection>, ApiError> {
    let upload = read_upload(multipart).await?;
    if !is_picture(&upload.filename) {
        return Err(ApiError::bad_request("given file is invalid"));
    }

    let probes = state.engine.embed(upload.bytes).await?;

    let registry = state.registry.read().await;
    let detection = detect_faces(&probes, &registry, &EuclideanMatcher);
    drop(registry);

    tracing::debug!(
        file = %upload.filename,
        count = detection.count,
        matched = detection.faces.len(),
        "faces identified"
    );

    Ok(Json(detection))
}

async fn list_faces(State(state): State<AppState>) -> Json<Vec<String>> {
    Json(state.registry.read().await.labels())
}

async fn enroll_face(
    State(state): State<AppState>,
    Query(query): Query<FaceQuery>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<Vec<String>>, ApiError> {
    let label = query.require_id()?;
    let upload = read_upload(multipart).await?;

    let embedding = state.engine.embed_single(upload.bytes).await?;

    let mut registry = state.registry.write().await;
    registry
        .add(embedding, label.clone())
        .map_err(|e| ApiError::bad_request(e.to_string()))?;
    tracing::info!(label = %label, entries = registry.len(), "face enrolled");

    Ok(Json(registry.labels()))
}

async fn remove_face(
    State(state): State<AppState>,
    Query(query): Query<FaceQuery>,
) -> Result<Json<Vec<String>>, ApiError> {
    let label = query.require_id()?;

    let mut registry = state.registry.write().await;
    let removed = registry.remove_all(&label);
    tracing::info!(label = %label, removed, entries = registry.len(), "faces removed");

    Ok(Json(registry.labels()))
}

async fn status(State(state): State<AppState>) -> Json<serde_json::Value> {
    let registry = state.registry.read().await;
    Json(serde_json::json!({
        "version": env!("CARGO_PKG_VERSION"),
        "entries": registry.len(),
        "labels": registry.labels().len(),
        "faces_dir": state.faces_dir.display().to_string(),
    }))
}
