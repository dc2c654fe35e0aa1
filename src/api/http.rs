//! HTTP API Server
//!
//! REST API for file CRUD, paginated listing and content generation.

use std::sync::Arc;

use axum::{
    extract::{multipart::MultipartRejection, DefaultBodyLimit, Multipart, Path, Query, State},
    http::{header, HeaderValue, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use bytes::Bytes;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use super::middleware::correlation_id;
use super::types::{FileWriteResponse, GenerateParams, HealthResponse, ListFilesParams};
use crate::config::ServerConfig;
use crate::error::{Error, Result};
use crate::files::{FileService, UploadOutcome};
use crate::listing::ListingPage;
use crate::storage::DEFAULT_CONTENT_TYPE;

/// Multipart field carrying the uploaded file
const UPLOAD_FIELD: &str = "file";

/// Key prefix served by the `/files/generated/*file_path` routes
const GENERATED_PREFIX: &str = "generated/";

/// `Last-Modified` / HTTP-date format
const HTTP_DATE_FORMAT: &str = "%a, %d %b %Y %H:%M:%S GMT";

/// Shared application state
pub struct AppState {
    pub files: FileService,
}

/// HTTP API server
pub struct HttpServer {
    config: ServerConfig,
    state: Arc<AppState>,
}

impl HttpServer {
    /// Create a new HTTP server
    pub fn new(config: ServerConfig, files: FileService) -> Self {
        Self {
            config,
            state: Arc::new(AppState { files }),
        }
    }

    /// Get the state for sharing with other components
    pub fn state(&self) -> Arc<AppState> {
        Arc::clone(&self.state)
    }

    /// Build the router with all middleware applied
    pub fn router(&self) -> Router {
        create_router(Arc::clone(&self.state), &self.config)
    }

    /// Start the HTTP server, returning once Ctrl+C is received
    pub async fn start(&self) -> Result<()> {
        let app = self.router();

        let listener = tokio::net::TcpListener::bind(&self.config.bind_address).await?;
        tracing::info!(
            "HTTP API listening on {} (bucket '{}')",
            self.config.bind_address,
            self.state.files.bucket()
        );

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        tracing::info!("HTTP API stopped");
        Ok(())
    }
}

/// Create the router
pub fn create_router(state: Arc<AppState>, config: &ServerConfig) -> Router {
    let routes = Router::new()
        .route("/files", get(handle_list_files))
        .route(
            "/files/*file_path",
            get(handle_get_file)
                .head(handle_head_file)
                .put(handle_upload_file)
                .delete(handle_delete_file),
        )
        .route(
            "/files/generated/*file_path",
            post(handle_generate_file)
                .get(handle_get_generated)
                .head(handle_head_generated)
                .put(handle_upload_generated)
                .delete(handle_delete_generated),
        )
        .route("/health", get(handle_health));

    let mut app = Router::new()
        .nest("/v1", routes.clone())
        .merge(routes)
        .with_state(state)
        .layer(DefaultBodyLimit::max(config.max_upload_bytes()))
        .layer(TraceLayer::new_for_http());

    if config.cors_enabled {
        app = app.layer(CorsLayer::permissive());
    }

    app.layer(middleware::from_fn(correlation_id))
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

// ============ Handlers ============

async fn handle_list_files(
    State(state): State<Arc<AppState>>,
    Query(params): Query<ListFilesParams>,
) -> Result<Json<ListingPage>> {
    let query = params.into_query()?;
    let page = state.files.list(&query).await?;
    Ok(Json(page))
}

async fn handle_get_file(
    State(state): State<Arc<AppState>>,
    Path(file_path): Path<String>,
) -> Result<Response> {
    let object = state.files.fetch(&file_path).await?;

    Ok((
        [
            (header::CONTENT_TYPE, header_value(&object.metadata.content_type, DEFAULT_CONTENT_TYPE)),
            (header::CONTENT_LENGTH, HeaderValue::from(object.data.len())),
        ],
        object.data,
    )
        .into_response())
}

async fn handle_head_file(
    State(state): State<Arc<AppState>>,
    Path(file_path): Path<String>,
) -> Response {
    match state.files.metadata(&file_path).await {
        Ok(meta) => (
            StatusCode::OK,
            [
                (header::CONTENT_TYPE, header_value(&meta.content_type, DEFAULT_CONTENT_TYPE)),
                (header::CONTENT_LENGTH, HeaderValue::from(meta.content_length)),
                (
                    header::LAST_MODIFIED,
                    header_value(&meta.last_modified.format(HTTP_DATE_FORMAT).to_string(), ""),
                ),
            ],
        )
            .into_response(),
        // HEAD responses carry no body, so the reason travels in a header
        Err(e @ Error::FileNotFound(_)) => {
            (StatusCode::NOT_FOUND, [("error", header_value(&e.to_string(), "File not found"))]).into_response()
        }
        Err(e) => e.into_response(),
    }
}

async fn handle_upload_file(
    State(state): State<Arc<AppState>>,
    Path(file_path): Path<String>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<(StatusCode, Json<FileWriteResponse>)> {
    let multipart =
        multipart.map_err(|e| Error::InvalidRequest(format!("expected multipart form data: {}", e)))?;
    let (data, content_type) = read_upload_field(multipart).await?;

    let outcome = state.files.upload(&file_path, data, &content_type).await?;
    let (status, message) = match outcome {
        UploadOutcome::Created => (
            StatusCode::CREATED,
            format!("New file uploaded at path: {}", file_path),
        ),
        UploadOutcome::Updated => (
            StatusCode::OK,
            format!("Existing file updated at path: {}", file_path),
        ),
    };

    Ok((status, Json(FileWriteResponse { file_path, message })))
}

async fn handle_delete_file(
    State(state): State<Arc<AppState>>,
    Path(file_path): Path<String>,
) -> Result<StatusCode> {
    state.files.delete(&file_path).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn handle_generate_file(
    State(state): State<Arc<AppState>>,
    Path(file_path): Path<String>,
    Query(params): Query<GenerateParams>,
) -> Result<(StatusCode, Json<FileWriteResponse>)> {
    if !state.files.generation_enabled() {
        return Err(Error::GenerationDisabled);
    }
    let (prompt, file_type) = params.into_parts()?;
    let file_path = generated_key(&file_path);

    let upload = state.files.generate(&file_path, &prompt, file_type).await?;
    tracing::info!(
        "Generated {} file at {} ({} bytes, {}, {:?})",
        upload.file_type,
        file_path,
        upload.size_bytes,
        upload.content_type,
        upload.outcome
    );

    let message = format!(
        "New {} file generated and uploaded at path: {}",
        upload.file_type, file_path
    );
    Ok((StatusCode::CREATED, Json(FileWriteResponse { file_path, message })))
}

// The static `generated/` segment shadows the catch-all, so these forward
// to the plain file handlers with the prefix restored.

async fn handle_get_generated(
    state: State<Arc<AppState>>,
    Path(file_path): Path<String>,
) -> Result<Response> {
    handle_get_file(state, Path(generated_key(&file_path))).await
}

async fn handle_head_generated(
    state: State<Arc<AppState>>,
    Path(file_path): Path<String>,
) -> Response {
    handle_head_file(state, Path(generated_key(&file_path))).await
}

async fn handle_upload_generated(
    state: State<Arc<AppState>>,
    Path(file_path): Path<String>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<(StatusCode, Json<FileWriteResponse>)> {
    handle_upload_file(state, Path(generated_key(&file_path)), multipart).await
}

async fn handle_delete_generated(
    state: State<Arc<AppState>>,
    Path(file_path): Path<String>,
) -> Result<StatusCode> {
    handle_delete_file(state, Path(generated_key(&file_path))).await
}

async fn handle_health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    Json(HealthResponse {
        healthy: true,
        bucket: state.files.bucket().to_string(),
        generation_enabled: state.files.generation_enabled(),
    })
}

// ============ Helpers ============

fn generated_key(file_path: &str) -> String {
    format!("{}{}", GENERATED_PREFIX, file_path.trim_start_matches('/'))
}

/// Pull the `file` field out of a multipart body
async fn read_upload_field(mut multipart: Multipart) -> Result<(Bytes, String)> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| Error::InvalidRequest(format!("malformed multipart body: {}", e)))?
    {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }

        let content_type = field
            .content_type()
            .map(str::to_string)
            .unwrap_or_else(|| DEFAULT_CONTENT_TYPE.to_string());
        let data = field
            .bytes()
            .await
            .map_err(|e| Error::InvalidRequest(format!("failed to read upload: {}", e)))?;
        return Ok((data, content_type));
    }

    Err(Error::InvalidRequest(format!(
        "missing multipart field '{}'",
        UPLOAD_FIELD
    )))
}

fn header_value(value: &str, fallback: &'static str) -> HeaderValue {
    HeaderValue::from_str(value).unwrap_or_else(|_| HeaderValue::from_static(fallback))
}
