//! # API REST
//!
//! REST API implementation for UpDown.
//!
//! Handles:
//! - HTTP endpoints with axum
//! - OpenAPI document generation with utoipa
//! - REST-specific concerns (multipart parsing, download headers, CORS)
//!
//! Storage work is blocking I/O, so handlers move it onto tokio's blocking pool. Download and
//! zip bodies are produced on that pool and streamed to the client through a bounded channel.

#![warn(rust_2018_idioms)]

mod error;
mod routes;
mod streaming;

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use serde::Serialize;
use tower_http::cors::CorsLayer;
use updown_core::FileService;
use utoipa::{OpenApi, ToSchema};

pub use error::ApiError;

/// Application state shared with every request handler.
#[derive(Clone, Debug)]
pub struct AppState {
    files: FileService,
}

impl AppState {
    pub fn new(files: FileService) -> Self {
        Self { files }
    }
}

/// Health check response body.
#[derive(Debug, Serialize, ToSchema)]
pub struct HealthRes {
    pub ok: bool,
    pub message: String,
}

#[derive(OpenApi)]
#[openapi(
    paths(
        routes::health,
        routes::upload_file,
        routes::upload_files,
        routes::list_files,
        routes::download_file,
        routes::zip_files,
    ),
    components(schemas(HealthRes))
)]
pub struct ApiDoc;

/// Builds the REST router.
///
/// `max_upload_bytes` bounds every request body, which caps multipart uploads.
pub fn router(files: FileService, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/health", get(routes::health))
        .route("/file", post(routes::upload_file))
        .route("/files", get(routes::list_files).post(routes::upload_files))
        .route("/files/:filename", get(routes::download_file))
        .route("/zip", post(routes::zip_files))
        .route("/api-docs/openapi.json", get(routes::openapi))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(CorsLayer::permissive())
        .with_state(AppState::new(files))
}
