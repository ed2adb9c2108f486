//! HTTP handlers.

use crate::error::ApiError;
use crate::streaming::{blocking_body, upload_channel};
use crate::{ApiDoc, AppState, HealthRes};
use axum::extract::multipart::Field;
use axum::extract::{Multipart, Path as AxumPath, State};
use axum::http::header::{CONTENT_DISPOSITION, CONTENT_LENGTH, CONTENT_TYPE};
use axum::response::{Json, Response};
use std::io::{self, BufWriter};
use updown_core::{FileService, StorageResult, COPY_BUFFER_SIZE, ZIP_DOWNLOAD_FILENAME};
use utoipa::OpenApi;

/// Multipart field carrying uploaded files.
const UPLOAD_FIELD: &str = "file";

const OCTET_STREAM: &str = "application/octet-stream";

const MISSING_FILE_PART: &str = "Missing multipart field `file`";

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Health check endpoint for the REST API
#[axum::debug_handler]
pub(crate) async fn health(State(_state): State<AppState>) -> Json<HealthRes> {
    Json(HealthRes {
        ok: true,
        message: "UpDown REST API is alive".into(),
    })
}

#[utoipa::path(
    post,
    path = "/file",
    request_body(content = String, content_type = "multipart/form-data", description = "Single `file` part"),
    responses(
        (status = 200, description = "File stored", body = String),
        (status = 400, description = "Empty file or malformed multipart request"),
        (status = 413, description = "Upload exceeds the configured limit"),
        (status = 500, description = "Storage failure")
    )
)]
/// Upload a single file
///
/// Stores the first `file` part under its client-supplied filename, replacing any file of the
/// same name.
#[axum::debug_handler]
pub(crate) async fn upload_file(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<String, ApiError> {
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let filename = store_part(&state.files, field).await?;
        tracing::info!("Stored upload");
        return Ok(format!("File uploaded successfully: {}", filename));
    }
    Err(ApiError::bad_request(MISSING_FILE_PART))
}

#[utoipa::path(
    post,
    path = "/files",
    request_body(content = String, content_type = "multipart/form-data", description = "Repeated `file` parts"),
    responses(
        (status = 200, description = "Files stored", body = String),
        (status = 400, description = "Empty file or malformed multipart request"),
        (status = 413, description = "Upload exceeds the configured limit"),
        (status = 500, description = "Storage failure")
    )
)]
/// Upload several files
///
/// Parts are stored in request order. The first failure ends the request; parts stored before
/// it stay stored.
#[axum::debug_handler]
pub(crate) async fn upload_files(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<String, ApiError> {
    let mut stored = 0usize;
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        store_part(&state.files, field).await?;
        stored += 1;
    }
    if stored == 0 {
        return Err(ApiError::bad_request(MISSING_FILE_PART));
    }

    tracing::info!("Stored {} uploads", stored);
    Ok("Files uploaded successfully".into())
}

#[utoipa::path(
    get,
    path = "/files",
    responses(
        (status = 200, description = "Stored filenames in ascending order", body = Vec<String>),
        (status = 500, description = "Storage failure")
    )
)]
/// List stored files
#[axum::debug_handler]
pub(crate) async fn list_files(State(state): State<AppState>) -> Result<Json<Vec<String>>, ApiError> {
    let files = state.files.clone();
    let names = run_blocking(move || files.list_files()).await?;
    Ok(Json(names))
}

#[utoipa::path(
    get,
    path = "/files/{filename}",
    params(
        ("filename" = String, Path, description = "Stored filename")
    ),
    responses(
        (status = 200, description = "File content as an attachment"),
        (status = 404, description = "No such file")
    )
)]
/// Download one stored file
///
/// The body is streamed from storage in fixed-size chunks.
#[axum::debug_handler]
pub(crate) async fn download_file(
    State(state): State<AppState>,
    AxumPath(filename): AxumPath<String>,
) -> Result<Response, ApiError> {
    let files = state.files.clone();
    let stored = run_blocking(move || files.load(&filename)).await?;

    let len = stored.len();
    let disposition = attachment_disposition(stored.filename());
    let body = blocking_body(move |mut sink| {
        let mut reader = stored.into_reader();
        io::copy(&mut reader, &mut sink).map(|_| ())
    });

    Ok(Response::builder()
        .header(CONTENT_TYPE, OCTET_STREAM)
        .header(CONTENT_DISPOSITION, disposition)
        .header(CONTENT_LENGTH, len)
        .body(body)?)
}

#[utoipa::path(
    post,
    path = "/zip",
    request_body = Vec<String>,
    responses(
        (status = 200, description = "Zip archive of the requested files")
    )
)]
/// Download several stored files as one zip archive
///
/// Entries follow request order. The archive is produced while it is sent, so a missing or
/// unreadable file aborts the response after the headers have gone out.
#[axum::debug_handler]
pub(crate) async fn zip_files(
    State(state): State<AppState>,
    Json(filenames): Json<Vec<String>>,
) -> Result<Response, ApiError> {
    tracing::info!("Zipping {} files", filenames.len());
    let archive = state.files.zip_files(filenames);
    let body = blocking_body(move |sink| {
        archive.write_to(BufWriter::with_capacity(COPY_BUFFER_SIZE, sink))
    });

    Ok(Response::builder()
        .header(CONTENT_TYPE, OCTET_STREAM)
        .header(
            CONTENT_DISPOSITION,
            attachment_disposition(ZIP_DOWNLOAD_FILENAME),
        )
        .body(body)?)
}

/// OpenAPI document for this API
pub(crate) async fn openapi() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

/// Streams one `file` part into storage and returns its filename.
///
/// Request chunks are fed to the blocking store as they arrive. A part without a filename is
/// rejected before anything is stored. If the request body fails midway, the store sees a read
/// error and keeps nothing, and the multipart error decides the response.
async fn store_part(files: &FileService, mut field: Field<'_>) -> Result<String, ApiError> {
    let filename = field
        .file_name()
        .map(str::to_owned)
        .ok_or_else(|| ApiError::bad_request("Multipart part `file` has no filename"))?;

    let (tx, mut reader) = upload_channel();
    let files = files.clone();
    let name = filename.clone();
    let store = tokio::task::spawn_blocking(move || files.upload_file(&name, &mut reader));

    let mut body_error = None;
    loop {
        match field.chunk().await {
            Ok(Some(chunk)) => {
                // The store has already finished, most likely with an error.
                if tx.send(Ok(chunk)).await.is_err() {
                    break;
                }
            }
            Ok(None) => break,
            Err(err) => {
                let _ = tx.send(Err(io::Error::other(err.to_string()))).await;
                body_error = Some(err);
                break;
            }
        }
    }
    drop(tx);

    let stored = store.await?;
    if let Some(err) = body_error {
        return Err(err.into());
    }
    stored?;
    Ok(filename)
}

/// Runs blocking storage work off the async runtime.
async fn run_blocking<T, F>(work: F) -> Result<T, ApiError>
where
    F: FnOnce() -> StorageResult<T> + Send + 'static,
    T: Send + 'static,
{
    Ok(tokio::task::spawn_blocking(work).await??)
}

/// `Content-Disposition` value offering `filename` as an attachment.
///
/// Names that are not plain printable ASCII get an RFC 5987 `filename*` parameter alongside a
/// generic fallback.
fn attachment_disposition(filename: &str) -> String {
    let plain = filename
        .chars()
        .all(|c| (c.is_ascii_graphic() && c != '"' && c != '\\') || c == ' ');
    if plain {
        format!("attachment; filename=\"{filename}\"")
    } else {
        format!(
            "attachment; filename=\"download\"; filename*=UTF-8''{}",
            urlencoding::encode(filename)
        )
    }
}
