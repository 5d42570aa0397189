use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
};
use stowage_processing::extension_of;
use tokio_util::io::ReaderStream;

use crate::error::{ErrorResponse, HttpAppError};
use crate::state::AppState;

fn content_type_for(name: &str) -> &'static str {
    match extension_of(name).as_str() {
        ".jpg" | ".jpeg" => "image/jpeg",
        ".png" => "image/png",
        ".gif" => "image/gif",
        ".txt" => "text/plain; charset=utf-8",
        _ => "application/octet-stream",
    }
}

/// Serve a stored file by name (the locator without the base URL)
#[utoipa::path(
    get,
    path = "/files/{name}",
    tag = "files",
    params(("name" = String, Path, description = "Storage name, e.g. 2025/01/15/report.xml")),
    responses(
        (status = 200, description = "File content", content_type = "application/octet-stream"),
        (status = 400, description = "Invalid name", body = ErrorResponse),
        (status = 404, description = "File not found", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state))]
pub async fn get_file(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Response, HttpAppError> {
    let reader = state.storage().open(&name).await?;
    let body = Body::from_stream(ReaderStream::new(reader));

    Ok(([(header::CONTENT_TYPE, content_type_for(&name))], body).into_response())
}

/// Delete a stored file by name
#[utoipa::path(
    delete,
    path = "/files/{name}",
    tag = "files",
    params(("name" = String, Path, description = "Storage name or full locator")),
    responses(
        (status = 204, description = "File deleted"),
        (status = 404, description = "File not found", body = ErrorResponse),
        (status = 500, description = "Backend cannot delete", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state))]
pub async fn delete_file(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<StatusCode, HttpAppError> {
    state.storage().delete(&name).await?;
    tracing::info!(key = %name, "File deleted");
    Ok(StatusCode::NO_CONTENT)
}
