use std::sync::Arc;

use axum::{
    extract::{Multipart, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::error::{ErrorResponse, UploadErrorResponse, UploadRejection};
use crate::multipart::read_upload_form;
use crate::state::AppState;

#[derive(Debug, Serialize, ToSchema)]
pub struct UploadResponse {
    /// Locators of the stored files, in submission order
    pub files: Vec<String>,
}

/// Upload files handler
///
/// Stores every file sent under the configured upload field. Processing stops
/// at the first rejected file; files stored before it are listed in the error
/// body under `files` and are not removed.
#[utoipa::path(
    post,
    path = "/upload",
    tag = "files",
    request_body(content = inline(Object), content_type = "multipart/form-data"),
    responses(
        (status = 201, description = "Files stored", body = UploadResponse),
        (status = 400, description = "Missing file, empty file or extension not allowed", body = UploadErrorResponse),
        (status = 413, description = "File too large", body = UploadErrorResponse),
        (status = 415, description = "Image format cannot be watermarked", body = UploadErrorResponse),
        (status = 422, description = "Image smaller than the watermark", body = UploadErrorResponse),
        (status = 500, description = "Storage failure", body = ErrorResponse)
    )
)]
#[tracing::instrument(skip(state, multipart), fields(operation = "upload_files"))]
pub async fn upload_files(
    State(state): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<(StatusCode, Json<UploadResponse>), UploadRejection> {
    let form = read_upload_form(multipart).await?;

    let files = state
        .upload
        .process(&state.config.upload_field_name, &form)
        .await?;

    Ok((StatusCode::CREATED, Json(UploadResponse { files })))
}
