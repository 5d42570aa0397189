//! Multipart decoding into the orchestrator's input types.

use axum::extract::Multipart;
use stowage_processing::{UploadForm, UploadedFile};

use crate::error::HttpAppError;

/// Collect every file part of the request, grouped by field name
///
/// Parts without a filename are plain form values and are skipped.
pub async fn read_upload_form(mut multipart: Multipart) -> Result<UploadForm, HttpAppError> {
    let mut form = UploadForm::new();

    while let Some(field) = multipart.next_field().await? {
        let Some(filename) = field.file_name().map(str::to_string) else {
            continue;
        };
        let name = field.name().map(str::to_string).unwrap_or_default();
        let data = field.bytes().await?;

        tracing::debug!(
            field = %name,
            filename = %filename,
            size_bytes = data.len(),
            "Received file part"
        );

        form.add(name, UploadedFile::from_bytes(filename, data));
    }

    Ok(form)
}
