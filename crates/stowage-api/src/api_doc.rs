//! OpenAPI documentation, served as JSON at `/api/openapi.json` and browsable at `/docs`.

use utoipa::OpenApi;

use crate::error;
use crate::handlers;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Stowage API",
        version = "0.1.0",
        description = "Multi-file upload service with extension and size validation, time-sharded storage and optional image watermarking."
    ),
    paths(
        handlers::upload::upload_files,
        handlers::files::get_file,
        handlers::files::delete_file,
        handlers::health::health_check,
    ),
    components(schemas(
        error::ErrorResponse,
        error::UploadErrorResponse,
        handlers::upload::UploadResponse,
        handlers::health::HealthCheckResponse,
    )),
    tags(
        (name = "files", description = "Upload, serve and delete files"),
        (name = "health", description = "Service health")
    )
)]
pub struct ApiDoc;
