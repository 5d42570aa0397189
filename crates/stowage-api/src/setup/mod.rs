//! Application setup and initialization

pub mod routes;
pub mod server;

use crate::state::AppState;
use anyhow::{Context, Result};
use std::sync::Arc;
use stowage_core::Config;
use stowage_processing::Upload;
use stowage_storage::create_storage;

/// Build the storage backend, the upload orchestrator and the router
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    let storage = create_storage(&config)
        .await
        .context("Failed to initialize storage")?;

    let upload =
        Upload::from_config(&config, storage).context("Failed to load watermark image")?;

    tracing::info!(
        storage_backend = %config.storage_backend,
        shard_format = %config.shard_format,
        watermark = config.watermark.is_some(),
        "Upload service initialized"
    );

    let state = Arc::new(AppState::new(config.clone(), upload));
    let router = routes::setup_routes(&config, state.clone())?;

    Ok((state, router))
}
