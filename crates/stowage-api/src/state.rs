//! Application state shared by all handlers.

use std::sync::Arc;
use stowage_core::Config;
use stowage_processing::Upload;
use stowage_storage::Storage;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub upload: Arc<Upload>,
}

impl AppState {
    pub fn new(config: Config, upload: Upload) -> Self {
        Self {
            config,
            upload: Arc::new(upload),
        }
    }

    /// Backend the uploads are stored in
    pub fn storage(&self) -> &Arc<dyn Storage> {
        self.upload.storage()
    }
}
