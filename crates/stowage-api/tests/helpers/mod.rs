//! Test helpers: build the router over a scratch directory for integration tests.
//!
//! Run with: `cargo test -p stowage-api`

#![allow(dead_code)]

pub mod fixtures;

use axum_test::multipart::{MultipartForm, Part};
use axum_test::TestServer;
use std::path::Path;
use stowage_api::setup;
use stowage_core::{Config, ShardFormat, StorageBackend, WatermarkSettings};
use tempfile::TempDir;

/// Test application: server plus the directory its files land in.
pub struct TestApp {
    pub server: TestServer,
    pub temp_dir: TempDir,
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }

    pub fn storage_path(&self) -> &Path {
        self.temp_dir.path()
    }
}

/// Config with local storage rooted in `dir`, 1 MiB files, no watermark.
pub fn create_test_config(dir: &Path) -> Config {
    Config {
        environment: "test".to_string(),
        storage_backend: StorageBackend::Local,
        local_storage_path: dir.display().to_string(),
        local_storage_base_url: String::new(),
        shard_format: ShardFormat::None,
        max_file_size_bytes: 1024 * 1024,
        max_request_size_bytes: 4 * 1024 * 1024,
        allowed_extensions: vec![".txt".to_string(), ".png".to_string()],
        ..Config::default()
    }
}

pub async fn setup_test_app() -> TestApp {
    setup_test_app_with(|_| {}).await
}

/// Setup test app after letting `customize` adjust the config.
pub async fn setup_test_app_with(customize: impl FnOnce(&mut Config)) -> TestApp {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let mut config = create_test_config(temp_dir.path());
    customize(&mut config);

    let (_state, router) = setup::initialize_app(config)
        .await
        .expect("Failed to initialize app");
    let server =
        TestServer::new(router.into_make_service()).expect("Failed to create test server");

    TestApp { server, temp_dir }
}

/// Setup test app with a red square watermark in the top-left corner.
pub async fn setup_watermarked_app(size: u32) -> TestApp {
    let mark_dir = TempDir::new().expect("Failed to create temp dir");
    let mark_path = mark_dir.path().join("mark.png");
    std::fs::write(&mark_path, fixtures::solid_png(size, size, fixtures::RED))
        .expect("Failed to write watermark");

    let app = setup_test_app_with(|config| {
        config.watermark = Some(WatermarkSettings {
            path: mark_path.display().to_string(),
            padding: 0,
            position: "top-left".to_string(),
        });
    })
    .await;

    // The watermark is decoded during setup, so its directory can go.
    drop(mark_dir);
    app
}

/// Multipart form with one `files` part per (filename, content) pair.
pub fn files_form(files: &[(&str, Vec<u8>)]) -> MultipartForm {
    files
        .iter()
        .fold(MultipartForm::new(), |form, (name, data)| {
            form.add_part(
                "files",
                Part::bytes(bytes::Bytes::from(data.clone())).file_name(name.to_string()),
            )
        })
}
