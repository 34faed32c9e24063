#![allow(dead_code)]

use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;

use coverscan::config::{DatabaseConfig, RecognitionConfig, UploadConfig};
use coverscan::db::{Database, DatabaseBackend, LibSqlBackend};
use coverscan::recognition::{ImageLimits, ProviderRegistry, RecognitionHandler};
use coverscan::storage::UploadStore;

/// Solid-color PNG; distinct colors give distinct bytes.
pub fn png(width: u32, height: u32, rgb: [u8; 3]) -> Vec<u8> {
    let img = image::DynamicImage::ImageRgb8(image::RgbImage::from_pixel(
        width,
        height,
        image::Rgb(rgb),
    ));
    let mut bytes = Vec::new();
    img.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .expect("Failed to encode PNG fixture");
    bytes
}

/// Route test logs through the libtest capture. Safe to call repeatedly.
pub fn init_test_logger() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("coverscan=debug")
        .with_test_writer()
        .try_init();
}

pub async fn library(dir: &Path) -> Arc<dyn DatabaseBackend> {
    let config = DatabaseConfig {
        url: format!("file:{}", dir.join("library.db").display()),
        auth_token: None,
        local_path: None,
    };
    let db = Database::new(&config)
        .await
        .expect("Failed to create database");
    Arc::new(LibSqlBackend::new(db))
}

pub fn upload_store(dir: &Path) -> UploadStore {
    UploadStore::new(&UploadConfig {
        dir: dir.join("uploads").to_string_lossy().to_string(),
        max_file_size: 5 * 1024 * 1024,
    })
}

pub async fn handler(
    config: &RecognitionConfig,
    dir: &Path,
) -> (RecognitionHandler, Arc<dyn DatabaseBackend>) {
    let library = library(dir).await;
    let handler = RecognitionHandler::new(
        Arc::new(ProviderRegistry::from_config(config)),
        upload_store(dir),
        library.clone(),
        ImageLimits::from(config),
    );
    (handler, library)
}
