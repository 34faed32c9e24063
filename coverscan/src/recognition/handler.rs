use std::sync::Arc;

use futures::future::join_all;
use tracing::{error, info, warn};

use crate::db::DatabaseBackend;
use crate::error::{CoverscanError, Result};
use crate::models::{
    NewLibraryEntry, RecognitionRequest, RecognitionResult, DEGRADED_CONFIDENCE,
};
use crate::storage::UploadStore;

use super::preprocessing::{prepare_image, ImageLimits};
use super::provider::RecognitionProvider;
use super::registry::ProviderRegistry;

/// An image received in a multi-file form.
#[derive(Debug, Clone)]
pub struct UploadedImage {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Outcome of recognizing one uploaded cover.
#[derive(Debug, Clone)]
pub struct ProcessedCover {
    /// Id of the provisional library entry, absent if the upload was rejected.
    pub entry_id: Option<String>,
    pub cover_image_path: Option<String>,
    pub result: RecognitionResult,
}

/// Orchestrates recognition: provider lookup, image loading and
/// preparation, the provider call, and degrading per-image faults.
#[derive(Clone)]
pub struct RecognitionHandler {
    registry: Arc<ProviderRegistry>,
    uploads: UploadStore,
    library: Arc<dyn DatabaseBackend>,
    limits: ImageLimits,
}

impl RecognitionHandler {
    pub fn new(
        registry: Arc<ProviderRegistry>,
        uploads: UploadStore,
        library: Arc<dyn DatabaseBackend>,
        limits: ImageLimits,
    ) -> Self {
        Self {
            registry,
            uploads,
            library,
            limits,
        }
    }

    /// Recognize a single image. Only an unknown provider fails; every
    /// provider fault comes back as a degraded result.
    pub async fn process(&self, request: RecognitionRequest) -> Result<RecognitionResult> {
        let provider = self.registry.get_adapter(&request.provider_id)?;
        Ok(self.recognize_or_degrade(provider, request.image_bytes).await)
    }

    /// Recognize an image previously stored in the upload directory.
    pub async fn process_path(
        &self,
        image_path: &str,
        provider_id: &str,
    ) -> Result<RecognitionResult> {
        let provider = self.registry.get_adapter(provider_id)?;
        let bytes = self.uploads.read(image_path).await?;
        Ok(self.recognize_or_degrade(provider, bytes).await)
    }

    /// Recognize several images concurrently; results follow input order.
    pub async fn process_batch(
        &self,
        images: Vec<Vec<u8>>,
        provider_id: &str,
    ) -> Result<Vec<RecognitionResult>> {
        let provider = self.registry.get_adapter(provider_id)?;

        let results = join_all(
            images
                .into_iter()
                .map(|bytes| self.recognize_or_degrade(provider, bytes)),
        )
        .await;

        Ok(results)
    }

    /// Store, recognize and record each uploaded cover as a provisional
    /// library entry awaiting review. Entries are written in one atomic step
    /// after recognition; if that write fails, nothing is recorded and the
    /// stored images are removed.
    pub async fn process_uploads(
        &self,
        images: Vec<UploadedImage>,
        provider_id: &str,
    ) -> Result<Vec<ProcessedCover>> {
        let provider = self.registry.get_adapter(provider_id)?;
        let count = images.len();

        let mut covers = join_all(
            images
                .into_iter()
                .map(|image| self.store_and_recognize(provider, image)),
        )
        .await;

        let stored: Vec<usize> = covers
            .iter()
            .enumerate()
            .filter(|(_, c)| c.cover_image_path.is_some())
            .map(|(i, _)| i)
            .collect();
        let entries = stored
            .iter()
            .filter_map(|&i| {
                let cover = &covers[i];
                cover.cover_image_path.as_ref().map(|path| {
                    NewLibraryEntry::provisional(&cover.result, path.clone(), provider.id())
                })
            })
            .collect();

        match self.library.create_library_entries(entries).await {
            Ok(created) => {
                for (i, entry) in stored.into_iter().zip(created) {
                    covers[i].entry_id = Some(entry.id);
                }
            }
            Err(e) => {
                error!(provider = provider_id, count, error = %e, "Failed to record cover batch, discarding stored images");
                self.discard_uploads(&covers).await;
                return Err(e);
            }
        }

        let degraded = covers
            .iter()
            .filter(|c| c.result.confidence == DEGRADED_CONFIDENCE)
            .count();
        info!(provider = provider_id, count, degraded, "Processed cover batch");

        Ok(covers)
    }

    async fn store_and_recognize(
        &self,
        provider: &RecognitionProvider,
        image: UploadedImage,
    ) -> ProcessedCover {
        let cover_image_path = match self.uploads.save(&image.file_name, &image.bytes).await {
            Ok(path) => path,
            Err(e) => {
                warn!(file = %image.file_name, error = %e, "Upload rejected, skipping recognition");
                return ProcessedCover {
                    entry_id: None,
                    cover_image_path: None,
                    result: RecognitionResult::degraded(),
                };
            }
        };

        let result = self.recognize_or_degrade(provider, image.bytes).await;

        ProcessedCover {
            entry_id: None,
            cover_image_path: Some(cover_image_path),
            result,
        }
    }

    async fn discard_uploads(&self, covers: &[ProcessedCover]) {
        for path in covers.iter().filter_map(|c| c.cover_image_path.as_deref()) {
            let removed = match self.uploads.resolve(path) {
                Ok(file) => tokio::fs::remove_file(file).await.map_err(CoverscanError::from),
                Err(e) => Err(e),
            };
            if let Err(e) = removed {
                warn!(path, error = %e, "Failed to remove stored image");
            }
        }
    }

    async fn recognize_or_degrade(
        &self,
        provider: &RecognitionProvider,
        bytes: Vec<u8>,
    ) -> RecognitionResult {
        match self.recognize(provider, bytes).await {
            Ok(result) => result,
            Err(e @ CoverscanError::Image(_)) => {
                warn!(provider = provider.id(), error = %e, "Image could not be prepared, returning degraded result");
                RecognitionResult::degraded()
            }
            Err(e) if e.is_provider_fault() => {
                warn!(provider = provider.id(), error = %e, "Provider call failed, returning degraded result");
                RecognitionResult::degraded()
            }
            Err(e) => {
                error!(provider = provider.id(), error = %e, "Unexpected recognition failure, returning degraded result");
                RecognitionResult::degraded()
            }
        }
    }

    async fn recognize(
        &self,
        provider: &RecognitionProvider,
        bytes: Vec<u8>,
    ) -> Result<RecognitionResult> {
        let limits = self.limits;
        let prepared = tokio::task::spawn_blocking(move || prepare_image(&bytes, &limits))
            .await
            .map_err(|e| CoverscanError::Internal(format!("Image preparation panicked: {e}")))??;

        provider.recognize(&prepared).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{RecognitionConfig, UploadConfig};
    use crate::db::{LibSqlBackend, LibraryStore};
    use crate::models::{LibraryEntry, LibraryEntryUpdate};
    use async_trait::async_trait;
    use std::io::Cursor;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn png(width: u32, height: u32) -> Vec<u8> {
        let img = image::DynamicImage::ImageRgb8(image::RgbImage::from_pixel(
            width,
            height,
            image::Rgb([10, 20, 30]),
        ));
        let mut bytes = Vec::new();
        img.write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
            .unwrap();
        bytes
    }

    async fn handler_with(
        registry: ProviderRegistry,
        upload_dir: &std::path::Path,
    ) -> RecognitionHandler {
        let uploads = UploadStore::new(&UploadConfig {
            dir: upload_dir.to_string_lossy().to_string(),
            max_file_size: 1024 * 1024,
        });
        let library = Arc::new(LibSqlBackend::new(crate::db::test_database().await));
        RecognitionHandler::new(
            Arc::new(registry),
            uploads,
            library,
            ImageLimits::from(&RecognitionConfig::default()),
        )
    }

    /// Library whose batch write always fails after reaching the database.
    struct FailingBatchLibrary {
        inner: LibSqlBackend,
    }

    #[async_trait]
    impl LibraryStore for FailingBatchLibrary {
        async fn create_library_entry(&self, entry: NewLibraryEntry) -> Result<LibraryEntry> {
            self.inner.create_library_entry(entry).await
        }
        async fn create_library_entries(
            &self,
            _entries: Vec<NewLibraryEntry>,
        ) -> Result<Vec<LibraryEntry>> {
            Err(CoverscanError::Internal("disk full".to_string()))
        }
        async fn list_library_entries(&self) -> Result<Vec<LibraryEntry>> {
            self.inner.list_library_entries().await
        }
        async fn get_library_entry(&self, id: &str) -> Result<Option<LibraryEntry>> {
            self.inner.get_library_entry(id).await
        }
        async fn update_library_entry(
            &self,
            id: &str,
            update: &LibraryEntryUpdate,
        ) -> Result<Option<LibraryEntry>> {
            self.inner.update_library_entry(id, update).await
        }
        async fn delete_library_entry(&self, id: &str) -> Result<bool> {
            self.inner.delete_library_entry(id).await
        }
    }

    #[async_trait]
    impl DatabaseBackend for FailingBatchLibrary {
        async fn sync(&self) -> Result<()> {
            Ok(())
        }
    }

    async fn local_registry(mock_server: &MockServer) -> ProviderRegistry {
        let mut config = RecognitionConfig::default();
        config.local.base_url = mock_server.uri();
        ProviderRegistry::from_config(&config)
    }

    #[tokio::test]
    async fn test_unknown_provider_fails_before_io() {
        let dir = tempfile::tempdir().unwrap();
        let handler = handler_with(
            ProviderRegistry::from_config(&RecognitionConfig::default()),
            dir.path(),
        )
        .await;

        let result = handler
            .process_path("/uploads/does-not-exist.png", "gemini")
            .await;
        assert!(matches!(result, Err(CoverscanError::UnsupportedProvider(_))));

        let result = handler
            .process_uploads(
                vec![UploadedImage {
                    file_name: "a.png".into(),
                    bytes: png(64, 64),
                }],
                "gemini",
            )
            .await;
        assert!(matches!(result, Err(CoverscanError::UnsupportedProvider(_))));
        assert_eq!(std::fs::read_dir(dir.path()).map(|d| d.count()).unwrap_or(0), 0);
    }

    #[tokio::test]
    async fn test_unavailable_provider_degrades() {
        let dir = tempfile::tempdir().unwrap();
        let handler = handler_with(
            ProviderRegistry::from_config(&RecognitionConfig::default()),
            dir.path(),
        )
        .await;

        let result = handler
            .process(RecognitionRequest::new(png(64, 64), "openai"))
            .await
            .unwrap();
        assert!(result.is_unknown());
        assert_eq!(result.confidence, DEGRADED_CONFIDENCE);
    }

    #[tokio::test]
    async fn test_undecodable_image_degrades() {
        let mock_server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        let handler = handler_with(local_registry(&mock_server).await, dir.path()).await;

        let result = handler
            .process(RecognitionRequest::new(b"not an image".to_vec(), "llama"))
            .await
            .unwrap();
        assert!(result.is_unknown());
    }

    #[tokio::test]
    async fn test_missing_path_is_not_found() {
        let mock_server = MockServer::start().await;
        let dir = tempfile::tempdir().unwrap();
        let handler = handler_with(local_registry(&mock_server).await, dir.path()).await;

        let result = handler.process_path("/uploads/nope.png", "llama").await;
        assert!(matches!(result, Err(CoverscanError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_process_uploads_persists_provisional_entries() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "response": "{\"title\": \"Kindred\", \"author\": \"Octavia E. Butler\"}"
            })))
            .mount(&mock_server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let handler = handler_with(local_registry(&mock_server).await, dir.path()).await;

        let covers = handler
            .process_uploads(
                vec![
                    UploadedImage {
                        file_name: "kindred.png".into(),
                        bytes: png(64, 96),
                    },
                    UploadedImage {
                        file_name: "notes.txt".into(),
                        bytes: b"plain text".to_vec(),
                    },
                ],
                "moondream",
            )
            .await
            .unwrap();

        assert_eq!(covers.len(), 2);
        assert_eq!(covers[0].result.title, "Kindred");
        assert!(covers[0].entry_id.is_some());
        assert!(covers[0]
            .cover_image_path
            .as_deref()
            .unwrap()
            .ends_with("-kindred.png"));

        assert!(covers[1].entry_id.is_none());
        assert!(covers[1].result.is_unknown());

        let entries = handler.library.list_library_entries().await.unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].provider_id, "moondream");
        assert!(!entries[0].is_confirmed);
    }

    #[tokio::test]
    async fn test_process_batch_preserves_order() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "response": "Title: Same\nAuthor: Reply"
            })))
            .mount(&mock_server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let handler = handler_with(local_registry(&mock_server).await, dir.path()).await;

        let results = handler
            .process_batch(vec![png(64, 64), Vec::new(), png(40, 40)], "llama")
            .await
            .unwrap();

        assert_eq!(results.len(), 3);
        assert_eq!(results[0].title, "Same");
        assert!(results[1].is_unknown());
        assert_eq!(results[2].author, "Reply");
    }

    #[tokio::test]
    async fn test_failed_batch_write_leaves_nothing_behind() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "response": "Title: Beloved\nAuthor: Toni Morrison"
            })))
            .mount(&mock_server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let library = Arc::new(FailingBatchLibrary {
            inner: LibSqlBackend::new(crate::db::test_database().await),
        });
        let handler = RecognitionHandler::new(
            Arc::new(local_registry(&mock_server).await),
            UploadStore::new(&UploadConfig {
                dir: dir.path().to_string_lossy().to_string(),
                max_file_size: 1024 * 1024,
            }),
            library.clone(),
            ImageLimits::from(&RecognitionConfig::default()),
        );

        let result = handler
            .process_uploads(
                vec![
                    UploadedImage {
                        file_name: "a.png".into(),
                        bytes: png(64, 64),
                    },
                    UploadedImage {
                        file_name: "b.png".into(),
                        bytes: png(48, 72),
                    },
                ],
                "llama",
            )
            .await;

        assert!(matches!(result, Err(CoverscanError::Internal(_))));
        assert!(library.list_library_entries().await.unwrap().is_empty());
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_degraded_count_ignores_low_confidence_unknowns() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "response": "I cannot read this cover."
            })))
            .mount(&mock_server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let handler = handler_with(local_registry(&mock_server).await, dir.path()).await;

        let covers = handler
            .process_uploads(
                vec![UploadedImage {
                    file_name: "blurry.png".into(),
                    bytes: png(64, 64),
                }],
                "llama",
            )
            .await
            .unwrap();

        assert!(covers[0].result.is_unknown());
        assert_ne!(covers[0].result.confidence, DEGRADED_CONFIDENCE);
        assert!(covers[0].entry_id.is_some());
    }
}
