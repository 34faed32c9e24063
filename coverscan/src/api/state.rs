use std::sync::Arc;

use crate::config::Config;
use crate::db::DatabaseBackend;
use crate::recognition::{ImageLimits, ProviderRegistry, RecognitionHandler};
use crate::storage::UploadStore;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub db: Arc<dyn DatabaseBackend>,
    /// Read-only after startup.
    pub registry: Arc<ProviderRegistry>,
    pub uploads: UploadStore,
    pub recognition: RecognitionHandler,
}

impl AppState {
    pub fn new(config: Config, db: Arc<dyn DatabaseBackend>, registry: ProviderRegistry) -> Self {
        let config = Arc::new(config);
        let registry = Arc::new(registry);
        let uploads = UploadStore::new(&config.uploads);
        let recognition = RecognitionHandler::new(
            registry.clone(),
            uploads.clone(),
            db.clone(),
            ImageLimits::from(&config.recognition),
        );

        Self {
            config,
            db,
            registry,
            uploads,
            recognition,
        }
    }
}
