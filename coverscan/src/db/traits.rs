use async_trait::async_trait;

use crate::error::Result;
use crate::models::{LibraryEntry, LibraryEntryUpdate, NewLibraryEntry};

/// Create, read, update and delete operations over the personal library.
#[async_trait]
pub trait LibraryStore: Send + Sync {
    /// Persist a new entry; the store assigns `id` and `created_at`.
    async fn create_library_entry(&self, entry: NewLibraryEntry) -> Result<LibraryEntry>;
    /// Persist several entries atomically, in order. On error nothing is stored.
    async fn create_library_entries(
        &self,
        entries: Vec<NewLibraryEntry>,
    ) -> Result<Vec<LibraryEntry>>;
    /// All entries, newest first.
    async fn list_library_entries(&self) -> Result<Vec<LibraryEntry>>;
    async fn get_library_entry(&self, id: &str) -> Result<Option<LibraryEntry>>;
    /// Apply a partial update. Returns `None` when no entry has this id.
    async fn update_library_entry(
        &self,
        id: &str,
        update: &LibraryEntryUpdate,
    ) -> Result<Option<LibraryEntry>>;
    async fn delete_library_entry(&self, id: &str) -> Result<bool>;
}

/// A complete database backend: the library store plus lifecycle operations.
#[async_trait]
pub trait DatabaseBackend: LibraryStore {
    /// Sync with remote (e.g. Turso replication). No-op for local-only backends.
    async fn sync(&self) -> Result<()>;
}
