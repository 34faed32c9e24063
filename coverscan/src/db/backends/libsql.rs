use crate::db::connection::Database;
use crate::db::repository::BookRepository;
use crate::db::traits::{DatabaseBackend, LibraryStore};
use crate::error::Result;
use crate::models::{LibraryEntry, LibraryEntryUpdate, NewLibraryEntry};
use async_trait::async_trait;

pub struct LibSqlBackend {
    db: Database,
}

impl LibSqlBackend {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

#[async_trait]
impl LibraryStore for LibSqlBackend {
    async fn create_library_entry(&self, entry: NewLibraryEntry) -> Result<LibraryEntry> {
        let conn = self.db.connect()?;
        BookRepository::insert_new(&conn, entry).await
    }
    async fn create_library_entries(
        &self,
        entries: Vec<NewLibraryEntry>,
    ) -> Result<Vec<LibraryEntry>> {
        let conn = self.db.connect()?;
        BookRepository::insert_many(&conn, entries).await
    }
    async fn list_library_entries(&self) -> Result<Vec<LibraryEntry>> {
        let conn = self.db.connect()?;
        BookRepository::list(&conn).await
    }
    async fn get_library_entry(&self, id: &str) -> Result<Option<LibraryEntry>> {
        let conn = self.db.connect()?;
        BookRepository::get_by_id(&conn, id).await
    }
    async fn update_library_entry(
        &self,
        id: &str,
        update: &LibraryEntryUpdate,
    ) -> Result<Option<LibraryEntry>> {
        let conn = self.db.connect()?;
        BookRepository::update(&conn, id, update).await
    }
    async fn delete_library_entry(&self, id: &str) -> Result<bool> {
        let conn = self.db.connect()?;
        BookRepository::delete(&conn, id).await
    }
}

#[async_trait]
impl DatabaseBackend for LibSqlBackend {
    async fn sync(&self) -> Result<()> {
        self.db.sync().await
    }
}
