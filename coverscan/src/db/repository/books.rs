use chrono::{DateTime, Utc};
use libsql::{params, Connection};

use crate::error::Result;
use crate::models::{LibraryEntry, LibraryEntryUpdate, NewLibraryEntry};

const BOOK_COLUMNS: &str =
    "id, title, author, cover_image_path, provider_id, confidence, created_at, is_confirmed";

pub struct BookRepository;

impl BookRepository {
    pub async fn create(conn: &Connection, entry: &LibraryEntry) -> Result<()> {
        conn.execute(
            r#"
            INSERT INTO books (
                id, title, author, cover_image_path, provider_id, confidence,
                created_at, is_confirmed
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                entry.id.clone(),
                entry.title.clone(),
                entry.author.clone(),
                entry.cover_image_path.clone(),
                entry.provider_id.clone(),
                entry.confidence.map(f64::from),
                entry.created_at.to_rfc3339(),
                i64::from(entry.is_confirmed),
            ],
        )
        .await?;

        Ok(())
    }

    /// Insert a new entry, assigning its id and creation time.
    pub async fn insert_new(conn: &Connection, entry: NewLibraryEntry) -> Result<LibraryEntry> {
        let entry = entry.into_entry(nanoid::nanoid!(), Utc::now());
        Self::create(conn, &entry).await?;
        Ok(entry)
    }

    /// Insert several entries in one transaction. Either all rows land or none.
    pub async fn insert_many(
        conn: &Connection,
        entries: Vec<NewLibraryEntry>,
    ) -> Result<Vec<LibraryEntry>> {
        let tx = conn.transaction().await?;
        let mut created = Vec::with_capacity(entries.len());
        for entry in entries {
            match Self::insert_new(&tx, entry).await {
                Ok(entry) => created.push(entry),
                Err(e) => {
                    tx.rollback().await?;
                    return Err(e);
                }
            }
        }
        tx.commit().await?;
        Ok(created)
    }

    pub async fn get_by_id(conn: &Connection, id: &str) -> Result<Option<LibraryEntry>> {
        let mut rows = conn
            .query(
                &format!("SELECT {BOOK_COLUMNS} FROM books WHERE id = ?1"),
                params![id],
            )
            .await?;

        if let Some(row) = rows.next().await? {
            Ok(Some(Self::row_to_entry(&row)?))
        } else {
            Ok(None)
        }
    }

    pub async fn list(conn: &Connection) -> Result<Vec<LibraryEntry>> {
        let mut rows = conn
            .query(
                &format!("SELECT {BOOK_COLUMNS} FROM books ORDER BY created_at DESC, rowid DESC"),
                (),
            )
            .await?;

        let mut entries = Vec::new();
        while let Some(row) = rows.next().await? {
            entries.push(Self::row_to_entry(&row)?);
        }
        Ok(entries)
    }

    pub async fn update(
        conn: &Connection,
        id: &str,
        update: &LibraryEntryUpdate,
    ) -> Result<Option<LibraryEntry>> {
        let rows_affected = conn
            .execute(
                r#"
                UPDATE books SET
                    title = COALESCE(?2, title),
                    author = COALESCE(?3, author),
                    is_confirmed = COALESCE(?4, is_confirmed)
                WHERE id = ?1
                "#,
                params![
                    id,
                    update.title.clone(),
                    update.author.clone(),
                    update.is_confirmed.map(i64::from),
                ],
            )
            .await?;

        if rows_affected == 0 {
            return Ok(None);
        }
        Self::get_by_id(conn, id).await
    }

    pub async fn delete(conn: &Connection, id: &str) -> Result<bool> {
        let rows_affected = conn
            .execute("DELETE FROM books WHERE id = ?1", params![id])
            .await?;

        Ok(rows_affected > 0)
    }

    fn row_to_entry(row: &libsql::Row) -> Result<LibraryEntry> {
        Ok(LibraryEntry {
            id: row.get(0)?,
            title: row.get(1)?,
            author: row.get(2)?,
            cover_image_path: row.get(3)?,
            provider_id: row.get(4)?,
            confidence: row.get::<Option<f64>>(5)?.map(|c| c as f32),
            created_at: DateTime::parse_from_rfc3339(&row.get::<String>(6)?)
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now()),
            is_confirmed: row.get::<i64>(7)? != 0,
        })
    }
}
