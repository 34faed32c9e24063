use libsql::Connection;

use crate::error::Result;

pub async fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        -- Library entries, provisional until the user confirms them
        CREATE TABLE IF NOT EXISTS books (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            author TEXT NOT NULL,
            cover_image_path TEXT NOT NULL,
            provider_id TEXT NOT NULL,
            confidence REAL,
            created_at TEXT NOT NULL,
            is_confirmed INTEGER NOT NULL DEFAULT 0
        );

        CREATE INDEX IF NOT EXISTS idx_books_created_at ON books(created_at);
        CREATE INDEX IF NOT EXISTS idx_books_is_confirmed ON books(is_confirmed);
        "#,
    )
    .await?;

    Ok(())
}
