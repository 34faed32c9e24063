use libsql::{Builder, Connection};
use std::sync::Arc;

use crate::config::DatabaseConfig;
use crate::error::Result;

use super::schema;

/// SQLite pragmas applied once per database handle.
#[derive(Debug, Clone)]
struct Pragmas {
    busy_timeout_ms: u64,
    journal_mode: &'static str,
    synchronous: &'static str,
}

impl Pragmas {
    fn from_env() -> Self {
        Self {
            busy_timeout_ms: std::env::var("DATABASE_BUSY_TIMEOUT_MS")
                .ok()
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(5000),
            journal_mode: normalize_journal_mode(
                &std::env::var("DATABASE_JOURNAL_MODE").unwrap_or_default(),
            ),
            synchronous: normalize_synchronous(
                &std::env::var("DATABASE_SYNCHRONOUS").unwrap_or_default(),
            ),
        }
    }

    fn statements(&self) -> [(&'static str, String); 3] {
        [
            ("busy_timeout", self.busy_timeout_ms.to_string()),
            ("journal_mode", self.journal_mode.to_string()),
            ("synchronous", self.synchronous.to_string()),
        ]
    }
}

#[derive(Clone)]
pub struct Database {
    db: Arc<libsql::Database>,
    pragmas: Pragmas,
}

impl Database {
    /// Open (or create) the library database and make sure the schema exists.
    ///
    /// `libsql://` and `https://` URLs open a remote database, as an embedded
    /// replica when `local_path` is set; `:memory:` and `file:` URLs stay local.
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        let token = config.auth_token.clone().unwrap_or_default();

        let db = if config.url.starts_with("libsql://") || config.url.starts_with("https://") {
            match config.local_path {
                Some(ref local_path) => {
                    Builder::new_remote_replica(local_path, config.url.clone(), token)
                        .build()
                        .await?
                }
                None => Builder::new_remote(config.url.clone(), token).build().await?,
            }
        } else {
            let path = config.url.strip_prefix("file:").unwrap_or(&config.url);
            Builder::new_local(path).build().await?
        };

        let database = Self {
            db: Arc::new(db),
            pragmas: Pragmas::from_env(),
        };
        database.configure().await;
        schema::init_schema(&database.connect()?).await?;

        tracing::info!(url = %redact_url(&config.url), "Library database ready");
        Ok(database)
    }

    pub fn connect(&self) -> Result<Connection> {
        Ok(self.db.connect()?)
    }

    async fn configure(&self) {
        let conn = match self.connect() {
            Ok(conn) => conn,
            Err(error) => {
                tracing::warn!(error = %error, "Failed to open connection for pragmas");
                return;
            }
        };

        for (name, value) in self.pragmas.statements() {
            let sql = format!("PRAGMA {name} = {value}");
            if let Err(error) = conn.execute_batch(&sql).await {
                tracing::warn!(pragma = name, value = %value, error = %error, "Failed to set SQLite pragma");
            }
        }
    }

    pub async fn sync(&self) -> Result<()> {
        if let Ok(sync) = self.db.sync().await {
            tracing::info!("Database synced: {:?}", sync);
        }
        Ok(())
    }
}

fn redact_url(url: &str) -> &str {
    url.split('?').next().unwrap_or(url)
}

fn normalize_journal_mode(value: &str) -> &'static str {
    match value.trim().to_uppercase().as_str() {
        "DELETE" => "DELETE",
        "TRUNCATE" => "TRUNCATE",
        "PERSIST" => "PERSIST",
        "MEMORY" => "MEMORY",
        "OFF" => "OFF",
        _ => "WAL",
    }
}

fn normalize_synchronous(value: &str) -> &'static str {
    match value.trim().to_uppercase().as_str() {
        "OFF" => "OFF",
        "FULL" => "FULL",
        "EXTRA" => "EXTRA",
        _ => "NORMAL",
    }
}
