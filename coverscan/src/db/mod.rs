pub mod backends;
mod connection;
pub mod repository;
pub(crate) mod schema;
pub mod traits;

pub use backends::libsql::LibSqlBackend;
pub use connection::Database;
pub use traits::*;

/// Fresh file-backed database under the system temp dir, one per call.
#[cfg(test)]
pub(crate) async fn test_database() -> Database {
    let path = std::env::temp_dir().join(format!("coverscan_test_{}.db", nanoid::nanoid!()));
    let config = crate::config::DatabaseConfig {
        url: format!("file:{}", path.display()),
        auth_token: None,
        local_path: None,
    };
    Database::new(&config)
        .await
        .expect("Failed to create database")
}
