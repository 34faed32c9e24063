use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::config::UploadConfig;
use crate::error::{CoverscanError, Result};

/// Public URL prefix of stored covers; also the only accepted path form.
pub const PUBLIC_PREFIX: &str = "/uploads/";

const MAX_NAME_LEN: usize = 100;

/// Stores uploaded covers on disk and hands out stable public paths.
#[derive(Debug, Clone)]
pub struct UploadStore {
    root: PathBuf,
    max_file_size: usize,
}

impl UploadStore {
    pub fn new(config: &UploadConfig) -> Self {
        Self {
            root: PathBuf::from(&config.dir),
            max_file_size: config.max_file_size,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub async fn ensure_dir(&self) -> Result<()> {
        tokio::fs::create_dir_all(&self.root).await?;
        Ok(())
    }

    /// Validate and write an image, returning its public path
    /// (`/uploads/{unix_millis}-{short_id}-{name}`).
    pub async fn save(&self, file_name: &str, bytes: &[u8]) -> Result<String> {
        if bytes.is_empty() {
            return Err(CoverscanError::Upload("File is empty".to_string()));
        }
        if bytes.len() > self.max_file_size {
            return Err(CoverscanError::Upload(format!(
                "File too large: {} bytes (max {})",
                bytes.len(),
                self.max_file_size
            )));
        }
        if !infer::is_image(bytes) {
            return Err(CoverscanError::Upload(format!(
                "{file_name} is not a supported image"
            )));
        }

        let stored_name = format!(
            "{}-{}-{}",
            chrono::Utc::now().timestamp_millis(),
            nanoid::nanoid!(8),
            sanitize_file_name(file_name)
        );

        tokio::fs::create_dir_all(&self.root).await?;
        tokio::fs::write(self.root.join(&stored_name), bytes).await?;

        tracing::debug!(file = %stored_name, size = bytes.len(), "Stored cover image");
        Ok(format!("{PUBLIC_PREFIX}{stored_name}"))
    }

    pub async fn read(&self, public_path: &str) -> Result<Vec<u8>> {
        let path = self.resolve(public_path)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(CoverscanError::NotFound(format!(
                "Image {public_path} not found"
            ))),
            Err(e) => Err(e.into()),
        }
    }

    /// Map a public `/uploads/<file>` path onto the upload directory.
    pub fn resolve(&self, public_path: &str) -> Result<PathBuf> {
        let name = public_path.strip_prefix(PUBLIC_PREFIX).ok_or_else(|| {
            CoverscanError::Validation(format!("Image path must start with {PUBLIC_PREFIX}"))
        })?;

        if !is_plain_file_name(name) {
            return Err(CoverscanError::Validation(format!(
                "Invalid image path: {public_path}"
            )));
        }

        Ok(self.root.join(name))
    }
}

fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with('.')
        && !name.contains("..")
        && !name.contains(['/', '\\', '\0'])
}

/// Keep only ASCII letters, digits, `.` and `-` from the last path segment.
pub fn sanitize_file_name(file_name: &str) -> String {
    let base = file_name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(file_name);

    let cleaned: String = base
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-'))
        .take(MAX_NAME_LEN)
        .collect();
    let cleaned = cleaned.trim_start_matches('.');

    if cleaned.is_empty() {
        "cover".to_string()
    } else {
        cleaned.replace("..", ".")
    }
}
