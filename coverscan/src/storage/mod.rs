//! On-disk storage for uploaded cover images.

mod uploads;

pub use uploads::{sanitize_file_name, UploadStore, PUBLIC_PREFIX};
