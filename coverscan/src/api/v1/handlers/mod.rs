pub mod books;
pub(crate) mod health;
pub mod providers;
pub mod recognition;
pub mod uploads;

pub use health::health_check;

use crate::error::CoverscanError;

/// Flatten `validator` errors into one client-facing message.
pub(crate) fn validation_error(errors: validator::ValidationErrors) -> CoverscanError {
    let mut fields: Vec<_> = errors
        .field_errors()
        .into_keys()
        .map(|field| field.to_string())
        .collect();
    fields.sort();
    CoverscanError::Validation(format!("Invalid or missing fields: {}", fields.join(", ")))
}
