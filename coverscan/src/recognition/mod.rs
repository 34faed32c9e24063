//! Cover recognition
//!
//! Turns a cover image and a provider id into a canonical
//! [`RecognitionResult`](crate::models::RecognitionResult).
//!
//! # Architecture
//!
//! - [`ProviderRegistry`] maps provider ids to [`RecognitionProvider`]s. It is
//!   built once at startup and never mutated.
//! - [`RecognitionProvider`] is a closed set of backends (OpenAI, Claude, a
//!   local Ollama runtime, or unavailable) behind one `recognize` call.
//! - Adapters in `api` and `local` only fetch raw reply text; the
//!   [`normalizer`] turns every reply into a result.
//! - [`RecognitionHandler`] resolves the provider, prepares the image and
//!   degrades per-image provider faults instead of failing a batch.
//!
//! # Usage
//!
//! ```rust,ignore
//! let registry = Arc::new(ProviderRegistry::from_config(&config.recognition));
//! let handler = RecognitionHandler::new(registry, uploads, library, limits);
//! let result = handler.process(RecognitionRequest::new(bytes, "claude")).await?;
//! ```

mod api;
mod handler;
mod local;
pub mod normalizer;
mod preprocessing;
mod prompts;
mod provider;
mod registry;

pub use handler::{ProcessedCover, RecognitionHandler, UploadedImage};
pub use normalizer::{normalize, ExtractionTier};
pub use preprocessing::{prepare_image, ImageLimits, PreparedImage};
pub use provider::RecognitionProvider;
pub use registry::{ProviderRegistry, PROVIDER_DESCRIPTORS};
