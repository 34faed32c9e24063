use std::time::Duration;

use tracing::{debug, info, warn};

use crate::config::RecognitionConfig;
use crate::error::{CoverscanError, Result};
use crate::models::RecognitionResult;

use super::api::{ClaudeVisionClient, OpenAiVisionClient};
use super::local::OllamaVisionClient;
use super::normalizer::normalize_with_tier;
use super::preprocessing::PreparedImage;

#[derive(Clone)]
enum RecognitionBackend {
    OpenAi(OpenAiVisionClient),
    Claude(ClaudeVisionClient),
    Local(OllamaVisionClient),
    Unavailable { reason: String },
}

/// One recognition backend behind the common `recognize` contract.
///
/// Adapters only fetch raw reply text; every reply goes through the
/// normalizer here so no adapter parses output on its own.
#[derive(Clone)]
pub struct RecognitionProvider {
    id: &'static str,
    backend: RecognitionBackend,
    timeout: Duration,
}

impl RecognitionProvider {
    pub fn openai(config: &RecognitionConfig) -> Self {
        let backend = match OpenAiVisionClient::new(config) {
            Ok(client) => {
                info!(model = %config.openai.model, "OpenAI vision backend initialized");
                RecognitionBackend::OpenAi(client)
            }
            Err(e) => unavailable("openai", e),
        };
        Self::with_backend("openai", backend, config)
    }

    pub fn claude(config: &RecognitionConfig) -> Self {
        let backend = match ClaudeVisionClient::new(config) {
            Ok(client) => {
                info!(model = %config.claude.model, "Claude vision backend initialized");
                RecognitionBackend::Claude(client)
            }
            Err(e) => unavailable("claude", e),
        };
        Self::with_backend("claude", backend, config)
    }

    /// A model served by the local inference runtime.
    pub fn local(id: &'static str, model: &str, config: &RecognitionConfig) -> Self {
        let backend = match OllamaVisionClient::new(config, model) {
            Ok(client) => {
                info!(provider = id, model, base_url = %config.local.base_url, "Local vision backend initialized");
                RecognitionBackend::Local(client)
            }
            Err(e) => unavailable(id, e),
        };
        Self::with_backend(id, backend, config)
    }

    pub fn unavailable(id: &'static str, reason: impl Into<String>) -> Self {
        Self {
            id,
            backend: RecognitionBackend::Unavailable {
                reason: reason.into(),
            },
            timeout: Duration::from_secs(RecognitionConfig::default().timeout_secs),
        }
    }

    fn with_backend(id: &'static str, backend: RecognitionBackend, config: &RecognitionConfig) -> Self {
        Self {
            id,
            backend,
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    pub fn id(&self) -> &'static str {
        self.id
    }

    pub fn kind(&self) -> &'static str {
        match &self.backend {
            RecognitionBackend::OpenAi(_) | RecognitionBackend::Claude(_) => "remote",
            RecognitionBackend::Local(_) => "local",
            RecognitionBackend::Unavailable { .. } => "unavailable",
        }
    }

    pub fn is_available(&self) -> bool {
        !matches!(self.backend, RecognitionBackend::Unavailable { .. })
    }

    /// Reason the backend could not be initialized, if any.
    pub fn unavailable_reason(&self) -> Option<&str> {
        match &self.backend {
            RecognitionBackend::Unavailable { reason } => Some(reason),
            _ => None,
        }
    }

    /// Recognize a prepared cover image. Fails only with provider faults;
    /// malformed replies come back as low-confidence results.
    pub async fn recognize(&self, image: &PreparedImage) -> Result<RecognitionResult> {
        let raw = match tokio::time::timeout(self.timeout, self.describe(image)).await {
            Ok(inner) => inner?,
            Err(_) => {
                return Err(CoverscanError::ProviderTransport(format!(
                    "{} timed out after {} seconds",
                    self.id,
                    self.timeout.as_secs()
                )))
            }
        };

        let (result, tier) = normalize_with_tier(&raw, None);
        debug!(
            provider = self.id,
            tier = tier.as_str(),
            reply_len = raw.len(),
            confidence = result.confidence,
            "Normalized provider reply"
        );

        Ok(result)
    }

    async fn describe(&self, image: &PreparedImage) -> Result<String> {
        match &self.backend {
            RecognitionBackend::OpenAi(client) => client.describe(image).await,
            RecognitionBackend::Claude(client) => client.describe(image).await,
            RecognitionBackend::Local(client) => client.describe(image).await,
            RecognitionBackend::Unavailable { reason } => {
                Err(CoverscanError::ProviderUnavailable(reason.clone()))
            }
        }
    }
}

impl std::fmt::Debug for RecognitionProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecognitionProvider")
            .field("id", &self.id)
            .field("kind", &self.kind())
            .field("timeout", &self.timeout)
            .finish()
    }
}

fn unavailable(id: &'static str, error: CoverscanError) -> RecognitionBackend {
    let reason = format!("{id} backend unavailable: {error}");
    warn!("{}", reason);
    RecognitionBackend::Unavailable { reason }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{UNKNOWN_AUTHOR, UNKNOWN_TITLE};
    use crate::recognition::normalizer::{LABELED_LINE_CONFIDENCE, STRUCTURED_CONFIDENCE};
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn image() -> PreparedImage {
        PreparedImage {
            bytes: vec![1, 2, 3],
            media_type: "image/png",
        }
    }

    #[test]
    fn test_remote_provider_without_key_is_unavailable() {
        let config = RecognitionConfig::default();
        let provider = RecognitionProvider::openai(&config);
        assert!(!provider.is_available());
        assert_eq!(provider.kind(), "unavailable");
        assert!(provider.unavailable_reason().unwrap().contains("API key"));
    }

    #[tokio::test]
    async fn test_unavailable_provider_returns_error() {
        let provider = RecognitionProvider::unavailable("claude", "Test unavailable");
        let result = provider.recognize(&image()).await;
        assert!(matches!(result, Err(CoverscanError::ProviderUnavailable(_))));
    }

    #[tokio::test]
    async fn test_openai_reply_is_normalized() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"content": "```json\n{\"title\": \"Dune\", \"author\": \"Frank Herbert\"}\n```"}}]
            })))
            .mount(&mock_server)
            .await;

        let mut config = RecognitionConfig::default();
        config.openai.api_key = Some("key".to_string());
        config.openai.base_url = Some(mock_server.uri());

        let provider = RecognitionProvider::openai(&config);
        assert_eq!(provider.kind(), "remote");

        let result = provider.recognize(&image()).await.unwrap();
        assert_eq!(result.title, "Dune");
        assert_eq!(result.author, "Frank Herbert");
        assert_eq!(result.confidence, STRUCTURED_CONFIDENCE);
    }

    #[tokio::test]
    async fn test_local_reply_is_normalized() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "response": "Title: Dracula"
            })))
            .mount(&mock_server)
            .await;

        let mut config = RecognitionConfig::default();
        config.local.base_url = mock_server.uri();

        let provider = RecognitionProvider::local("moondream", "moondream", &config);
        assert_eq!(provider.kind(), "local");

        let result = provider.recognize(&image()).await.unwrap();
        assert_eq!(result.title, "Dracula");
        assert_eq!(result.author, UNKNOWN_AUTHOR);
        assert_eq!(result.confidence, LABELED_LINE_CONFIDENCE);
    }

    #[tokio::test]
    async fn test_slow_provider_times_out() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"response": "late"}))
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&mock_server)
            .await;

        let mut config = RecognitionConfig::default();
        config.local.base_url = mock_server.uri();
        config.timeout_secs = 1;

        let provider = RecognitionProvider::local("llama", "llama3.2-vision", &config);
        let result = provider.recognize(&image()).await;
        assert!(result.is_err());
        assert!(result.unwrap_err().is_provider_fault());
    }

    #[tokio::test]
    async fn test_empty_reply_is_unknown_not_error() {
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .mount(&mock_server)
            .await;

        let mut config = RecognitionConfig::default();
        config.local.base_url = mock_server.uri();

        let provider = RecognitionProvider::local("llama", "llama3.2-vision", &config);
        let result = provider.recognize(&image()).await.unwrap();
        assert_eq!(result.title, UNKNOWN_TITLE);
    }
}
