use base64::{engine::general_purpose::STANDARD, Engine};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::{RecognitionConfig, RemoteProviderConfig};
use crate::error::{CoverscanError, Result};

use super::preprocessing::PreparedImage;
use super::prompts::{COVER_PROMPT, MAX_REPLY_TOKENS};

const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const CLAUDE_BASE_URL: &str = "https://api.anthropic.com/v1";
const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Clone, Debug)]
pub struct OpenAiVisionClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    max_retries: u32,
}

#[derive(Clone, Debug)]
pub struct ClaudeVisionClient {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
    max_retries: u32,
}

// OpenAI chat completions wire format

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: Vec<ContentPart>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type")]
enum ContentPart {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "image_url")]
    ImageUrl { image_url: ImageUrl },
}

#[derive(Debug, Serialize)]
struct ImageUrl {
    url: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Debug, Deserialize)]
struct ChatMessageResponse {
    #[serde(default)]
    content: Option<String>,
}

// Anthropic messages wire format

#[derive(Debug, Serialize)]
struct ClaudeRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<ClaudeMessage>,
}

#[derive(Debug, Serialize)]
struct ClaudeMessage {
    role: String,
    content: Vec<ClaudeContent>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ClaudeContent {
    Image { source: ClaudeImageSource },
    Text { text: String },
}

#[derive(Debug, Serialize)]
struct ClaudeImageSource {
    #[serde(rename = "type")]
    kind: String,
    media_type: String,
    data: String,
}

#[derive(Debug, Deserialize)]
struct ClaudeResponse {
    #[serde(default)]
    content: Vec<ClaudeResponseBlock>,
}

#[derive(Debug, Deserialize)]
struct ClaudeResponseBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

fn build_http_client(provider: &str, timeout_secs: u64) -> Result<Client> {
    Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
        .map_err(|e| {
            CoverscanError::Internal(format!("Failed to create HTTP client for {provider}: {e}"))
        })
}

fn required_api_key(provider: &str, config: &RemoteProviderConfig) -> Result<String> {
    config.api_key.clone().ok_or_else(|| {
        CoverscanError::ProviderUnavailable(format!("API key required for {provider}"))
    })
}

impl OpenAiVisionClient {
    pub fn new(config: &RecognitionConfig) -> Result<Self> {
        let api_key = required_api_key("OpenAI", &config.openai)?;

        let base_url = config
            .openai
            .base_url
            .clone()
            .unwrap_or_else(|| OPENAI_BASE_URL.to_string());

        Ok(Self {
            client: build_http_client("OpenAI", config.timeout_secs)?,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: config.openai.model.clone(),
            max_retries: config.max_retries,
        })
    }

    /// Ask the model to read the cover and return its raw text reply.
    pub async fn describe(&self, image: &PreparedImage) -> Result<String> {
        let data_url = format!(
            "data:{};base64,{}",
            image.media_type,
            STANDARD.encode(&image.bytes)
        );

        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: vec![
                    ContentPart::Text {
                        text: COVER_PROMPT.to_string(),
                    },
                    ContentPart::ImageUrl {
                        image_url: ImageUrl { url: data_url },
                    },
                ],
            }],
            max_tokens: MAX_REPLY_TOKENS,
        };

        let response = send_with_retry("OpenAI", self.max_retries, || {
            self.client
                .post(format!("{}/chat/completions", self.base_url))
                .header("Authorization", format!("Bearer {}", self.api_key))
                .json(&request)
        })
        .await?;

        let chat_response: ChatResponse = response.json().await.map_err(|e| {
            CoverscanError::ProviderTransport(format!("Failed to decode OpenAI response: {e}"))
        })?;

        let text = chat_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .unwrap_or_default();

        if text.trim().is_empty() {
            tracing::debug!(provider = "openai", "Provider reply contained no text");
        }

        Ok(text)
    }
}

impl ClaudeVisionClient {
    pub fn new(config: &RecognitionConfig) -> Result<Self> {
        let api_key = required_api_key("Claude", &config.claude)?;

        let base_url = config
            .claude
            .base_url
            .clone()
            .unwrap_or_else(|| CLAUDE_BASE_URL.to_string());

        Ok(Self {
            client: build_http_client("Claude", config.timeout_secs)?,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            model: config.claude.model.clone(),
            max_retries: config.max_retries,
        })
    }

    pub async fn describe(&self, image: &PreparedImage) -> Result<String> {
        let request = ClaudeRequest {
            model: self.model.clone(),
            max_tokens: MAX_REPLY_TOKENS,
            messages: vec![ClaudeMessage {
                role: "user".to_string(),
                content: vec![
                    ClaudeContent::Image {
                        source: ClaudeImageSource {
                            kind: "base64".to_string(),
                            media_type: image.media_type.to_string(),
                            data: STANDARD.encode(&image.bytes),
                        },
                    },
                    ClaudeContent::Text {
                        text: COVER_PROMPT.to_string(),
                    },
                ],
            }],
        };

        let response = send_with_retry("Claude", self.max_retries, || {
            self.client
                .post(format!("{}/messages", self.base_url))
                .header("x-api-key", &self.api_key)
                .header("anthropic-version", ANTHROPIC_VERSION)
                .json(&request)
        })
        .await?;

        let claude_response: ClaudeResponse = response.json().await.map_err(|e| {
            CoverscanError::ProviderTransport(format!("Failed to decode Claude response: {e}"))
        })?;

        let text = claude_response
            .content
            .into_iter()
            .filter(|block| block.kind == "text")
            .filter_map(|block| block.text)
            .collect::<Vec<_>>()
            .join("\n");

        if text.trim().is_empty() {
            tracing::debug!(provider = "claude", "Provider reply contained no text");
        }

        Ok(text)
    }
}

/// Send a request, retrying rate limits, server errors and transport failures
/// with exponential backoff.
async fn send_with_retry<F>(provider: &str, max_retries: u32, build: F) -> Result<Response>
where
    F: Fn() -> RequestBuilder,
{
    let mut retries = 0;

    loop {
        match build().send().await {
            Ok(resp) => {
                let status = resp.status();
                if status.is_success() {
                    return Ok(resp);
                }

                if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
                    return Err(CoverscanError::ProviderAuth(format!(
                        "{provider} rejected the credentials: {status}"
                    )));
                }

                let retryable =
                    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error();
                if retryable && retries < max_retries {
                    retries += 1;
                    tracing::debug!(provider, %status, attempt = retries, "Retrying provider request");
                    backoff(retries).await;
                    continue;
                }

                let body = resp.text().await.unwrap_or_default();
                return Err(CoverscanError::ProviderTransport(format!(
                    "{provider} request failed: {status} - {body}"
                )));
            }
            Err(e) => {
                if retries < max_retries {
                    retries += 1;
                    tracing::debug!(provider, error = %e, attempt = retries, "Retrying provider request");
                    backoff(retries).await;
                    continue;
                }
                return Err(CoverscanError::ProviderTransport(format!(
                    "{provider} request failed after {max_retries} retries: {e}"
                )));
            }
        }
    }
}

async fn backoff(attempt: u32) {
    let delay = Duration::from_millis(100 * 2_u64.pow(attempt - 1));
    tokio::time::sleep(delay).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(base_url: Option<String>) -> RecognitionConfig {
        let mut config = RecognitionConfig {
            timeout_secs: 5,
            max_retries: 2,
            ..RecognitionConfig::default()
        };
        config.openai.api_key = Some("test-key".to_string());
        config.openai.base_url = base_url.clone();
        config.claude.api_key = Some("test-key".to_string());
        config.claude.base_url = base_url;
        config
    }

    fn image() -> PreparedImage {
        PreparedImage {
            bytes: vec![0xFF, 0xD8, 0xFF, 0xE0],
            media_type: "image/jpeg",
        }
    }

    #[test]
    fn test_openai_client_requires_api_key() {
        let mut config = test_config(None);
        config.openai.api_key = None;
        let result = OpenAiVisionClient::new(&config);
        assert!(matches!(result, Err(CoverscanError::ProviderUnavailable(msg)) if msg.contains("API key required")));
    }

    #[test]
    fn test_claude_client_requires_api_key() {
        let mut config = test_config(None);
        config.claude.api_key = None;
        assert!(ClaudeVisionClient::new(&config).is_err());
    }

    #[test]
    fn test_default_base_urls() {
        let config = test_config(None);
        let openai = OpenAiVisionClient::new(&config).unwrap();
        assert!(openai.base_url.contains("openai"));
        let claude = ClaudeVisionClient::new(&config).unwrap();
        assert!(claude.base_url.contains("anthropic"));
    }

    #[test]
    fn test_custom_base_url_trailing_slash_trimmed() {
        let config = test_config(Some("https://proxy.example.com/v1/".to_string()));
        let client = OpenAiVisionClient::new(&config).unwrap();
        assert_eq!(client.base_url, "https://proxy.example.com/v1");
    }

    #[tokio::test]
    async fn test_openai_sends_data_url_and_returns_text() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .and(header("Authorization", "Bearer test-key"))
            .and(body_string_contains("data:image/jpeg;base64,/9j/4A=="))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"role": "assistant", "content": "{\"title\":\"Dune\"}"}}]
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = OpenAiVisionClient::new(&test_config(Some(mock_server.uri()))).unwrap();
        let text = client.describe(&image()).await.unwrap();
        assert_eq!(text, "{\"title\":\"Dune\"}");
    }

    #[tokio::test]
    async fn test_claude_sends_version_header_and_joins_text_blocks() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/messages"))
            .and(header("x-api-key", "test-key"))
            .and(header("anthropic-version", ANTHROPIC_VERSION))
            .and(body_string_contains("\"media_type\":\"image/jpeg\""))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "content": [
                    {"type": "text", "text": "Title: Dune"},
                    {"type": "text", "text": "Author: Frank Herbert"}
                ]
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = ClaudeVisionClient::new(&test_config(Some(mock_server.uri()))).unwrap();
        let text = client.describe(&image()).await.unwrap();
        assert_eq!(text, "Title: Dune\nAuthor: Frank Herbert");
    }

    #[tokio::test]
    async fn test_server_errors_are_retried_then_surface_as_transport_error() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(ResponseTemplate::new(503))
            .expect(3)
            .mount(&mock_server)
            .await;

        let client = OpenAiVisionClient::new(&test_config(Some(mock_server.uri()))).unwrap();
        let result = client.describe(&image()).await;
        assert!(matches!(result, Err(CoverscanError::ProviderTransport(_))));
    }

    #[tokio::test]
    async fn test_unauthorized_is_not_retried() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/messages"))
            .respond_with(ResponseTemplate::new(401))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = ClaudeVisionClient::new(&test_config(Some(mock_server.uri()))).unwrap();
        let result = client.describe(&image()).await;
        assert!(matches!(result, Err(CoverscanError::ProviderAuth(_))));
    }

    #[tokio::test]
    async fn test_empty_choices_yield_empty_text() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/chat/completions"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(serde_json::json!({"choices": []})),
            )
            .mount(&mock_server)
            .await;

        let client = OpenAiVisionClient::new(&test_config(Some(mock_server.uri()))).unwrap();
        assert_eq!(client.describe(&image()).await.unwrap(), "");
    }
}
