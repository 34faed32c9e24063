use serde::Deserialize;
use std::env;

fn parse_env_or<T: std::str::FromStr>(var: &str, default: T) -> T
where
    T::Err: std::fmt::Display,
{
    match env::var(var) {
        Ok(val) => match val.parse() {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::warn!("Invalid value '{}' for {}: {}. Using default.", val, var, e);
                default
            }
        },
        Err(_) => default,
    }
}

/// Read an optional string variable, treating blank values as unset.
fn env_opt(var: &str) -> Option<String> {
    env::var(var)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub uploads: UploadConfig,
    pub recognition: RecognitionConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub api_keys: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub auth_token: Option<String>,
    pub local_path: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UploadConfig {
    pub dir: String,
    pub max_file_size: usize,
}

/// Settings shared by every recognition provider plus per-provider credentials.
#[derive(Debug, Clone, Deserialize)]
pub struct RecognitionConfig {
    /// Upper bound for a single adapter invocation, network round trip included.
    pub timeout_secs: u64,
    pub max_retries: u32,
    pub max_image_dimension: u32,
    pub min_image_dimension: u32,
    pub openai: RemoteProviderConfig,
    pub claude: RemoteProviderConfig,
    pub local: LocalRuntimeConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RemoteProviderConfig {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub model: String,
}

/// Locally hosted inference runtime (Ollama-compatible HTTP API).
#[derive(Debug, Clone, Deserialize)]
pub struct LocalRuntimeConfig {
    pub base_url: String,
    pub llama_model: String,
    pub moondream_model: String,
}

impl Default for RecognitionConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 60,
            max_retries: 3,
            max_image_dimension: 2048,
            min_image_dimension: 32,
            openai: RemoteProviderConfig {
                api_key: None,
                base_url: None,
                model: "gpt-4o".to_string(),
            },
            claude: RemoteProviderConfig {
                api_key: None,
                base_url: None,
                model: "claude-3-opus-20240229".to_string(),
            },
            local: LocalRuntimeConfig::default(),
        }
    }
}

impl Default for LocalRuntimeConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            llama_model: "llama3.2-vision".to_string(),
            moondream_model: "moondream".to_string(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let defaults = RecognitionConfig::default();

        Self {
            server: ServerConfig {
                host: env::var("COVERSCAN_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
                port: parse_env_or("COVERSCAN_PORT", 3000),
                api_keys: env::var("COVERSCAN_API_KEYS")
                    .map(|keys| {
                        keys.split(',')
                            .map(|s| s.trim().to_string())
                            .filter(|s| !s.is_empty())
                            .collect()
                    })
                    .unwrap_or_default(),
            },
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").unwrap_or_else(|_| "file:coverscan.db".to_string()),
                auth_token: env::var("DATABASE_AUTH_TOKEN").ok(),
                local_path: env::var("DATABASE_LOCAL_PATH").ok(),
            },
            uploads: UploadConfig {
                dir: env::var("UPLOAD_DIR").unwrap_or_else(|_| "public/uploads".to_string()),
                max_file_size: parse_env_or("UPLOAD_MAX_FILE_SIZE", 10 * 1024 * 1024),
            },
            recognition: RecognitionConfig {
                timeout_secs: parse_env_or("RECOGNITION_TIMEOUT", defaults.timeout_secs),
                max_retries: parse_env_or("RECOGNITION_MAX_RETRIES", defaults.max_retries),
                max_image_dimension: parse_env_or(
                    "RECOGNITION_MAX_IMAGE_DIMENSION",
                    defaults.max_image_dimension,
                ),
                min_image_dimension: parse_env_or(
                    "RECOGNITION_MIN_IMAGE_DIMENSION",
                    defaults.min_image_dimension,
                ),
                openai: RemoteProviderConfig {
                    api_key: env_opt("OPENAI_API_KEY"),
                    base_url: env_opt("OPENAI_BASE_URL"),
                    model: env_opt("OPENAI_VISION_MODEL").unwrap_or(defaults.openai.model),
                },
                claude: RemoteProviderConfig {
                    api_key: env_opt("CLAUDE_API_KEY"),
                    base_url: env_opt("CLAUDE_BASE_URL"),
                    model: env_opt("CLAUDE_VISION_MODEL").unwrap_or(defaults.claude.model),
                },
                local: LocalRuntimeConfig {
                    base_url: env_opt("OLLAMA_BASE_URL").unwrap_or(defaults.local.base_url),
                    llama_model: env_opt("LLAMA_VISION_MODEL")
                        .unwrap_or(defaults.local.llama_model),
                    moondream_model: env_opt("MOONDREAM_MODEL")
                        .unwrap_or(defaults.local.moondream_model),
                },
            },
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        Self::default()
    }
}
