use std::collections::HashMap;

use crate::config::RecognitionConfig;
use crate::error::{CoverscanError, Result};
use crate::models::ProviderDescriptor;

use super::provider::RecognitionProvider;

/// Every provider the service knows about, in display order.
pub const PROVIDER_DESCRIPTORS: &[ProviderDescriptor] = &[
    ProviderDescriptor {
        id: "llama",
        display_name: "Llama3.2-vision",
        description: "Meta's vision-language model",
    },
    ProviderDescriptor {
        id: "moondream",
        display_name: "Moondream2",
        description: "Lightweight vision-language model",
    },
    ProviderDescriptor {
        id: "claude",
        display_name: "Claude API",
        description: "Anthropic's vision model",
    },
    ProviderDescriptor {
        id: "openai",
        display_name: "OpenAI API",
        description: "GPT-4 Vision model",
    },
];

/// Provider lookup table, built once at startup and never mutated.
#[derive(Debug)]
pub struct ProviderRegistry {
    providers: HashMap<&'static str, RecognitionProvider>,
}

impl ProviderRegistry {
    pub fn from_config(config: &RecognitionConfig) -> Self {
        let providers = PROVIDER_DESCRIPTORS
            .iter()
            .map(|descriptor| {
                let provider = match descriptor.id {
                    "openai" => RecognitionProvider::openai(config),
                    "claude" => RecognitionProvider::claude(config),
                    "llama" => {
                        RecognitionProvider::local("llama", &config.local.llama_model, config)
                    }
                    "moondream" => RecognitionProvider::local(
                        "moondream",
                        &config.local.moondream_model,
                        config,
                    ),
                    other => RecognitionProvider::unavailable(
                        descriptor.id,
                        format!("No backend for provider {other}"),
                    ),
                };
                (descriptor.id, provider)
            })
            .collect();

        Self { providers }
    }

    /// Build a registry from already constructed providers. Ids outside the
    /// descriptor list are dropped.
    pub fn from_providers(providers: impl IntoIterator<Item = RecognitionProvider>) -> Self {
        let providers = providers
            .into_iter()
            .filter(|p| PROVIDER_DESCRIPTORS.iter().any(|d| d.id == p.id()))
            .map(|p| (p.id(), p))
            .collect();

        Self { providers }
    }

    pub fn get_adapter(&self, provider_id: &str) -> Result<&RecognitionProvider> {
        self.providers
            .get(provider_id)
            .ok_or_else(|| CoverscanError::UnsupportedProvider(provider_id.to_string()))
    }

    pub fn descriptors(&self) -> &'static [ProviderDescriptor] {
        PROVIDER_DESCRIPTORS
    }

    pub fn is_available(&self, provider_id: &str) -> bool {
        self.providers
            .get(provider_id)
            .is_some_and(RecognitionProvider::is_available)
    }

    /// Providers that could not be initialized, with the reason.
    pub fn unavailable(&self) -> Vec<(&'static str, &str)> {
        PROVIDER_DESCRIPTORS
            .iter()
            .filter_map(|d| self.providers.get(d.id))
            .filter_map(|p| p.unavailable_reason().map(|reason| (p.id(), reason)))
            .collect()
    }
}
