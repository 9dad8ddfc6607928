//! API configuration and credential resolution.

use crate::store::KeyValueStore;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Chat-completions endpoint.
pub const OPENAI_ENDPOINT: &str = "https://api.openai.com/v1/chat/completions";
/// Model used for both explanation and generation requests.
pub const MODEL: &str = "gpt-4o";
/// Sampling temperature for explanation requests.
pub const TEMPERATURE: f32 = 0.3;
/// Output token bound for explanation requests.
pub const MAX_TOKENS: u32 = 1500;
/// Sampling temperature for code generation.
pub const GENERATION_TEMPERATURE: f32 = 0.7;
/// Output token bound for code generation.
pub const GENERATION_MAX_TOKENS: u32 = 2000;

/// Store key holding the user's API key.
pub const API_KEY_STORAGE_KEY: &str = "openai_api_key";
/// Environment variable consulted when the store has no key.
pub const API_KEY_ENV_VAR: &str = "OPENAI_API_KEY";

/// Endpoint and sampling parameters for explanation requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    pub endpoint: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            endpoint: OPENAI_ENDPOINT.to_string(),
            model: MODEL.to_string(),
            temperature: TEMPERATURE,
            max_tokens: MAX_TOKENS,
        }
    }
}

impl ApiConfig {
    /// Same endpoint and model, generation sampling parameters.
    pub fn for_generation(&self) -> Self {
        Self {
            endpoint: self.endpoint.clone(),
            model: self.model.clone(),
            temperature: GENERATION_TEMPERATURE,
            max_tokens: GENERATION_MAX_TOKENS,
        }
    }
}

/// Resolves the API key: the injected store first, environment as fallback.
#[derive(Clone)]
pub struct Credentials {
    store: Arc<dyn KeyValueStore>,
}

impl Credentials {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// The stored key when present, else the `OPENAI_API_KEY` environment
    /// variable. Store read failures are logged and treated as absent.
    pub fn api_key(&self) -> Option<String> {
        match self.store.get(API_KEY_STORAGE_KEY) {
            Ok(Some(key)) if !key.trim().is_empty() => return Some(key),
            Ok(_) => {}
            Err(err) => {
                tracing::warn!("failed to read API key from store: {}", err);
            }
        }
        std::env::var(API_KEY_ENV_VAR)
            .ok()
            .filter(|key| !key.trim().is_empty())
    }

    pub fn set_api_key(&self, key: &str) -> anyhow::Result<()> {
        self.store.set(API_KEY_STORAGE_KEY, key)
    }

    pub fn clear_api_key(&self) -> anyhow::Result<()> {
        self.store.remove(API_KEY_STORAGE_KEY)
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key().is_some()
    }

    /// Validate API key format (should start with sk-). Advisory only.
    pub fn validate_api_key_format(key: &str) -> bool {
        key.starts_with("sk-")
    }
}
