//! # Vibe Models
//!
//! Centralized LLM configuration and the backend seam used by every agent.
//!
//! The pipeline only ever needs one operation from a model: stream the text
//! generated for a system instruction plus a list of turns. [`LlmBackend`]
//! is that operation; [`GeminiClient`] is the production implementation.

pub mod gemini;
pub mod types;

use async_trait::async_trait;
use futures::stream::BoxStream;
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, LlmError};

pub use gemini::GeminiClient;
pub use types::{Content, ContentRole, DeploymentError, ExternalFile, Message, MessageRole, Part};

/// Environment variable holding the Gemini API key
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";
/// Environment variable overriding the model name
pub const MODEL_ENV: &str = "GEMINI_MODEL";
/// Environment variable overriding the API base URL
pub const BASE_URL_ENV: &str = "GEMINI_BASE_URL";

/// Default model used by all agents
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";
/// Default Generative Language API endpoint
pub const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// Text fragments in arrival order
pub type TextStream = BoxStream<'static, Result<String, LlmError>>;

/// One generation request: fixed role instruction plus the turn list.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerateRequest {
    pub system_instruction: String,
    pub contents: Vec<Content>,
}

/// The opaque text-generation collaborator.
#[async_trait]
pub trait LlmBackend: Send + Sync {
    /// Start a streaming generation. The returned stream yields text
    /// fragments in the order the backend produced them.
    async fn stream_generate(&self, request: GenerateRequest) -> Result<TextStream, LlmError>;
}

/// Configuration for LLM model selection
///
/// Built once per process and shared by reference; there is no module-level
/// client.
///
/// ## Example
/// ```rust,ignore
/// use vibe_core::models::{GeminiClient, ModelConfig};
///
/// let config = ModelConfig::from_env()?;
/// let client = GeminiClient::new(&config)?;
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ModelConfig {
    /// Model name (e.g., "gemini-2.5-flash")
    pub model: String,
    /// API key; never serialized
    #[serde(skip)]
    pub api_key: Option<String>,
    /// Base URL override (for proxies and mock servers)
    pub base_url: Option<String>,
    /// Upper bound on generated tokens per call
    pub max_output_tokens: Option<u32>,
    /// Sampling temperature
    pub temperature: Option<f32>,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            api_key: None,
            base_url: None,
            max_output_tokens: None,
            temperature: None,
        }
    }
}

impl ModelConfig {
    /// Create a config for a specific model
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Self::default()
        }
    }

    /// Load from `GEMINI_API_KEY`, `GEMINI_MODEL` and `GEMINI_BASE_URL`.
    ///
    /// Fails when no API key is available.
    pub fn from_env() -> Result<Self, ConfigError> {
        let config = Self::default().merge_env();
        config.require_api_key()?;
        Ok(config)
    }

    /// Fill unset fields from the environment without requiring a key.
    pub fn merge_env(mut self) -> Self {
        if let Some(key) = non_empty_env(API_KEY_ENV) {
            self.api_key = Some(key);
        }
        if let Some(model) = non_empty_env(MODEL_ENV) {
            self.model = model;
        }
        if self.base_url.is_none() {
            self.base_url = non_empty_env(BASE_URL_ENV);
        }
        self
    }

    /// Set the API key
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Set base URL (for proxies and mock servers)
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    /// The API key, or a configuration error naming the variable to set
    pub fn require_api_key(&self) -> Result<&str, ConfigError> {
        self.api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingApiKey(API_KEY_ENV.to_string()))
    }

    /// Effective base URL without a trailing slash
    pub fn effective_base_url(&self) -> &str {
        self.base_url
            .as_deref()
            .unwrap_or(DEFAULT_BASE_URL)
            .trim_end_matches('/')
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}
