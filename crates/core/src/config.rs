//! Tunables for the LLM, registry access and the stage sequencer.
//!
//! Both structs deserialize from partial JSON (every field has a default) so
//! the server can layer them from its persisted config file.

use crate::models::ModelConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const NPM_REGISTRY_URL: &str = "https://registry.npmjs.org";

/// Packages every generated Next.js app depends on
pub const CORE_PACKAGES: &[&str] = &["next", "react", "react-dom"];

/// npm registry access
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RegistryConfig {
    pub base_url: String,
    pub user_agent: String,
    /// Per-attempt timeout in milliseconds
    pub attempt_timeout_ms: u64,
    pub max_attempts: u32,
    /// First retry delay in milliseconds, doubled on each attempt
    pub retry_base_delay_ms: u64,
    /// Pause between two sequential lookups in milliseconds
    pub batch_pause_ms: u64,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            base_url: NPM_REGISTRY_URL.to_string(),
            user_agent: format!("vibe/{}", env!("CARGO_PKG_VERSION")),
            attempt_timeout_ms: 8_000,
            max_attempts: 3,
            retry_base_delay_ms: 1_000,
            batch_pause_ms: 500,
        }
    }
}

impl RegistryConfig {
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_millis(self.attempt_timeout_ms)
    }

    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_delay_ms)
    }

    pub fn batch_pause(&self) -> Duration {
        Duration::from_millis(self.batch_pause_ms)
    }

    /// Base URL without a trailing slash
    pub fn effective_base_url(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }
}

/// Stage sequencer behaviour
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OrchestratorConfig {
    pub model: ModelConfig,
    pub registry: RegistryConfig,
    /// Characters per `stage_output` chunk
    pub chunk_size: usize,
    /// Always declared in the manifest, whatever the agents report
    pub core_packages: Vec<String>,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            model: ModelConfig::default(),
            registry: RegistryConfig::default(),
            chunk_size: 100,
            core_packages: CORE_PACKAGES.iter().map(|s| s.to_string()).collect(),
        }
    }
}
