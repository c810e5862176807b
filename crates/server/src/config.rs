//! Persisted server settings.
//!
//! Layering: defaults, then `.vibe/config.json`, then the environment (a
//! `.env` file is loaded into it at startup), then CLI flags.

use std::path::Path;

use serde::{Deserialize, Serialize};
use vibe_core::config::OrchestratorConfig;

/// Default location of the settings file
pub const CONFIG_PATH: &str = ".vibe/config.json";

/// Settings that may be stored on disk. Absent fields keep their default.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PersistedConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registry_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub batch_pause_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chunk_size: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub core_packages: Option<Vec<String>>,
}

impl PersistedConfig {
    /// Read the settings file. A missing or unreadable file yields defaults.
    pub async fn load(path: &Path) -> Self {
        let content = match tokio::fs::read_to_string(path).await {
            Ok(content) => content,
            Err(_) => return Self::default(),
        };
        match serde_json::from_str(&content) {
            Ok(config) => config,
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Ignoring malformed config file");
                Self::default()
            }
        }
    }

    pub fn merge(&mut self, other: PersistedConfig) {
        if other.model.is_some() {
            self.model = other.model;
        }
        if other.base_url.is_some() {
            self.base_url = other.base_url;
        }
        if other.max_output_tokens.is_some() {
            self.max_output_tokens = other.max_output_tokens;
        }
        if other.temperature.is_some() {
            self.temperature = other.temperature;
        }
        if other.registry_url.is_some() {
            self.registry_url = other.registry_url;
        }
        if other.batch_pause_ms.is_some() {
            self.batch_pause_ms = other.batch_pause_ms;
        }
        if other.chunk_size.is_some() {
            self.chunk_size = other.chunk_size;
        }
        if other.core_packages.is_some() {
            self.core_packages = other.core_packages;
        }
    }

    /// Defaults overlaid with these settings, then with the environment.
    pub fn into_orchestrator_config(self) -> OrchestratorConfig {
        let mut config = OrchestratorConfig::default();
        if let Some(model) = self.model {
            config.model.model = model;
        }
        if self.base_url.is_some() {
            config.model.base_url = self.base_url;
        }
        if self.max_output_tokens.is_some() {
            config.model.max_output_tokens = self.max_output_tokens;
        }
        if self.temperature.is_some() {
            config.model.temperature = self.temperature;
        }
        if let Some(url) = self.registry_url {
            config.registry.base_url = url;
        }
        if let Some(pause) = self.batch_pause_ms {
            config.registry.batch_pause_ms = pause;
        }
        if let Some(size) = self.chunk_size {
            config.chunk_size = size.max(1);
        }
        if let Some(packages) = self.core_packages {
            config.core_packages = packages;
        }
        config.model = config.model.merge_env();
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_keeps_unset_fields() {
        let mut base = PersistedConfig {
            model: Some("gemini-2.5-pro".into()),
            chunk_size: Some(50),
            ..PersistedConfig::default()
        };
        base.merge(PersistedConfig {
            chunk_size: Some(200),
            registry_url: Some("http://localhost:4873".into()),
            ..PersistedConfig::default()
        });
        assert_eq!(base.model.as_deref(), Some("gemini-2.5-pro"));
        assert_eq!(base.chunk_size, Some(200));
        assert_eq!(base.registry_url.as_deref(), Some("http://localhost:4873"));
    }

    #[test]
    fn test_overlay_on_defaults() {
        let config = PersistedConfig {
            registry_url: Some("http://localhost:4873".into()),
            batch_pause_ms: Some(0),
            core_packages: Some(vec!["next".into()]),
            chunk_size: Some(0),
            ..PersistedConfig::default()
        }
        .into_orchestrator_config();
        assert_eq!(config.registry.base_url, "http://localhost:4873");
        assert_eq!(config.registry.batch_pause_ms, 0);
        assert_eq!(config.registry.max_attempts, 3);
        assert_eq!(config.core_packages, vec!["next"]);
        assert_eq!(config.chunk_size, 1);
    }

    #[tokio::test]
    async fn test_load_missing_and_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        assert_eq!(PersistedConfig::load(&path).await, PersistedConfig::default());

        tokio::fs::write(&path, "{not json").await.unwrap();
        assert_eq!(PersistedConfig::load(&path).await, PersistedConfig::default());

        tokio::fs::write(&path, r#"{"model": "gemini-2.0-flash", "batchPauseMs": 250}"#)
            .await
            .unwrap();
        let loaded = PersistedConfig::load(&path).await;
        assert_eq!(loaded.model.as_deref(), Some("gemini-2.0-flash"));
        assert_eq!(loaded.batch_pause_ms, Some(250));
    }
}
