//! # Error Taxonomy
//!
//! Typed failures for every layer of the pipeline. Which of these abort a
//! run and which are only logged is decided by the coordinator, not here.

use thiserror::Error;

/// Missing or invalid process configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing API key: {0} is not set")]
    MissingApiKey(String),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Failures talking to the LLM backend.
#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("response blocked: {0}")]
    Blocked(String),

    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

/// A single agent call failed. Always carries the underlying message.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error("{role} agent failed: {message}")]
    Invocation { role: String, message: String },
}

impl AgentError {
    pub fn invocation(role: &str, err: impl std::fmt::Display) -> Self {
        AgentError::Invocation {
            role: role.to_string(),
            message: err.to_string(),
        }
    }
}

/// Registry lookup failures. Never fatal to a pipeline run.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResolveError {
    #[error("INVALID_PACKAGE_NAME: {0:?}")]
    InvalidPackageName(String),

    #[error("PACKAGE_NOT_FOUND: {name} (HTTP {status})")]
    PackageNotFound { name: String, status: u16 },

    #[error("NPM_REGISTRY_ERROR: {0}")]
    Registry(String),

    /// The registry answered but listed no `latest` dist-tag.
    #[error("NPM_REGISTRY_ERROR: no version information for {0}")]
    NoVersion(String),
}

impl ResolveError {
    /// Short reason string reported in failed-dependency maps.
    pub fn reason(&self) -> &'static str {
        match self {
            ResolveError::InvalidPackageName(_) => "INVALID_PACKAGE_NAME",
            ResolveError::PackageNotFound { .. } => "PACKAGE_NOT_FOUND",
            ResolveError::Registry(_) | ResolveError::NoVersion(_) => "NPM_REGISTRY_ERROR",
        }
    }
}

/// Structured output from an agent could not be read.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("no JSON payload found in agent output")]
    MissingPayload,

    #[error("malformed JSON payload: {0}")]
    Json(#[from] serde_json::Error),
}

/// Failures of the sequencer itself.
#[derive(Debug, Error)]
pub enum OrchestrationError {
    #[error("orchestration cancelled")]
    Cancelled,
}
