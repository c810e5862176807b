//! # Vibe Core
//!
//! Turns a natural-language request into a set of project files by running
//! a fixed sequence of LLM agents, then resolves the npm packages the
//! generated code imports.
//!
//! ## Architecture
//!
//! - `models/` - LLM backend trait and the Gemini streaming client
//! - `skills/` - One module per agent role, plus the shared invoker
//! - `tools/` - File extraction, npm registry lookups, manifest synthesis
//! - `swarm/` - The stage sequencer and its event stream
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use vibe_core::config::OrchestratorConfig;
//! use vibe_core::swarm::{Coordinator, OrchestrationRequest};
//!
//! let config = Arc::new(OrchestratorConfig::default());
//! let mut coordinator = Coordinator::from_config(config)?;
//! let outcome = coordinator.run(OrchestrationRequest::new("Build a todo app")).await;
//! ```

pub mod config;
pub mod error;
pub mod models;
pub mod skills;
pub mod swarm;
pub mod tools;

#[cfg(test)]
mod testing;

pub use config::OrchestratorConfig;
pub use swarm::{Coordinator, OrchestrationRequest, RunOutcome, StageEvent};
