//! # Blueprint Skill
//!
//! First generate stage (`pkg` on the wire): turns the raw user request into
//! a Markdown project blueprint every later stage builds on.

use crate::error::AgentError;
use crate::skills::invoker::AgentInvoker;
use crate::skills::prompts::AgentRole;

/// File the blueprint is stored under in the FileSet
pub const BLUEPRINT_PATH: &str = "blueprint.md";

pub struct BlueprintSkill;

impl BlueprintSkill {
    /// SDK-style call for direct Coordinator integration.
    pub async fn run(invoker: &AgentInvoker, request: &str) -> Result<String, AgentError> {
        invoker.invoke(AgentRole::Blueprint, request, &[]).await
    }
}
