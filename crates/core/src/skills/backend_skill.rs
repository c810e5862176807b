//! # Backend Skill
//!
//! Generates the API route handlers described by the blueprint.

use crate::error::AgentError;
use crate::skills::invoker::AgentInvoker;
use crate::skills::prompts::AgentRole;

pub struct BackendSkill;

impl BackendSkill {
    pub fn build_prompt(blueprint: &str, request: &str) -> String {
        format!(
            "Based on this project blueprint:\n\n{}\n\nOriginal request:\n{}",
            blueprint, request
        )
    }

    /// SDK-style call for direct Coordinator integration.
    pub async fn run(
        invoker: &AgentInvoker,
        blueprint: &str,
        request: &str,
    ) -> Result<String, AgentError> {
        let prompt = Self::build_prompt(blueprint, request);
        invoker.invoke(AgentRole::Backend, &prompt, &[]).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_carries_blueprint_and_request() {
        let prompt = BackendSkill::build_prompt("# Todo blueprint", "build a todo app");
        assert!(prompt.contains("# Todo blueprint"));
        assert!(prompt.ends_with("build a todo app"));
    }
}
