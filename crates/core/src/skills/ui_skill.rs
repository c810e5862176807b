//! # UI Skill
//!
//! Generates pages and components wired to the generated backend.

use crate::error::AgentError;
use crate::skills::invoker::AgentInvoker;
use crate::skills::prompts::AgentRole;

pub struct UiSkill;

impl UiSkill {
    pub fn build_prompt(blueprint: &str, backend: &str, request: &str) -> String {
        format!(
            "Based on this blueprint:\n\n{}\n\nAnd this generated backend code:\n\n{}\n\nOriginal request:\n{}",
            blueprint, backend, request
        )
    }

    pub async fn run(
        invoker: &AgentInvoker,
        blueprint: &str,
        backend: &str,
        request: &str,
    ) -> Result<String, AgentError> {
        let prompt = Self::build_prompt(blueprint, backend, request);
        invoker.invoke(AgentRole::Ui, &prompt, &[]).await
    }
}
