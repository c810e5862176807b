//! # Validator Skill
//!
//! Audits blueprint vs. generated code and writes a Markdown report.
//! Advisory: the pipeline continues whatever it says.

use crate::error::AgentError;
use crate::skills::invoker::AgentInvoker;
use crate::skills::prompts::AgentRole;

/// File the validation report is stored under in the FileSet
pub const REPORT_PATH: &str = "validation-report.md";

pub struct ValidatorSkill;

impl ValidatorSkill {
    pub fn build_prompt(blueprint: &str, backend: &str, ui: &str, request: &str) -> String {
        format!(
            "Original blueprint:\n\n{}\n\nGenerated backend code:\n\n{}\n\nGenerated UI:\n\n{}\n\nOriginal request:\n{}",
            blueprint, backend, ui, request
        )
    }

    pub async fn run(
        invoker: &AgentInvoker,
        blueprint: &str,
        backend: &str,
        ui: &str,
        request: &str,
    ) -> Result<String, AgentError> {
        let prompt = Self::build_prompt(blueprint, backend, ui, request);
        invoker.invoke(AgentRole::Validator, &prompt, &[]).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_orders_sections() {
        let prompt = ValidatorSkill::build_prompt("<bp>", "<be>", "<ui>", "<req>");
        let bp = prompt.find("<bp>").unwrap();
        let be = prompt.find("<be>").unwrap();
        let ui = prompt.find("<ui>").unwrap();
        assert!(bp < be && be < ui);
        assert!(prompt.ends_with("<req>"));
    }
}
