//! # Error Fixer Skill
//!
//! Reads the run transcript so far and patches whatever it reports as
//! broken. Advisory.

use crate::error::AgentError;
use crate::skills::invoker::AgentInvoker;
use crate::skills::prompts::AgentRole;

pub struct ErrorFixerSkill;

impl ErrorFixerSkill {
    pub fn build_prompt(transcript: &[String], request: &str) -> String {
        format!(
            "Run logs:\n\n{}\n\nOriginal request:\n{}",
            transcript.join("\n"),
            request
        )
    }

    pub async fn run(
        invoker: &AgentInvoker,
        transcript: &[String],
        request: &str,
    ) -> Result<String, AgentError> {
        let prompt = Self::build_prompt(transcript, request);
        invoker.invoke(AgentRole::ErrorFixer, &prompt, &[]).await
    }
}
