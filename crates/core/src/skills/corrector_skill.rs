//! # Corrector Skill
//!
//! Regenerates missing or broken files. Used in two places:
//!
//! - the `correct` branch, repairing the caller's current files against a
//!   problem description (deployment error or user complaint)
//! - the generate pipeline, acting on the validator's report
//!
//! Conversation history is passed on both paths.

use crate::error::AgentError;
use crate::models::{DeploymentError, Message};
use crate::skills::invoker::AgentInvoker;
use crate::skills::prompts::AgentRole;
use crate::tools::extractor::FileSet;

pub struct CorrectorSkill;

impl CorrectorSkill {
    /// `--- path ---` headed dump of every file.
    pub fn render_files(files: &FileSet) -> String {
        files
            .iter()
            .map(|(path, content)| format!("--- {} ---\n{}", path, content))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Problem statement for a failed build/install/start.
    pub fn deployment_problem(error: &DeploymentError) -> String {
        format!(
            "Error during {}:\nSTDOUT: {}\nSTDERR: {}",
            error.action, error.stdout, error.stderr
        )
    }

    pub fn repair_prompt(files: &FileSet, problem: &str) -> String {
        format!(
            "Current files:\n{}\n\nProblem to fix:\n{}",
            Self::render_files(files),
            problem
        )
    }

    pub fn follow_up_prompt(report: &str, files: &FileSet, request: &str) -> String {
        let paths: Vec<&String> = files.keys().collect();
        let paths = serde_json::to_string(&paths).unwrap_or_default();
        format!(
            "Validation report:\n\n{}\n\nAll generated files:\n\n{}\n\nOriginal request:\n{}\n\n\
             Generate ONLY the files that are missing or must be fixed according to the validation report.",
            report, paths, request
        )
    }

    /// Repair `files` for `problem` (the `correct` branch).
    pub async fn repair(
        invoker: &AgentInvoker,
        files: &FileSet,
        problem: &str,
        history: &[Message],
    ) -> Result<String, AgentError> {
        let prompt = Self::repair_prompt(files, problem);
        invoker.invoke(AgentRole::Corrector, &prompt, history).await
    }

    /// Act on the validator's report (generate pipeline).
    pub async fn follow_up(
        invoker: &AgentInvoker,
        report: &str,
        files: &FileSet,
        request: &str,
        history: &[Message],
    ) -> Result<String, AgentError> {
        let prompt = Self::follow_up_prompt(report, files, request);
        invoker.invoke(AgentRole::Corrector, &prompt, history).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn files() -> FileSet {
        let mut files = FileSet::new();
        files.insert("app/page.tsx".into(), "import { z } from 'zod'".into());
        files.insert("package.json".into(), "{}".into());
        files
    }

    #[test]
    fn test_repair_prompt_embeds_error_and_files() {
        let error = DeploymentError {
            action: "build".into(),
            stdout: String::new(),
            stderr: "Cannot find module 'zod'".into(),
        };
        let prompt = CorrectorSkill::repair_prompt(&files(), &CorrectorSkill::deployment_problem(&error));

        assert!(prompt.contains("--- app/page.tsx ---\nimport { z } from 'zod'"));
        assert!(prompt.contains("--- package.json ---\n{}"));
        assert!(prompt.contains("Error during build:"));
        assert!(prompt.contains("STDERR: Cannot find module 'zod'"));
    }

    #[test]
    fn test_follow_up_lists_paths_only() {
        let prompt = CorrectorSkill::follow_up_prompt("missing auth", &files(), "todo app");
        assert!(prompt.contains(r#"["app/page.tsx","package.json"]"#));
        assert!(!prompt.contains("import { z }"));
    }
}
