//! Agent roles and their bundled system prompts.
//!
//! Prompts are compiled into the binary; each role has exactly one.

use std::fmt;

/// Manager - conversational entry point and router
pub const MANAGER: &str = include_str!("defaults/manager.md");

/// Blueprint - turns the request into a project blueprint
pub const BLUEPRINT: &str = include_str!("defaults/blueprint.md");

/// Backend - API route handlers
pub const BACKEND: &str = include_str!("defaults/backend.md");

/// UI - pages and components
pub const UI: &str = include_str!("defaults/ui.md");

/// Validator - audits the generated code against the blueprint
pub const VALIDATOR: &str = include_str!("defaults/validator.md");

/// Corrector - regenerates missing or broken files
pub const CORRECTOR: &str = include_str!("defaults/corrector.md");

/// Error Fixer - reads the run transcript and patches what failed
pub const ERROR_FIXER: &str = include_str!("defaults/error_fixer.md");

/// Identifier - picks the real npm packages out of the imports
pub const IDENTIFIER: &str = include_str!("defaults/identifier.md");

/// A fixed system prompt paired with the shared invoker
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AgentRole {
    Manager,
    Blueprint,
    Backend,
    Ui,
    Validator,
    Corrector,
    ErrorFixer,
    Identifier,
}

impl AgentRole {
    pub const ALL: [AgentRole; 8] = [
        AgentRole::Manager,
        AgentRole::Blueprint,
        AgentRole::Backend,
        AgentRole::Ui,
        AgentRole::Validator,
        AgentRole::Corrector,
        AgentRole::ErrorFixer,
        AgentRole::Identifier,
    ];

    pub fn slug(&self) -> &'static str {
        match self {
            AgentRole::Manager => "manager",
            AgentRole::Blueprint => "blueprint",
            AgentRole::Backend => "backend",
            AgentRole::Ui => "ui",
            AgentRole::Validator => "validator",
            AgentRole::Corrector => "corrector",
            AgentRole::ErrorFixer => "error_fixer",
            AgentRole::Identifier => "identifier",
        }
    }

    pub fn system_prompt(&self) -> &'static str {
        match self {
            AgentRole::Manager => MANAGER,
            AgentRole::Blueprint => BLUEPRINT,
            AgentRole::Backend => BACKEND,
            AgentRole::Ui => UI,
            AgentRole::Validator => VALIDATOR,
            AgentRole::Corrector => CORRECTOR,
            AgentRole::ErrorFixer => ERROR_FIXER,
            AgentRole::Identifier => IDENTIFIER,
        }
    }
}

impl fmt::Display for AgentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.slug())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_all_prompts_non_empty() {
        for role in AgentRole::ALL {
            let prompt = role.system_prompt();
            assert!(prompt.len() > 50, "Prompt '{}' seems too short", role);
        }
    }

    #[test]
    fn test_prompts_are_distinct() {
        let unique: HashSet<&str> = AgentRole::ALL.iter().map(|r| r.system_prompt()).collect();
        assert_eq!(unique.len(), AgentRole::ALL.len());
    }

    #[test]
    fn test_code_roles_ask_for_file_fences() {
        for role in [AgentRole::Backend, AgentRole::Ui, AgentRole::Corrector, AgentRole::ErrorFixer] {
            assert!(role.system_prompt().contains("file=\""), "{} must request file fences", role);
        }
        assert!(MANAGER.contains("ROUTE:"));
    }
}
