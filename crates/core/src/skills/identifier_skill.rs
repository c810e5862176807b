//! # Identifier Skill
//!
//! Asks an agent which imports of the generated code are real npm packages.
//! The static extractor already finds every specifier; the agent's job is to
//! drop framework-internal and aliased names it cannot know about.
//!
//! The answer is a JSON document (schema generated from
//! [`IdentifiedPackages`]) inside a ```` ```json ```` fence.

use crate::error::{AgentError, ParseError};
use crate::skills::blueprint_skill::BLUEPRINT_PATH;
use crate::skills::invoker::AgentInvoker;
use crate::skills::prompts::AgentRole;
use crate::skills::validator_skill::REPORT_PATH;
use crate::tools::extractor::{canonical_package_name, extract_import_names, FileSet};
use crate::tools::registry::validate_package_name;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Identified package list, stored in the FileSet
pub const PACKAGES_PATH: &str = "packages-identified.json";

/// Run summary, stored in the FileSet
pub const FINAL_REPORT_PATH: &str = "final-report.json";

/// Bookkeeping files the identifier never reads
pub const EXCLUDED_PATHS: &[&str] = &[
    BLUEPRINT_PATH,
    REPORT_PATH,
    FINAL_REPORT_PATH,
    PACKAGES_PATH,
];

/// Counters the agent reports about its scan
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(rename_all = "camelCase", default)]
pub struct ImportAnalysis {
    pub total_imports_scanned: u32,
    pub npm_packages_found: u32,
    pub internal_imports_ignored: u32,
}

/// Output from the identifier skill
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema, PartialEq, Eq)]
pub struct IdentifiedPackages {
    /// Exact npm package names, no subpaths
    #[serde(default)]
    pub packages: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub analysis: Option<ImportAnalysis>,
}

impl IdentifiedPackages {
    /// Read the JSON payload out of an agent answer.
    ///
    /// Prefers a ```` ```json ```` fence; falls back to the outermost braces.
    pub fn parse(output: &str) -> Result<Self, ParseError> {
        let payload = json_fence(output)
            .or_else(|| outer_braces(output))
            .ok_or(ParseError::MissingPayload)?;
        Ok(serde_json::from_str(payload)?)
    }

    /// Canonical, valid names in report order, without duplicates.
    pub fn package_names(&self) -> Vec<String> {
        let mut seen = BTreeSet::new();
        self.packages
            .iter()
            .filter_map(|raw| canonical_package_name(raw))
            .filter(|name| validate_package_name(name).is_ok())
            .filter(|name| seen.insert(name.clone()))
            .collect()
    }
}

fn json_fence(output: &str) -> Option<&str> {
    let start = output.find("```json")? + "```json".len();
    let rest = &output[start..];
    let end = rest.find("```")?;
    Some(rest[..end].trim())
}

fn outer_braces(output: &str) -> Option<&str> {
    let start = output.find('{')?;
    let end = output.rfind('}')?;
    (end > start).then(|| &output[start..=end])
}

pub struct IdentifierSkill;

impl IdentifierSkill {
    /// Files the identifier may read
    pub fn source_files(files: &FileSet) -> impl Iterator<Item = (&String, &String)> {
        files
            .iter()
            .filter(|(path, _)| !EXCLUDED_PATHS.contains(&path.as_str()))
    }

    pub fn build_prompt(files: &FileSet) -> String {
        let hints = extract_import_names(Self::source_files(files).map(|(_, c)| c.as_str()));
        let described: String = Self::source_files(files)
            .map(|(path, content)| format!("\n--- File: {} ---\n{}", path, content))
            .collect::<Vec<_>>()
            .join("\n");
        let schema = serde_json::to_string_pretty(&schemars::schema_for!(IdentifiedPackages))
            .unwrap_or_default();

        format!(
            "Here are all the generated project files:\n{}\n\n\
             Import specifiers found by static analysis: {}\n\n\
             Answer with JSON matching this schema:\n{}",
            described,
            if hints.is_empty() {
                "none".to_string()
            } else {
                hints.into_iter().collect::<Vec<_>>().join(", ")
            },
            schema
        )
    }

    pub async fn run(invoker: &AgentInvoker, files: &FileSet) -> Result<String, AgentError> {
        let prompt = Self::build_prompt(files);
        invoker.invoke(AgentRole::Identifier, &prompt, &[]).await
    }
}
