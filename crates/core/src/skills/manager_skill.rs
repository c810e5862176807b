//! # Manager Skill
//!
//! Conversational entry point. The manager answers the user and picks what
//! runs next: the generate pipeline, the correct branch, or nothing.
//!
//! The agent is asked to end its answer with a `ROUTE: <generate|correct|reply>`
//! line. That line is authoritative and stripped from the displayed reply.
//! When it is missing the decision falls back to keyword sniffing over the
//! reply (French and English). A deployment error always routes to `correct`.

use crate::error::AgentError;
use crate::models::Message;
use crate::skills::invoker::AgentInvoker;
use crate::skills::prompts::AgentRole;
use crate::tools::extractor::FileSet;
use serde::{Deserialize, Serialize};

const ROUTE_PREFIX: &str = "route:";

const GENERATE_KEYWORDS: &[&str] = &["génération", "générer", "créer", "generate", "generating"];
const CORRECT_KEYWORDS: &[&str] = &["correction", "corriger", "corrige", "fix the", "fixing"];

/// Where the sequencer goes after the manager
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Route {
    Generate,
    Correct,
    Reply,
}

impl Route {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "generate" => Some(Route::Generate),
            "correct" => Some(Route::Correct),
            "reply" => Some(Route::Reply),
            _ => None,
        }
    }
}

/// Parsed manager answer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagerDecision {
    /// Reply to show the user, without the routing line
    pub reply: String,
    pub route: Route,
    /// Whether the route came from an explicit `ROUTE:` line
    pub explicit: bool,
}

pub struct ManagerSkill;

impl ManagerSkill {
    pub fn build_context(request: &str, history: &[Message], files: &FileSet) -> String {
        let history = if history.is_empty() {
            "No history".to_string()
        } else {
            history
                .iter()
                .map(|m| format!("{}: {}", role_label(m), m.content))
                .collect::<Vec<_>>()
                .join("\n")
        };
        let files = if files.is_empty() {
            "No files".to_string()
        } else {
            files.keys().cloned().collect::<Vec<_>>().join(", ")
        };

        format!(
            "Conversation history:\n{}\n\nCurrent files:\n{}\n\nUser request: {}",
            history, files, request
        )
    }

    /// SDK-style call for direct Coordinator integration. Returns the raw
    /// answer; see [`parse_decision`].
    ///
    /// The history only travels inside the context text, never as prior turns.
    pub async fn run(
        invoker: &AgentInvoker,
        request: &str,
        history: &[Message],
        files: &FileSet,
    ) -> Result<String, AgentError> {
        let context = Self::build_context(request, history, files);
        invoker.invoke(AgentRole::Manager, &context, &[]).await
    }
}

fn role_label(message: &Message) -> &'static str {
    match message.role {
        crate::models::MessageRole::User => "user",
        crate::models::MessageRole::Assistant => "assistant",
        crate::models::MessageRole::System => "system",
    }
}

/// Turn the manager's raw answer into a routing decision.
pub fn parse_decision(output: &str, has_deployment_error: bool) -> ManagerDecision {
    let mut explicit_route = None;
    let mut kept = Vec::new();

    for line in output.lines() {
        let normalized = line
            .trim()
            .trim_matches(|c| c == '*' || c == '`' || c == '_')
            .trim();
        let is_route_line = normalized
            .get(..ROUTE_PREFIX.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(ROUTE_PREFIX));
        if is_route_line {
            let value = normalized[ROUTE_PREFIX.len()..].trim_matches(|c: char| {
                c.is_whitespace() || c == '*' || c == '`' || c == '_'
            });
            if let Some(route) = Route::parse(value) {
                explicit_route = Some(route);
                continue;
            }
        }
        kept.push(line);
    }

    let reply = kept.join("\n").trim().to_string();
    let explicit = explicit_route.is_some();

    let route = if has_deployment_error {
        Route::Correct
    } else if let Some(route) = explicit_route {
        route
    } else {
        sniff_route(&reply)
    };

    if !explicit {
        tracing::warn!(route = ?route, "Manager gave no ROUTE line, routed by keywords");
    }

    ManagerDecision {
        reply,
        route,
        explicit,
    }
}

fn sniff_route(reply: &str) -> Route {
    let lower = reply.to_lowercase();
    let generate = GENERATE_KEYWORDS.iter().any(|k| lower.contains(k));
    let correct = CORRECT_KEYWORDS.iter().any(|k| lower.contains(k));
    match (generate, correct) {
        (true, _) => Route::Generate,
        (false, true) => Route::Correct,
        (false, false) => Route::Reply,
    }
}
