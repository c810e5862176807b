//! Orchestration input and output.

use super::pipeline::{Mode, PipelineStage};
use crate::models::{DeploymentError, Message};
use crate::tools::extractor::FileSet;
use serde::{Deserialize, Serialize};

/// One orchestration request, as the caller sends it
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct OrchestrationRequest {
    /// Required; an empty prompt is rejected before any stage runs
    #[serde(default)]
    pub prompt: String,
    #[serde(default)]
    pub mode: Mode,
    #[serde(default)]
    pub conversation_history: Vec<Message>,
    /// Prior files supplied as context; the run's FileSet starts from these
    #[serde(default)]
    pub current_files: FileSet,
    #[serde(default)]
    pub deployment_error: Option<DeploymentError>,
}

impl OrchestrationRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            ..Self::default()
        }
    }

    pub fn with_mode(mut self, mode: Mode) -> Self {
        self.mode = mode;
        self
    }

    pub fn has_prompt(&self) -> bool {
        !self.prompt.trim().is_empty()
    }
}

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunStatus {
    /// Generate pipeline reached the end
    Completed,
    /// Manager answered without running any pipeline
    Conversational,
    /// Correct branch produced its fixes
    Corrected,
    /// A load-bearing stage failed
    Aborted,
    /// Caller went away or cancelled
    Cancelled,
}

/// Final state of a run
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub status: RunStatus,
    pub files: FileSet,
    pub transcript: Vec<String>,
    pub stages_started: u32,
    /// Where the pipeline stopped; `Done` or `Aborted` unless cancelled
    pub final_stage: PipelineStage,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_from_wire() {
        let request: OrchestrationRequest = serde_json::from_str(
            r#"{
                "prompt": "fix it",
                "mode": "manager",
                "conversationHistory": [{"role": "user", "content": "hi"}],
                "currentFiles": {"app/page.tsx": "x"},
                "deploymentError": {"action": "build", "stderr": "boom"}
            }"#,
        )
        .unwrap();
        assert_eq!(request.mode, Mode::Manager);
        assert_eq!(request.conversation_history.len(), 1);
        assert_eq!(request.current_files["app/page.tsx"], "x");
        let error = request.deployment_error.unwrap();
        assert_eq!(error.stderr, "boom");
        assert_eq!(error.stdout, "");
    }

    #[test]
    fn test_defaults() {
        let request: OrchestrationRequest = serde_json::from_str(r#"{"prompt":"todo"}"#).unwrap();
        assert_eq!(request.mode, Mode::Generate);
        assert!(request.has_prompt());
        assert!(!OrchestrationRequest::new("   ").has_prompt());
    }
}
