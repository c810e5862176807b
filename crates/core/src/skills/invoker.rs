//! # Agent Invoker
//!
//! The one call every agent makes: system prompt + history + current turn,
//! streamed from the backend and concatenated in arrival order.

use crate::error::{AgentError, ConfigError};
use crate::models::{Content, GeminiClient, GenerateRequest, LlmBackend, Message, ModelConfig};
use crate::skills::prompts::AgentRole;
use futures::StreamExt;
use std::sync::Arc;

/// Shared handle to the LLM backend. Cheap to clone.
#[derive(Clone)]
pub struct AgentInvoker {
    backend: Arc<dyn LlmBackend>,
}

impl AgentInvoker {
    pub fn new(backend: Arc<dyn LlmBackend>) -> Self {
        Self { backend }
    }

    /// Production invoker talking to Gemini.
    pub fn from_config(config: &ModelConfig) -> Result<Self, ConfigError> {
        Ok(Self::new(Arc::new(GeminiClient::new(config)?)))
    }

    /// Run `role` on `user_content`, with `history` as prior turns.
    ///
    /// Returns only once the backend stream has ended. System-role history
    /// entries are dropped. Any transport or stream error fails the whole
    /// call; no retry.
    #[tracing::instrument(skip_all, fields(role = %role))]
    pub async fn invoke(
        &self,
        role: AgentRole,
        user_content: &str,
        history: &[Message],
    ) -> Result<String, AgentError> {
        let request = build_request(role, user_content, history);
        tracing::debug!(turns = request.contents.len(), "Invoking agent");

        let mut stream = self
            .backend
            .stream_generate(request)
            .await
            .map_err(|e| AgentError::invocation(role.slug(), e))?;

        let mut output = String::new();
        while let Some(fragment) = stream.next().await {
            let fragment = fragment.map_err(|e| AgentError::invocation(role.slug(), e))?;
            output.push_str(&fragment);
        }

        tracing::debug!(chars = output.len(), "Agent finished");
        Ok(output)
    }
}

fn build_request(role: AgentRole, user_content: &str, history: &[Message]) -> GenerateRequest {
    let mut contents: Vec<Content> = history.iter().filter_map(Message::to_content).collect();
    contents.push(Content::user_text(user_content));
    GenerateRequest {
        system_instruction: role.system_prompt().to_string(),
        contents,
    }
}
