//! # Orchestration API
//!
//! Validates the request, then streams the sequencer's events as
//! newline-delimited JSON until the run reaches a terminal state. Dropping
//! the connection drops the receiver, which cancels the run.

use std::collections::BTreeMap;

use axum::{
    body::Body,
    extract::{rejection::JsonRejection, State},
    http::header,
    response::{IntoResponse, Response},
    Json,
};
use futures::StreamExt;
use serde::Deserialize;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use utoipa::ToSchema;
use vibe_core::models::{DeploymentError, Message};
use vibe_core::skills::AgentInvoker;
use vibe_core::swarm::{Coordinator, Mode, OrchestrationRequest};

use crate::app::SharedState;
use crate::error::{ApiError, ErrorBody};

/// Events buffered between the sequencer and a slow client
const EVENT_BUFFER: usize = 64;

/// Request payload of `POST /api/orchestrate`
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrchestrateBody {
    /// Required
    pub prompt: Option<String>,
    /// `generate` (default), `correct` or `manager`
    #[schema(value_type = Option<String>, example = "generate")]
    pub mode: Option<Mode>,
    #[serde(default)]
    #[schema(value_type = Vec<Object>)]
    pub conversation_history: Vec<Message>,
    /// path -> content
    #[serde(default)]
    pub current_files: BTreeMap<String, String>,
    /// `{action, stdout, stderr}` of a failed build or deploy
    #[schema(value_type = Option<Object>)]
    pub deployment_error: Option<DeploymentError>,
}

impl OrchestrateBody {
    pub fn into_request(self) -> Result<OrchestrationRequest, ApiError> {
        let prompt = self
            .prompt
            .filter(|p| !p.trim().is_empty())
            .ok_or_else(|| ApiError::InputValidation("prompt is required".to_string()))?;

        Ok(OrchestrationRequest {
            prompt,
            mode: self.mode.unwrap_or_default(),
            conversation_history: self.conversation_history,
            current_files: self.current_files,
            deployment_error: self.deployment_error,
        })
    }
}

/// Run the agent pipeline
#[utoipa::path(
    post,
    path = "/api/orchestrate",
    tag = "orchestration",
    request_body = OrchestrateBody,
    responses(
        (status = 200, description = "NDJSON stream of stage events", content_type = "text/event-stream", body = String),
        (status = 400, description = "Missing or malformed fields", body = ErrorBody),
        (status = 500, description = "LLM not configured", body = ErrorBody)
    )
)]
pub async fn orchestrate(
    State(state): State<SharedState>,
    payload: Result<Json<OrchestrateBody>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(body) = payload.map_err(|e| ApiError::InputValidation(e.body_text()))?;
    let request = body.into_request()?;
    let invoker = AgentInvoker::from_config(&state.config.model)?;

    tracing::info!(
        mode = ?request.mode,
        files = request.current_files.len(),
        history = request.conversation_history.len(),
        "Orchestration request accepted"
    );

    let (tx, rx) = mpsc::channel(EVENT_BUFFER);
    let mut coordinator = Coordinator::new(state.config.clone(), invoker, state.resolver.clone())
        .with_event_channel(tx);

    tokio::spawn(async move {
        let outcome = coordinator.run(request).await;
        tracing::info!(
            status = ?outcome.status,
            files = outcome.files.len(),
            stages = outcome.stages_started,
            "Orchestration stream closed"
        );
    });

    let stream = ReceiverStream::new(rx).map(|event| event.to_ndjson());
    Ok((
        [
            (header::CONTENT_TYPE, "text/event-stream"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        Body::from_stream(stream),
    )
        .into_response())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_is_required() {
        let missing = OrchestrateBody::default().into_request();
        assert!(matches!(missing, Err(ApiError::InputValidation(_))));

        let blank = OrchestrateBody {
            prompt: Some("  ".into()),
            ..OrchestrateBody::default()
        };
        assert!(blank.into_request().is_err());
    }

    #[test]
    fn test_body_maps_to_request() {
        let body: OrchestrateBody = serde_json::from_str(
            r#"{"prompt": "fix", "mode": "correct", "currentFiles": {"a.ts": "x"},
                "deploymentError": {"action": "build", "stderr": "boom"}}"#,
        )
        .unwrap();
        let request = body.into_request().unwrap();
        assert_eq!(request.mode, Mode::Correct);
        assert_eq!(request.current_files["a.ts"], "x");
        assert_eq!(request.deployment_error.unwrap().stderr, "boom");
    }
}
