//! Streaming client for the Google Generative Language API.
//!
//! Calls `models/{model}:streamGenerateContent?alt=sse` and turns the SSE
//! body into a stream of text fragments. No retry: a failed call surfaces
//! as an [`LlmError`] and the caller decides what that means.

use std::collections::VecDeque;

use async_trait::async_trait;
use futures::StreamExt;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{GenerateRequest, LlmBackend, ModelConfig, TextStream};
use crate::error::{ConfigError, LlmError};

/// Google error response format.
#[derive(Debug, Deserialize)]
struct GoogleError {
    code: Option<u16>,
    message: String,
}

/// Google error wrapper.
#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: GoogleError,
}

/// Streaming response chunk.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StreamChunk {
    candidates: Option<Vec<Candidate>>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<CandidateContent>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ChunkPart>,
}

#[derive(Debug, Deserialize)]
struct ChunkPart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

/// Gemini-backed [`LlmBackend`].
#[derive(Debug, Clone)]
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    model: String,
    max_output_tokens: Option<u32>,
    temperature: Option<f32>,
}

impl GeminiClient {
    /// Create a client from a model config. Requires an API key.
    pub fn new(config: &ModelConfig) -> Result<Self, ConfigError> {
        Self::with_client(reqwest::Client::new(), config)
    }

    /// Creates a client with a custom HTTP client.
    pub fn with_client(http: reqwest::Client, config: &ModelConfig) -> Result<Self, ConfigError> {
        let api_key = config.require_api_key()?.to_string();
        Ok(Self {
            http,
            api_key,
            base_url: config.effective_base_url().to_string(),
            model: config.model.clone(),
            max_output_tokens: config.max_output_tokens,
            temperature: config.temperature,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:streamGenerateContent?alt=sse",
            self.base_url, self.model
        )
    }

    fn build_request_body(&self, request: &GenerateRequest) -> Value {
        let mut body = json!({
            "contents": request.contents,
            "systemInstruction": {
                "parts": [{ "text": request.system_instruction }]
            },
        });

        let mut gen_config = serde_json::Map::new();
        if let Some(max) = self.max_output_tokens {
            gen_config.insert("maxOutputTokens".into(), json!(max));
        }
        if let Some(temp) = self.temperature {
            gen_config.insert("temperature".into(), json!(temp));
        }
        if !gen_config.is_empty() {
            body["generationConfig"] = Value::Object(gen_config);
        }

        body
    }
}

#[async_trait]
impl LlmBackend for GeminiClient {
    async fn stream_generate(&self, request: GenerateRequest) -> Result<TextStream, LlmError> {
        let body = self.build_request_body(&request);

        tracing::debug!(model = %self.model, turns = request.contents.len(), "gemini request");

        let response = self
            .http
            .post(self.endpoint())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            if let Ok(parsed) = serde_json::from_str::<ErrorResponse>(&error_text) {
                return Err(LlmError::Api {
                    status: parsed.error.code.unwrap_or(status.as_u16()),
                    message: parsed.error.message,
                });
            }
            return Err(LlmError::Api {
                status: status.as_u16(),
                message: error_text,
            });
        }

        let state = StreamState {
            bytes: response
                .bytes_stream()
                .map(|chunk| chunk.map(|b| b.to_vec()))
                .boxed(),
            decoder: SseTextDecoder::default(),
            pending: VecDeque::new(),
            done: false,
        };

        let stream = futures::stream::unfold(state, |mut state| async move {
            loop {
                if let Some(text) = state.pending.pop_front() {
                    return Some((Ok(text), state));
                }
                if state.done {
                    return None;
                }
                let step = match state.bytes.next().await {
                    Some(Ok(chunk)) => state.decoder.push(&chunk),
                    Some(Err(e)) => Err(LlmError::Http(e)),
                    None => {
                        state.done = true;
                        state.decoder.finish()
                    }
                };
                match step {
                    Ok(texts) => state.pending.extend(texts),
                    Err(e) => {
                        state.done = true;
                        state.pending.clear();
                        return Some((Err(e), state));
                    }
                }
            }
        });

        Ok(stream.boxed())
    }
}

struct StreamState {
    bytes: futures::stream::BoxStream<'static, reqwest::Result<Vec<u8>>>,
    decoder: SseTextDecoder,
    pending: VecDeque<String>,
    done: bool,
}

/// Incremental decoder for the SSE body: bytes in, text fragments out.
#[derive(Debug, Default)]
pub struct SseTextDecoder {
    buffer: Vec<u8>,
}

impl SseTextDecoder {
    /// Feed raw bytes; returns the text of every complete event line.
    pub fn push(&mut self, bytes: &[u8]) -> Result<Vec<String>, LlmError> {
        self.buffer.extend_from_slice(bytes);
        let mut texts = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            texts.extend(decode_line(&String::from_utf8_lossy(&line))?);
        }
        Ok(texts)
    }

    /// Flush a final line that had no trailing newline.
    pub fn finish(&mut self) -> Result<Vec<String>, LlmError> {
        if self.buffer.is_empty() {
            return Ok(Vec::new());
        }
        let line = std::mem::take(&mut self.buffer);
        decode_line(&String::from_utf8_lossy(&line))
    }
}

fn decode_line(line: &str) -> Result<Vec<String>, LlmError> {
    let line = line.trim();
    if line.is_empty() || line.starts_with(':') {
        return Ok(Vec::new());
    }

    let json_str = match line.strip_prefix("data:") {
        Some(data) => data.trim(),
        None if line.starts_with('{') => line,
        // event:, id:, retry: and array punctuation
        None => return Ok(Vec::new()),
    };
    if json_str.is_empty() || json_str == "[DONE]" {
        return Ok(Vec::new());
    }

    let chunk: StreamChunk = match serde_json::from_str(json_str) {
        Ok(chunk) => chunk,
        Err(e) => {
            tracing::debug!("Failed to parse chunk: {} - data: {}", e, json_str);
            return Ok(Vec::new());
        }
    };

    if let Some(reason) = chunk.prompt_feedback.and_then(|f| f.block_reason) {
        return Err(LlmError::Blocked(format!("prompt blocked: {reason}")));
    }

    let mut texts = Vec::new();
    for candidate in chunk.candidates.unwrap_or_default() {
        if candidate.finish_reason.as_deref() == Some("SAFETY") {
            return Err(LlmError::Blocked(
                "response blocked due to safety concerns".to_string(),
            ));
        }
        if let Some(content) = candidate.content {
            texts.extend(
                content
                    .parts
                    .into_iter()
                    .filter_map(|p| p.text)
                    .filter(|t| !t.is_empty()),
            );
        }
    }
    Ok(texts)
}
