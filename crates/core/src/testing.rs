//! In-memory collaborators for unit tests.

use crate::error::{LlmError, ResolveError};
use crate::models::{GenerateRequest, LlmBackend, TextStream};
use crate::skills::prompts::AgentRole;
use crate::tools::registry::{PackageResolver, ResolvedPackage};
use async_trait::async_trait;
use futures::StreamExt;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// What the scripted backend answers for one call
#[derive(Debug, Clone)]
pub(crate) enum Reply {
    Fragments(Vec<String>),
    /// `stream_generate` itself fails
    Fail(String),
    /// Some fragments, then a stream error
    Broken(Vec<String>, String),
    /// Never produces anything
    Hang,
}

impl Reply {
    pub(crate) fn text(text: impl Into<String>) -> Self {
        Reply::Fragments(vec![text.into()])
    }

    pub(crate) fn fragments<const N: usize>(parts: [&str; N]) -> Self {
        Reply::Fragments(parts.iter().map(|s| s.to_string()).collect())
    }

    pub(crate) fn fail(message: impl Into<String>) -> Self {
        Reply::Fail(message.into())
    }

    pub(crate) fn broken_stream<const N: usize>(parts: [&str; N], message: &str) -> Self {
        Reply::Broken(parts.iter().map(|s| s.to_string()).collect(), message.to_string())
    }
}

/// Answers each role from its own queue; unscripted calls return "".
#[derive(Default)]
pub(crate) struct ScriptedBackend {
    scripts: Mutex<HashMap<AgentRole, VecDeque<Reply>>>,
    requests: Mutex<Vec<(AgentRole, GenerateRequest)>>,
}

impl ScriptedBackend {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn reply(self, role: AgentRole, reply: Reply) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .entry(role)
            .or_default()
            .push_back(reply);
        self
    }

    pub(crate) fn requests(&self) -> Vec<GenerateRequest> {
        self.requests.lock().unwrap().iter().map(|(_, r)| r.clone()).collect()
    }

    pub(crate) fn requests_for(&self, role: AgentRole) -> Vec<GenerateRequest> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|(r, _)| *r == role)
            .map(|(_, req)| req.clone())
            .collect()
    }

    pub(crate) fn roles_called(&self) -> Vec<AgentRole> {
        self.requests.lock().unwrap().iter().map(|(r, _)| *r).collect()
    }
}

#[async_trait]
impl LlmBackend for ScriptedBackend {
    async fn stream_generate(&self, request: GenerateRequest) -> Result<TextStream, LlmError> {
        let role = AgentRole::ALL
            .into_iter()
            .find(|r| r.system_prompt() == request.system_instruction)
            .ok_or_else(|| LlmError::InvalidResponse("unknown system instruction".into()))?;

        self.requests.lock().unwrap().push((role, request));
        let reply = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(&role)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| Reply::text(""));

        match reply {
            Reply::Fragments(parts) => {
                Ok(futures::stream::iter(parts.into_iter().map(Ok::<String, LlmError>)).boxed())
            }
            Reply::Fail(message) => Err(LlmError::Api {
                status: 503,
                message,
            }),
            Reply::Broken(parts, message) => {
                let items = parts
                    .into_iter()
                    .map(Ok)
                    .chain(std::iter::once(Err(LlmError::InvalidResponse(message))));
                Ok(futures::stream::iter(items).boxed())
            }
            Reply::Hang => Ok(futures::stream::pending::<Result<String, LlmError>>().boxed()),
        }
    }
}

/// Registry stand-in; unknown names fail with a transient registry error.
pub(crate) struct ScriptedResolver {
    answers: HashMap<String, Result<ResolvedPackage, ResolveError>>,
    pub(crate) calls: AtomicU32,
    pub(crate) call_times: Mutex<Vec<tokio::time::Instant>>,
    pub(crate) names: Mutex<Vec<String>>,
    pub(crate) hang: Option<Duration>,
}

impl ScriptedResolver {
    pub(crate) fn new() -> Self {
        Self {
            answers: HashMap::new(),
            calls: AtomicU32::new(0),
            call_times: Mutex::new(Vec::new()),
            names: Mutex::new(Vec::new()),
            hang: None,
        }
    }

    pub(crate) fn answer(mut self, name: &str, result: Result<ResolvedPackage, ResolveError>) -> Self {
        self.answers.insert(name.to_string(), result);
        self
    }

    pub(crate) fn found(self, name: &str, version: &str) -> Self {
        self.answer(name, Ok(package(name, version)))
    }

    pub(crate) fn missing(self, name: &str) -> Self {
        self.answer(
            name,
            Err(ResolveError::PackageNotFound {
                name: name.to_string(),
                status: 404,
            }),
        )
    }

    pub(crate) fn call_count(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn resolved_names(&self) -> Vec<String> {
        self.names.lock().unwrap().clone()
    }
}

#[async_trait]
impl PackageResolver for ScriptedResolver {
    async fn resolve(&self, name: &str) -> Result<ResolvedPackage, ResolveError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.call_times.lock().unwrap().push(tokio::time::Instant::now());
        self.names.lock().unwrap().push(name.to_string());
        if let Some(hang) = self.hang {
            tokio::time::sleep(hang).await;
        }
        self.answers
            .get(name)
            .cloned()
            .unwrap_or_else(|| Err(ResolveError::Registry("connection reset".into())))
    }
}

pub(crate) fn package(name: &str, version: &str) -> ResolvedPackage {
    ResolvedPackage {
        name: name.to_string(),
        version: version.to_string(),
        description: None,
        homepage: None,
        repository: None,
        license: None,
        author: None,
        dist_tags: BTreeMap::from([("latest".to_string(), version.to_string())]),
    }
}
