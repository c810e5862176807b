//! # Swarm Coordinator
//!
//! Sequences the agents for one orchestration request and streams progress.
//!
//! Stages run strictly one after another. Every stage that emits
//! `stage_start` emits exactly one `stage_complete` or `stage_error`.
//! `pkg`, `backend` and `ui` abort the run on failure; `validator`,
//! `corrector` and `error_fixer` log the failure and the run moves on.
//!
//! Each await on the network is raced against the cancellation token and the
//! caller hanging up. Once cancelled, nothing more is emitted.

use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::config::OrchestratorConfig;
use crate::error::{AgentError, ConfigError, OrchestrationError};
use crate::models::DeploymentError;
use crate::skills::blueprint_skill::BLUEPRINT_PATH;
use crate::skills::identifier_skill::{FINAL_REPORT_PATH, PACKAGES_PATH};
use crate::skills::validator_skill::REPORT_PATH;
use crate::skills::{
    parse_decision, AgentInvoker, BackendSkill, BlueprintSkill, CorrectorSkill, ErrorFixerSkill,
    IdentifiedPackages, IdentifierSkill, ManagerSkill, Route, UiSkill, ValidatorSkill,
};
use crate::tools::extractor::{extract_files, FileSet};
use crate::tools::manifest::{synthesize_manifest, MANIFEST_PATH};
use crate::tools::registry::{BatchResolution, NpmRegistry, PackageResolver};

use super::events::{chunk_text, Stage, StageEvent};
use super::log_sink::{LogSink, TracingLogSink};
use super::pipeline::{Mode, Pipeline};
use super::request::{OrchestrationRequest, RunOutcome, RunStatus};

type Step<T> = Result<T, OrchestrationError>;

/// Run summary stored as `final-report.json`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FinalReport {
    pub timestamp: String,
    pub files_generated: Vec<String>,
    pub dependencies_resolved: BTreeMap<String, String>,
    pub dependencies_failed: BTreeMap<String, String>,
    pub all_logs: Vec<String>,
    pub total_stages: u32,
    pub status: RunStatus,
}

/// The stage sequencer
pub struct Coordinator {
    config: Arc<OrchestratorConfig>,
    invoker: AgentInvoker,
    resolver: Arc<dyn PackageResolver>,
    sink: Arc<dyn LogSink>,
    cancel: CancellationToken,
    pipeline: Pipeline,
    events: Vec<StageEvent>,
    event_tx: Option<mpsc::Sender<StageEvent>>,
    files: FileSet,
    transcript: Vec<String>,
    stages_started: u32,
}

impl Coordinator {
    pub fn new(
        config: Arc<OrchestratorConfig>,
        invoker: AgentInvoker,
        resolver: Arc<dyn PackageResolver>,
    ) -> Self {
        Self {
            config,
            invoker,
            resolver,
            sink: Arc::new(TracingLogSink),
            cancel: CancellationToken::new(),
            pipeline: Pipeline::new(Mode::default()),
            events: Vec::new(),
            event_tx: None,
            files: FileSet::new(),
            transcript: Vec::new(),
            stages_started: 0,
        }
    }

    /// Production wiring: Gemini for the agents, the npm registry for packages.
    pub fn from_config(config: Arc<OrchestratorConfig>) -> Result<Self, ConfigError> {
        let invoker = AgentInvoker::from_config(&config.model)?;
        let resolver = Arc::new(NpmRegistry::new(&config.registry)?);
        Ok(Self::new(config, invoker, resolver))
    }

    /// Set event channel for streaming events
    pub fn with_event_channel(mut self, tx: mpsc::Sender<StageEvent>) -> Self {
        self.event_tx = Some(tx);
        self
    }

    pub fn with_log_sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Every event emitted by the last run, in order
    pub fn events(&self) -> &[StageEvent] {
        &self.events
    }

    /// Run one request to a terminal state.
    #[tracing::instrument(
        skip_all,
        fields(mode = ?request.mode, prompt_preview = %request.prompt.chars().take(50).collect::<String>())
    )]
    pub async fn run(&mut self, request: OrchestrationRequest) -> RunOutcome {
        self.pipeline = Pipeline::new(request.mode);
        self.events.clear();
        self.transcript.clear();
        self.stages_started = 0;
        self.files = request.current_files.clone();

        let status = match self.drive(&request).await {
            Ok(status) => status,
            Err(OrchestrationError::Cancelled) => {
                tracing::warn!(stages = self.stages_started, "Orchestration cancelled");
                RunStatus::Cancelled
            }
        };

        tracing::info!(
            status = ?status,
            pipeline = ?self.pipeline.stage,
            stages = self.stages_started,
            files = self.files.len(),
            "Orchestration finished"
        );

        RunOutcome {
            status,
            files: std::mem::take(&mut self.files),
            transcript: std::mem::take(&mut self.transcript),
            stages_started: self.stages_started,
            final_stage: self.pipeline.stage,
        }
    }

    async fn drive(&mut self, request: &OrchestrationRequest) -> Step<RunStatus> {
        if self.cancel.is_cancelled() {
            return Err(OrchestrationError::Cancelled);
        }
        match request.mode {
            Mode::Manager => self.run_manager(request).await,
            Mode::Correct => self.run_correct(request).await,
            Mode::Generate => self.run_generate(request).await,
        }
    }

    // ---------------------------------------------------------------------
    // Branches
    // ---------------------------------------------------------------------

    async fn run_manager(&mut self, request: &OrchestrationRequest) -> Step<RunStatus> {
        let invoker = self.invoker.clone();
        let files = self.files.clone();
        let call = ManagerSkill::run(
            &invoker,
            &request.prompt,
            &request.conversation_history,
            &files,
        );

        let raw = match self.start_stage(Stage::Manager, call).await? {
            Ok(raw) => raw,
            Err(e) => return self.abort(Stage::Manager, e).await,
        };

        let decision = parse_decision(&raw, request.deployment_error.is_some());
        self.finish_stage(Stage::Manager, &decision.reply, FileSet::new())
            .await?;
        self.log(
            Stage::Manager,
            format!("Manager routed the request to {}", route_name(decision.route)),
        )
        .await?;
        self.pipeline.route(decision.route);

        match decision.route {
            Route::Reply => {
                self.emit(StageEvent::Chat {
                    stage: Stage::Manager,
                    content: decision.reply,
                })
                .await?;
                Ok(RunStatus::Conversational)
            }
            Route::Correct => self.run_correct(request).await,
            Route::Generate => self.run_generate(request).await,
        }
    }

    /// Repair the caller's files. Terminal: never continues into generation.
    async fn run_correct(&mut self, request: &OrchestrationRequest) -> Step<RunStatus> {
        let problem = problem_statement(&request.prompt, request.deployment_error.as_ref());
        let invoker = self.invoker.clone();
        let files = self.files.clone();
        let call = CorrectorSkill::repair(
            &invoker,
            &files,
            &problem,
            &request.conversation_history,
        );

        match self.start_stage(Stage::Corrector, call).await? {
            Ok(output) => {
                let corrected = extract_files(&output);
                self.finish_stage(Stage::Corrector, &output, corrected)
                    .await?;
                self.pipeline.advance();
                Ok(RunStatus::Corrected)
            }
            Err(e) => self.abort(Stage::Corrector, e).await,
        }
    }

    async fn run_generate(&mut self, request: &OrchestrationRequest) -> Step<RunStatus> {
        let invoker = self.invoker.clone();
        let prompt = request.prompt.as_str();
        let history = request.conversation_history.as_slice();

        // Load-bearing stages
        let blueprint = match self
            .start_stage(Stage::Pkg, BlueprintSkill::run(&invoker, prompt))
            .await?
        {
            Ok(out) => out,
            Err(e) => return self.abort(Stage::Pkg, e).await,
        };
        self.finish_stage(Stage::Pkg, &blueprint, single_file(BLUEPRINT_PATH, &blueprint))
            .await?;
        self.pipeline.advance();

        let backend = match self
            .start_stage(Stage::Backend, BackendSkill::run(&invoker, &blueprint, prompt))
            .await?
        {
            Ok(out) => out,
            Err(e) => return self.abort(Stage::Backend, e).await,
        };
        self.finish_stage(Stage::Backend, &backend, extract_files(&backend))
            .await?;
        self.pipeline.advance();

        let ui = match self
            .start_stage(Stage::Ui, UiSkill::run(&invoker, &blueprint, &backend, prompt))
            .await?
        {
            Ok(out) => out,
            Err(e) => return self.abort(Stage::Ui, e).await,
        };
        self.finish_stage(Stage::Ui, &ui, extract_files(&ui)).await?;
        self.pipeline.advance();

        // Advisory stages
        let validation = ValidatorSkill::run(&invoker, &blueprint, &backend, &ui, prompt);
        let report = match self.start_stage(Stage::Validator, validation).await? {
            Ok(out) => {
                self.finish_stage(Stage::Validator, &out, single_file(REPORT_PATH, &out))
                    .await?;
                out
            }
            Err(e) => {
                self.skip(Stage::Validator, e).await?;
                String::new()
            }
        };
        self.pipeline.advance();

        let files = self.files.clone();
        let correction = CorrectorSkill::follow_up(&invoker, &report, &files, prompt, history);
        match self.start_stage(Stage::Corrector, correction).await? {
            Ok(out) => {
                self.finish_stage(Stage::Corrector, &out, extract_files(&out))
                    .await?
            }
            Err(e) => self.skip(Stage::Corrector, e).await?,
        }
        self.pipeline.advance();

        let transcript = self.transcript.clone();
        match self
            .start_stage(Stage::ErrorFixer, ErrorFixerSkill::run(&invoker, &transcript, prompt))
            .await?
        {
            Ok(out) => {
                self.finish_stage(Stage::ErrorFixer, &out, extract_files(&out))
                    .await?
            }
            Err(e) => self.skip(Stage::ErrorFixer, e).await?,
        }
        self.pipeline.advance();

        self.run_identifier().await
    }

    /// Identify packages, resolve them, write the manifest and the run summary.
    async fn run_identifier(&mut self) -> Step<RunStatus> {
        let stage = Stage::Identifier;
        let invoker = self.invoker.clone();
        let files = self.files.clone();

        let identified = match self
            .start_stage(stage, IdentifierSkill::run(&invoker, &files))
            .await?
        {
            Ok(output) => {
                self.emit_chunks(stage, &output).await?;
                match IdentifiedPackages::parse(&output) {
                    Ok(parsed) => parsed,
                    Err(e) => {
                        tracing::warn!(error = %e, "Identifier output unreadable, falling back");
                        self.log(
                            stage,
                            format!("Failed to parse identifier output ({}), using an empty package list", e),
                        )
                        .await?;
                        IdentifiedPackages::default()
                    }
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Identifier agent failed, falling back");
                self.log(
                    stage,
                    format!("Identifier agent failed ({}), using an empty package list", e),
                )
                .await?;
                IdentifiedPackages::default()
            }
        };

        let identified_names = identified.package_names();
        self.log(
            stage,
            format!(
                "Identified {} npm packages: {}",
                identified_names.len(),
                identified_names.join(", ")
            ),
        )
        .await?;
        let listing = serde_json::to_string_pretty(&serde_json::json!({ "packages": identified_names }))
            .unwrap_or_default();
        self.files.insert(PACKAGES_PATH.to_string(), listing);

        let mut names = identified_names;
        for core in &self.config.core_packages {
            if !names.contains(core) {
                names.push(core.clone());
            }
        }

        let batch = self.resolve_packages(stage, &names).await?;

        match synthesize_manifest(&batch.resolved) {
            Some(manifest) => {
                self.files.insert(MANIFEST_PATH.to_string(), manifest);
                self.log(
                    stage,
                    format!("Created package.json with {} dependencies", batch.resolved.len()),
                )
                .await?;
            }
            None => {
                self.log(stage, "No npm package resolved, skipping package.json")
                    .await?
            }
        }
        self.pipeline.advance();

        let report = FinalReport {
            timestamp: Utc::now().to_rfc3339(),
            files_generated: self.files.keys().cloned().collect(),
            dependencies_resolved: batch.resolved,
            dependencies_failed: batch.failed,
            all_logs: self.transcript.clone(),
            total_stages: self.stages_started,
            status: RunStatus::Completed,
        };
        let summary = serde_json::to_string_pretty(&report).unwrap_or_default();
        self.files
            .insert(FINAL_REPORT_PATH.to_string(), summary.clone());

        let files = self.files.clone();
        self.emit(StageEvent::StageComplete {
            stage,
            output: summary,
            files,
        })
        .await?;
        Ok(RunStatus::Completed)
    }

    /// Sequential lookups with a pause between them. Failures are collected.
    async fn resolve_packages(&mut self, stage: Stage, names: &[String]) -> Step<BatchResolution> {
        self.log(stage, format!("Resolving {} packages on npm", names.len()))
            .await?;

        let resolver = self.resolver.clone();
        let pause = self.config.registry.batch_pause();
        let mut batch = BatchResolution::default();

        for (i, name) in names.iter().enumerate() {
            if i > 0 {
                self.suspend(tokio::time::sleep(pause)).await?;
            }
            self.log(stage, format!("Resolving {}...", name)).await?;
            let result = self.suspend(resolver.resolve(name)).await?;
            let line = batch.record(name, result);
            self.log(stage, line).await?;
        }

        Ok(batch)
    }

    // ---------------------------------------------------------------------
    // Stage plumbing
    // ---------------------------------------------------------------------

    /// Announce `stage`, then await its agent call.
    async fn start_stage<F>(&mut self, stage: Stage, call: F) -> Step<Result<String, AgentError>>
    where
        F: Future<Output = Result<String, AgentError>>,
    {
        self.log(stage, format!("Starting {} stage", stage)).await?;
        self.emit(StageEvent::StageStart { stage }).await?;
        self.stages_started += 1;
        self.suspend(call).await
    }

    /// Stream the output in chunks, merge `files`, then complete the stage.
    async fn finish_stage(&mut self, stage: Stage, output: &str, files: FileSet) -> Step<()> {
        self.emit_chunks(stage, output).await?;
        self.log(
            stage,
            format!(
                "{} stage completed: {} chars, {} files",
                stage,
                output.chars().count(),
                files.len()
            ),
        )
        .await?;
        self.files
            .extend(files.iter().map(|(k, v)| (k.clone(), v.clone())));
        self.emit(StageEvent::StageComplete {
            stage,
            output: output.to_string(),
            files,
        })
        .await
    }

    async fn emit_chunks(&mut self, stage: Stage, output: &str) -> Step<()> {
        for chunk in chunk_text(output, self.config.chunk_size) {
            self.emit(StageEvent::StageOutput {
                stage,
                chunk: chunk.to_string(),
            })
            .await?;
        }
        Ok(())
    }

    /// Load-bearing failure: error event, pipeline aborted.
    async fn abort(&mut self, stage: Stage, err: AgentError) -> Step<RunStatus> {
        tracing::error!(stage = %stage, error = %err, "Stage failed, aborting run");
        self.log(stage, format!("{} stage failed: {}", stage, err))
            .await?;
        self.emit(StageEvent::StageError {
            stage,
            error: err.to_string(),
        })
        .await?;
        self.pipeline.fail();
        Ok(RunStatus::Aborted)
    }

    /// Advisory failure: logged and reported, the run continues.
    async fn skip(&mut self, stage: Stage, err: AgentError) -> Step<()> {
        tracing::warn!(stage = %stage, error = %err, "Advisory stage failed, continuing");
        self.log(stage, format!("{} stage failed, continuing: {}", stage, err))
            .await?;
        self.emit(StageEvent::StageError {
            stage,
            error: err.to_string(),
        })
        .await
    }

    /// Record a transcript line and send it to the caller.
    async fn log(&mut self, stage: Stage, message: impl Into<String>) -> Step<()> {
        let message = message.into();
        self.sink.record(stage, &message);
        self.transcript.push(message.clone());
        self.emit(StageEvent::Log { stage, message }).await
    }

    /// Emit an event
    async fn emit(&mut self, event: StageEvent) -> Step<()> {
        if self.cancel.is_cancelled() {
            return Err(OrchestrationError::Cancelled);
        }
        if let Some(tx) = &self.event_tx {
            let sent = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Err(OrchestrationError::Cancelled),
                sent = tx.send(event.clone()) => sent,
            };
            if sent.is_err() {
                tracing::warn!("Event receiver dropped, cancelling run");
                self.cancel.cancel();
                return Err(OrchestrationError::Cancelled);
            }
        }
        self.events.push(event);
        Ok(())
    }

    /// Await `fut` unless the run is cancelled or the caller hangs up first.
    async fn suspend<F: Future>(&self, fut: F) -> Step<F::Output> {
        let hung_up = receiver_gone(self.event_tx.clone());
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(OrchestrationError::Cancelled),
            _ = hung_up => {
                tracing::warn!("Event receiver dropped, cancelling run");
                self.cancel.cancel();
                Err(OrchestrationError::Cancelled)
            }
            out = fut => Ok(out),
        }
    }
}

async fn receiver_gone(tx: Option<mpsc::Sender<StageEvent>>) {
    match tx {
        Some(tx) => tx.closed().await,
        None => std::future::pending().await,
    }
}

fn route_name(route: Route) -> &'static str {
    match route {
        Route::Generate => "generate",
        Route::Correct => "correct",
        Route::Reply => "reply",
    }
}

fn single_file(path: &str, content: &str) -> FileSet {
    FileSet::from([(path.to_string(), content.to_string())])
}

/// What the corrector is asked to fix.
fn problem_statement(prompt: &str, error: Option<&DeploymentError>) -> String {
    match error {
        Some(error) => format!(
            "{}\n\nUser message:\n{}",
            CorrectorSkill::deployment_problem(error),
            prompt
        ),
        None => prompt.to_string(),
    }
}
