//! # Swarm Orchestration
//!
//! Runs the agents for one request and streams what happens.
//!
//! ## Pipeline Flow
//!
//! ```text
//! [manager] → pkg → backend → ui → validator → corrector → error_fixer → identifier
//!     └──────→ corrector (repair branch)
//! ```

pub mod coordinator;
pub mod events;
pub mod log_sink;
pub mod pipeline;
pub mod request;

pub use coordinator::{Coordinator, FinalReport};
pub use events::{chunk_text, Stage, StageEvent};
pub use log_sink::{LogSink, MemoryLogSink, TracingLogSink};
pub use pipeline::{Mode, Pipeline, PipelineStage};
pub use request::{OrchestrationRequest, RunOutcome, RunStatus};
