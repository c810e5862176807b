//! Run transcript sink.
//!
//! The coordinator writes every transcript line here. What the sink does with
//! it is independent of the caller's event stream.

use super::events::Stage;
use std::sync::Mutex;

pub trait LogSink: Send + Sync {
    fn record(&self, stage: Stage, message: &str);
}

/// Forwards transcript lines to `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingLogSink;

impl LogSink for TracingLogSink {
    fn record(&self, stage: Stage, message: &str) {
        tracing::info!(stage = %stage, "{}", message);
    }
}

/// Keeps transcript lines in memory
#[derive(Debug, Default)]
pub struct MemoryLogSink {
    lines: Mutex<Vec<(Stage, String)>>,
}

impl MemoryLogSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> Vec<(Stage, String)> {
        match self.lines.lock() {
            Ok(lines) => lines.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }
}

impl LogSink for MemoryLogSink {
    fn record(&self, stage: Stage, message: &str) {
        let mut lines = match self.lines.lock() {
            Ok(lines) => lines,
            Err(poisoned) => poisoned.into_inner(),
        };
        lines.push((stage, message.to_string()));
    }
}
