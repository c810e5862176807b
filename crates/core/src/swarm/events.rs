//! # Stage Events
//!
//! The progress feed sent to the caller, one JSON object per line. Each
//! variant carries only the fields of its kind; `type` is the tag.

use crate::tools::extractor::FileSet;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stage identifier as it appears on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Manager,
    /// Blueprint generation
    Pkg,
    Backend,
    Ui,
    Validator,
    Corrector,
    ErrorFixer,
    Identifier,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Manager => "manager",
            Stage::Pkg => "pkg",
            Stage::Backend => "backend",
            Stage::Ui => "ui",
            Stage::Validator => "validator",
            Stage::Corrector => "corrector",
            Stage::ErrorFixer => "error_fixer",
            Stage::Identifier => "identifier",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An event in the orchestration stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StageEvent {
    StageStart {
        stage: Stage,
    },
    /// A slice of the stage's raw output, in order
    StageOutput {
        stage: Stage,
        chunk: String,
    },
    StageComplete {
        stage: Stage,
        output: String,
        files: FileSet,
    },
    StageError {
        stage: Stage,
        error: String,
    },
    Log {
        stage: Stage,
        message: String,
    },
    /// Conversational answer that ends the run
    Chat {
        stage: Stage,
        content: String,
    },
}

impl StageEvent {
    pub fn stage(&self) -> Stage {
        match self {
            StageEvent::StageStart { stage }
            | StageEvent::StageOutput { stage, .. }
            | StageEvent::StageComplete { stage, .. }
            | StageEvent::StageError { stage, .. }
            | StageEvent::Log { stage, .. }
            | StageEvent::Chat { stage, .. } => *stage,
        }
    }

    /// Newline-terminated JSON record
    pub fn to_ndjson(&self) -> Result<String, serde_json::Error> {
        let mut line = serde_json::to_string(self)?;
        line.push('\n');
        Ok(line)
    }
}

/// Split `text` into slices of at most `size` characters.
///
/// Concatenating the slices gives back `text`. Empty text yields nothing.
pub fn chunk_text(text: &str, size: usize) -> Vec<&str> {
    let size = size.max(1);
    let mut chunks = Vec::new();
    let mut start = 0;
    let mut count = 0;

    for (idx, _) in text.char_indices() {
        if count == size {
            chunks.push(&text[start..idx]);
            start = idx;
            count = 0;
        }
        count += 1;
    }
    if start < text.len() {
        chunks.push(&text[start..]);
    }
    chunks
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_format() {
        let event = StageEvent::StageStart { stage: Stage::ErrorFixer };
        assert_eq!(
            event.to_ndjson().unwrap(),
            "{\"type\":\"stage_start\",\"stage\":\"error_fixer\"}\n"
        );

        let mut files = FileSet::new();
        files.insert("a.ts".into(), "x".into());
        let event = StageEvent::StageComplete {
            stage: Stage::Backend,
            output: "out".into(),
            files,
        };
        let value: serde_json::Value = serde_json::to_value(&event).unwrap();
        assert_eq!(value["type"], "stage_complete");
        assert_eq!(value["files"]["a.ts"], "x");

        let value = serde_json::to_value(StageEvent::StageError {
            stage: Stage::Pkg,
            error: "boom".into(),
        })
        .unwrap();
        assert_eq!(value, serde_json::json!({"type": "stage_error", "stage": "pkg", "error": "boom"}));
    }

    #[test]
    fn test_event_from_wire() {
        let event: StageEvent =
            serde_json::from_str(r#"{"type":"log","stage":"identifier","message":"hi"}"#).unwrap();
        assert_eq!(
            event,
            StageEvent::Log {
                stage: Stage::Identifier,
                message: "hi".into()
            }
        );
    }

    #[test]
    fn test_chunks_of_250_chars() {
        let text = "a".repeat(250);
        let chunks = chunk_text(&text, 100);
        assert_eq!(chunks.iter().map(|c| c.len()).collect::<Vec<_>>(), vec![100, 100, 50]);
        assert_eq!(chunks.concat(), text);
    }

    #[test]
    fn test_chunks_respect_char_boundaries() {
        let text = "é".repeat(150);
        let chunks = chunk_text(&text, 100);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].chars().count(), 100);
        assert_eq!(chunks.concat(), text);
        assert!(chunk_text("", 100).is_empty());
    }
}
