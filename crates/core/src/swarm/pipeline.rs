//! # Pipeline States
//!
//! Where a run is, and where it may go next.
//!
//! ```text
//! manager -> { done | correct | pkg }
//! correct -> done
//! pkg -> backend -> ui -> validator -> corrector -> error_fixer -> identifier -> done
//! pkg | backend | ui | manager | correct -> aborted (on failure)
//! ```

use crate::skills::manager_skill::Route;
use serde::{Deserialize, Serialize};

/// Entry mode chosen by the caller
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Generate,
    Correct,
    Manager,
}

/// State of the pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Manager,
    /// Standalone repair branch
    Correct,
    Pkg,
    Backend,
    Ui,
    Validator,
    Corrector,
    ErrorFixer,
    Identifier,
    Done,
    Aborted,
}

/// The pipeline state machine
#[derive(Debug, Clone)]
pub struct Pipeline {
    pub stage: PipelineStage,
}

impl Pipeline {
    pub fn new(mode: Mode) -> Self {
        let stage = match mode {
            Mode::Manager => PipelineStage::Manager,
            Mode::Correct => PipelineStage::Correct,
            Mode::Generate => PipelineStage::Pkg,
        };
        Self { stage }
    }

    /// Apply the manager's decision. Ignored outside the manager state.
    pub fn route(&mut self, route: Route) {
        if self.stage != PipelineStage::Manager {
            return;
        }
        self.stage = match route {
            Route::Generate => PipelineStage::Pkg,
            Route::Correct => PipelineStage::Correct,
            Route::Reply => PipelineStage::Done,
        };
    }

    /// Advance to the next stage
    pub fn advance(&mut self) {
        self.stage = match self.stage {
            PipelineStage::Manager => PipelineStage::Done,
            PipelineStage::Correct => PipelineStage::Done,
            PipelineStage::Pkg => PipelineStage::Backend,
            PipelineStage::Backend => PipelineStage::Ui,
            PipelineStage::Ui => PipelineStage::Validator,
            PipelineStage::Validator => PipelineStage::Corrector,
            PipelineStage::Corrector => PipelineStage::ErrorFixer,
            PipelineStage::ErrorFixer => PipelineStage::Identifier,
            PipelineStage::Identifier => PipelineStage::Done,
            PipelineStage::Done => PipelineStage::Done,
            PipelineStage::Aborted => PipelineStage::Aborted,
        };
    }

    /// Abort the pipeline
    pub fn fail(&mut self) {
        self.stage = PipelineStage::Aborted;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_runs_fixed_order() {
        let mut pipeline = Pipeline::new(Mode::Generate);
        let mut seen = vec![pipeline.stage];
        while pipeline.stage != PipelineStage::Done {
            pipeline.advance();
            seen.push(pipeline.stage);
        }
        assert_eq!(
            seen,
            vec![
                PipelineStage::Pkg,
                PipelineStage::Backend,
                PipelineStage::Ui,
                PipelineStage::Validator,
                PipelineStage::Corrector,
                PipelineStage::ErrorFixer,
                PipelineStage::Identifier,
                PipelineStage::Done
            ]
        );
    }

    #[test]
    fn test_manager_routes() {
        let mut reply = Pipeline::new(Mode::Manager);
        reply.route(Route::Reply);
        assert_eq!(reply.stage, PipelineStage::Done);

        let mut correct = Pipeline::new(Mode::Manager);
        correct.route(Route::Correct);
        assert_eq!(correct.stage, PipelineStage::Correct);
        correct.advance();
        assert_eq!(correct.stage, PipelineStage::Done);

        let mut generate = Pipeline::new(Mode::Manager);
        generate.route(Route::Generate);
        assert_eq!(generate.stage, PipelineStage::Pkg);
    }

    #[test]
    fn test_route_only_applies_to_manager() {
        let mut pipeline = Pipeline::new(Mode::Generate);
        pipeline.route(Route::Reply);
        assert_eq!(pipeline.stage, PipelineStage::Pkg);
    }

    #[test]
    fn test_abort_is_terminal() {
        let mut pipeline = Pipeline::new(Mode::Generate);
        pipeline.advance();
        pipeline.fail();
        pipeline.advance();
        assert_eq!(pipeline.stage, PipelineStage::Aborted);
    }
}
