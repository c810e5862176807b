//! # Vibe Skills
//!
//! One module per agent role. Every skill is a fixed system prompt plus a
//! prompt builder, run through the shared [`AgentInvoker`].
//!
//! ## Roles
//!
//! **Entry:**
//! - `ManagerSkill` - Converses with the user and routes the request
//!
//! **Generate pipeline** (in order):
//! - `BlueprintSkill` - Project blueprint (`pkg` stage)
//! - `BackendSkill` - API route handlers
//! - `UiSkill` - Pages and components
//! - `ValidatorSkill` - Audit report (advisory)
//! - `CorrectorSkill` - Missing/broken files (advisory; also the `correct` branch)
//! - `ErrorFixerSkill` - Fixes from the run transcript (advisory)
//! - `IdentifierSkill` - Real npm packages among the imports

pub mod invoker;
pub mod prompts;

pub mod manager_skill;

pub mod backend_skill;
pub mod blueprint_skill;
pub mod corrector_skill;
pub mod error_fixer_skill;
pub mod identifier_skill;
pub mod ui_skill;
pub mod validator_skill;

pub use backend_skill::BackendSkill;
pub use blueprint_skill::BlueprintSkill;
pub use corrector_skill::CorrectorSkill;
pub use error_fixer_skill::ErrorFixerSkill;
pub use identifier_skill::{IdentifiedPackages, IdentifierSkill};
pub use invoker::AgentInvoker;
pub use manager_skill::{parse_decision, ManagerDecision, ManagerSkill, Route};
pub use prompts::AgentRole;
pub use ui_skill::UiSkill;
pub use validator_skill::ValidatorSkill;
