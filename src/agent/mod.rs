//! Financial analysis agents.
//!
//! - [`roles`]: the six agent tasks and their prompts
//! - [`executor`]: timed execution of one task
//! - [`orchestrator`]: concurrent fan-out over all tasks

pub mod executor;
pub mod orchestrator;
pub mod roles;

pub use orchestrator::{Orchestrator, OrchestratorConfig, SourceDocument};
