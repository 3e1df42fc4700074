//! Pit Wall core: telemetry -> anomaly -> diagnosis -> compliance -> auto-fix -> learning

pub mod constants;
pub mod logic;

pub use logic::config::{PipelineConfig, SafetyConfig};
pub use logic::pipeline::{Collaborators, Orchestrator, PipelineError};
