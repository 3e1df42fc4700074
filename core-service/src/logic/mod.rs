//! Logic Module - pipeline stages and their collaborators
//!
//! ## Layout
//! - `telemetry/`, `model/` - frames, rig simulator, anomaly scoring
//! - `diagnosis/`, `compliance/` - physics proposal and the regulatory gate
//! - `autofix/`, `learning/` - deployment and the knowledge base
//! - `pipeline/` - orchestrator that sequences the stages per ticket
//! - `collaborators/`, `notify/`, `storage/` - outside world and state

// Pipeline stages
pub mod analysis_loop;
pub mod autofix;
pub mod compliance;
pub mod diagnosis;
pub mod learning;
pub mod model;
pub mod telemetry;

// Orchestration
pub mod config;
pub mod dashboard;
pub mod incident;
pub mod pipeline;

// Infrastructure
pub mod collaborators;
pub mod notify;
pub mod storage;
