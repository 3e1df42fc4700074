//! Diagnosis Module
//!
//! Failure event + baseline + knowledge base -> one proposal.
//!
//! # Components
//! - `types.rs`: failure, baseline and proposal types
//! - `physics.rs`: resonance/mass rule
//! - `llm.rs`: prompt and answer validation
//! - `engine.rs`: retrieval-augmented engine with rule fallback

pub mod engine;
pub mod llm;
pub mod physics;
pub mod types;

pub use engine::DiagnosisEngine;
pub use types::{BaselineSpec, Confidence, FailureEvent, Proposal, ProposalSource, Reading};
