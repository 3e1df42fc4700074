//! Model Module - anomaly scoring
//!
//! Scoring is kept apart from telemetry collection so the ONNX model and
//! the fallback ramp can be swapped behind one trait.

pub mod buffer;
pub mod inference;
pub mod threshold;

pub use buffer::{AnomalyWindow, BufferStatus};
pub use inference::{
    AnomalyScorer, AutoScorer, EngineStatus, FallbackScorer, InferenceError, PredictionResult,
    ReconstructionScorer, ScoringMethod,
};
pub use threshold::ThresholdConfig;
