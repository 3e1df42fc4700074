//! Anomaly Scoring - ONNX reconstruction model with deterministic fallback
//!
//! The model is an LSTM autoencoder over `[1, N, 3]` standardised frames
//! (vibration, temperature, aero load). Its score is the mean absolute
//! reconstruction error. Without a model, a vibration ramp is used.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use ndarray::Array3;
use ort::session::{builder::GraphOptimizationLevel, Session};
use ort::value::Value;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use super::buffer::AnomalyWindow;
use super::threshold::ThresholdConfig;
use crate::constants::{
    FALLBACK_BASELINE_SCORE, FALLBACK_VIBRATION_FLOOR_HZ, FALLBACK_VIBRATION_SPAN_HZ,
};
use crate::logic::telemetry::TelemetryFrame;

/// Values per frame fed to the model
pub const FEATURE_COUNT: usize = 3;

// ============================================================================
// DATA STRUCTURES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScoringMethod {
    Onnx,
    Fallback,
    /// Window not yet full; no model verdict
    Warmup,
}

/// Prediction output
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictionResult {
    pub score: f32,              // 0.0 - 1.0
    pub is_anomaly: bool,
    pub raw_mae: f32,            // Mean Absolute Error, 0 for fallback
    pub threshold: f32,
    pub inference_time_us: u64,  // Microseconds
    pub method: ScoringMethod,
}

impl PredictionResult {
    fn new(score: f32, raw_mae: f32, threshold: &ThresholdConfig, started: std::time::Instant, method: ScoringMethod) -> Self {
        let score = score.clamp(0.0, 1.0);
        Self {
            score,
            is_anomaly: threshold.is_anomaly(score),
            raw_mae,
            threshold: threshold.base_threshold,
            inference_time_us: started.elapsed().as_micros() as u64,
            method,
        }
    }
}

/// Standardisation constants from training (mean, std) per feature
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizationParams {
    pub mean: [f32; FEATURE_COUNT],
    pub std: [f32; FEATURE_COUNT],
}

impl Default for NormalizationParams {
    fn default() -> Self {
        Self {
            mean: [50.0, 82.5, 1500.0],
            std: [1.5, 1.5, 7.0],
        }
    }
}

impl NormalizationParams {
    pub fn normalize(&self, frame: &TelemetryFrame) -> [f32; FEATURE_COUNT] {
        let raw = [frame.vibration as f32, frame.temperature as f32, frame.aero_load as f32];
        let mut out = [0.0f32; FEATURE_COUNT];
        for i in 0..FEATURE_COUNT {
            out[i] = (raw[i] - self.mean[i]) / self.std[i].max(1e-8);
        }
        out
    }
}

/// Scorer status for the status view
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineStatus {
    pub model_loaded: bool,
    pub model_name: String,
    pub inference_device: String,
    pub avg_latency_ms: f32,
    pub inference_count: u64,
}

// ============================================================================
// ERROR HANDLING
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum InferenceError {
    #[error("model not found: {0}")]
    ModelNotFound(PathBuf),

    #[error("session error: {0}")]
    Session(String),

    #[error("tensor error: {0}")]
    Tensor(String),

    #[error("inference failed: {0}")]
    Run(String),
}

// ============================================================================
// SCORER TRAIT
// ============================================================================

/// Interchangeable window scorers
pub trait AnomalyScorer: Send + Sync {
    fn score(&self, window: &AnomalyWindow) -> Result<PredictionResult, InferenceError>;
    fn method(&self) -> ScoringMethod;
}

// ============================================================================
// FALLBACK
// ============================================================================

/// Linear vibration ramp above 60 Hz; fixed low score otherwise
#[derive(Debug, Clone, Default)]
pub struct FallbackScorer {
    threshold: ThresholdConfig,
}

impl FallbackScorer {
    pub fn new(threshold: ThresholdConfig) -> Self {
        Self { threshold }
    }

    pub fn score_vibration(vibration: f64) -> f32 {
        if vibration > FALLBACK_VIBRATION_FLOOR_HZ {
            (((vibration - FALLBACK_VIBRATION_FLOOR_HZ) / FALLBACK_VIBRATION_SPAN_HZ) as f32).clamp(0.1, 1.0)
        } else {
            FALLBACK_BASELINE_SCORE
        }
    }

    /// Score the newest frame; never fails
    pub fn predict(&self, window: &AnomalyWindow) -> PredictionResult {
        let started = std::time::Instant::now();
        let score = window
            .latest()
            .map(|f| Self::score_vibration(f.vibration))
            .unwrap_or(FALLBACK_BASELINE_SCORE);
        PredictionResult::new(score, 0.0, &self.threshold, started, ScoringMethod::Fallback)
    }
}

impl AnomalyScorer for FallbackScorer {
    fn score(&self, window: &AnomalyWindow) -> Result<PredictionResult, InferenceError> {
        Ok(self.predict(window))
    }

    fn method(&self) -> ScoringMethod {
        ScoringMethod::Fallback
    }
}

// ============================================================================
// ONNX RECONSTRUCTION MODEL
// ============================================================================

pub struct ReconstructionScorer {
    session: Mutex<Session>,
    output_name: String,
    model_path: String,
    normalization: NormalizationParams,
    threshold: ThresholdConfig,
}

impl ReconstructionScorer {
    /// Load ONNX model from file
    pub fn load(model_path: &Path, threshold: ThresholdConfig) -> Result<Self, InferenceError> {
        log::info!("Loading ONNX model from: {:?}", model_path);

        if !model_path.exists() {
            return Err(InferenceError::ModelNotFound(model_path.to_path_buf()));
        }

        let session = Session::builder()
            .map_err(|e| InferenceError::Session(format!("Failed to create session builder: {}", e)))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| InferenceError::Session(format!("Failed to set optimization: {}", e)))?
            .commit_from_file(model_path)
            .map_err(|e| InferenceError::Session(format!("Failed to load model: {}", e)))?;

        let output_name = session
            .outputs
            .first()
            .map(|o| o.name.clone())
            .ok_or_else(|| InferenceError::Session("No output defined".to_string()))?;

        log::info!("ONNX model loaded successfully");

        Ok(Self {
            session: Mutex::new(session),
            output_name,
            model_path: model_path.display().to_string(),
            normalization: NormalizationParams::default(),
            threshold,
        })
    }

    pub fn model_path(&self) -> &str {
        &self.model_path
    }
}

impl AnomalyScorer for ReconstructionScorer {
    fn score(&self, window: &AnomalyWindow) -> Result<PredictionResult, InferenceError> {
        let started = std::time::Instant::now();

        if !window.is_full() {
            return Ok(PredictionResult::new(0.0, 0.0, &self.threshold, started, ScoringMethod::Warmup));
        }

        let prepared: Vec<[f32; FEATURE_COUNT]> =
            window.frames().map(|f| self.normalization.normalize(f)).collect();
        let seq_len = prepared.len();
        let input_data: Vec<f32> = prepared.iter().flatten().copied().collect();

        let input_array = Array3::<f32>::from_shape_vec((1, seq_len, FEATURE_COUNT), input_data)
            .map_err(|e| InferenceError::Tensor(format!("Array error: {}", e)))?;

        let input_tensor = Value::from_array(input_array)
            .map_err(|e| InferenceError::Tensor(format!("Tensor error: {}", e)))?;

        let mut session = self.session.lock();
        let outputs = session
            .run(ort::inputs![input_tensor])
            .map_err(|e| InferenceError::Run(e.to_string()))?;

        let output = outputs
            .get(&self.output_name)
            .ok_or_else(|| InferenceError::Run("No output".to_string()))?;

        let output_tensor = output
            .try_extract_tensor::<f32>()
            .map_err(|e| InferenceError::Tensor(format!("Extract error: {}", e)))?;

        let data = output_tensor.1;

        let mut mae = 0.0f32;
        let mut count = 0;
        for (i, frame) in prepared.iter().enumerate() {
            for (j, original) in frame.iter().enumerate() {
                if let Some(reconstructed) = data.get(i * FEATURE_COUNT + j) {
                    mae += (original - reconstructed).abs();
                    count += 1;
                }
            }
        }
        if count == 0 {
            return Err(InferenceError::Run("Empty reconstruction".to_string()));
        }
        mae /= count as f32;

        Ok(PredictionResult::new(mae, mae, &self.threshold, started, ScoringMethod::Onnx))
    }

    fn method(&self) -> ScoringMethod {
        ScoringMethod::Onnx
    }
}

// ============================================================================
// AUTO
// ============================================================================

/// Model when loaded, fallback otherwise or on any inference error
pub struct AutoScorer {
    model: Option<ReconstructionScorer>,
    fallback: FallbackScorer,
    latency_sum: AtomicU64,
    inference_count: AtomicU64,
}

impl AutoScorer {
    pub fn new(model: Option<ReconstructionScorer>, threshold: ThresholdConfig) -> Self {
        Self {
            model,
            fallback: FallbackScorer::new(threshold),
            latency_sum: AtomicU64::new(0),
            inference_count: AtomicU64::new(0),
        }
    }

    /// Try the model at `path`; fall back silently when it cannot be loaded
    pub fn from_path(path: Option<&Path>, threshold: ThresholdConfig) -> Self {
        let model = path.and_then(|p| match ReconstructionScorer::load(p, threshold) {
            Ok(model) => Some(model),
            Err(e) => {
                log::warn!("Anomaly model unavailable ({}), using fallback scorer", e);
                None
            }
        });
        Self::new(model, threshold)
    }

    pub fn predict(&self, window: &AnomalyWindow) -> PredictionResult {
        let result = match self.model.as_ref().map(|m| m.score(window)) {
            Some(Ok(result)) => result,
            Some(Err(e)) => {
                log::debug!("ONNX failed ({}), using fallback", e);
                self.fallback.predict(window)
            }
            None => self.fallback.predict(window),
        };

        self.latency_sum.fetch_add(result.inference_time_us, Ordering::Relaxed);
        self.inference_count.fetch_add(1, Ordering::Relaxed);
        result
    }

    pub fn status(&self) -> EngineStatus {
        let sum = self.latency_sum.load(Ordering::Relaxed);
        let count = self.inference_count.load(Ordering::Relaxed);
        let avg = if count > 0 { (sum as f32 / count as f32) / 1000.0 } else { 0.0 };

        EngineStatus {
            model_loaded: self.model.is_some(),
            model_name: self
                .model
                .as_ref()
                .map(|m| m.model_path().to_string())
                .unwrap_or_else(|| "None".to_string()),
            inference_device: "ONNX Runtime (CPU)".to_string(),
            avg_latency_ms: avg,
            inference_count: count,
        }
    }
}

impl AnomalyScorer for AutoScorer {
    fn score(&self, window: &AnomalyWindow) -> Result<PredictionResult, InferenceError> {
        Ok(self.predict(window))
    }

    fn method(&self) -> ScoringMethod {
        match self.model {
            Some(_) => ScoringMethod::Onnx,
            None => ScoringMethod::Fallback,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn window_with(vibrations: &[f64], capacity: usize) -> AnomalyWindow {
        let mut window = AnomalyWindow::new(capacity);
        for v in vibrations {
            window.push(TelemetryFrame { vibration: *v, temperature: 85.0, aero_load: 1500.0, timestamp: 0 });
        }
        window
    }

    #[test]
    fn test_fallback_ramp() {
        assert_eq!(FallbackScorer::score_vibration(50.0), 0.02);
        assert_eq!(FallbackScorer::score_vibration(60.0), 0.02);
        assert_eq!(FallbackScorer::score_vibration(61.0), 0.1);
        assert!((FallbackScorer::score_vibration(75.0) - 0.5).abs() < 1e-6);
        assert_eq!(FallbackScorer::score_vibration(120.0), 1.0);
    }

    #[test]
    fn test_fallback_uses_latest_frame() {
        let scorer = FallbackScorer::default();
        let result = scorer.score(&window_with(&[95.0, 50.0], 5)).unwrap();
        assert_eq!(result.score, 0.02);
        assert!(!result.is_anomaly);

        let result = scorer.score(&window_with(&[50.0, 90.0], 5)).unwrap();
        assert_eq!(result.score, 1.0);
        assert!(result.is_anomaly);
        assert_eq!(result.method, ScoringMethod::Fallback);
    }

    #[test]
    fn test_auto_without_model_falls_back() {
        let scorer = AutoScorer::from_path(Some(Path::new("/nonexistent/model.onnx")), ThresholdConfig::default());
        let result = scorer.predict(&window_with(&[80.0], 3));

        assert_eq!(result.method, ScoringMethod::Fallback);
        assert!(!scorer.status().model_loaded);
        assert_eq!(scorer.status().inference_count, 1);
    }

    #[test]
    fn test_normalization_centres_nominal_frame() {
        let params = NormalizationParams::default();
        let frame = TelemetryFrame { vibration: 50.0, temperature: 82.5, aero_load: 1500.0, timestamp: 0 };
        assert_eq!(params.normalize(&frame), [0.0, 0.0, 0.0]);
    }
}
