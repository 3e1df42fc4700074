//! Central Configuration Constants
//!
//! Single source of truth for physics, regulatory and collaborator defaults.
//! Anything an operator may tune is read from the environment with a fallback here.

use std::path::PathBuf;
use std::time::Duration;

/// App name
pub const APP_NAME: &str = "Pit Wall";

/// App version
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

// ============================================
// Anomaly detection
// ============================================

/// Score above which a window is treated as a failure
pub const ANOMALY_THRESHOLD: f32 = 0.65;

/// Frames per anomaly window
pub const DEFAULT_WINDOW_SIZE: usize = 10;

/// Fallback scorer: vibration where the linear ramp starts (Hz)
pub const FALLBACK_VIBRATION_FLOOR_HZ: f64 = 60.0;

/// Fallback scorer: ramp width (Hz) from floor to full score
pub const FALLBACK_VIBRATION_SPAN_HZ: f64 = 30.0;

/// Fallback scorer: score reported for nominal vibration
pub const FALLBACK_BASELINE_SCORE: f32 = 0.02;

// ============================================
// Physics model
// ============================================

/// Nominal wall thickness of the component (mm)
pub const BASE_THICKNESS_MM: f64 = 5.0;

/// Nominal component mass at base thickness (g)
pub const BASE_WEIGHT_G: f64 = 300.0;

/// Target resonance after correction (Hz)
pub const TARGET_RESONANCE_HZ: f64 = 45.0;

/// Resonance shift per added millimetre (Hz / mm)
pub const HZ_PER_MM: f64 = 10.0;

/// Added mass per added millimetre (g / mm)
pub const GRAMS_PER_MM: f64 = 60.0;

/// Vibration assumed when the failure reading cannot be parsed (Hz)
pub const DEFAULT_FAILURE_VIBRATION_HZ: f64 = 80.0;

/// Material named in recommendations when the baseline does not say
pub const DEFAULT_MATERIAL: &str = "Titanium Alloy";

// ============================================
// Regulation
// ============================================

/// FIA Article 3.4 thickness ceiling (mm)
pub const REGULATORY_CEILING_MM: f64 = 8.0;

/// Rule id cited on every compliance verdict
pub const REGULATORY_RULE_ID: &str = "FIA-2025-ART-3.4";

// ============================================
// Collaborators
// ============================================

/// Label that engages autonomous monitoring on a ticket
pub const CRITICAL_LABEL: &str = "power-unit-vibrations";

/// Tracker status treated as terminal
pub const DEFAULT_DONE_STATUS: &str = "Done";

/// Branch every fix is proposed against
pub const DEFAULT_BRANCH: &str = "main";

/// Credential holding the source-control token
pub const SOURCE_CONTROL_TOKEN: &str = "bb_token";

/// Credential holding the source-control username
pub const SOURCE_CONTROL_USERNAME: &str = "bb_username";

/// Default per-call collaborator timeout (seconds)
pub const DEFAULT_COLLABORATOR_TIMEOUT: u64 = 10;

/// Default telemetry poll interval for the live monitor (milliseconds)
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 500;

/// Default credential secret
pub const DEFAULT_CREDENTIAL_SECRET: &str = "pitwall-credential-secret-change-in-production";

// ============================================
// Helper functions to read from env with fallback
// ============================================

/// Data directory for the SQLite state store
pub fn get_data_dir() -> PathBuf {
    std::env::var("PITWALL_DATA_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("pitwall")
        })
}

/// Collaborator timeout from environment or default
pub fn get_collaborator_timeout() -> Duration {
    let secs = std::env::var("PITWALL_COLLABORATOR_TIMEOUT_SECS")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(DEFAULT_COLLABORATOR_TIMEOUT);
    Duration::from_secs(secs)
}

/// Anomaly window length from environment or default
pub fn get_window_size() -> usize {
    std::env::var("PITWALL_WINDOW_SIZE")
        .ok()
        .and_then(|s| s.parse().ok())
        .filter(|n: &usize| *n > 0)
        .unwrap_or(DEFAULT_WINDOW_SIZE)
}

/// Optional ONNX anomaly model path
pub fn get_model_path() -> Option<PathBuf> {
    std::env::var("PITWALL_MODEL_PATH").ok().map(PathBuf::from)
}

/// Secret used to derive the credential encryption key
pub fn get_credential_secret() -> String {
    std::env::var("PITWALL_CREDENTIAL_SECRET")
        .unwrap_or_else(|_| DEFAULT_CREDENTIAL_SECRET.to_string())
}

/// Read an env var, treating empty strings as unset
pub fn env_opt(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|s| !s.trim().is_empty())
}
