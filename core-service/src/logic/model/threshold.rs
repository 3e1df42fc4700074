//! Anomaly Threshold
//!
//! A window whose score exceeds the threshold is a failure.

use serde::{Deserialize, Serialize};

use crate::constants::ANOMALY_THRESHOLD;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ThresholdConfig {
    /// Base threshold (0.0 - 1.0)
    pub base_threshold: f32,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            base_threshold: ANOMALY_THRESHOLD,
        }
    }
}

impl ThresholdConfig {
    pub fn new(base: f32) -> Self {
        Self {
            base_threshold: base.clamp(0.0, 1.0),
        }
    }

    pub fn is_anomaly(&self, score: f32) -> bool {
        score > self.base_threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_threshold() {
        let t = ThresholdConfig::default();
        assert!(!t.is_anomaly(0.65));
        assert!(t.is_anomaly(0.66));
        assert!(!t.is_anomaly(0.2));
    }
}
