//! Telemetry Frame
//!
//! One sensor sample. Only the newest frame is retained.

use serde::{Deserialize, Serialize};

/// Sensor sample from the rig
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TelemetryFrame {
    /// Hz
    pub vibration: f64,
    /// °C
    pub temperature: f64,
    /// N
    pub aero_load: f64,
    /// Epoch seconds
    pub timestamp: i64,
}

impl TelemetryFrame {
    pub fn now(vibration: f64, temperature: f64, aero_load: f64) -> Self {
        Self {
            vibration,
            temperature,
            aero_load,
            timestamp: chrono::Utc::now().timestamp(),
        }
    }

    /// Reject frames no sensor could have produced
    pub fn validate(&self) -> Result<(), String> {
        let fields = [
            ("vibration", self.vibration),
            ("temperature", self.temperature),
            ("aero_load", self.aero_load),
        ];
        for (name, value) in fields {
            if !value.is_finite() {
                return Err(format!("{} is not a finite number", name));
            }
        }
        if self.vibration < 0.0 {
            return Err("vibration cannot be negative".to_string());
        }
        if self.timestamp < 0 {
            return Err("timestamp cannot be negative".to_string());
        }
        Ok(())
    }
}

/// Result of `ingest_telemetry`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum IngestStatus {
    Accepted,
    Rejected { reason: String },
}

impl IngestStatus {
    pub fn is_accepted(&self) -> bool {
        matches!(self, IngestStatus::Accepted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate() {
        assert!(TelemetryFrame::now(50.0, 85.0, 1500.0).validate().is_ok());
        assert!(TelemetryFrame::now(f64::NAN, 85.0, 1500.0).validate().is_err());
        assert!(TelemetryFrame::now(-1.0, 85.0, 1500.0).validate().is_err());
        assert!(TelemetryFrame::now(50.0, f64::INFINITY, 1500.0).validate().is_err());
    }

    #[test]
    fn test_status_wire_shape() {
        let json = serde_json::to_value(IngestStatus::Rejected { reason: "bad".into() }).unwrap();
        assert_eq!(json["status"], "rejected");
        assert_eq!(json["reason"], "bad");
    }
}
