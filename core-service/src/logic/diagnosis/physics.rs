//! Resonance Physics
//!
//! +1 mm of wall thickness shifts resonance by -10 Hz; each added millimetre
//! costs 60 g. Thickness is reported at 0.1 mm precision.

use super::types::{BaselineSpec, Reading};
use crate::constants::{DEFAULT_FAILURE_VIBRATION_HZ, GRAMS_PER_MM, HZ_PER_MM};

/// Round to one decimal place
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Vibration from a failure reading, defaulting when unparsable
pub fn failure_vibration(reading: &Reading) -> f64 {
    match reading.value() {
        Some(v) => v,
        None => {
            log::warn!(
                "Unparsable vibration reading {:?}, assuming {} Hz",
                reading,
                DEFAULT_FAILURE_VIBRATION_HZ
            );
            DEFAULT_FAILURE_VIBRATION_HZ
        }
    }
}

/// Thickness that moves resonance back to the baseline target
pub fn corrective_thickness(vibration_hz: f64, baseline: &BaselineSpec) -> f64 {
    round1(baseline.base_thickness_mm + (vibration_hz - baseline.target_resonance_hz) / HZ_PER_MM)
}

/// Component mass at `thickness_mm`
pub fn estimated_weight(thickness_mm: f64, baseline: &BaselineSpec) -> f64 {
    round1(baseline.base_weight_g + (thickness_mm - baseline.base_thickness_mm) * GRAMS_PER_MM)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_target_resonance_needs_no_correction() {
        let b = BaselineSpec::default();
        let t = corrective_thickness(45.0, &b);
        assert_eq!(t, 5.0);
        assert_eq!(estimated_weight(t, &b), 300.0);
    }

    #[test]
    fn test_known_corrections() {
        let b = BaselineSpec::default();
        assert_eq!(corrective_thickness(55.0, &b), 6.0);
        assert_eq!(estimated_weight(6.0, &b), 360.0);
        assert_eq!(corrective_thickness(80.0, &b), 8.5);
        assert_eq!(estimated_weight(8.0, &b), 480.0);
        assert_eq!(corrective_thickness(75.0, &b), 8.0);
    }

    #[test]
    fn test_thickness_rounds_to_tenth() {
        let b = BaselineSpec::default();
        assert_eq!(corrective_thickness(58.04, &b), 6.3);
        assert_eq!(estimated_weight(6.3, &b), 378.0);
    }

    #[test]
    fn test_unparsable_reading_defaults() {
        assert_eq!(failure_vibration(&Reading::from("sensor offline")), 80.0);
        assert_eq!(failure_vibration(&Reading::from("62.5 Hz")), 62.5);
    }
}
