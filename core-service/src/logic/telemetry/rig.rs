//! Simulated Test Rig
//!
//! Nominal 50 Hz with a slow sine wobble, then a resonance failure injected
//! at frame 15 that climbs 2 Hz per frame up to +45 Hz.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::frame::TelemetryFrame;

pub const BASE_VIBRATION_HZ: f64 = 50.0;
pub const CRASH_START_FRAME: u64 = 15;
const CRASH_RAMP_HZ_PER_FRAME: f64 = 2.0;
const CRASH_CAP_HZ: f64 = 45.0;

pub struct TelemetryRig {
    step: u64,
    crash_start: u64,
    rng: StdRng,
}

impl Default for TelemetryRig {
    fn default() -> Self {
        Self::new()
    }
}

impl TelemetryRig {
    pub fn new() -> Self {
        Self {
            step: 0,
            crash_start: CRASH_START_FRAME,
            rng: StdRng::from_entropy(),
        }
    }

    /// Reproducible rig for tests
    pub fn seeded(seed: u64) -> Self {
        Self {
            step: 0,
            crash_start: CRASH_START_FRAME,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    pub fn with_crash_at(mut self, frame: u64) -> Self {
        self.crash_start = frame;
        self
    }

    pub fn step(&self) -> u64 {
        self.step
    }

    pub fn next_frame(&mut self) -> TelemetryFrame {
        let step = self.step;
        let t = step as f64;

        let vibration = if step < self.crash_start {
            BASE_VIBRATION_HZ + (t * 0.2).sin() * 1.5 + self.rng.gen_range(-0.5..0.5)
        } else {
            let intensity = ((step - self.crash_start) as f64 * CRASH_RAMP_HZ_PER_FRAME).min(CRASH_CAP_HZ);
            BASE_VIBRATION_HZ + intensity + self.rng.gen_range(-1.0..1.0)
        };

        let temperature = 85.0 + t * 0.05;
        let aero_load = 1500.0 + (t * 0.1).sin() * 10.0;

        self.step += 1;
        TelemetryFrame::now(vibration, temperature, aero_load)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nominal_phase_stays_near_baseline() {
        let mut rig = TelemetryRig::seeded(7);
        for _ in 0..CRASH_START_FRAME {
            let frame = rig.next_frame();
            assert!((frame.vibration - BASE_VIBRATION_HZ).abs() <= 2.0);
        }
    }

    #[test]
    fn test_crash_ramps_and_caps() {
        let mut rig = TelemetryRig::seeded(7);
        let frames: Vec<_> = (0..60).map(|_| rig.next_frame()).collect();

        assert!(frames[25].vibration > 68.0);
        let last = frames[59].vibration;
        assert!(last >= 94.0 && last <= 96.0);
        assert!((frames[40].temperature - 87.0).abs() < 1e-9);
    }
}
