//! Anomaly Window - fixed-length FIFO of recent frames
//!
//! Push newest, drop oldest once full. Discarded between runs.

use std::collections::VecDeque;

use crate::logic::telemetry::TelemetryFrame;

#[derive(Debug, Clone)]
pub struct AnomalyWindow {
    frames: VecDeque<TelemetryFrame>,
    capacity: usize,
}

impl AnomalyWindow {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            frames: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, frame: TelemetryFrame) {
        if self.frames.len() == self.capacity {
            self.frames.pop_front();
        }
        self.frames.push_back(frame);
    }

    pub fn frames(&self) -> impl Iterator<Item = &TelemetryFrame> {
        self.frames.iter()
    }

    pub fn latest(&self) -> Option<&TelemetryFrame> {
        self.frames.back()
    }

    /// Highest vibration seen in the window
    pub fn max_vibration(&self) -> Option<f64> {
        self.frames.iter().map(|f| f.vibration).reduce(f64::max)
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn is_full(&self) -> bool {
        self.frames.len() == self.capacity
    }

    pub fn clear(&mut self) {
        self.frames.clear();
    }

    pub fn status(&self) -> BufferStatus {
        BufferStatus {
            current_size: self.frames.len(),
            required_size: self.capacity,
            is_ready: self.is_full(),
            fill_percent: (self.frames.len() as f32 / self.capacity as f32 * 100.0).min(100.0),
        }
    }
}

/// Window fill information
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct BufferStatus {
    pub current_size: usize,
    pub required_size: usize,
    pub is_ready: bool,
    pub fill_percent: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(v: f64) -> TelemetryFrame {
        TelemetryFrame { vibration: v, temperature: 85.0, aero_load: 1500.0, timestamp: 0 }
    }

    #[test]
    fn test_window_drops_oldest() {
        let mut window = AnomalyWindow::new(3);
        for v in [1.0, 2.0, 3.0, 4.0] {
            window.push(frame(v));
        }

        let kept: Vec<f64> = window.frames().map(|f| f.vibration).collect();
        assert_eq!(kept, vec![2.0, 3.0, 4.0]);
        assert!(window.is_full());
        assert_eq!(window.max_vibration(), Some(4.0));
        assert_eq!(window.latest().map(|f| f.vibration), Some(4.0));
    }

    #[test]
    fn test_status_fill() {
        let mut window = AnomalyWindow::new(4);
        window.push(frame(1.0));
        let status = window.status();
        assert_eq!(status.current_size, 1);
        assert!(!status.is_ready);
        assert_eq!(status.fill_percent, 25.0);

        window.clear();
        assert!(window.is_empty());
    }
}
