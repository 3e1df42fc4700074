//! Monitor loop
//!
//! Pulls frames from a telemetry source, scores the rolling window and
//! raises at most one failure per run. The stop flag is checked before every
//! frame, so an operator stop lands within one iteration.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;

use crate::logic::diagnosis::{FailureEvent, Reading};
use crate::logic::model::{AnomalyScorer, AnomalyWindow};
use crate::logic::storage::{keys, StateStore};
use crate::logic::telemetry::{TelemetryFrame, TelemetryRig};

/// Where the loop gets its frames
pub trait TelemetrySource: Send {
    /// `None` when no new frame is available this tick
    fn next_frame(&mut self) -> Option<TelemetryFrame>;
}

impl TelemetrySource for TelemetryRig {
    fn next_frame(&mut self) -> Option<TelemetryFrame> {
        Some(TelemetryRig::next_frame(self))
    }
}

/// Follows the `latest_telemetry` slot, yielding each distinct frame once
pub struct StoreFeed {
    store: Arc<dyn StateStore>,
    last: Option<TelemetryFrame>,
}

impl StoreFeed {
    pub fn new(store: Arc<dyn StateStore>) -> Self {
        Self { store, last: None }
    }
}

impl TelemetrySource for StoreFeed {
    fn next_frame(&mut self) -> Option<TelemetryFrame> {
        let frame: TelemetryFrame = match self.store.get_json(keys::LATEST_TELEMETRY) {
            Ok(Some(frame)) => frame,
            Ok(None) => return None,
            Err(e) => {
                log::warn!("Telemetry feed read failed: {}", e);
                return None;
            }
        };

        if self.last == Some(frame) {
            return None;
        }
        self.last = Some(frame);
        Some(frame)
    }
}

#[derive(Debug, Clone)]
pub struct MonitorOptions {
    pub window_size: usize,
    pub poll_interval: Duration,
    /// `None` runs until a failure or an operator stop
    pub max_iterations: Option<u64>,
}

impl Default for MonitorOptions {
    fn default() -> Self {
        Self {
            window_size: crate::constants::DEFAULT_WINDOW_SIZE,
            poll_interval: Duration::from_millis(crate::constants::DEFAULT_POLL_INTERVAL_MS),
            max_iterations: None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct MonitorReport {
    pub iterations: u64,
    pub frames: u64,
    /// 1-based index of the frame that fired
    pub failure_frame: Option<u64>,
    pub failure: Option<FailureEvent>,
    pub stopped: bool,
}

/// Build the failure event for the current window
pub fn failure_event(ticket_id: &str, window: &AnomalyWindow, score: f32) -> FailureEvent {
    let max_vibration = window
        .max_vibration()
        .map(|v| Reading::Text(format!("{:.2} Hz", v)))
        .unwrap_or_else(|| Reading::Text("Unknown".to_string()));

    FailureEvent {
        ticket_id: ticket_id.to_string(),
        max_vibration,
        temperature: window.latest().map(|f| f.temperature).unwrap_or_default(),
        anomaly_score: f64::from(score),
        timestamp: Utc::now().to_rfc3339(),
    }
}

/// Run one monitored test. `on_frame` sees every frame before it is scored.
pub async fn run_monitor<F>(
    ticket_id: &str,
    source: &mut dyn TelemetrySource,
    scorer: &dyn AnomalyScorer,
    stop: &AtomicBool,
    options: &MonitorOptions,
    mut on_frame: F,
) -> MonitorReport
where
    F: FnMut(&TelemetryFrame),
{
    let mut window = AnomalyWindow::new(options.window_size);
    let mut report = MonitorReport::default();

    log::info!("[{}] Monitor started ({:?})", ticket_id, scorer.method());

    loop {
        if stop.load(Ordering::Relaxed) {
            log::info!("[{}] Monitor stopped by operator", ticket_id);
            report.stopped = true;
            break;
        }
        if let Some(max) = options.max_iterations {
            if report.iterations >= max {
                break;
            }
        }
        report.iterations += 1;

        if let Some(frame) = source.next_frame() {
            report.frames += 1;
            on_frame(&frame);
            window.push(frame);

            match scorer.score(&window) {
                Ok(result) if result.is_anomaly => {
                    log::warn!(
                        "[{}] Anomaly on frame {}: score {:.3} > {:.2}",
                        ticket_id,
                        report.frames,
                        result.score,
                        result.threshold
                    );
                    report.failure_frame = Some(report.frames);
                    report.failure = Some(failure_event(ticket_id, &window, result.score));
                    break;
                }
                Ok(result) => {
                    log::debug!("[{}] Frame {} score {:.3}", ticket_id, report.frames, result.score);
                }
                Err(e) => log::warn!("[{}] Scoring failed on frame {}: {}", ticket_id, report.frames, e),
            }
        }

        if !options.poll_interval.is_zero() {
            tokio::time::sleep(options.poll_interval).await;
        }
    }

    report
}
