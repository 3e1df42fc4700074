//! Live monitor handlers
//!
//! One store-fed monitor at a time, matching the single telemetry slot.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use axum::{extract::{Path, State}, http::StatusCode, Json};
use pitwall_core::logic::analysis_loop::{run_monitor, MonitorOptions, StoreFeed};
use serde::Serialize;
use tokio::sync::Mutex;

use crate::{AppError, AppResult, AppState};

/// The running monitor, if any
#[derive(Default)]
pub struct MonitorControl {
    active: Mutex<Option<ActiveMonitor>>,
}

struct ActiveMonitor {
    ticket_id: String,
    stop: Arc<AtomicBool>,
}

#[derive(Debug, Serialize)]
pub struct MonitorResponse {
    pub ticket: Option<String>,
    pub status: &'static str,
}

pub async fn start(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> AppResult<(StatusCode, Json<MonitorResponse>)> {
    let mut active = state.monitors.active.lock().await;
    if let Some(ref running) = *active {
        return Err(AppError::Conflict(format!("monitor already running for {}", running.ticket_id)));
    }

    state.pipeline.begin_run(&key)?;

    let stop = Arc::new(AtomicBool::new(false));
    *active = Some(ActiveMonitor { ticket_id: key.clone(), stop: stop.clone() });
    drop(active);

    let options = MonitorOptions {
        window_size: state.config.pipeline.window_size,
        poll_interval: state.config.pipeline.poll_interval,
        max_iterations: None,
    };

    let ticket_id = key.clone();
    tokio::spawn(async move {
        let mut feed = StoreFeed::new(state.pipeline.store().clone());
        let report = run_monitor(&ticket_id, &mut feed, state.scorer.as_ref(), &stop, &options, |_| {}).await;

        if let Some(failure) = report.failure {
            match state.pipeline.report_failure(&ticket_id, failure).await {
                Ok(spec) => tracing::info!(ticket = %ticket_id, thickness = spec.material_thickness_mm, "Failure remediated"),
                Err(e) => tracing::warn!(ticket = %ticket_id, "Failure not remediated: {}", e),
            }
        }

        let mut active = state.monitors.active.lock().await;
        if active.as_ref().map_or(false, |m| Arc::ptr_eq(&m.stop, &stop)) {
            *active = None;
        }
    });

    tracing::info!(ticket = %key, "Monitor started");
    Ok((
        StatusCode::ACCEPTED,
        Json(MonitorResponse { ticket: Some(key), status: "monitoring" }),
    ))
}

/// Operator stop; lands within one poll interval
pub async fn stop(State(state): State<AppState>) -> AppResult<Json<MonitorResponse>> {
    let mut active = state.monitors.active.lock().await;
    match active.take() {
        Some(monitor) => {
            monitor.stop.store(true, Ordering::Relaxed);
            tracing::info!(ticket = %monitor.ticket_id, "Monitor stop requested");
            Ok(Json(MonitorResponse { ticket: Some(monitor.ticket_id), status: "stopping" }))
        }
        None => Ok(Json(MonitorResponse { ticket: None, status: "idle" })),
    }
}
