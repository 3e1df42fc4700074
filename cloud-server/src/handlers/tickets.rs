//! Ticket lifecycle handlers
//!
//! Called by tracker automation rules and the dashboard.

use axum::{extract::{Path, State}, Json};
use pitwall_core::logic::dashboard::{FailureContext, IncidentSummary};
use pitwall_core::logic::diagnosis::{FailureEvent, Reading};
use pitwall_core::logic::incident::{FinalSpec, TicketState};
use pitwall_core::logic::learning::LearningOutcome;
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::{AppResult, AppState};

#[derive(Debug, Serialize)]
pub struct EngagementResponse {
    pub ticket: String,
    pub engaged: bool,
}

#[derive(Debug, Deserialize, Validate)]
pub struct FailurePayload {
    /// Number or text such as `"81.20 Hz"`
    pub max_vibration: Reading,
    pub temperature: f64,
    #[validate(range(min = 0.0, max = 1.0))]
    pub anomaly_score: f64,
    pub timestamp: Option<String>,
}

pub async fn created(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> AppResult<Json<EngagementResponse>> {
    let engaged = state.pipeline.on_ticket_created(&key).await?;
    Ok(Json(EngagementResponse { ticket: key, engaged }))
}

pub async fn begin_run(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> AppResult<Json<TicketState>> {
    Ok(Json(state.pipeline.begin_run(&key)?))
}

/// Runs the full remediation pipeline for the reported failure
pub async fn failure(
    State(state): State<AppState>,
    Path(key): Path<String>,
    Json(req): Json<FailurePayload>,
) -> AppResult<Json<FinalSpec>> {
    req.validate()?;

    let event = FailureEvent {
        ticket_id: key.clone(),
        max_vibration: req.max_vibration,
        temperature: req.temperature,
        anomaly_score: req.anomaly_score,
        timestamp: req.timestamp.unwrap_or_else(|| chrono::Utc::now().to_rfc3339()),
    };
    Ok(Json(state.pipeline.report_failure(&key, event).await?))
}

pub async fn resolved(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> AppResult<Json<LearningOutcome>> {
    Ok(Json(state.pipeline.on_ticket_resolved(&key).await?))
}

pub async fn summary(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> AppResult<Json<IncidentSummary>> {
    Ok(Json(state.pipeline.incident_summary(&key)?))
}

pub async fn context(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> AppResult<Json<FailureContext>> {
    Ok(Json(state.pipeline.failure_context(&key)?))
}
