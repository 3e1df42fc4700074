//! Operator kill switches

use axum::{extract::State, Json};
use pitwall_core::logic::config::{SafetyStatus, SafetyUpdate};

use crate::AppState;

pub async fn status(State(state): State<AppState>) -> Json<SafetyStatus> {
    Json(state.pipeline.safety().status())
}

/// Only the switches present in the body change
pub async fn update(
    State(state): State<AppState>,
    Json(req): Json<SafetyUpdate>,
) -> Json<SafetyStatus> {
    let status = state.pipeline.safety().apply(&req);
    tracing::warn!(
        auto_fix = status.auto_fix,
        learning = status.learning,
        language_model = status.language_model,
        "Kill switches updated"
    );
    Json(status)
}
