//! Dashboard handler

use axum::{extract::State, Json};
use pitwall_core::logic::dashboard::DashboardSnapshot;

use crate::{AppResult, AppState};

pub async fn snapshot(State(state): State<AppState>) -> AppResult<Json<DashboardSnapshot>> {
    Ok(Json(state.pipeline.dashboard_snapshot()?))
}
