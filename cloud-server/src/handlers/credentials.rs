//! Source-control credential handlers

use axum::{extract::State, Json};
use pitwall_core::logic::pipeline::AuthStatus;
use serde::Deserialize;
use validator::Validate;

use crate::{AppResult, AppState};

#[derive(Debug, Deserialize, Validate)]
pub struct SaveCredentials {
    #[validate(length(min = 1, max = 256))]
    pub username: String,
    #[validate(length(min = 1, max = 4096))]
    pub token: String,
}

pub async fn save(
    State(state): State<AppState>,
    Json(req): Json<SaveCredentials>,
) -> AppResult<Json<AuthStatus>> {
    req.validate()?;
    state.pipeline.save_credentials(&req.username, &req.token)?;
    Ok(Json(state.pipeline.auth_status()?))
}

pub async fn status(State(state): State<AppState>) -> AppResult<Json<AuthStatus>> {
    Ok(Json(state.pipeline.auth_status()?))
}
