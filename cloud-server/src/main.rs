//! Pit Wall Server
//!
//! HTTP surface for the remediation pipeline. Tracker automation rules,
//! the telemetry feed and the dashboard all call in here.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      PIT WALL SERVER                        │
//! ├─────────────────────────────────────────────────────────────┤
//! │  ┌───────────┐  ┌───────────────┐  ┌─────────────────────┐  │
//! │  │  API      │  │  Orchestrator │  │  Monitor task       │  │
//! │  │  (Axum)   │─▶│  (core)       │◀─│  (store-fed)        │  │
//! │  └───────────┘  └───────┬───────┘  └─────────────────────┘  │
//! │                         ▼                                   │
//! │        SQLite · Jira · Confluence · Bitbucket · LLM          │
//! └─────────────────────────────────────────────────────────────┘
//! ```

mod config;
mod handlers;
mod error;

#[cfg(test)]
mod tests;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use pitwall_core::logic::model::{AutoScorer, ThresholdConfig};
use pitwall_core::logic::storage::{sqlite, EncryptedCredentialStore, SqliteStore, StateStore};
use pitwall_core::{constants, Collaborators, Orchestrator, SafetyConfig};
use tower_http::{
    cors::{CorsLayer, Any},
    trace::TraceLayer,
    compression::CompressionLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub use error::{AppError, AppResult};
use handlers::monitor::MonitorControl;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "pitwall_server=debug,pitwall_core=info,tower_http=debug".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = config::Config::from_env();

    tracing::info!("Pit Wall Server starting ({})...", config.environment);
    if config.is_production() && config.pipeline.credential_secret == constants::DEFAULT_CREDENTIAL_SECRET {
        tracing::warn!("PITWALL_CREDENTIAL_SECRET is not set; credentials use the default key");
    }

    // Initialize state store
    let store: Arc<dyn StateStore> = Arc::new(SqliteStore::open(&config.data_dir.join(sqlite::DB_FILE))?);
    tracing::info!("State store: {:?}", config.data_dir);

    let credentials = Arc::new(EncryptedCredentialStore::new(store.clone(), &config.pipeline.credential_secret));
    let collaborators = Collaborators::from_config(&config.pipeline, credentials.clone())?;
    let pipeline = Orchestrator::new(
        &config.pipeline,
        store,
        credentials,
        collaborators,
        Arc::new(SafetyConfig::default()),
    );
    let scorer = AutoScorer::from_path(config.pipeline.model_path.as_deref(), ThresholdConfig::default());

    // Build application state
    let state = AppState {
        pipeline: Arc::new(pipeline),
        scorer: Arc::new(scorer),
        monitors: Arc::new(MonitorControl::default()),
        config: config.clone(),
    };

    // Build router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("🚀 Server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Orchestrator>,
    pub scorer: Arc<AutoScorer>,
    pub monitors: Arc<MonitorControl>,
    pub config: config::Config,
}

/// Create the main router with all routes
fn create_router(state: AppState) -> Router {
    let telemetry_routes = Router::new()
        .route("/api/v1/telemetry", post(handlers::telemetry::ingest))
        .route("/api/v1/telemetry/latest", get(handlers::telemetry::latest))
        .route("/api/v1/status", get(handlers::telemetry::status))
        .route("/api/v1/dashboard", get(handlers::dashboard::snapshot));

    let ticket_routes = Router::new()
        .route("/api/v1/tickets/:key", get(handlers::tickets::summary))
        .route("/api/v1/tickets/:key/context", get(handlers::tickets::context))
        .route("/api/v1/tickets/:key/created", post(handlers::tickets::created))
        .route("/api/v1/tickets/:key/runs", post(handlers::tickets::begin_run))
        .route("/api/v1/tickets/:key/failure", post(handlers::tickets::failure))
        .route("/api/v1/tickets/:key/resolved", post(handlers::tickets::resolved));

    let operator_routes = Router::new()
        .route("/api/v1/credentials", post(handlers::credentials::save))
        .route("/api/v1/credentials/status", get(handlers::credentials::status))
        .route("/api/v1/monitor/:key/start", post(handlers::monitor::start))
        .route("/api/v1/monitor/stop", post(handlers::monitor::stop))
        .route(
            "/api/v1/safety",
            get(handlers::safety::status).post(handlers::safety::update),
        );

    // Combine all routes
    Router::new()
        .route("/health", get(handlers::health::check))
        .merge(telemetry_routes)
        .merge(ticket_routes)
        .merge(operator_routes)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any)
        )
        .with_state(state)
}
