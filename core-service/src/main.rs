//! Pit Wall - simulated test run
//!
//! Drives the rig through a crash, feeds the failure into the pipeline and,
//! offline, closes the ticket so the learning loop runs too.
//!
//! Usage: `pitwall-core [TICKET]` (default `KAN-1`). With `JIRA_*` and
//! `CONFLUENCE_*` set, real collaborators and the on-disk store are used.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use pitwall_core::constants::{self, CRITICAL_LABEL};
use pitwall_core::logic::analysis_loop::{run_monitor, MonitorOptions};
use pitwall_core::logic::collaborators::fake::FakeTracker;
use pitwall_core::logic::model::{AutoScorer, ThresholdConfig};
use pitwall_core::logic::storage::{sqlite, EncryptedCredentialStore, MemoryStore, SqliteStore, StateStore};
use pitwall_core::logic::telemetry::TelemetryRig;
use pitwall_core::{Collaborators, Orchestrator, PipelineConfig, SafetyConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    log::info!("Starting {} v{}", constants::APP_NAME, constants::APP_VERSION);

    let ticket_id = std::env::args().nth(1).unwrap_or_else(|| "KAN-1".to_string());
    let config = PipelineConfig::from_env();
    let online = config.is_online();

    let store: Arc<dyn StateStore> = if online {
        Arc::new(SqliteStore::open(&config.data_dir.join(sqlite::DB_FILE))?)
    } else {
        log::info!("Offline mode: in-memory store and collaborators");
        Arc::new(MemoryStore::new())
    };
    let credentials = Arc::new(EncryptedCredentialStore::new(store.clone(), &config.credential_secret));

    let offline_tracker = Arc::new(FakeTracker::default());
    let collaborators = if online {
        Collaborators::from_config(&config, credentials.clone())?
    } else {
        offline_tracker.set_labels(&ticket_id, &[CRITICAL_LABEL]);
        Collaborators::offline(offline_tracker.clone())
    };

    let orchestrator = Orchestrator::new(
        &config,
        store,
        credentials,
        collaborators,
        Arc::new(SafetyConfig::default()),
    );
    if !online {
        orchestrator.save_credentials("offline", "offline-token")?;
    }

    orchestrator.on_ticket_created(&ticket_id).await?;
    orchestrator.begin_run(&ticket_id)?;

    let stop = Arc::new(AtomicBool::new(false));
    {
        let stop = stop.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                log::info!("Stop requested");
                stop.store(true, Ordering::Relaxed);
            }
        });
    }

    let scorer = AutoScorer::from_path(config.model_path.as_deref(), ThresholdConfig::default());
    let options = MonitorOptions {
        window_size: config.window_size,
        poll_interval: config.poll_interval,
        max_iterations: Some(200),
    };
    let mut rig = TelemetryRig::new();

    let report = run_monitor(&ticket_id, &mut rig, &scorer, &stop, &options, |frame| {
        if let Err(e) = orchestrator.ingest_telemetry(frame) {
            log::warn!("Telemetry not stored: {}", e);
        }
    })
    .await;

    match report.failure {
        Some(failure) => {
            let spec = orchestrator.report_failure(&ticket_id, failure).await?;
            log::info!("Final spec: {}", serde_json::to_string(&spec.to_artifact_json())?);

            if !online {
                offline_tracker.set_status(&ticket_id, constants::DEFAULT_DONE_STATUS);
                let outcome = orchestrator.on_ticket_resolved(&ticket_id).await?;
                log::info!("Learning outcome: {:?}", outcome);
            }
        }
        None => log::info!("No failure detected after {} frames", report.frames),
    }

    orchestrator.notifier().flush().await;
    log::info!("Scorer: {:?}", scorer.status());
    log::info!("Notifications: {:?}", orchestrator.notifier().stats());
    println!("{}", serde_json::to_string_pretty(&orchestrator.dashboard_snapshot()?)?);
    Ok(())
}
