//! Pipeline Orchestrator
//!
//! Sequences diagnosis, compliance, deployment and learning per ticket and
//! owns every phase transition. Each completed stage posts its notification
//! before the next stage starts, so a later failure never retracts an
//! earlier report.
//!
//! # Entry points
//! - `ingest_telemetry`: overwrite the latest frame
//! - `on_ticket_created` / `begin_run`: engage monitoring, start a test run
//! - `report_failure`: diagnose -> enforce -> persist -> deploy -> persist
//! - `on_ticket_resolved`: learning loop
//! - read-only views for the dashboard and agents


use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::constants::{CRITICAL_LABEL, SOURCE_CONTROL_TOKEN, SOURCE_CONTROL_USERNAME};
use crate::logic::autofix::FixDeployer;
use crate::logic::collaborators::bitbucket::BitbucketClient;
use crate::logic::collaborators::confluence::ConfluenceClient;
use crate::logic::collaborators::fake::{FakeDocuments, FakeSourceControl, FakeTracker};
use crate::logic::collaborators::jira::JiraClient;
use crate::logic::collaborators::openai::OpenAiClient;
use crate::logic::collaborators::simulated::SimulatedLanguageModel;
use crate::logic::collaborators::{
    with_timeout, CollaboratorError, DocumentStore, IssueTracker, LanguageModel, SourceControl,
};
use crate::logic::compliance;
use crate::logic::config::{PipelineConfig, SafetyConfig};
use crate::logic::dashboard::{self, DashboardSnapshot, FailureContext, IncidentSummary, StatusReport};
use crate::logic::diagnosis::physics::estimated_weight;
use crate::logic::diagnosis::{BaselineSpec, DiagnosisEngine, FailureEvent};
use crate::logic::incident::types::{DAMPENING_COEFFICIENT, MAX_LOAD_RATING};
use crate::logic::incident::{
    FinalSpec, FixRecord, TicketPhase, TicketRegistry, TicketState, TransitionError, NO_LINK,
};
use crate::logic::learning::{LearningError, LearningLoop, LearningOutcome};
use crate::logic::notify::{Notifier, RichText, StatusColor};
use crate::logic::storage::{keys, CredentialError, CredentialStore, StateStore, StoreError};
use crate::logic::telemetry::{IngestStatus, TelemetryFrame};

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("failure already reported for the active run of {0}")]
    AlreadyReported(String),

    #[error("ticket {0} is closed")]
    Closed(String),

    #[error("invalid ticket transition: {0}")]
    Transition(TransitionError),

    #[error("persistence failure: {0}")]
    Persistence(#[from] StoreError),

    #[error("credential failure: {0}")]
    Credentials(#[from] CredentialError),

    #[error("tracker unavailable: {0}")]
    Tracker(#[from] CollaboratorError),

    #[error("invalid input: {0}")]
    Validation(String),
}

impl From<TransitionError> for PipelineError {
    fn from(e: TransitionError) -> Self {
        match e {
            TransitionError::AlreadyReported(t) => PipelineError::AlreadyReported(t),
            other => PipelineError::Transition(other),
        }
    }
}

impl From<LearningError> for PipelineError {
    fn from(e: LearningError) -> Self {
        match e {
            LearningError::Status(e) => PipelineError::Tracker(e),
            LearningError::Store(e) => PipelineError::Persistence(e),
        }
    }
}

// ============================================================================
// COLLABORATORS
// ============================================================================

pub struct Collaborators {
    pub tracker: Arc<dyn IssueTracker>,
    pub documents: Arc<dyn DocumentStore>,
    pub source_control: Arc<dyn SourceControl>,
    pub language_model: Option<Arc<dyn LanguageModel>>,
}

impl Collaborators {
    /// In-memory collaborators with the physics-aware simulated model.
    /// The tracker is passed in so the caller can script labels and statuses.
    pub fn offline(tracker: Arc<FakeTracker>) -> Self {
        Self {
            tracker,
            documents: Arc::new(FakeDocuments::default()),
            source_control: Arc::new(FakeSourceControl::default()),
            language_model: Some(Arc::new(SimulatedLanguageModel::new())),
        }
    }

    /// Real HTTP clients where configured, in-memory stand-ins elsewhere
    pub fn from_config(
        config: &PipelineConfig,
        credentials: Arc<dyn CredentialStore>,
    ) -> Result<Self, CollaboratorError> {
        let timeout_seconds = config.collaborator_timeout.as_secs().max(1);

        let tracker: Arc<dyn IssueTracker> = match config.jira {
            Some(ref jira) => Arc::new(JiraClient::new(jira.clone())?),
            None => {
                log::warn!("Jira not configured, using in-memory tracker");
                Arc::new(FakeTracker::default())
            }
        };

        let documents: Arc<dyn DocumentStore> = match config.confluence {
            Some(ref confluence) => Arc::new(ConfluenceClient::new(confluence.clone())?),
            None => {
                log::warn!("Confluence not configured, using in-memory document store");
                Arc::new(FakeDocuments::default())
            }
        };

        let language_model: Arc<dyn LanguageModel> = match config.openai {
            Some(ref openai) => Arc::new(OpenAiClient::new(openai.clone())?),
            None => {
                log::info!("OpenAI not configured, using simulated language model");
                Arc::new(SimulatedLanguageModel::new())
            }
        };

        Ok(Self {
            tracker,
            documents,
            source_control: Arc::new(BitbucketClient::new(credentials, timeout_seconds)?),
            language_model: Some(language_model),
        })
    }
}

// ============================================================================
// VIEWS
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthStatus {
    pub is_connected: bool,
}

// ============================================================================
// ORCHESTRATOR
// ============================================================================

pub struct Orchestrator {
    store: Arc<dyn StateStore>,
    credentials: Arc<dyn CredentialStore>,
    registry: TicketRegistry,
    tracker: Arc<dyn IssueTracker>,
    diagnosis: DiagnosisEngine,
    deployer: FixDeployer,
    learning: LearningLoop,
    notifier: Notifier,
    safety: Arc<SafetyConfig>,
    timeout: Duration,
}

impl Orchestrator {
    /// Must be called inside a tokio runtime; spawns the notification dispatcher.
    pub fn new(
        config: &PipelineConfig,
        store: Arc<dyn StateStore>,
        credentials: Arc<dyn CredentialStore>,
        collaborators: Collaborators,
        safety: Arc<SafetyConfig>,
    ) -> Self {
        let timeout = config.collaborator_timeout;
        let notifier = Notifier::spawn(collaborators.tracker.clone(), timeout);

        let diagnosis = DiagnosisEngine::new(collaborators.language_model, safety.clone(), timeout);
        let deployer = FixDeployer::new(
            collaborators.source_control,
            credentials.clone(),
            &config.repository,
            timeout,
        );
        let learning = LearningLoop::new(
            store.clone(),
            collaborators.tracker.clone(),
            collaborators.documents,
            notifier.clone(),
            safety.clone(),
            &config.done_status,
            timeout,
        );

        Self {
            store,
            credentials,
            registry: TicketRegistry::new(),
            tracker: collaborators.tracker,
            diagnosis,
            deployer,
            learning,
            notifier,
            safety,
            timeout,
        }
    }

    pub fn safety(&self) -> &Arc<SafetyConfig> {
        &self.safety
    }

    pub fn registry(&self) -> &TicketRegistry {
        &self.registry
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    pub fn store(&self) -> &Arc<dyn StateStore> {
        &self.store
    }

    // ------------------------------------------------------------------------
    // Telemetry
    // ------------------------------------------------------------------------

    /// Overwrite the latest frame. Invalid frames are rejected, not stored.
    pub fn ingest_telemetry(&self, frame: &TelemetryFrame) -> Result<IngestStatus, PipelineError> {
        if let Err(reason) = frame.validate() {
            log::warn!("Rejected telemetry frame: {}", reason);
            return Ok(IngestStatus::Rejected { reason });
        }
        self.store.put_json(keys::LATEST_TELEMETRY, frame)?;
        Ok(IngestStatus::Accepted)
    }

    pub fn latest_telemetry(&self) -> Result<Option<TelemetryFrame>, PipelineError> {
        Ok(self.store.get_json(keys::LATEST_TELEMETRY)?)
    }

    // ------------------------------------------------------------------------
    // Ticket lifecycle
    // ------------------------------------------------------------------------

    /// Engage monitoring when the ticket carries the critical label.
    ///
    /// Returns whether the ticket was engaged.
    pub async fn on_ticket_created(&self, ticket_id: &str) -> Result<bool, PipelineError> {
        let ticket_id = validate_ticket(ticket_id)?;
        let labels = with_timeout(self.timeout, self.tracker.get_labels(ticket_id)).await?;

        if !labels.iter().any(|l| l.eq_ignore_ascii_case(CRITICAL_LABEL)) {
            log::debug!("[{}] No critical label, not engaging", ticket_id);
            return Ok(false);
        }
        if self.store.is_learned(ticket_id)? {
            log::debug!("[{}] Already learned, not engaging", ticket_id);
            return Ok(false);
        }

        if self.store.get_raw(&keys::spec(ticket_id))?.is_none() {
            self.store.put_json(&keys::spec(ticket_id), &BaselineSpec::default())?;
        }
        let state = self.registry.engage(ticket_id);
        log::info!("[{}] Monitoring engaged ({})", ticket_id, state.phase.as_str());

        self.notifier.notify(
            ticket_id,
            RichText::new(
                "🏎️ AI RACE STRATEGIST",
                "Critical component label detected. Autonomous monitoring protocols engaged.",
                StatusColor::Info,
            )
            .with_json(serde_json::json!({
                "status": "ONLINE",
                "monitoring_target": "Power Unit",
                "sampling_rate": "100ms",
            })),
        );
        Ok(true)
    }

    /// Start a fresh test run; the next failure will be accepted
    pub fn begin_run(&self, ticket_id: &str) -> Result<TicketState, PipelineError> {
        let ticket_id = validate_ticket(ticket_id)?;
        self.ensure_open(ticket_id)?;
        let state = self.registry.begin_run(ticket_id)?;
        log::info!("[{}] Run {} started", ticket_id, state.run_id);
        Ok(state)
    }

    /// Run diagnosis, compliance and deployment for the run's single failure.
    pub async fn report_failure(&self, ticket_id: &str, failure: FailureEvent) -> Result<FinalSpec, PipelineError> {
        let ticket_id = validate_ticket(ticket_id)?;
        let failure = validate_failure(ticket_id, failure)?;
        self.ensure_open(ticket_id)?;

        let run_id = self.registry.claim_failure(ticket_id)?;
        log::warn!("[{}] Failure accepted for run {}", ticket_id, run_id);

        self.notifier.notify(
            ticket_id,
            RichText::new("🚨 FAILURE DETECTED", "Analysis initiated...", StatusColor::Critical)
                .with_json(serde_json::to_value(&failure).unwrap_or_default()),
        );

        match self.run_stages(ticket_id, run_id, &failure).await {
            Ok(spec) => Ok(spec),
            Err(e) => {
                log::error!("[{}] Pipeline aborted: {}", ticket_id, e);
                self.notifier.notify(
                    ticket_id,
                    RichText::new(
                        "⚠️ SYSTEM ERROR",
                        format!("Pipeline aborted: {}. Start a new run to retry.", e),
                        StatusColor::Critical,
                    ),
                );
                Err(PipelineError::Persistence(e))
            }
        }
    }

    async fn run_stages(&self, ticket_id: &str, run_id: Uuid, failure: &FailureEvent) -> Result<FinalSpec, StoreError> {
        let mut baseline: BaselineSpec = self.store.get_json(&keys::spec(ticket_id))?.unwrap_or_default();
        let knowledge = self.store.knowledge_base()?;

        // Diagnosis
        let proposal = self.diagnosis.diagnose(ticket_id, failure, &baseline, &knowledge).await;
        self.advance(ticket_id, run_id, TicketPhase::Diagnosed);

        self.notifier.notify(
            ticket_id,
            RichText::new(
                "✅ AI PRESCRIPTION (Powered by RAG)",
                format!("{}\n\n{}", proposal.root_cause, proposal.recommendation),
                StatusColor::Success,
            )
            .with_json(serde_json::json!({
                "material_thickness": format!("{:.1}mm", proposal.thickness_mm()),
                "dampening_coefficient": DAMPENING_COEFFICIENT,
                "max_load_rating": MAX_LOAD_RATING,
                "confidence": proposal.confidence.as_str(),
                "reference_ticket": proposal.reference_ticket,
            })),
        );

        // Compliance
        let verdict = compliance::enforce(proposal.thickness_mm());
        let thickness = verdict.final_value;
        let spec = FinalSpec::new(thickness, estimated_weight(thickness, &baseline));
        self.advance(ticket_id, run_id, TicketPhase::ComplianceChecked);

        log::info!(
            "[{}] Compliance {}: {:.1}mm -> {:.1}mm",
            ticket_id,
            verdict.status.as_str(),
            verdict.original_value,
            verdict.final_value
        );
        self.notifier.notify(
            ticket_id,
            RichText::new(
                "⚖️ FIA COMPLIANCE ENFORCER",
                verdict.note(),
                if verdict.is_restricted() { StatusColor::Warning } else { StatusColor::Info },
            )
            .with_json(verdict.audit_json()),
        );

        // Persist before deploying so a failed deploy leaves the diagnosis on record
        let mut record = FixRecord {
            ticket_id: ticket_id.to_string(),
            run_id,
            recommendation: format!(
                "Increase precision thickness to {:.1}mm ({}).",
                thickness, baseline.material_suggestion
            ),
            root_cause: proposal.root_cause.clone(),
            compliance_note: verdict.note(),
            verdict,
            specs: spec.clone(),
            pr_link: NO_LINK.to_string(),
            failure: failure.clone(),
            updated_at: Utc::now(),
        };
        self.store.put_json(&keys::fix(ticket_id), &record)?;

        baseline.max_vibration = Some(failure.max_vibration.clone());
        self.store.put_json(&keys::spec(ticket_id), &baseline)?;

        // Deployment
        let pr_link = self.deploy(ticket_id, &spec).await;
        if pr_link != NO_LINK {
            self.advance(ticket_id, run_id, TicketPhase::FixDeployed);
            record.pr_link = pr_link;
            record.updated_at = Utc::now();
            self.store.put_json(&keys::fix(ticket_id), &record)?;
        }

        Ok(spec)
    }

    /// Best effort; always notifies, returns the link or `N/A`
    async fn deploy(&self, ticket_id: &str, spec: &FinalSpec) -> String {
        if !self.safety.is_auto_fix_enabled() {
            log::info!("[{}] Auto-fix disabled, skipping deployment", ticket_id);
            self.notifier.notify(
                ticket_id,
                RichText::new(
                    "⏸️ Auto-Fix skipped",
                    "Autonomous deployment is disabled by the operator. Approved specs are on record.",
                    StatusColor::Warning,
                ),
            );
            return NO_LINK.to_string();
        }

        match self.deployer.deploy(ticket_id, spec).await {
            Ok(deployment) => {
                self.notifier.notify(
                    ticket_id,
                    RichText::new(
                        "🛠️ AUTO-FIX DEPLOYED",
                        format!(
                            "Pull Request created with approved specs. Auto-Fix PR: {}",
                            deployment.pr_link
                        ),
                        StatusColor::Learning,
                    )
                    .with_json(serde_json::json!({
                        "branch": deployment.branch,
                        "artifact": deployment.artifact_path,
                    })),
                );
                deployment.pr_link
            }
            Err(e) => {
                log::warn!("[{}] Auto-Fix skipped: {}", ticket_id, e);
                self.notifier.notify(
                    ticket_id,
                    RichText::new(
                        "⚠️ Auto-Fix skipped",
                        format!("Deployment failed: {}. Approved specs are on record.", e),
                        StatusColor::Warning,
                    ),
                );
                NO_LINK.to_string()
            }
        }
    }

    fn advance(&self, ticket_id: &str, run_id: Uuid, to: TicketPhase) {
        if let Err(e) = self.registry.advance(ticket_id, run_id, to) {
            log::warn!("[{}] {}", ticket_id, e);
        }
    }

    /// The persisted `learned_<ticket>` flag is the terminal state, so it
    /// holds across restarts.
    fn ensure_open(&self, ticket_id: &str) -> Result<(), PipelineError> {
        if self.store.is_learned(ticket_id)? {
            return Err(PipelineError::Closed(ticket_id.to_string()));
        }
        Ok(())
    }

    /// Current phase; `Learned` comes from the store, not the registry
    pub fn ticket_phase(&self, ticket_id: &str) -> Result<TicketPhase, PipelineError> {
        if self.store.is_learned(ticket_id)? {
            return Ok(TicketPhase::Learned);
        }
        Ok(self.registry.phase(ticket_id))
    }

    /// Learning loop entry; the ticket becomes terminal once learned
    pub async fn on_ticket_resolved(&self, ticket_id: &str) -> Result<LearningOutcome, PipelineError> {
        let ticket_id = validate_ticket(ticket_id)?;
        let outcome = self.learning.on_ticket_resolved(ticket_id).await?;
        if outcome.is_learned() && self.registry.archive(ticket_id).is_some() {
            log::debug!("[{}] State record archived", ticket_id);
        }
        Ok(outcome)
    }

    // ------------------------------------------------------------------------
    // Views
    // ------------------------------------------------------------------------

    pub fn dashboard_snapshot(&self) -> Result<DashboardSnapshot, PipelineError> {
        let latest = self.latest_telemetry()?;
        let size = self.store.knowledge_size()?;
        Ok(dashboard::dashboard_snapshot(latest.as_ref(), size))
    }

    pub fn status(&self) -> Result<StatusReport, PipelineError> {
        Ok(dashboard::status_report(self.latest_telemetry()?.as_ref()))
    }

    pub fn incident_summary(&self, ticket_id: &str) -> Result<IncidentSummary, PipelineError> {
        let (spec, fix) = self.ticket_records(ticket_id)?;
        Ok(dashboard::incident_summary(ticket_id, spec.as_ref(), fix.as_ref()))
    }

    pub fn failure_context(&self, ticket_id: &str) -> Result<FailureContext, PipelineError> {
        let (spec, fix) = self.ticket_records(ticket_id)?;
        Ok(dashboard::failure_context(ticket_id, spec.as_ref(), fix.as_ref()))
    }

    fn ticket_records(&self, ticket_id: &str) -> Result<(Option<BaselineSpec>, Option<FixRecord>), PipelineError> {
        let ticket_id = validate_ticket(ticket_id)?;
        Ok((
            self.store.get_json(&keys::spec(ticket_id))?,
            self.store.get_json(&keys::fix(ticket_id))?,
        ))
    }

    // ------------------------------------------------------------------------
    // Credentials
    // ------------------------------------------------------------------------

    pub fn save_credentials(&self, username: &str, token: &str) -> Result<(), PipelineError> {
        let (username, token) = (username.trim(), token.trim());
        if username.is_empty() || token.is_empty() {
            return Err(PipelineError::Validation("username and token are required".to_string()));
        }

        self.credentials.set(SOURCE_CONTROL_USERNAME, username)?;
        self.credentials.set(SOURCE_CONTROL_TOKEN, token)?;
        log::info!("Source-control credentials saved for {}", username);
        Ok(())
    }

    pub fn auth_status(&self) -> Result<AuthStatus, PipelineError> {
        Ok(AuthStatus {
            is_connected: self.credentials.get(SOURCE_CONTROL_TOKEN)?.is_some(),
        })
    }
}

fn validate_ticket(ticket_id: &str) -> Result<&str, PipelineError> {
    let ticket_id = ticket_id.trim();
    if ticket_id.is_empty() {
        return Err(PipelineError::Validation("ticket id is required".to_string()));
    }
    Ok(ticket_id)
}

fn validate_failure(ticket_id: &str, mut failure: FailureEvent) -> Result<FailureEvent, PipelineError> {
    if failure.ticket_id.trim().is_empty() {
        failure.ticket_id = ticket_id.to_string();
    } else if failure.ticket_id.trim() != ticket_id {
        return Err(PipelineError::Validation(format!(
            "failure belongs to {}, not {}",
            failure.ticket_id, ticket_id
        )));
    }

    if !failure.anomaly_score.is_finite() || !failure.temperature.is_finite() {
        return Err(PipelineError::Validation("anomaly score and temperature must be finite".to_string()));
    }
    Ok(failure)
}
