//! Learning Loop
//!
//! When a ticket reaches the terminal tracker status, its verified fix is
//! appended to the knowledge base exactly once and a post-mortem is filed.
//!
//! # Components
//! - `knowledge.rs`: knowledge base entries and retrieval window
//! - `postmortem.rs`: post-mortem document

pub mod knowledge;
pub mod postmortem;

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

pub use knowledge::{latest_match, recent, KnowledgeEntry, Scenario, RETRIEVAL_WINDOW};

use crate::logic::collaborators::{with_timeout, CollaboratorError, DocumentStore, IssueTracker};
use crate::logic::config::SafetyConfig;
use crate::logic::incident::FixRecord;
use crate::logic::notify::{Notifier, RichText, StatusColor};
use crate::logic::storage::{keys, StateStore, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum LearningError {
    #[error("could not read tracker status: {0}")]
    Status(#[from] CollaboratorError),

    #[error("persistence failure: {0}")]
    Store(#[from] StoreError),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum LearningOutcome {
    /// Learning kill switch is off
    Disabled,
    NotDone { status: String },
    AlreadyLearned,
    /// No persisted fix for the ticket
    NothingToLearn,
    Learned {
        knowledge_size: usize,
        post_mortem_url: Option<String>,
    },
}

impl LearningOutcome {
    /// The ticket is in its terminal learned state
    pub fn is_learned(&self) -> bool {
        matches!(self, LearningOutcome::Learned { .. } | LearningOutcome::AlreadyLearned)
    }
}

pub struct LearningLoop {
    store: Arc<dyn StateStore>,
    tracker: Arc<dyn IssueTracker>,
    documents: Arc<dyn DocumentStore>,
    notifier: Notifier,
    safety: Arc<SafetyConfig>,
    done_status: String,
    timeout: Duration,
}

impl LearningLoop {
    pub fn new(
        store: Arc<dyn StateStore>,
        tracker: Arc<dyn IssueTracker>,
        documents: Arc<dyn DocumentStore>,
        notifier: Notifier,
        safety: Arc<SafetyConfig>,
        done_status: &str,
        timeout: Duration,
    ) -> Self {
        Self {
            store,
            tracker,
            documents,
            notifier,
            safety,
            done_status: done_status.to_string(),
            timeout,
        }
    }

    pub async fn on_ticket_resolved(&self, ticket_id: &str) -> Result<LearningOutcome, LearningError> {
        if !self.safety.is_learning_enabled() {
            log::info!("[{}] Learning disabled, ignoring resolution", ticket_id);
            return Ok(LearningOutcome::Disabled);
        }

        let status = with_timeout(self.timeout, self.tracker.get_status(ticket_id)).await?;
        if !status.trim().eq_ignore_ascii_case(&self.done_status) {
            log::debug!("[{}] Status '{}' is not terminal, nothing to learn", ticket_id, status);
            return Ok(LearningOutcome::NotDone { status });
        }

        if self.store.is_learned(ticket_id)? {
            log::info!("[{}] Already learned", ticket_id);
            return Ok(LearningOutcome::AlreadyLearned);
        }

        let record: FixRecord = match self.store.get_json(&keys::fix(ticket_id))? {
            Some(record) => record,
            None => {
                log::info!("[{}] No fix record found, skipping", ticket_id);
                return Ok(LearningOutcome::NothingToLearn);
            }
        };

        let entry = KnowledgeEntry {
            ticket_id: ticket_id.to_string(),
            scenario: Scenario {
                vibration: match record.failure.max_vibration.value() {
                    Some(v) => format!("{:.2} Hz", v),
                    None => "Unknown".to_string(),
                },
                temperature: Some(record.failure.temperature),
                anomaly_score: Some(record.failure.anomaly_score),
            },
            successful_fix: record.recommendation.clone(),
            timestamp: Utc::now(),
        };

        if !self.store.learn_once(&entry)? {
            // Lost a race with a concurrent resolution signal
            return Ok(LearningOutcome::AlreadyLearned);
        }

        let knowledge_size = self.store.knowledge_size()?;
        log::info!("[{}] Knowledge base updated, {} entries", ticket_id, knowledge_size);

        let post_mortem_url = self.file_post_mortem(&record).await;

        let mut text = "Success verified. This failure scenario has been added to the knowledge base.".to_string();
        if let Some(ref url) = post_mortem_url {
            text.push_str(&format!("\n\nOfficial Post-Mortem Report: {}", url));
        }

        self.notifier.notify(
            ticket_id,
            RichText::new("🧠 MODEL RETRAINED", text, StatusColor::Learning).with_json(serde_json::json!({
                "training_id": format!("batch-{}", Uuid::new_v4().simple()),
                "data_points_total": knowledge_size,
                "post_mortem": post_mortem_url.as_deref().unwrap_or("N/A"),
            })),
        );

        Ok(LearningOutcome::Learned {
            knowledge_size,
            post_mortem_url,
        })
    }

    async fn file_post_mortem(&self, record: &FixRecord) -> Option<String> {
        let now = Utc::now();
        let title = postmortem::title(&record.ticket_id, now);
        let body = postmortem::render(record, now);

        match with_timeout(self.timeout, self.documents.create_page(&title, &body)).await {
            Ok(url) => {
                log::info!("[{}] Post-mortem filed: {}", record.ticket_id, url);
                Some(url)
            }
            Err(e) => {
                log::warn!("[{}] Post-mortem not filed: {}", record.ticket_id, e);
                None
            }
        }
    }
}
