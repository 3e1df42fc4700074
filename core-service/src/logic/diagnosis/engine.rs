//! Diagnosis Engine
//!
//! Physics decides the numbers; retrieval and the optional language model
//! decide the narrative. Diagnosis never fails: every collaborator problem
//! degrades to the rule-based proposal.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use super::llm::{build_prompt, parse_answer};
use super::physics::{corrective_thickness, estimated_weight, failure_vibration};
use super::types::{BaselineSpec, Confidence, FailureEvent, Proposal, ProposalSource};
use crate::logic::collaborators::{with_timeout, LanguageModel};
use crate::logic::config::SafetyConfig;
use crate::logic::learning::{latest_match, KnowledgeEntry};

pub struct DiagnosisEngine {
    language_model: Option<Arc<dyn LanguageModel>>,
    safety: Arc<SafetyConfig>,
    timeout: Duration,
}

impl DiagnosisEngine {
    pub fn new(
        language_model: Option<Arc<dyn LanguageModel>>,
        safety: Arc<SafetyConfig>,
        timeout: Duration,
    ) -> Self {
        Self {
            language_model,
            safety,
            timeout,
        }
    }

    /// Engine with no language model
    pub fn rules_only() -> Self {
        Self::new(None, Arc::new(SafetyConfig::default()), Duration::from_secs(1))
    }

    pub async fn diagnose(
        &self,
        ticket_id: &str,
        failure: &FailureEvent,
        baseline: &BaselineSpec,
        knowledge: &[KnowledgeEntry],
    ) -> Proposal {
        let vibration = failure_vibration(&failure.max_vibration);
        let thickness = corrective_thickness(vibration, baseline);
        let weight = estimated_weight(thickness, baseline);
        let reference = latest_match(knowledge).map(|e| e.ticket_id.clone());

        log::info!(
            "[{}] Diagnosing {} Hz: raw thickness {:.1}mm, weight {:.1}g, reference {:?}",
            ticket_id,
            vibration,
            thickness,
            weight,
            reference
        );

        let rules = rule_proposal(vibration, thickness, weight, baseline, reference.clone());

        let model = match self.language_model {
            Some(ref model) if self.safety.is_language_model_enabled() => model,
            _ => return rules,
        };

        let prompt = build_prompt(
            ticket_id,
            vibration,
            failure.temperature,
            failure.anomaly_score,
            baseline,
            knowledge,
        );

        let reply = match with_timeout(self.timeout, model.complete(&prompt)).await {
            Ok(reply) => reply,
            Err(e) => {
                log::warn!("[{}] Language model unavailable ({}), using rule-based diagnosis", ticket_id, e);
                return rules;
            }
        };

        match parse_answer(&reply, thickness, reference.as_deref()) {
            Ok(answer) => Proposal {
                root_cause: answer.root_cause,
                recommendation: answer.recommendation,
                source: ProposalSource::LanguageModel,
                ..rules
            },
            Err(e) => {
                log::warn!("[{}] Discarding language model answer: {}", ticket_id, e);
                rules
            }
        }
    }
}

fn rule_proposal(
    vibration: f64,
    thickness: f64,
    weight: f64,
    baseline: &BaselineSpec,
    reference: Option<String>,
) -> Proposal {
    let root_cause = format!(
        "Harmonic resonance at {} Hz against a {} Hz design target.",
        vibration, baseline.target_resonance_hz
    );

    let (recommendation, confidence) = match reference {
        Some(ref ticket) => (
            format!(
                "Increase wall thickness to {:.1}mm ({}), based on verified fix for ticket {}.",
                thickness, baseline.material_suggestion, ticket
            ),
            Confidence::High,
        ),
        None => (
            format!(
                "Increase wall thickness to {:.1}mm ({}); no prior similar failure found.",
                thickness, baseline.material_suggestion
            ),
            Confidence::MediumCalculated,
        ),
    };

    let mut suggested_changes = BTreeMap::new();
    suggested_changes.insert(Proposal::THICKNESS.to_string(), thickness);
    suggested_changes.insert(Proposal::WEIGHT.to_string(), weight);

    Proposal {
        root_cause,
        recommendation,
        suggested_changes,
        confidence,
        source: ProposalSource::Rules,
        reference_ticket: reference,
    }
}
