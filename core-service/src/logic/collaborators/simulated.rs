//! Physics-Aware Simulated Language Model
//!
//! Offline stand-in that answers the diagnosis prompt with the same physics
//! rule the engine uses. It never caps: the compliance enforcer owns that.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;

use super::{CollaboratorError, LanguageModel};
use crate::logic::diagnosis::physics::{corrective_thickness, estimated_weight};
use crate::logic::diagnosis::BaselineSpec;

static VIBRATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Vibration (-?[\d.]+)").expect("vibration pattern is valid"));
static REFERENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"On ticket ([\w-]+):").expect("reference pattern is valid"));
static BASE_THICKNESS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Base thickness ([\d.]+) mm").expect("thickness pattern is valid"));
static BASE_WEIGHT: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Base weight ([\d.]+) g").expect("weight pattern is valid"));
static TARGET: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Target resonance ([\d.]+) Hz").expect("target pattern is valid"));

/// Vibration assumed when the prompt does not state one (Hz)
const PROMPT_DEFAULT_VIBRATION_HZ: f64 = 60.0;

fn capture(pattern: &Regex, prompt: &str) -> Option<f64> {
    pattern
        .captures(prompt)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

#[derive(Debug, Default)]
pub struct SimulatedLanguageModel;

impl SimulatedLanguageModel {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl LanguageModel for SimulatedLanguageModel {
    async fn complete(&self, prompt: &str) -> Result<String, CollaboratorError> {
        let mut baseline = BaselineSpec::default();
        if let Some(v) = capture(&BASE_THICKNESS, prompt) {
            baseline.base_thickness_mm = v;
        }
        if let Some(v) = capture(&BASE_WEIGHT, prompt) {
            baseline.base_weight_g = v;
        }
        if let Some(v) = capture(&TARGET, prompt) {
            baseline.target_resonance_hz = v;
        }

        let vibration = capture(&VIBRATION, prompt).unwrap_or(PROMPT_DEFAULT_VIBRATION_HZ);
        let thickness = corrective_thickness(vibration, &baseline);
        let weight = estimated_weight(thickness, &baseline);

        let reference = REFERENCE
            .captures(prompt)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string());

        let recommendation = match reference {
            Some(ticket) => format!(
                "Based on verified fix for {}, recommended thickness is {:.1}mm.",
                ticket, thickness
            ),
            None => format!(
                "Increase {} thickness to {:.1}mm to dampen resonance.",
                baseline.material_suggestion, thickness
            ),
        };

        let answer = serde_json::json!({
            "root_cause": format!("Resonance ({}Hz) detected.", vibration),
            "recommendation": recommendation,
            "suggested_changes": {
                "material_thickness": thickness,
                "estimated_weight": weight
            }
        });

        Ok(format!("```json\n{}\n```", answer))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::diagnosis::llm::parse_answer;

    #[tokio::test]
    async fn test_answers_with_uncapped_physics() {
        let model = SimulatedLanguageModel::new();
        let reply = model
            .complete("Ticket KAN-1 failed under test: Vibration 80 Hz, temperature 85.0 C")
            .await
            .unwrap();

        let answer = parse_answer(&reply, 8.5, None).unwrap();
        assert_eq!(answer.suggested_changes.material_thickness, 8.5);
        assert_eq!(answer.suggested_changes.estimated_weight, 510.0);
    }

    #[tokio::test]
    async fn test_cites_first_listed_ticket() {
        let model = SimulatedLanguageModel::new();
        let reply = model
            .complete("Vibration 55 Hz\nOn ticket X-2: fix\nOn ticket X-1: fix")
            .await
            .unwrap();

        let answer = parse_answer(&reply, 6.0, Some("X-2")).unwrap();
        assert!(answer.recommendation.contains("X-2"));
    }
}
