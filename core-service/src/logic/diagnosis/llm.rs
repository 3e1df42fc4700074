//! Language Model Boundary
//!
//! Builds the diagnosis prompt and turns the model's reply into a checked
//! answer. Anything that fails these checks is discarded by the engine.

use serde::Deserialize;

use super::types::BaselineSpec;
use crate::logic::learning::{recent, KnowledgeEntry};

/// Largest thickness disagreement with the physics rule still accepted (mm)
pub const THICKNESS_TOLERANCE_MM: f64 = 0.1;

#[derive(Debug, thiserror::Error)]
pub enum AnswerError {
    #[error("malformed answer: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("answer field '{0}' is empty")]
    Empty(&'static str),

    #[error("answer thickness {proposed}mm disagrees with physics ({expected}mm)")]
    Disagrees { proposed: f64, expected: f64 },

    #[error("answer does not cite reference ticket {0}")]
    MissingReference(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelAnswer {
    pub root_cause: String,
    pub recommendation: String,
    pub suggested_changes: ModelChanges,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ModelChanges {
    pub material_thickness: f64,
    pub estimated_weight: f64,
}

/// Prompt for one failure
pub fn build_prompt(
    ticket_id: &str,
    vibration_hz: f64,
    temperature: f64,
    anomaly_score: f64,
    baseline: &BaselineSpec,
    knowledge: &[KnowledgeEntry],
) -> String {
    let mut history: Vec<String> = recent(knowledge)
        .map(|e| format!("On ticket {}: {}", e.ticket_id, e.successful_fix))
        .collect();
    if history.is_empty() {
        history.push("None recorded.".to_string());
    }

    format!(
        "You are the race engineering AI for a Formula 1 power unit.\n\
         Ticket {ticket} failed under test: Vibration {vib} Hz, temperature {temp:.1} C, anomaly score {score:.2}.\n\n\
         Baseline design: {material}, Base thickness {thick} mm, Base weight {weight} g, Target resonance {target} Hz.\n\
         Physics: +1 mm of thickness shifts resonance by -10 Hz; each added mm adds 60 g.\n\n\
         Prior resolved cases (newest first):\n{history}\n\n\
         Reply with JSON only: {{\"root_cause\": string, \"recommendation\": string, \
         \"suggested_changes\": {{\"material_thickness\": number, \"estimated_weight\": number}}}}.\n\
         If a prior case is listed, cite its ticket in the recommendation.",
        ticket = ticket_id,
        vib = vibration_hz,
        temp = temperature,
        score = anomaly_score,
        material = baseline.material_suggestion,
        thick = baseline.base_thickness_mm,
        weight = baseline.base_weight_g,
        target = baseline.target_resonance_hz,
        history = history.join("\n"),
    )
}

/// Remove markdown code fences the model may wrap its JSON in
pub fn strip_code_fences(reply: &str) -> &str {
    let trimmed = reply.trim();
    let inner = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .unwrap_or(trimmed);
    inner.strip_suffix("```").unwrap_or(inner).trim()
}

/// Parse and check a reply against the physics result and the retrieval match
pub fn parse_answer(
    reply: &str,
    expected_thickness: f64,
    reference: Option<&str>,
) -> Result<ModelAnswer, AnswerError> {
    let answer: ModelAnswer = serde_json::from_str(strip_code_fences(reply))?;

    if answer.root_cause.trim().is_empty() {
        return Err(AnswerError::Empty("root_cause"));
    }
    if answer.recommendation.trim().is_empty() {
        return Err(AnswerError::Empty("recommendation"));
    }

    let proposed = answer.suggested_changes.material_thickness;
    if !proposed.is_finite() || (proposed - expected_thickness).abs() > THICKNESS_TOLERANCE_MM + f64::EPSILON {
        return Err(AnswerError::Disagrees {
            proposed,
            expected: expected_thickness,
        });
    }

    if let Some(ticket) = reference {
        if !answer.recommendation.contains(ticket) {
            return Err(AnswerError::MissingReference(ticket.to_string()));
        }
    }

    Ok(answer)
}

#[cfg(test)]
mod tests {
    use super::*;

    const GOOD: &str = r#"```json
{"root_cause": "Resonance", "recommendation": "Go to 8.5mm per KAN-7",
 "suggested_changes": {"material_thickness": 8.5, "estimated_weight": 510}}
```"#;

    #[test]
    fn test_strips_fences() {
        assert_eq!(strip_code_fences("```json\n{}\n```"), "{}");
        assert_eq!(strip_code_fences("  {}  "), "{}");
    }

    #[test]
    fn test_accepts_consistent_answer() {
        let answer = parse_answer(GOOD, 8.5, Some("KAN-7")).unwrap();
        assert_eq!(answer.suggested_changes.material_thickness, 8.5);
    }

    #[test]
    fn test_rejects_disagreeing_thickness() {
        let err = parse_answer(GOOD, 6.0, None).unwrap_err();
        assert!(matches!(err, AnswerError::Disagrees { .. }));
    }

    #[test]
    fn test_rejects_missing_reference() {
        let err = parse_answer(GOOD, 8.5, Some("KAN-99")).unwrap_err();
        assert!(matches!(err, AnswerError::MissingReference(_)));
    }

    #[test]
    fn test_rejects_prose() {
        let err = parse_answer("I think you should add material.", 8.5, None).unwrap_err();
        assert!(matches!(err, AnswerError::Malformed(_)));
    }

    #[test]
    fn test_prompt_lists_history_newest_first() {
        use chrono::Utc;
        use crate::logic::learning::Scenario;

        let entry = |t: &str| KnowledgeEntry {
            ticket_id: t.to_string(),
            scenario: Scenario { vibration: "80 Hz".to_string(), temperature: None, anomaly_score: None },
            successful_fix: "fix".to_string(),
            timestamp: Utc::now(),
        };
        let prompt = build_prompt("KAN-9", 80.0, 85.0, 0.7, &BaselineSpec::default(), &[entry("A-1"), entry("A-2")]);

        let a2 = prompt.find("On ticket A-2:").unwrap();
        let a1 = prompt.find("On ticket A-1:").unwrap();
        assert!(a2 < a1);
        assert!(prompt.contains("Vibration 80 Hz"));
    }
}
