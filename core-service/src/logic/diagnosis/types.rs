//! Diagnosis Types

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::constants::{
    BASE_THICKNESS_MM, BASE_WEIGHT_G, DEFAULT_MATERIAL, TARGET_RESONANCE_HZ,
};

static NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"-?\d+(?:\.\d+)?").expect("number pattern is valid"));

static HERTZ: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)(-?\d+(?:\.\d+)?)\s*hz\b").expect("hertz pattern is valid"));

// ============================================================================
// READINGS
// ============================================================================

/// A sensor value that may arrive as a number or as text like `"81.20 Hz"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Reading {
    Number(f64),
    Text(String),
}

impl Reading {
    /// Numeric value, if one can be recovered
    pub fn value(&self) -> Option<f64> {
        match self {
            Reading::Number(v) if v.is_finite() => Some(*v),
            Reading::Number(_) => None,
            // The number tagged `Hz` wins; otherwise the last one in the text
            Reading::Text(s) => HERTZ
                .captures(s)
                .and_then(|c| c.get(1))
                .or_else(|| NUMBER.find_iter(s).last())
                .and_then(|m| m.as_str().parse::<f64>().ok())
                .filter(|v| v.is_finite()),
        }
    }
}

impl From<f64> for Reading {
    fn from(v: f64) -> Self {
        Reading::Number(v)
    }
}

impl From<&str> for Reading {
    fn from(s: &str) -> Self {
        Reading::Text(s.to_string())
    }
}

// ============================================================================
// FAILURE EVENT
// ============================================================================

/// Raised when the anomaly score crosses the threshold
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureEvent {
    pub ticket_id: String,
    pub max_vibration: Reading,
    pub temperature: f64,
    pub anomaly_score: f64,
    pub timestamp: String,
}

// ============================================================================
// BASELINE
// ============================================================================

/// Baseline design recorded when a ticket is engaged
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaselineSpec {
    #[serde(default)]
    pub max_vibration: Option<Reading>,
    #[serde(default = "default_material")]
    pub material_suggestion: String,
    #[serde(default = "default_thickness")]
    pub base_thickness_mm: f64,
    #[serde(default = "default_weight")]
    pub base_weight_g: f64,
    #[serde(default = "default_resonance")]
    pub target_resonance_hz: f64,
}

fn default_material() -> String {
    DEFAULT_MATERIAL.to_string()
}

fn default_thickness() -> f64 {
    BASE_THICKNESS_MM
}

fn default_weight() -> f64 {
    BASE_WEIGHT_G
}

fn default_resonance() -> f64 {
    TARGET_RESONANCE_HZ
}

impl Default for BaselineSpec {
    fn default() -> Self {
        Self {
            max_vibration: None,
            material_suggestion: default_material(),
            base_thickness_mm: BASE_THICKNESS_MM,
            base_weight_g: BASE_WEIGHT_G,
            target_resonance_hz: TARGET_RESONANCE_HZ,
        }
    }
}

// ============================================================================
// PROPOSAL
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Confidence {
    Low,
    #[serde(rename = "Medium/Calculated")]
    MediumCalculated,
    High,
}

impl Confidence {
    pub fn as_str(&self) -> &'static str {
        match self {
            Confidence::Low => "Low",
            Confidence::MediumCalculated => "Medium/Calculated",
            Confidence::High => "High",
        }
    }
}

/// Where the proposal narrative came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalSource {
    Rules,
    LanguageModel,
}

/// Diagnosis output; one per failure event
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Proposal {
    pub root_cause: String,
    pub recommendation: String,
    pub suggested_changes: BTreeMap<String, f64>,
    pub confidence: Confidence,
    pub source: ProposalSource,
    /// Ticket of the prior resolved case that shaped the narrative
    pub reference_ticket: Option<String>,
}

impl Proposal {
    pub const THICKNESS: &'static str = "material_thickness";
    pub const WEIGHT: &'static str = "estimated_weight";

    pub fn thickness_mm(&self) -> f64 {
        self.suggested_changes.get(Self::THICKNESS).copied().unwrap_or(BASE_THICKNESS_MM)
    }

    pub fn weight_g(&self) -> f64 {
        self.suggested_changes.get(Self::WEIGHT).copied().unwrap_or(BASE_WEIGHT_G)
    }
}
