//! Knowledge Base entries
//!
//! Append-only log of resolved failure -> fix pairs. Diagnosis reads it,
//! only the learning loop writes it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// How many recent entries diagnosis consults
pub const RETRIEVAL_WINDOW: usize = 3;

/// Telemetry that characterised a resolved failure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub vibration: String,
    #[serde(default)]
    pub temperature: Option<f64>,
    #[serde(default)]
    pub anomaly_score: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeEntry {
    pub ticket_id: String,
    pub scenario: Scenario,
    pub successful_fix: String,
    pub timestamp: DateTime<Utc>,
}

/// Most recent entry among the last `RETRIEVAL_WINDOW`
pub fn latest_match(knowledge: &[KnowledgeEntry]) -> Option<&KnowledgeEntry> {
    let start = knowledge.len().saturating_sub(RETRIEVAL_WINDOW);
    knowledge[start..].last()
}

/// The last `RETRIEVAL_WINDOW` entries, newest first
pub fn recent(knowledge: &[KnowledgeEntry]) -> impl Iterator<Item = &KnowledgeEntry> {
    let start = knowledge.len().saturating_sub(RETRIEVAL_WINDOW);
    knowledge[start..].iter().rev()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(ticket: &str) -> KnowledgeEntry {
        KnowledgeEntry {
            ticket_id: ticket.to_string(),
            scenario: Scenario {
                vibration: "80 Hz".to_string(),
                temperature: None,
                anomaly_score: None,
            },
            successful_fix: "Increase precision thickness to 8.0mm (Titanium Alloy).".to_string(),
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_latest_match_empty() {
        assert!(latest_match(&[]).is_none());
    }

    #[test]
    fn test_latest_match_picks_newest() {
        let kb = vec![entry("A-1"), entry("A-2"), entry("A-3"), entry("A-4")];
        assert_eq!(latest_match(&kb).unwrap().ticket_id, "A-4");

        let ids: Vec<_> = recent(&kb).map(|e| e.ticket_id.as_str()).collect();
        assert_eq!(ids, vec!["A-4", "A-3", "A-2"]);
    }
}
