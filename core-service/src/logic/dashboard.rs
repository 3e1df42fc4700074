//! Read-only projections for the dashboard and the agent views
//!
//! Pure functions of stored state; nothing here feeds back into the pipeline.

use chrono::{TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::logic::diagnosis::physics::round1;
use crate::logic::diagnosis::BaselineSpec;
use crate::logic::incident::{FixRecord, NO_LINK};
use crate::logic::telemetry::TelemetryFrame;

const NOMINAL_HEALTH: f64 = 98.5;
const CRITICAL_VIBRATION_HZ: f64 = 60.0;
const WARNING_VIBRATION_HZ: f64 = 52.0;

// ============================================================================
// DASHBOARD
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HealthStatus {
    Optimal,
    Warning,
    Critical,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthSummary {
    pub score: f64,
    pub status: HealthStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiSummary {
    pub knowledge_size: usize,
    pub optimization_rate: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeedEntry {
    pub time: String,
    pub msg: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardSnapshot {
    pub health: HealthSummary,
    pub ai: AiSummary,
    pub feed: Vec<FeedEntry>,
}

pub fn dashboard_snapshot(latest: Option<&TelemetryFrame>, knowledge_size: usize) -> DashboardSnapshot {
    let (penalty, status) = match latest.map(|f| f.vibration) {
        Some(v) if v > CRITICAL_VIBRATION_HZ => (35.0, HealthStatus::Critical),
        Some(v) if v > WARNING_VIBRATION_HZ => (15.0, HealthStatus::Warning),
        _ => (0.0, HealthStatus::Optimal),
    };

    let mut feed = Vec::with_capacity(3);
    if knowledge_size > 0 {
        feed.push(FeedEntry {
            time: "Recently".to_string(),
            msg: format!("🧠 AI Model Retrained. Knowledge Base size: {} scenarios.", knowledge_size),
        });
    }
    feed.push(FeedEntry {
        time: "Now".to_string(),
        msg: format!(
            "Telemetry Stream Active: {}",
            latest
                .map(|f| format!("{:.1} Hz", f.vibration))
                .unwrap_or_else(|| "Waiting...".to_string())
        ),
    });
    feed.push(FeedEntry {
        time: "-2m".to_string(),
        msg: "System Heartbeat: All sensors nominal.".to_string(),
    });

    DashboardSnapshot {
        health: HealthSummary {
            score: round1((NOMINAL_HEALTH - penalty).max(0.0)),
            status,
        },
        ai: AiSummary {
            knowledge_size,
            optimization_rate: format!("{:.1}%", knowledge_size as f64 * 1.2),
        },
        feed,
    }
}

// ============================================================================
// STATUS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhysicsReadout {
    pub vibration: String,
    pub temperature: String,
    pub aero_load: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum StatusReport {
    Live {
        timestamp: String,
        physics: PhysicsReadout,
        fleet_health: String,
        active_protocols: Vec<String>,
    },
    Offline {
        status: String,
        message: String,
    },
}

pub fn status_report(latest: Option<&TelemetryFrame>) -> StatusReport {
    let frame = match latest {
        Some(frame) => frame,
        None => {
            return StatusReport::Offline {
                status: "Offline".to_string(),
                message: "No telemetry stream detected.".to_string(),
            }
        }
    };

    let critical = frame.vibration > CRITICAL_VIBRATION_HZ;
    let timestamp = Utc
        .timestamp_opt(frame.timestamp, 0)
        .single()
        .map(|t| t.to_rfc3339())
        .unwrap_or_default();

    let protocols: &[&str] = if critical {
        &["Autonomous-Fix-Daemon", "FIA-Compliance-Check"]
    } else {
        &["Standard-Monitoring"]
    };

    StatusReport::Live {
        timestamp,
        physics: PhysicsReadout {
            vibration: format!("{:.2} Hz", frame.vibration),
            temperature: format!("{:.1} °C", frame.temperature),
            aero_load: format!("{:.0} N", frame.aero_load),
        },
        fleet_health: if critical { "CRITICAL FAILURE IMMINENT" } else { "NOMINAL" }.to_string(),
        active_protocols: protocols.iter().map(|p| p.to_string()).collect(),
    }
}

// ============================================================================
// TICKET VIEWS
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IncidentSummary {
    Analysed {
        ticket: String,
        root_cause: String,
        telemetry_snapshot: String,
        ai_solution: String,
        compliance_status: String,
        deployment: String,
    },
    NoData {
        error: String,
        message: String,
    },
}

pub fn incident_summary(ticket_id: &str, spec: Option<&BaselineSpec>, fix: Option<&FixRecord>) -> IncidentSummary {
    let (spec, fix) = match (spec, fix) {
        (Some(spec), Some(fix)) => (spec, fix),
        _ => {
            return IncidentSummary::NoData {
                error: "No Data".to_string(),
                message: format!("{} has not been analysed yet. Run a crash test first.", ticket_id),
            }
        }
    };

    IncidentSummary::Analysed {
        ticket: ticket_id.to_string(),
        root_cause: fix.root_cause.clone(),
        telemetry_snapshot: describe_vibration(spec),
        ai_solution: fix.recommendation.clone(),
        compliance_status: fix.compliance_note.clone(),
        deployment: if fix.pr_link != NO_LINK {
            fix.pr_link.clone()
        } else {
            "No automated fix deployed".to_string()
        },
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailureContextData {
    pub ticket: String,
    pub max_vibration: String,
    pub ai_recommendation: String,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FailureContext {
    Found { context: String, data: FailureContextData },
    Missing { message: String },
}

pub fn failure_context(ticket_id: &str, spec: Option<&BaselineSpec>, fix: Option<&FixRecord>) -> FailureContext {
    let spec = match spec {
        Some(spec) => spec,
        None => {
            return FailureContext::Missing {
                message: "No simulation data found.".to_string(),
            }
        }
    };

    FailureContext::Found {
        context: "Telemetry Data from Pit Wall".to_string(),
        data: FailureContextData {
            ticket: ticket_id.to_string(),
            max_vibration: describe_vibration(spec),
            ai_recommendation: fix
                .map(|f| f.recommendation.clone())
                .unwrap_or_else(|| "Pending".to_string()),
            status: "CRITICAL FAILURE DETECTED".to_string(),
        },
    }
}

fn describe_vibration(spec: &BaselineSpec) -> String {
    spec.max_vibration
        .as_ref()
        .and_then(|r| r.value())
        .map(|v| format!("{:.2} Hz", v))
        .unwrap_or_else(|| "Unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(v: f64) -> TelemetryFrame {
        TelemetryFrame { vibration: v, temperature: 85.04, aero_load: 1503.6, timestamp: 1_700_000_000 }
    }

    #[test]
    fn test_health_bands() {
        assert_eq!(dashboard_snapshot(None, 0).health, HealthSummary { score: 98.5, status: HealthStatus::Optimal });
        assert_eq!(dashboard_snapshot(Some(&frame(50.0)), 0).health.status, HealthStatus::Optimal);

        let warn = dashboard_snapshot(Some(&frame(55.0)), 0).health;
        assert_eq!((warn.score, warn.status), (83.5, HealthStatus::Warning));

        let crit = dashboard_snapshot(Some(&frame(61.0)), 0).health;
        assert_eq!((crit.score, crit.status), (63.5, HealthStatus::Critical));
    }

    #[test]
    fn test_feed_and_optimisation_rate() {
        let snap = dashboard_snapshot(Some(&frame(50.04)), 3);
        assert_eq!(snap.ai.optimization_rate, "3.6%");
        assert_eq!(snap.feed.len(), 3);
        assert!(snap.feed[0].msg.contains("3 scenarios"));
        assert!(snap.feed[1].msg.contains("50.0 Hz"));

        let empty = dashboard_snapshot(None, 0);
        assert_eq!(empty.feed.len(), 2);
        assert!(empty.feed[0].msg.contains("Waiting..."));
    }

    #[test]
    fn test_status_formatting() {
        match status_report(Some(&frame(61.234))) {
            StatusReport::Live { physics, fleet_health, active_protocols, .. } => {
                assert_eq!(physics.vibration, "61.23 Hz");
                assert_eq!(physics.temperature, "85.0 °C");
                assert_eq!(physics.aero_load, "1504 N");
                assert_eq!(fleet_health, "CRITICAL FAILURE IMMINENT");
                assert_eq!(active_protocols.len(), 2);
            }
            other => panic!("unexpected {:?}", other),
        }
        assert!(matches!(status_report(None), StatusReport::Offline { .. }));
    }

    #[test]
    fn test_ticket_views_without_data() {
        assert!(matches!(incident_summary("KAN-1", None, None), IncidentSummary::NoData { .. }));
        assert!(matches!(failure_context("KAN-1", None, None), FailureContext::Missing { .. }));

        let spec = BaselineSpec::default();
        match failure_context("KAN-1", Some(&spec), None) {
            FailureContext::Found { data, .. } => {
                assert_eq!(data.ai_recommendation, "Pending");
                assert_eq!(data.max_vibration, "Unknown");
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
