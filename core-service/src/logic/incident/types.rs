use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::logic::compliance::ComplianceVerdict;
use crate::logic::diagnosis::FailureEvent;

/// Placeholder link recorded when no fix was deployed
pub const NO_LINK: &str = "N/A";

/// Fixed extras shipped with every corrective spec
pub const DAMPENING_COEFFICIENT: &str = "+15%";
pub const MAX_LOAD_RATING: &str = "2500 N";

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TicketPhase {
    Unobserved,
    Monitoring,
    FailureDetected,
    Diagnosed,
    ComplianceChecked,
    FixDeployed,
    Learned, // terminal
}

impl TicketPhase {
    fn rank(&self) -> u8 {
        match self {
            TicketPhase::Unobserved => 0,
            TicketPhase::Monitoring => 1,
            TicketPhase::FailureDetected => 2,
            TicketPhase::Diagnosed => 3,
            TicketPhase::ComplianceChecked => 4,
            TicketPhase::FixDeployed => 5,
            TicketPhase::Learned => 6,
        }
    }

    pub fn is_after(&self, other: TicketPhase) -> bool {
        self.rank() > other.rank()
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TicketPhase::Unobserved => "UNOBSERVED",
            TicketPhase::Monitoring => "MONITORING",
            TicketPhase::FailureDetected => "FAILURE_DETECTED",
            TicketPhase::Diagnosed => "DIAGNOSED",
            TicketPhase::ComplianceChecked => "COMPLIANCE_CHECKED",
            TicketPhase::FixDeployed => "FIX_DEPLOYED",
            TicketPhase::Learned => "LEARNED",
        }
    }
}

/// Per-ticket pipeline state, owned by the registry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketState {
    pub ticket_id: String,
    pub phase: TicketPhase,
    pub run_id: Uuid,
    /// A failure was accepted for the current run
    pub reported: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TicketState {
    pub fn new(ticket_id: &str) -> Self {
        let now = Utc::now();
        Self {
            ticket_id: ticket_id.to_string(),
            phase: TicketPhase::Unobserved,
            run_id: Uuid::new_v4(),
            reported: false,
            created_at: now,
            updated_at: now,
        }
    }

    pub(super) fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("a failure was already reported for the current run of {0}")]
    AlreadyReported(String),

    #[error("ticket {0} has no active run")]
    UnknownTicket(String),

    #[error("run {run_id} of {ticket_id} was superseded")]
    StaleRun { ticket_id: String, run_id: Uuid },

    #[error("cannot move {ticket_id} from {from:?} to {to:?}")]
    Backwards {
        ticket_id: String,
        from: TicketPhase,
        to: TicketPhase,
    },
}

/// Approved design spec, the artifact committed by the fix deployer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FinalSpec {
    pub material_thickness_mm: f64,
    pub estimated_weight_g: f64,
    pub dampening_coefficient: String,
    pub max_load_rating: String,
}

impl FinalSpec {
    pub fn new(material_thickness_mm: f64, estimated_weight_g: f64) -> Self {
        Self {
            material_thickness_mm,
            estimated_weight_g,
            dampening_coefficient: DAMPENING_COEFFICIENT.to_string(),
            max_load_rating: MAX_LOAD_RATING.to_string(),
        }
    }

    /// Engineering-file representation with units
    pub fn to_artifact_json(&self) -> serde_json::Value {
        serde_json::json!({
            "material_thickness": format!("{:.1}mm", self.material_thickness_mm),
            "estimated_weight": format!("{:.0}g", self.estimated_weight_g),
            "dampening_coefficient": self.dampening_coefficient,
            "max_load_rating": self.max_load_rating,
        })
    }
}

/// Latest-wins record of a ticket's diagnosis, verdict and deployment
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FixRecord {
    pub ticket_id: String,
    pub run_id: Uuid,
    pub recommendation: String,
    pub root_cause: String,
    pub compliance_note: String,
    pub verdict: ComplianceVerdict,
    pub specs: FinalSpec,
    pub pr_link: String,
    /// Telemetry that triggered the run
    pub failure: FailureEvent,
    pub updated_at: DateTime<Utc>,
}

impl FixRecord {
    pub fn is_deployed(&self) -> bool {
        self.pr_link != NO_LINK
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phase_order() {
        assert!(TicketPhase::Diagnosed.is_after(TicketPhase::FailureDetected));
        assert!(TicketPhase::Learned.is_after(TicketPhase::FixDeployed));
        assert!(!TicketPhase::Monitoring.is_after(TicketPhase::Monitoring));
    }

    #[test]
    fn test_artifact_carries_units_and_extras() {
        let json = FinalSpec::new(8.0, 480.0).to_artifact_json();
        assert_eq!(json["material_thickness"], "8.0mm");
        assert_eq!(json["estimated_weight"], "480g");
        assert_eq!(json["dampening_coefficient"], "+15%");
        assert_eq!(json["max_load_rating"], "2500 N");
    }
}
