//! Compliance Enforcer
//!
//! Single gate between proposed values and anything persisted or deployed.
//! `enforce` is total and pure: the verdict's final value never exceeds the
//! regulatory ceiling.

use serde::{Deserialize, Serialize};

use crate::constants::{REGULATORY_CEILING_MM, REGULATORY_RULE_ID};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum VerdictStatus {
    Approved,
    Restricted,
}

impl VerdictStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VerdictStatus::Approved => "APPROVED",
            VerdictStatus::Restricted => "RESTRICTED",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplianceVerdict {
    pub rule_id: String,
    pub original_value: f64,
    pub final_value: f64,
    pub status: VerdictStatus,
    /// Compliance finding, citing the rule on violation
    pub message: String,
    /// What happens to the fix as a result
    pub action: String,
}

impl ComplianceVerdict {
    pub fn is_restricted(&self) -> bool {
        self.status == VerdictStatus::Restricted
    }

    /// Finding and action as one line
    pub fn note(&self) -> String {
        format!("{} {}", self.message, self.action)
    }

    /// Audit payload for the ticket notification
    pub fn audit_json(&self) -> serde_json::Value {
        serde_json::json!({
            "rule_id": self.rule_id,
            "original_proposal": format!("{}mm", self.original_value),
            "final_approved": format!("{}mm", self.final_value),
            "status": self.status.as_str(),
        })
    }
}

/// Check a proposed thickness against the regulatory ceiling
pub fn enforce(proposal_value: f64) -> ComplianceVerdict {
    enforce_with(proposal_value, REGULATORY_CEILING_MM, REGULATORY_RULE_ID)
}

pub fn enforce_with(proposal_value: f64, ceiling: f64, rule_id: &str) -> ComplianceVerdict {
    // NaN compares false against the ceiling, so test for compliance instead
    let compliant = proposal_value <= ceiling;

    if compliant {
        ComplianceVerdict {
            rule_id: rule_id.to_string(),
            original_value: proposal_value,
            final_value: proposal_value,
            status: VerdictStatus::Approved,
            message: "COMPLIANT: Design is within FIA Article 3.4 limits.".to_string(),
            action: "Auto-Fix proceeding with proposed specs.".to_string(),
        }
    } else {
        ComplianceVerdict {
            rule_id: rule_id.to_string(),
            original_value: proposal_value,
            final_value: ceiling,
            status: VerdictStatus::Restricted,
            message: format!(
                "VIOLATION DETECTED: {}mm exceeds FIA Article 3.4 limit ({}mm) under rule {}.",
                proposal_value, ceiling, rule_id
            ),
            action: format!("CORRECTION APPLIED: Thickness capped at {:.1}mm. Auto-Fix updated.", ceiling),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logic::diagnosis::{physics, BaselineSpec};

    #[test]
    fn test_within_limit_is_approved() {
        let v = enforce(6.0);
        assert_eq!(v.status, VerdictStatus::Approved);
        assert_eq!(v.final_value, 6.0);
        assert_eq!(v.rule_id, "FIA-2025-ART-3.4");
    }

    #[test]
    fn test_ceiling_itself_is_approved() {
        let v = enforce(8.0);
        assert_eq!(v.status, VerdictStatus::Approved);
        assert_eq!(v.final_value, 8.0);
    }

    #[test]
    fn test_violation_is_capped_and_cites_rule() {
        let v = enforce(8.5);
        assert_eq!(v.status, VerdictStatus::Restricted);
        assert_eq!(v.original_value, 8.5);
        assert_eq!(v.final_value, 8.0);
        assert!(v.message.contains("FIA-2025-ART-3.4"));
        assert!(v.message.contains("8.5mm"));
        assert!(v.action.contains("capped at 8.0mm"));
    }

    #[test]
    fn test_non_finite_input_is_capped() {
        assert_eq!(enforce(f64::NAN).final_value, 8.0);
        assert_eq!(enforce(f64::INFINITY).status, VerdictStatus::Restricted);
    }

    #[test]
    fn test_enforce_is_pure() {
        assert_eq!(enforce(8.7), enforce(8.7));
        assert_eq!(enforce(5.5), enforce(5.5));
    }

    #[test]
    fn test_fractional_vibration_rounds_before_the_gate() {
        // Thickness is rounded to 0.1 mm first, so just above 75 Hz still lands on the ceiling
        let baseline = BaselineSpec::default();
        for v in [75.04, 75.4] {
            let verdict = enforce(physics::corrective_thickness(v, &baseline));
            assert_eq!(verdict.status, VerdictStatus::Approved, "vibration {}", v);
            assert_eq!(verdict.final_value, 8.0);
        }

        let verdict = enforce(physics::corrective_thickness(75.6, &baseline));
        assert_eq!(verdict.status, VerdictStatus::Restricted);
        assert_eq!(verdict.original_value, 8.1);
    }

    #[test]
    fn test_vibration_sweep_boundary() {
        let baseline = BaselineSpec::default();
        let mut v = 0.0;
        while v <= 120.0 {
            let thickness = physics::corrective_thickness(v, &baseline);
            let verdict = enforce(thickness);
            if v <= 75.0 {
                assert_eq!(verdict.status, VerdictStatus::Approved, "vibration {}", v);
            } else {
                assert_eq!(verdict.status, VerdictStatus::Restricted, "vibration {}", v);
                assert_eq!(verdict.final_value, 8.0);
            }
            assert!(verdict.final_value <= 8.0);
            v += 1.0;
        }
    }

    #[test]
    fn test_audit_payload() {
        let json = enforce(8.5).audit_json();
        assert_eq!(json["original_proposal"], "8.5mm");
        assert_eq!(json["final_approved"], "8mm");
        assert_eq!(json["status"], "RESTRICTED");
    }
}
