use std::collections::HashMap;

use parking_lot::Mutex;
use uuid::Uuid;

use super::types::{TicketPhase, TicketState, TransitionError};

/// Per-ticket state records. Every check-and-set happens under one lock.
#[derive(Default)]
pub struct TicketRegistry {
    tickets: Mutex<HashMap<String, TicketState>>,
}

impl TicketRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, ticket_id: &str) -> Option<TicketState> {
        self.tickets.lock().get(ticket_id).cloned()
    }

    pub fn phase(&self, ticket_id: &str) -> TicketPhase {
        self.get(ticket_id).map(|s| s.phase).unwrap_or(TicketPhase::Unobserved)
    }

    /// Move an unobserved ticket to Monitoring; other phases are untouched
    pub fn engage(&self, ticket_id: &str) -> TicketState {
        let mut tickets = self.tickets.lock();
        let state = tickets
            .entry(ticket_id.to_string())
            .or_insert_with(|| TicketState::new(ticket_id));

        if state.phase == TicketPhase::Unobserved {
            state.phase = TicketPhase::Monitoring;
            state.touch();
        }
        state.clone()
    }

    /// Start a fresh test run: new run id, `reported` cleared
    pub fn begin_run(&self, ticket_id: &str) -> Result<TicketState, TransitionError> {
        let mut tickets = self.tickets.lock();
        let state = tickets
            .entry(ticket_id.to_string())
            .or_insert_with(|| TicketState::new(ticket_id));

        state.run_id = Uuid::new_v4();
        state.reported = false;
        state.phase = TicketPhase::Monitoring;
        state.touch();
        Ok(state.clone())
    }

    /// Atomically accept the single failure of the current run.
    ///
    /// Returns the run id the failure belongs to.
    pub fn claim_failure(&self, ticket_id: &str) -> Result<Uuid, TransitionError> {
        let mut tickets = self.tickets.lock();
        let state = tickets
            .entry(ticket_id.to_string())
            .or_insert_with(|| TicketState::new(ticket_id));

        if state.reported {
            return Err(TransitionError::AlreadyReported(ticket_id.to_string()));
        }

        state.reported = true;
        state.phase = TicketPhase::FailureDetected;
        state.touch();
        Ok(state.run_id)
    }

    /// Move a run forward. Stale runs and backwards moves are rejected.
    pub fn advance(&self, ticket_id: &str, run_id: Uuid, to: TicketPhase) -> Result<(), TransitionError> {
        let mut tickets = self.tickets.lock();
        let state = tickets
            .get_mut(ticket_id)
            .ok_or_else(|| TransitionError::UnknownTicket(ticket_id.to_string()))?;

        if state.run_id != run_id {
            return Err(TransitionError::StaleRun {
                ticket_id: ticket_id.to_string(),
                run_id,
            });
        }
        if !to.is_after(state.phase) {
            return Err(TransitionError::Backwards {
                ticket_id: ticket_id.to_string(),
                from: state.phase,
                to,
            });
        }

        state.phase = to;
        state.touch();
        Ok(())
    }

    /// Drop the record of a learned ticket. The terminal flag lives in the store.
    pub fn archive(&self, ticket_id: &str) -> Option<TicketState> {
        self.tickets.lock().remove(ticket_id)
    }

    pub fn is_empty(&self) -> bool {
        self.tickets.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_claim_per_run() {
        let registry = TicketRegistry::new();
        registry.engage("KAN-1");

        let run = registry.claim_failure("KAN-1").unwrap();
        assert_eq!(
            registry.claim_failure("KAN-1"),
            Err(TransitionError::AlreadyReported("KAN-1".to_string()))
        );

        let next = registry.begin_run("KAN-1").unwrap();
        assert_ne!(next.run_id, run);
        assert!(registry.claim_failure("KAN-1").is_ok());
    }

    #[test]
    fn test_forward_only() {
        let registry = TicketRegistry::new();
        let run = registry.claim_failure("KAN-2").unwrap();

        registry.advance("KAN-2", run, TicketPhase::Diagnosed).unwrap();
        registry.advance("KAN-2", run, TicketPhase::ComplianceChecked).unwrap();
        let err = registry.advance("KAN-2", run, TicketPhase::Diagnosed).unwrap_err();
        assert!(matches!(err, TransitionError::Backwards { .. }));
    }

    #[test]
    fn test_superseded_run_cannot_advance() {
        let registry = TicketRegistry::new();
        let old = registry.claim_failure("KAN-3").unwrap();
        registry.begin_run("KAN-3").unwrap();

        let err = registry.advance("KAN-3", old, TicketPhase::Diagnosed).unwrap_err();
        assert!(matches!(err, TransitionError::StaleRun { .. }));
    }

    #[test]
    fn test_archive_drops_record() {
        let registry = TicketRegistry::new();
        registry.engage("KAN-4");
        registry.claim_failure("KAN-4").unwrap();

        let archived = registry.archive("KAN-4").unwrap();
        assert_eq!(archived.phase, TicketPhase::FailureDetected);
        assert!(registry.is_empty());
        assert!(registry.archive("KAN-4").is_none());
        assert_eq!(registry.phase("KAN-4"), TicketPhase::Unobserved);
    }

    #[test]
    fn test_engage_does_not_rewind() {
        let registry = TicketRegistry::new();
        registry.claim_failure("KAN-5").unwrap();
        let state = registry.engage("KAN-5");
        assert_eq!(state.phase, TicketPhase::FailureDetected);
    }
}
