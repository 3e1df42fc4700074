//! Ticket lifecycle
//!
//! `Unobserved -> Monitoring -> FailureDetected -> Diagnosed ->
//! ComplianceChecked -> FixDeployed -> Learned`

pub mod manager;
pub mod types;

pub use manager::TicketRegistry;
pub use types::{
    FinalSpec, FixRecord, TicketPhase, TicketState, TransitionError, NO_LINK,
};
