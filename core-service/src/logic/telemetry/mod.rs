//! Telemetry Module
//!
//! ## Structure
//! - `frame.rs` - sensor frame and ingest status
//! - `rig.rs` - simulated test rig

pub mod frame;
pub mod rig;

pub use frame::{IngestStatus, TelemetryFrame};
pub use rig::TelemetryRig;
