//! HTTP handlers

pub mod health;
pub mod telemetry;
pub mod dashboard;
pub mod tickets;
pub mod credentials;
pub mod monitor;
pub mod safety;
