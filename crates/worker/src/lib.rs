//! Queue-driven validation service: poll events, validate them, publish results.

pub mod service;
pub mod setup;

pub use service::{CycleReport, ValidationService};
