//! Snapshot data model, verdict taxonomy and the battery orchestrator.

pub mod error;
pub mod outcome;
pub mod output;
pub mod platform;
pub mod snapshot;
