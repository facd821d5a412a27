//! potcheck - checks whether a network endpoint is a honeypot by running a
//! battery of heuristic checks against a reconnaissance snapshot and
//! aggregating their verdicts into a karma score.

pub mod checks;
pub mod config;
pub mod core;
pub mod probes;
