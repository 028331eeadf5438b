//! Integration test modules for arbor
//!
//! - engine: engine lifecycle, start/stop, backends, deferred swaps
//! - graph: tree construction and routing
//! - parameters: parameter table, levels and events
//! - scenarios: end-to-end PCM checks

pub mod engine;
pub mod graph;
pub mod scenarios;
