//! Scenario tests for the annulus engine
//!
//! Tests are organized by topic:
//! - `spectral` - Basis construction, evaluation and integral operators
//! - `annulus` - Single-annulus evaluation, evolution and snapshots
//! - `sweep` - Scheduler determinism, failure isolation and snapshots

mod annulus;
mod spectral;
