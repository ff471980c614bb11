//! Analytic chemical-evolution engine for a galaxy annulus.
//!
//! This crate models the coupled gas/star mass flows of one annulus in closed
//! form and explores them with randomized parameter sweeps:
//! - Exponential-basis solution of the mass-balance system ([`spectral`])
//! - Physical parameters, validation and randomized draws ([`model`])
//! - Pass/fail evaluation of a single annulus ([`annulus`])
//! - Concurrent two-axis sweeps over a fixed worker pool ([`sweep`])

#![warn(clippy::all)]

// ============================================================================
// Core modules
// ============================================================================

pub mod annulus;
pub mod error;
pub mod io;
pub mod spectral;
pub mod sweep;

// ============================================================================
// Type definition modules
// ============================================================================

pub mod model;

// ============================================================================
// Test modules
// ============================================================================

#[cfg(test)]
mod tests;

// ============================================================================
// Public re-exports for convenience
// ============================================================================

pub use annulus::{Annulus, TrialModel};
pub use model::{ModelParameters, ModelParametersBuilder, Randomizer};
pub use spectral::{ComplexVector, SpectralProcess};
pub use sweep::{GridSweepScheduler, SuccessGrid, SweepConfig, SweepSummary};
