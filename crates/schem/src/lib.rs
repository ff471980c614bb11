//! Command-line driver for the annulus chemistry engine
//!
//! Loads a YAML run configuration, then either evolves a single annulus or
//! runs a randomized two-axis sweep, saving results to an output directory.

pub mod config;
pub mod driver;
pub mod logging;

pub use config::{Overrides, RunConfig, RunMode};
pub use driver::{RunOutcome, run};
pub use logging::init_logging;
