//! Run configuration loaded from YAML and overridden from the command line.

use std::path::Path;

use color_eyre::eyre::WrapErr;
use serde::{Deserialize, Serialize};

use schem_core::model::{ModelParameters, Randomizer};
use schem_core::sweep::SweepConfig;

/// What a run does with the configured parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    /// Evolve one annulus and save its history
    #[default]
    Single,
    /// Randomized two-axis sweep over the success criteria
    Sweep,
}

/// Everything a run needs besides the output location
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RunConfig {
    pub mode: RunMode,
    /// Base parameters of the annulus
    pub parameters: ModelParameters,
    /// Per-trial scatter applied in sweep mode
    pub randomization: Randomizer,
    pub sweep: SweepConfig,
}

/// Command-line values that take precedence over the file
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub mode: Option<RunMode>,
    pub trials: Option<usize>,
    pub threads: Option<usize>,
    pub seed: Option<u64>,
}

impl RunConfig {
    pub fn from_yaml(yaml: &str) -> Result<Self, serde_saphyr::Error> {
        serde_saphyr::from_str(yaml)
    }

    pub fn to_yaml(&self) -> Result<String, serde_saphyr::ser::Error> {
        serde_saphyr::to_string(self)
    }

    /// Read and parse a YAML run configuration
    pub fn load(path: &Path) -> color_eyre::Result<Self> {
        let content = std::fs::read_to_string(path)
            .wrap_err_with(|| format!("failed to read config {}", path.display()))?;
        Self::from_yaml(&content)
            .wrap_err_with(|| format!("failed to parse config {}", path.display()))
    }

    pub fn apply_overrides(&mut self, overrides: &Overrides) {
        if let Some(mode) = overrides.mode {
            self.mode = mode;
        }
        if let Some(trials) = overrides.trials {
            self.sweep.trials = trials;
        }
        if let Some(threads) = overrides.threads {
            self.sweep.pool_size = threads;
        }
        if let Some(seed) = overrides.seed {
            self.sweep.seed = Some(seed);
        }
    }
}
