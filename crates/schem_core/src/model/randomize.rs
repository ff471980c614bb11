//! Randomized draws of model parameters around a base configuration.

use rand::Rng;
use rand::distr::Distribution;
use serde::{Deserialize, Serialize};

use super::params::{InflowEvent, ModelParameters, ScalarParam};
use crate::error::ConfigError;

/// How a single scalar is scattered around its base value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Spread {
    /// Replace the value with a uniform draw from `[min, max)`
    Uniform { min: f64, max: f64 },
    /// Add a zero-mean normal offset
    Normal { std_dev: f64 },
    /// Multiply by `exp(N(0, sigma))`
    LogNormal { sigma: f64 },
}

impl Spread {
    pub fn sample<R: Rng + ?Sized>(
        &self,
        base: f64,
        name: &'static str,
        rng: &mut R,
    ) -> Result<f64, ConfigError> {
        match self {
            Spread::Uniform { min, max } => rand::distr::Uniform::new(*min, *max)
                .map(|d| d.sample(rng))
                .map_err(|_| ConfigError::InvalidDistribution {
                    name,
                    reason: "uniform bounds must be finite with min < max",
                }),
            Spread::Normal { std_dev } => rand_distr::Normal::new(base, *std_dev)
                .map(|d| d.sample(rng))
                .map_err(|_| ConfigError::InvalidDistribution {
                    name,
                    reason: "std_dev must be non-negative and finite",
                }),
            Spread::LogNormal { sigma } => rand_distr::LogNormal::new(0.0, *sigma)
                .map(|d| base * d.sample(rng))
                .map_err(|_| ConfigError::InvalidDistribution {
                    name,
                    reason: "sigma must be non-negative and finite",
                }),
        }
    }
}

/// One randomized scalar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Perturbation {
    pub target: ScalarParam,
    pub spread: Spread,
}

/// Produces independent parameter draws from a fixed base configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Randomizer {
    pub perturbations: Vec<Perturbation>,
    /// Log-normal scatter applied to every inflow mass
    pub inflow_mass_sigma: Option<f64>,
}

impl Randomizer {
    #[must_use]
    pub fn new(perturbations: Vec<Perturbation>) -> Self {
        Self {
            perturbations,
            inflow_mass_sigma: None,
        }
    }

    /// Randomizer that returns the base parameters unchanged
    #[must_use]
    pub fn identity() -> Self {
        Self::default()
    }

    /// Draw a new parameter set. The base is never modified.
    pub fn draw<R: Rng + ?Sized>(
        &self,
        base: &ModelParameters,
        rng: &mut R,
    ) -> Result<ModelParameters, ConfigError> {
        let mut params = base.clone();
        for perturbation in &self.perturbations {
            let current = params.get(perturbation.target);
            let value = perturbation
                .spread
                .sample(current, perturbation.target.name(), rng)?;
            params = params.with(perturbation.target, value);
        }

        if let Some(sigma) = self.inflow_mass_sigma {
            let spread = Spread::LogNormal { sigma };
            params.inflows = params
                .inflows
                .iter()
                .map(|inflow| {
                    spread
                        .sample(inflow.mass, "inflow mass", rng)
                        .map(|mass| InflowEvent::new(mass, inflow.decay_rate))
                })
                .collect::<Result<_, _>>()?;
        }

        Ok(params)
    }
}
