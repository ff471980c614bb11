use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::model::{ModelParameters, ScalarParam};

/// One swept parameter with evenly spaced steps between `min` and `max`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepAxis {
    pub target: ScalarParam,
    pub min: f64,
    pub max: f64,
    pub steps: usize,
}

impl SweepAxis {
    #[must_use]
    pub fn new(target: ScalarParam, min: f64, max: f64, steps: usize) -> Self {
        Self {
            target,
            min,
            max,
            steps,
        }
    }

    /// Value at step `index`. A single-step axis sits at the midpoint.
    #[must_use]
    pub fn value_at(&self, index: usize) -> f64 {
        if self.steps <= 1 {
            (self.min + self.max) / 2.0
        } else {
            self.min + (self.max - self.min) * (index as f64) / (self.steps - 1) as f64
        }
    }

    /// All step values in order
    #[must_use]
    pub fn values(&self) -> Vec<f64> {
        (0..self.steps).map(|i| self.value_at(i)).collect()
    }

    /// Copy of `params` with the target set to step `index`
    #[must_use]
    pub fn apply(&self, params: &ModelParameters, index: usize) -> ModelParameters {
        params.with(self.target, self.value_at(index))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let name = self.target.name().to_string();
        if self.steps == 0 {
            return Err(ConfigError::InvalidAxis {
                name,
                reason: "steps must be at least 1",
            });
        }
        if !self.min.is_finite() || !self.max.is_finite() {
            return Err(ConfigError::InvalidAxis {
                name,
                reason: "bounds must be finite",
            });
        }
        if self.min > self.max {
            return Err(ConfigError::InvalidAxis {
                name,
                reason: "min must not exceed max",
            });
        }
        Ok(())
    }
}
