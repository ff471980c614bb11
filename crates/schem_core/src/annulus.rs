//! A single annulus evaluated from its spectral solution.

use std::fmt::Write as _;
use std::io;
use std::path::Path;

use crate::error::ModelError;
use crate::io::atomic_write;
use crate::model::ModelParameters;
use crate::spectral::{ComplexVector, SpectralProcess, basis};

/// Evolution horizon relative to the final evaluation time
const HORIZON_FACTOR: f64 = 1.02;

/// A model that can be evaluated once per sweep grid cell.
///
/// The scheduler only depends on this trait, so tests can drive it with
/// lightweight stand-ins.
pub trait TrialModel: Sized {
    fn from_parameters(params: &ModelParameters) -> Result<Self, ModelError>;

    /// Whether the final state passes the success criteria
    fn evaluate_final_state(&self) -> bool;

    /// Compute the full time history. Only needed before [`Self::persist`].
    fn evolve(&mut self) -> Result<(), ModelError>;

    /// Write a snapshot of the model to `path`
    fn persist(&self, path: &Path) -> io::Result<()>;
}

/// Channel rates and cumulative mass at one instant
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AnnulusSample {
    pub time: f64,
    pub star_formation_rate: f64,
    pub stars_formed: f64,
    pub feedback_rate: f64,
    pub delayed_return_rate: f64,
}

impl AnnulusSample {
    fn is_finite(&self) -> bool {
        [
            self.star_formation_rate,
            self.stars_formed,
            self.feedback_rate,
            self.delayed_return_rate,
        ]
        .iter()
        .all(|v| v.is_finite())
    }
}

#[derive(Debug, Clone)]
pub struct Annulus {
    params: ModelParameters,
    process: SpectralProcess,
    feedback: ComplexVector,
    delayed_return: ComplexVector,
    history: Vec<AnnulusSample>,
}

impl Annulus {
    pub fn new(params: &ModelParameters) -> Result<Self, ModelError> {
        let process = SpectralProcess::new(params)?;
        let feedback = process.feedback_flow(params.hot_fraction)?;
        let delayed_return = process
            .generic_convolution(process.flow_coefficients(), basis::DELAY)?
            .scale(params.delay_decay);

        Ok(Self {
            params: params.clone(),
            process,
            feedback,
            delayed_return,
            history: Vec::new(),
        })
    }

    #[must_use]
    pub fn process(&self) -> &SpectralProcess {
        &self.process
    }

    #[must_use]
    pub fn params(&self) -> &ModelParameters {
        &self.params
    }

    /// Samples recorded by the last call to [`TrialModel::evolve`]
    #[must_use]
    pub fn history(&self) -> &[AnnulusSample] {
        &self.history
    }

    pub fn sample_at(&self, t: f64) -> Result<AnnulusSample, ModelError> {
        let flow = self.process.flow_coefficients();
        Ok(AnnulusSample {
            time: t,
            star_formation_rate: self.process.rate_at(flow, t)?,
            stars_formed: self.process.integral_to(flow, t)?,
            feedback_rate: self.process.rate_at(&self.feedback, t)?,
            delayed_return_rate: self.process.rate_at(&self.delayed_return, t)?,
        })
    }

    /// State at the configured final time
    pub fn final_state(&self) -> Result<AnnulusSample, ModelError> {
        self.sample_at(self.params.final_time)
    }

    /// Sample times `0, Δt, 2Δt, …` up to the evolution horizon
    #[must_use]
    pub fn time_vector(&self) -> Vec<f64> {
        let horizon = self.params.final_time * HORIZON_FACTOR;
        let steps = (horizon / self.params.time_step).floor() as usize;
        (0..=steps)
            .map(|k| k as f64 * self.params.time_step)
            .collect()
    }

    fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(
            out,
            "# sfr_rate={} cooling_rate={} outflow_fraction={} hot_fraction={} complex_domain={}",
            self.params.sfr_rate,
            self.params.cooling_rate,
            self.params.outflow_fraction,
            self.params.hot_fraction,
            self.process.is_complex_domain()
        );
        let _ = writeln!(
            out,
            "# time star_formation_rate stars_formed feedback_rate delayed_return_rate"
        );
        for s in &self.history {
            let _ = writeln!(
                out,
                "{:.6e} {:.6e} {:.6e} {:.6e} {:.6e}",
                s.time, s.star_formation_rate, s.stars_formed, s.feedback_rate, s.delayed_return_rate
            );
        }
        out
    }
}

impl TrialModel for Annulus {
    fn from_parameters(params: &ModelParameters) -> Result<Self, ModelError> {
        Annulus::new(params)
    }

    fn evaluate_final_state(&self) -> bool {
        match self.final_state() {
            Ok(state) => {
                state.is_finite()
                    && self
                        .params
                        .success
                        .accepts(state.stars_formed, state.star_formation_rate)
            }
            Err(e) => {
                tracing::debug!("final state evaluation failed: {e}");
                false
            }
        }
    }

    fn evolve(&mut self) -> Result<(), ModelError> {
        self.history = self
            .time_vector()
            .into_iter()
            .map(|t| self.sample_at(t))
            .collect::<Result<_, _>>()?;
        Ok(())
    }

    fn persist(&self, path: &Path) -> io::Result<()> {
        atomic_write(path, &self.render())
    }
}
