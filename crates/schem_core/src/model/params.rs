//! Physical parameters of a single annulus.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Relative tolerance below which an inflow decay rate is treated as a
/// root of `x² − px + q`.
const ROOT_TOLERANCE: f64 = 1e-12;

/// A discrete inflow of gas with exponentially decaying accretion rate
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct InflowEvent {
    /// Total mass delivered by the inflow
    pub mass: f64,
    /// Decay rate (`β`) of the accretion
    pub decay_rate: f64,
}

impl InflowEvent {
    #[must_use]
    pub fn new(mass: f64, decay_rate: f64) -> Self {
        Self { mass, decay_rate }
    }

    /// Pair parallel mass and decay-rate lists into inflow events.
    pub fn pair_up(masses: &[f64], decay_rates: &[f64]) -> Result<Vec<InflowEvent>, ConfigError> {
        if masses.len() != decay_rates.len() {
            return Err(ConfigError::InflowCountMismatch {
                masses: masses.len(),
                decay_rates: decay_rates.len(),
            });
        }
        Ok(masses
            .iter()
            .zip(decay_rates)
            .map(|(&mass, &decay_rate)| InflowEvent { mass, decay_rate })
            .collect())
    }
}

/// Pass/fail window applied to the final state of an annulus.
///
/// Unset bounds are not checked.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SuccessCriteria {
    pub min_stellar_mass: Option<f64>,
    pub max_stellar_mass: Option<f64>,
    pub min_final_sfr: Option<f64>,
}

impl SuccessCriteria {
    #[must_use]
    pub fn accepts(&self, stellar_mass: f64, final_sfr: f64) -> bool {
        self.min_stellar_mass.is_none_or(|min| stellar_mass >= min)
            && self.max_stellar_mass.is_none_or(|max| stellar_mass <= max)
            && self.min_final_sfr.is_none_or(|min| final_sfr >= min)
    }
}

/// Scalar model parameters that can be swept or randomized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScalarParam {
    StellarDeathRate,
    SfrRate,
    CoolingRate,
    HotFraction,
    OutflowFraction,
    InitialMass,
    SfrModifier,
    CoolingDecay,
    DelayDecay,
    FinalTime,
}

impl ScalarParam {
    pub const ALL: [ScalarParam; 10] = [
        ScalarParam::StellarDeathRate,
        ScalarParam::SfrRate,
        ScalarParam::CoolingRate,
        ScalarParam::HotFraction,
        ScalarParam::OutflowFraction,
        ScalarParam::InitialMass,
        ScalarParam::SfrModifier,
        ScalarParam::CoolingDecay,
        ScalarParam::DelayDecay,
        ScalarParam::FinalTime,
    ];

    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::StellarDeathRate => "stellar_death_rate",
            Self::SfrRate => "sfr_rate",
            Self::CoolingRate => "cooling_rate",
            Self::HotFraction => "hot_fraction",
            Self::OutflowFraction => "outflow_fraction",
            Self::InitialMass => "initial_mass",
            Self::SfrModifier => "sfr_modifier",
            Self::CoolingDecay => "cooling_decay",
            Self::DelayDecay => "delay_decay",
            Self::FinalTime => "final_time",
        }
    }
}

/// Aggregate rates of the coupled cold/hot gas system.
///
/// The characteristic polynomial of the system is `x² − p·x + q`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateAggregates {
    pub p: f64,
    pub q: f64,
}

impl RateAggregates {
    /// Value of the characteristic polynomial at `x`
    #[must_use]
    pub fn characteristic(&self, x: f64) -> f64 {
        x * x - self.p * x + self.q
    }

    /// `p²/4 − q`; negative means an oscillatory solution
    #[must_use]
    pub fn discriminant(&self) -> f64 {
        self.p * self.p / 4.0 - self.q
    }
}

/// Rate constants, masses and timing of a single annulus model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelParameters {
    /// Stellar death rate (`μ`)
    pub stellar_death_rate: f64,
    /// Star-formation rate per unit cold gas (`ν`)
    pub sfr_rate: f64,
    /// Hot gas cooling rate (`λ`)
    pub cooling_rate: f64,
    /// Fraction of returned stellar mass that enters the hot phase (`f`)
    pub hot_fraction: f64,
    /// Mass loading of galactic outflows (`δ`)
    pub outflow_fraction: f64,
    /// Initial cold gas mass
    pub initial_mass: f64,
    /// Scale applied to `sfr_rate` for the formation channel frequency
    pub sfr_modifier: f64,
    /// Decay frequency of the cooling channel
    pub cooling_decay: f64,
    /// Decay frequency of the delayed return channel
    pub delay_decay: f64,
    pub inflows: Vec<InflowEvent>,
    /// Time at which the final state is evaluated
    pub final_time: f64,
    /// Sampling interval used when evolving over time
    pub time_step: f64,
    pub success: SuccessCriteria,
}

impl Default for ModelParameters {
    fn default() -> Self {
        Self {
            stellar_death_rate: 0.1,
            sfr_rate: 0.2,
            cooling_rate: 0.05,
            hot_fraction: 0.3,
            outflow_fraction: 0.1,
            initial_mass: 1.0,
            sfr_modifier: 1.5,
            cooling_decay: 0.7,
            delay_decay: 0.9,
            inflows: Vec::new(),
            final_time: 14.0,
            time_step: 0.1,
            success: SuccessCriteria::default(),
        }
    }
}

impl ModelParameters {
    #[must_use]
    pub fn get(&self, param: ScalarParam) -> f64 {
        match param {
            ScalarParam::StellarDeathRate => self.stellar_death_rate,
            ScalarParam::SfrRate => self.sfr_rate,
            ScalarParam::CoolingRate => self.cooling_rate,
            ScalarParam::HotFraction => self.hot_fraction,
            ScalarParam::OutflowFraction => self.outflow_fraction,
            ScalarParam::InitialMass => self.initial_mass,
            ScalarParam::SfrModifier => self.sfr_modifier,
            ScalarParam::CoolingDecay => self.cooling_decay,
            ScalarParam::DelayDecay => self.delay_decay,
            ScalarParam::FinalTime => self.final_time,
        }
    }

    /// Copy of these parameters with one scalar replaced
    #[must_use]
    pub fn with(&self, param: ScalarParam, value: f64) -> Self {
        let mut next = self.clone();
        let slot = match param {
            ScalarParam::StellarDeathRate => &mut next.stellar_death_rate,
            ScalarParam::SfrRate => &mut next.sfr_rate,
            ScalarParam::CoolingRate => &mut next.cooling_rate,
            ScalarParam::HotFraction => &mut next.hot_fraction,
            ScalarParam::OutflowFraction => &mut next.outflow_fraction,
            ScalarParam::InitialMass => &mut next.initial_mass,
            ScalarParam::SfrModifier => &mut next.sfr_modifier,
            ScalarParam::CoolingDecay => &mut next.cooling_decay,
            ScalarParam::DelayDecay => &mut next.delay_decay,
            ScalarParam::FinalTime => &mut next.final_time,
        };
        *slot = value;
        next
    }

    #[must_use]
    pub fn aggregates(&self) -> RateAggregates {
        let mu = self.stellar_death_rate;
        let nu = self.sfr_rate;
        let lambda = self.cooling_rate;
        RateAggregates {
            p: mu + nu * (1.0 + self.outflow_fraction) + lambda,
            q: mu * nu * (self.hot_fraction + self.outflow_fraction) + lambda * (mu + nu),
        }
    }

    /// Initial mass plus every inflow mass
    #[must_use]
    pub fn total_mass(&self) -> f64 {
        self.initial_mass + self.inflows.iter().map(|i| i.mass).sum::<f64>()
    }

    /// Check that the parameters describe a solvable system.
    pub fn validate(&self) -> Result<(), ConfigError> {
        for param in ScalarParam::ALL {
            let value = self.get(param);
            if !value.is_finite() {
                return Err(ConfigError::NonFinite {
                    name: param.name(),
                    value,
                });
            }
            if value < 0.0 {
                return Err(ConfigError::Negative {
                    name: param.name(),
                    value,
                });
            }
        }
        if !self.time_step.is_finite() {
            return Err(ConfigError::NonFinite {
                name: "time_step",
                value: self.time_step,
            });
        }
        if self.hot_fraction > 1.0 {
            return Err(ConfigError::OutOfRange {
                name: "hot_fraction",
                value: self.hot_fraction,
                min: 0.0,
                max: 1.0,
            });
        }
        if self.final_time <= 0.0 {
            return Err(ConfigError::OutOfRange {
                name: "final_time",
                value: self.final_time,
                min: f64::MIN_POSITIVE,
                max: f64::INFINITY,
            });
        }
        if self.time_step <= 0.0 {
            return Err(ConfigError::OutOfRange {
                name: "time_step",
                value: self.time_step,
                min: f64::MIN_POSITIVE,
                max: f64::INFINITY,
            });
        }

        let aggregates = self.aggregates();
        if aggregates.q <= 0.0 {
            return Err(ConfigError::NonPositiveAggregate { q: aggregates.q });
        }

        let named = [
            ("nuSFR(mod)", self.sfr_modifier * self.sfr_rate),
            ("nuCool", self.cooling_decay),
            ("nuDelay", self.delay_decay),
        ];
        for (basis, value) in named {
            if value == 0.0 {
                return Err(ConfigError::ZeroFrequency {
                    basis: basis.to_string(),
                });
            }
        }

        for (index, inflow) in self.inflows.iter().enumerate() {
            for (name, value) in [("inflow mass", inflow.mass), ("inflow decay rate", inflow.decay_rate)] {
                if !value.is_finite() {
                    return Err(ConfigError::NonFinite { name, value });
                }
                if value < 0.0 {
                    return Err(ConfigError::Negative { name, value });
                }
            }
            let b = inflow.decay_rate;
            if b == 0.0 {
                return Err(ConfigError::ZeroFrequency {
                    basis: format!("inflow {index}"),
                });
            }
            let scale = b * b + aggregates.p * b + aggregates.q;
            if aggregates.characteristic(b).abs() <= ROOT_TOLERANCE * scale {
                return Err(ConfigError::DegenerateInflow {
                    index,
                    decay_rate: b,
                });
            }
        }

        Ok(())
    }
}

/// Fluent builder for [`ModelParameters`]
///
/// ```ignore
/// let params = ModelParametersBuilder::new()
///     .rates(0.1, 0.2, 0.05)
///     .fractions(0.3, 0.1)
///     .initial_mass(1.0)
///     .inflow(0.5, 0.4)
///     .build()?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct ModelParametersBuilder {
    params: ModelParameters,
}

impl ModelParametersBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set death, star-formation and cooling rates
    #[must_use]
    pub fn rates(mut self, death: f64, sfr: f64, cooling: f64) -> Self {
        self.params.stellar_death_rate = death;
        self.params.sfr_rate = sfr;
        self.params.cooling_rate = cooling;
        self
    }

    /// Set hot fraction and outflow fraction
    #[must_use]
    pub fn fractions(mut self, hot: f64, outflow: f64) -> Self {
        self.params.hot_fraction = hot;
        self.params.outflow_fraction = outflow;
        self
    }

    #[must_use]
    pub fn initial_mass(mut self, mass: f64) -> Self {
        self.params.initial_mass = mass;
        self
    }

    #[must_use]
    pub fn sfr_modifier(mut self, modifier: f64) -> Self {
        self.params.sfr_modifier = modifier;
        self
    }

    /// Set the cooling and delayed-return decay frequencies
    #[must_use]
    pub fn decays(mut self, cooling: f64, delay: f64) -> Self {
        self.params.cooling_decay = cooling;
        self.params.delay_decay = delay;
        self
    }

    #[must_use]
    pub fn inflow(mut self, mass: f64, decay_rate: f64) -> Self {
        self.params.inflows.push(InflowEvent::new(mass, decay_rate));
        self
    }

    /// Set the evaluation horizon and sampling step
    #[must_use]
    pub fn timing(mut self, final_time: f64, time_step: f64) -> Self {
        self.params.final_time = final_time;
        self.params.time_step = time_step;
        self
    }

    #[must_use]
    pub fn success(mut self, criteria: SuccessCriteria) -> Self {
        self.params.success = criteria;
        self
    }

    /// Validate and return the parameters
    pub fn build(self) -> Result<ModelParameters, ConfigError> {
        self.params.validate()?;
        Ok(self.params)
    }

    /// Return the parameters without validation
    #[must_use]
    pub fn build_unchecked(self) -> ModelParameters {
        self.params
    }
}
