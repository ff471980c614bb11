//! Closed-form solution of the coupled annulus mass-flow system.
//!
//! Every time-dependent quantity is stored as a set of coefficients `c_i`
//! over a shared basis of exponentials `exp(−ω_i·t)`. Evaluating, integrating
//! or convolving a quantity is then a matter of elementwise arithmetic on
//! [`ComplexVector`]s that all share the basis frequencies of one
//! [`SpectralProcess`].

use num_complex::Complex64;

use super::vector::ComplexVector;
use crate::error::{ConfigError, SpectralError};
use crate::model::ModelParameters;

/// Two frequencies closer than this (in both parts) are treated as equal
pub const DEGENERACY_TOLERANCE: f64 = 1e-7;
/// Factor applied to the real part of a colliding frequency
pub const REAL_PERTURBATION: f64 = 1.01;
/// Factor applied to the imaginary part of a colliding frequency
pub const IMAG_PERTURBATION: f64 = 0.99;
/// Upper bound on full pair scans while breaking degeneracies
const MAX_DEGENERACY_PASSES: usize = 16;

/// Fixed positions in the basis
pub mod basis {
    pub const CONSTANT: usize = 0;
    pub const OMEGA_PLUS: usize = 1;
    pub const OMEGA_MINUS: usize = 2;
    pub const FORMATION: usize = 3;
    pub const COOLING: usize = 4;
    pub const DELAY: usize = 5;
    /// Index of the first inflow term; inflow `k` lives at `FIRST_INFLOW + k`
    pub const FIRST_INFLOW: usize = 6;

    /// Human readable name of a basis position
    #[must_use]
    pub fn label(index: usize) -> String {
        match index {
            CONSTANT => "constant".to_string(),
            OMEGA_PLUS => "omega plus".to_string(),
            OMEGA_MINUS => "omega minus".to_string(),
            FORMATION => "nuSFR(mod)".to_string(),
            COOLING => "nuCool".to_string(),
            DELAY => "nuDelay".to_string(),
            n => format!("inflow {}", n - FIRST_INFLOW),
        }
    }
}

/// Spectral representation of the star-formation history of one annulus
#[derive(Debug, Clone, PartialEq)]
pub struct SpectralProcess {
    frequencies: ComplexVector,
    flow: ComplexVector,
    complex_domain: bool,
    omega: f64,
}

impl SpectralProcess {
    /// Build the process using the decay frequencies carried by `params`.
    pub fn new(params: &ModelParameters) -> Result<Self, ConfigError> {
        params.validate()?;

        let mu = params.stellar_death_rate;
        let nu = params.sfr_rate;
        let lambda = params.cooling_rate;
        let delta = params.outflow_fraction;
        let aggregates = params.aggregates();
        let (p, q) = (aggregates.p, aggregates.q);

        let residues: Vec<f64> = params
            .inflows
            .iter()
            .map(|inflow| {
                let b = inflow.decay_rate;
                -inflow.mass * (b * b - (mu + lambda) * b + mu * lambda)
                    / aggregates.characteristic(b)
            })
            .collect();

        let discriminant = aggregates.discriminant();
        let complex_domain = discriminant < 0.0;
        let omega = discriminant.abs().sqrt();

        let d = mu * lambda * params.total_mass() / q;
        let mut j = params.initial_mass - d;
        let mut k = -nu * params.initial_mass * (1.0 + delta);
        for (inflow, c) in params.inflows.iter().zip(&residues) {
            j -= c;
            k += inflow.decay_rate * (inflow.mass + c);
        }

        let (omega_plus, omega_minus) = if complex_domain {
            (Complex64::new(p / 2.0, omega), Complex64::new(p / 2.0, -omega))
        } else {
            (
                Complex64::new(p / 2.0 + omega, 0.0),
                Complex64::new(p / 2.0 - omega, 0.0),
            )
        };

        let mut frequencies = vec![
            Complex64::new(0.0, 0.0),
            omega_plus,
            omega_minus,
            Complex64::new(params.sfr_modifier * nu, 0.0),
            Complex64::new(params.cooling_decay, 0.0),
            Complex64::new(params.delay_decay, 0.0),
        ];
        frequencies.extend(
            params
                .inflows
                .iter()
                .map(|inflow| Complex64::new(inflow.decay_rate, 0.0)),
        );
        // An inflow sitting on a characteristic root has no finite residue
        for (index, inflow) in params.inflows.iter().enumerate() {
            let beta = Complex64::new(inflow.decay_rate, 0.0);
            if coincide(beta, omega_plus) || coincide(beta, omega_minus) {
                return Err(ConfigError::DegenerateInflow {
                    index,
                    decay_rate: inflow.decay_rate,
                });
            }
        }
        resolve_degeneracy(&mut frequencies)?;

        // Characteristic-mode weights fixed by the initial value J and initial
        // slope K of the homogeneous part: A + B = J, A·ω₊ + B·ω₋ = −K.
        let (w_plus, w_minus) = (frequencies[basis::OMEGA_PLUS], frequencies[basis::OMEGA_MINUS]);
        let a = (-k - j * w_minus) / (w_plus - w_minus);
        let b = Complex64::new(j, 0.0) - a;

        let mut coefficients = vec![
            Complex64::new(d, 0.0),
            a,
            b,
            Complex64::new(0.0, 0.0),
            Complex64::new(0.0, 0.0),
            Complex64::new(0.0, 0.0),
        ];
        coefficients.extend(residues.iter().map(|&c| Complex64::new(c, 0.0)));

        Ok(Self {
            frequencies: ComplexVector::from_values(frequencies),
            flow: ComplexVector::from_values(coefficients).scale(nu),
            complex_domain,
            omega,
        })
    }

    /// Number of basis terms
    #[must_use]
    pub fn len(&self) -> usize {
        self.frequencies.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.frequencies.is_empty()
    }

    #[must_use]
    pub fn frequencies(&self) -> &ComplexVector {
        &self.frequencies
    }

    /// Coefficients of the star-formation rate over the basis
    #[must_use]
    pub fn flow_coefficients(&self) -> &ComplexVector {
        &self.flow
    }

    /// True when the characteristic modes form a complex-conjugate pair
    #[must_use]
    pub fn is_complex_domain(&self) -> bool {
        self.complex_domain
    }

    /// `sqrt(|p²/4 − q|)`
    #[must_use]
    pub fn omega(&self) -> f64 {
        self.omega
    }

    /// `exp(−ω_i·t)` for every basis term
    #[must_use]
    pub fn evaluate(&self, t: f64) -> ComplexVector {
        self.frequencies
            .iter()
            .map(|w| {
                let decay = (-w.re * t).exp();
                Complex64::new(decay * (-w.im * t).cos(), decay * (-w.im * t).sin())
            })
            .collect()
    }

    /// Basis functions whose derivatives are the terms of [`Self::evaluate`],
    /// up to the factors in [`Self::total_integral_operator`]. The constant
    /// term integrates to `t`.
    #[must_use]
    pub fn evaluate_antiderivative_basis(&self, t: f64) -> ComplexVector {
        self.evaluate(t)
            .iter()
            .enumerate()
            .map(|(i, value)| {
                if i == basis::CONSTANT {
                    Complex64::new(t, 0.0)
                } else {
                    *value
                }
            })
            .collect()
    }

    /// Coefficients `1/(ω_id − ω_i)` projecting each term onto term `id`.
    pub fn definite_integral_operator(&self, id: usize) -> Result<ComplexVector, SpectralError> {
        let target = self.frequency(id)?;
        Ok(self
            .frequencies
            .iter()
            .enumerate()
            .map(|(i, w)| {
                if i == id {
                    Complex64::new(0.0, 0.0)
                } else {
                    (target - w).inv()
                }
            })
            .collect())
    }

    /// Coefficients turning a spectrum into its antiderivative over the
    /// basis of [`Self::evaluate_antiderivative_basis`]: `1` for the constant
    /// term, `−1/ω_i` otherwise (zero for a vanishing frequency).
    #[must_use]
    pub fn total_integral_operator(&self) -> ComplexVector {
        self.frequencies
            .iter()
            .enumerate()
            .map(|(i, w)| {
                if i == basis::CONSTANT {
                    Complex64::new(1.0, 0.0)
                } else if w.norm_sqr() > 0.0 {
                    -w.inv()
                } else {
                    Complex64::new(0.0, 0.0)
                }
            })
            .collect()
    }

    /// Response of a reservoir draining at frequency `id` and fed by `input`,
    /// starting empty.
    ///
    /// The term at `id` carries the mass-conservation correction so that the
    /// result vanishes at `t = 0`.
    pub fn generic_convolution(
        &self,
        input: &ComplexVector,
        id: usize,
    ) -> Result<ComplexVector, SpectralError> {
        let operator = self.definite_integral_operator(id)?;
        let mut projected = input.hadamard(&operator)?;
        projected.set_real(id, -input.real_dot(&operator)?)?;
        Ok(projected)
    }

    /// Mass flow returned through the hot (cooling) channel net of the cold
    /// share, passed through the formation channel.
    pub fn feedback_flow(&self, hot_fraction: f64) -> Result<ComplexVector, SpectralError> {
        let cooled = self
            .generic_convolution(&self.flow, basis::COOLING)?
            .scale(hot_fraction);
        let cooling_rate = self.frequencies[basis::COOLING].re;
        let mixed = self
            .flow
            .scale(1.0 - hot_fraction)
            .checked_add(&cooled.scale(cooling_rate))?;
        self.generic_convolution(&mixed, basis::FORMATION)
    }

    /// Value of a spectrum at time `t`
    pub fn rate_at(&self, spectrum: &ComplexVector, t: f64) -> Result<f64, SpectralError> {
        spectrum.real_dot(&self.evaluate(t))
    }

    /// Integral of a spectrum over `[0, t]`
    pub fn integral_to(&self, spectrum: &ComplexVector, t: f64) -> Result<f64, SpectralError> {
        let weights = spectrum.hadamard(&self.total_integral_operator())?;
        let upper = weights.real_dot(&self.evaluate_antiderivative_basis(t))?;
        let lower = weights.real_dot(&self.evaluate_antiderivative_basis(0.0))?;
        Ok(upper - lower)
    }

    fn frequency(&self, id: usize) -> Result<Complex64, SpectralError> {
        self.frequencies
            .get(id)
            .ok_or(SpectralError::IndexOutOfRange {
                index: id,
                len: self.frequencies.len(),
            })
    }
}

fn coincide(a: Complex64, b: Complex64) -> bool {
    (a.re - b.re).abs() < DEGENERACY_TOLERANCE && (a.im - b.im).abs() < DEGENERACY_TOLERANCE
}

/// Separate coincident basis frequencies.
///
/// Every unordered pair is scanned; when two frequencies coincide the
/// earlier one is scaled by [`REAL_PERTURBATION`] / [`IMAG_PERTURBATION`].
/// The constant term is never moved, its partner is scaled instead.
/// Returns the number of perturbations applied.
pub fn resolve_degeneracy(frequencies: &mut [Complex64]) -> Result<usize, ConfigError> {
    let mut perturbed = 0;
    for _ in 0..MAX_DEGENERACY_PASSES {
        let mut clean = true;
        for i in 0..frequencies.len() {
            for j in (i + 1)..frequencies.len() {
                if !coincide(frequencies[i], frequencies[j]) {
                    continue;
                }
                clean = false;
                let target = if i == basis::CONSTANT { j } else { i };
                tracing::warn!(
                    "basis frequencies {} ({}) and {} ({}) coincide; perturbing {}",
                    basis::label(i),
                    frequencies[i],
                    basis::label(j),
                    frequencies[j],
                    basis::label(target)
                );
                let w = frequencies[target];
                frequencies[target] =
                    Complex64::new(w.re * REAL_PERTURBATION, w.im * IMAG_PERTURBATION);
                perturbed += 1;
            }
        }
        if clean {
            return Ok(perturbed);
        }
    }

    for i in 0..frequencies.len() {
        for j in (i + 1)..frequencies.len() {
            if coincide(frequencies[i], frequencies[j]) {
                return Err(ConfigError::UnresolvedDegeneracy {
                    first: basis::label(i),
                    second: basis::label(j),
                });
            }
        }
    }
    Ok(perturbed)
}
