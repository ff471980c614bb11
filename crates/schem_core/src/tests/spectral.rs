//! Tests for basis construction and the spectral operators

use num_complex::Complex64;

use crate::error::{ConfigError, SpectralError};
use crate::model::{ModelParameters, ModelParametersBuilder};
use crate::spectral::{ComplexVector, DEGENERACY_TOLERANCE, SpectralProcess, basis};

const TOL: f64 = 1e-9;

fn with_inflows() -> ModelParameters {
    ModelParametersBuilder::new()
        .inflow(0.5, 0.25)
        .inflow(0.2, 0.05)
        .build()
        .unwrap()
}

/// μ = ν = λ = f = 1, δ = 0 puts the characteristic roots off the real axis
fn complex_params() -> ModelParameters {
    ModelParametersBuilder::new()
        .rates(1.0, 1.0, 1.0)
        .fractions(1.0, 0.0)
        .build()
        .unwrap()
}

/// μ = 0, ν = λ, δ = 0 gives p²/4 = q exactly
fn boundary_params(sfr_modifier: f64) -> ModelParameters {
    ModelParametersBuilder::new()
        .rates(0.0, 0.5, 0.5)
        .fractions(0.3, 0.0)
        .sfr_modifier(sfr_modifier)
        .build()
        .unwrap()
}

/// Time derivative of a spectrum at `t`
fn derivative_at(process: &SpectralProcess, spectrum: &ComplexVector, t: f64) -> f64 {
    let slopes = spectrum
        .hadamard(&process.frequencies().scale(-1.0))
        .unwrap();
    process.rate_at(&slopes, t).unwrap()
}

/// Composite Simpson rule over `[0, t]`
fn simpson(f: impl Fn(f64) -> f64, t: f64, intervals: usize) -> f64 {
    let h = t / intervals as f64;
    let mut sum = f(0.0) + f(t);
    for k in 1..intervals {
        let weight = if k % 2 == 1 { 4.0 } else { 2.0 };
        sum += weight * f(k as f64 * h);
    }
    sum * h / 3.0
}

fn assert_distinct(frequencies: &ComplexVector) {
    let values = frequencies.as_slice();
    for i in 0..values.len() {
        for j in (i + 1)..values.len() {
            let gap = (values[i] - values[j]).norm();
            assert!(gap >= 1e-8, "frequencies {i} and {j} only {gap} apart");
        }
    }
}

// ============================================================================
// Basis layout and evaluation
// ============================================================================

#[test]
fn test_basis_layout() {
    let params = with_inflows();
    let process = SpectralProcess::new(&params).unwrap();
    assert_eq!(process.len(), basis::FIRST_INFLOW + 2);
    assert_eq!(process.flow_coefficients().len(), process.len());

    let freqs = process.frequencies();
    assert_eq!(freqs[basis::CONSTANT], Complex64::new(0.0, 0.0));
    assert!((freqs[basis::FORMATION].re - params.sfr_modifier * params.sfr_rate).abs() < TOL);
    assert!((freqs[basis::COOLING].re - params.cooling_decay).abs() < TOL);
    assert!((freqs[basis::DELAY].re - params.delay_decay).abs() < TOL);
    assert!((freqs[basis::FIRST_INFLOW].re - 0.25).abs() < TOL);
    assert!((freqs[basis::FIRST_INFLOW + 1].re - 0.05).abs() < TOL);

    // Only the characteristic modes, the constant and the inflows carry flow
    let flow = process.flow_coefficients();
    for id in [basis::FORMATION, basis::COOLING, basis::DELAY] {
        assert_eq!(flow[id], Complex64::new(0.0, 0.0));
    }
}

#[test]
fn test_evaluate_at_zero_is_all_ones() {
    for params in [ModelParameters::default(), with_inflows(), complex_params()] {
        let process = SpectralProcess::new(&params).unwrap();
        for value in process.evaluate(0.0).iter() {
            assert_eq!(*value, Complex64::new(1.0, 0.0));
        }
    }
}

#[test]
fn test_evaluate_decays() {
    let process = SpectralProcess::new(&ModelParameters::default()).unwrap();
    let values = process.evaluate(10.0);
    assert_eq!(values[basis::CONSTANT], Complex64::new(1.0, 0.0));
    let expected = (-0.7_f64 * 10.0).exp();
    assert!((values[basis::COOLING].re - expected).abs() < TOL);
    assert!(values[basis::COOLING].im.abs() < TOL);
}

#[test]
fn test_antiderivative_basis_replaces_constant_term() {
    let process = SpectralProcess::new(&ModelParameters::default()).unwrap();
    let plain = process.evaluate(2.5);
    let anti = process.evaluate_antiderivative_basis(2.5);
    assert_eq!(anti[basis::CONSTANT], Complex64::new(2.5, 0.0));
    for i in 1..process.len() {
        assert_eq!(anti[i], plain[i]);
    }
}

// ============================================================================
// Star-formation rate
// ============================================================================

#[test]
fn test_initial_rate_is_sfr_times_initial_mass() {
    for params in [ModelParameters::default(), with_inflows(), complex_params()] {
        let process = SpectralProcess::new(&params).unwrap();
        let flow = process.flow_coefficients();
        let expected = params.sfr_rate * params.initial_mass;

        let at_zero = process.rate_at(flow, 0.0).unwrap();
        let summed: f64 = flow.real_parts().iter().sum();
        assert!((at_zero - expected).abs() < TOL, "{at_zero} vs {expected}");
        assert!((summed - expected).abs() < TOL);
    }
}

#[test]
fn test_initial_slope_matches_mass_balance() {
    for params in [ModelParameters::default(), with_inflows(), complex_params()] {
        let process = SpectralProcess::new(&params).unwrap();
        let nu = params.sfr_rate;
        let inflow: f64 = params.inflows.iter().map(|i| i.decay_rate * i.mass).sum();
        let expected =
            nu * (-nu * (1.0 + params.outflow_fraction) * params.initial_mass + inflow);

        let slope = derivative_at(&process, process.flow_coefficients(), 0.0);
        assert!((slope - expected).abs() < 1e-8, "{slope} vs {expected}");
    }
}

#[test]
fn test_long_time_rate_approaches_equilibrium() {
    for params in [ModelParameters::default(), with_inflows()] {
        let process = SpectralProcess::new(&params).unwrap();
        let aggregates = params.aggregates();
        let equilibrium = params.sfr_rate
            * params.stellar_death_rate
            * params.cooling_rate
            * params.total_mass()
            / aggregates.q;

        let late = process.rate_at(process.flow_coefficients(), 2000.0).unwrap();
        assert!((late - equilibrium).abs() < 1e-9, "{late} vs {equilibrium}");
    }
}

#[test]
fn test_default_parameters_are_real_domain() {
    let params = ModelParameters::default();
    let aggregates = params.aggregates();
    assert!((aggregates.p - 0.37).abs() < 1e-12);
    assert!((aggregates.q - 0.023).abs() < 1e-12);
    assert!((aggregates.discriminant() - 0.011225).abs() < 1e-12);

    let process = SpectralProcess::new(&params).unwrap();
    assert!(!process.is_complex_domain());
    assert!((process.omega() - 0.011225_f64.sqrt()).abs() < 1e-12);
    for value in process.frequencies().iter() {
        assert_eq!(value.im, 0.0);
    }
}

#[test]
fn test_complex_domain_conjugate_pair() {
    let process = SpectralProcess::new(&complex_params()).unwrap();
    assert!(process.is_complex_domain());
    assert!((process.omega() - 0.75_f64.sqrt()).abs() < 1e-12);

    let freqs = process.frequencies();
    let flow = process.flow_coefficients();
    assert!((freqs[basis::OMEGA_PLUS] - freqs[basis::OMEGA_MINUS].conj()).norm() < TOL);
    assert!((flow[basis::OMEGA_PLUS] - flow[basis::OMEGA_MINUS].conj()).norm() < TOL);
    assert!(freqs[basis::OMEGA_PLUS].im > 0.0);

    // The imaginary parts cancel so the rate is real at every time
    for t in [0.0, 0.7, 3.0, 12.0] {
        let terms = flow.hadamard(&process.evaluate(t)).unwrap();
        let imag: f64 = terms.imag_parts().iter().sum();
        assert!(imag.abs() < TOL, "imaginary residue {imag} at t = {t}");
    }
}

// ============================================================================
// Degenerate spectra
// ============================================================================

#[test]
fn test_zero_discriminant_is_separated() {
    let params = boundary_params(1.5);
    assert_eq!(params.aggregates().discriminant(), 0.0);

    let process = SpectralProcess::new(&params).unwrap();
    assert!(!process.is_complex_domain());
    assert_eq!(process.omega(), 0.0);
    assert!(process.frequencies().is_finite());
    assert!(process.flow_coefficients().is_finite());
    assert_distinct(process.frequencies());

    let flow = process.flow_coefficients();
    let at_zero = process.rate_at(flow, 0.0).unwrap();
    assert!((at_zero - params.sfr_rate * params.initial_mass).abs() < TOL);
    for t in [1.0, 5.0, 14.0] {
        assert!(process.rate_at(flow, t).unwrap().is_finite());
    }
}

#[test]
fn test_zero_discriminant_with_matching_formation_frequency() {
    // Formation frequency 0.5 sits on top of both characteristic roots
    let params = boundary_params(1.0);
    let process = SpectralProcess::new(&params).unwrap();

    assert_distinct(process.frequencies());
    assert!(process.flow_coefficients().is_finite());
    let feedback = process.feedback_flow(params.hot_fraction).unwrap();
    assert!(feedback.is_finite());
    assert!(process.rate_at(&feedback, 3.0).unwrap().is_finite());
}

#[test]
fn test_inflow_on_existing_frequency_is_separated() {
    let params = ModelParametersBuilder::new()
        .inflow(0.4, 0.7)
        .build()
        .unwrap();
    let process = SpectralProcess::new(&params).unwrap();
    let freqs = process.frequencies();
    assert!((freqs[basis::COOLING] - freqs[basis::FIRST_INFLOW]).norm() >= DEGENERACY_TOLERANCE);
    assert!(process.flow_coefficients().is_finite());
}

#[test]
fn test_inflow_on_characteristic_root_is_rejected() {
    // p = 0.37, q = 0.034: the larger root of x² − px + q is 0.2
    let params = ModelParameters {
        stellar_death_rate: 0.1,
        sfr_rate: 0.2,
        cooling_rate: 0.05,
        outflow_fraction: 0.1,
        hot_fraction: 0.85,
        ..Default::default()
    };
    let q = params.aggregates().q;
    let p = params.aggregates().p;
    let root = p / 2.0 + (p * p / 4.0 - q).sqrt();

    let mut with_root = params.clone();
    with_root.inflows = vec![crate::model::InflowEvent::new(1.0, root)];
    assert!(matches!(
        SpectralProcess::new(&with_root),
        Err(ConfigError::DegenerateInflow { index: 0, .. })
    ));
}

#[test]
fn test_inflow_within_collision_tolerance_of_root_is_rejected() {
    let base = ModelParameters::default();
    let aggregates = base.aggregates();
    let omega_plus = aggregates.p / 2.0 + aggregates.discriminant().sqrt();
    let omega_minus = aggregates.p / 2.0 - aggregates.discriminant().sqrt();

    for decay_rate in [omega_plus + 5e-8, omega_minus - 5e-8] {
        let params = ModelParametersBuilder::new()
            .inflow(0.5, decay_rate)
            .build()
            .unwrap();
        assert!(matches!(
            SpectralProcess::new(&params),
            Err(ConfigError::DegenerateInflow { index: 0, .. })
        ));
    }

    // Outside the tolerance the rate stays bounded
    let params = ModelParametersBuilder::new()
        .inflow(0.5, omega_plus + 1e-5)
        .build()
        .unwrap();
    let process = SpectralProcess::new(&params).unwrap();
    for t in [5.0, 10.0, 14.0] {
        let rate = process.rate_at(process.flow_coefficients(), t).unwrap();
        assert!(rate > 0.0 && rate < 1.0, "rate {rate} at t = {t}");
    }
}

#[test]
fn test_invalid_parameters_are_rejected() {
    let params = ModelParametersBuilder::new()
        .rates(0.1, -0.2, 0.05)
        .build_unchecked();
    assert!(matches!(
        SpectralProcess::new(&params),
        Err(ConfigError::Negative { .. })
    ));
}

// ============================================================================
// Integral operators
// ============================================================================

#[test]
fn test_definite_integral_operator_is_antisymmetric() {
    let process = SpectralProcess::new(&with_inflows()).unwrap();
    let n = process.len();
    for a in 0..n {
        let row_a = process.definite_integral_operator(a).unwrap();
        assert_eq!(row_a[a], Complex64::new(0.0, 0.0));
        for b in 0..n {
            if a == b {
                continue;
            }
            let row_b = process.definite_integral_operator(b).unwrap();
            assert!((row_a[b] + row_b[a]).norm() < TOL);
        }
    }
}

#[test]
fn test_definite_integral_operator_out_of_range() {
    let process = SpectralProcess::new(&ModelParameters::default()).unwrap();
    assert_eq!(
        process.definite_integral_operator(42),
        Err(SpectralError::IndexOutOfRange { index: 42, len: 6 })
    );
}

#[test]
fn test_total_integral_operator() {
    let process = SpectralProcess::new(&complex_params()).unwrap();
    let op = process.total_integral_operator();
    assert_eq!(op[basis::CONSTANT], Complex64::new(1.0, 0.0));
    for i in 1..process.len() {
        let w = process.frequencies()[i];
        assert!((op[i] * w + 1.0).norm() < TOL);
    }
    // −1/(a + bi) has imaginary part b/|ω|²
    let w = process.frequencies()[basis::OMEGA_PLUS];
    assert!((op[basis::OMEGA_PLUS].im - w.im / w.norm_sqr()).abs() < TOL);
}

#[test]
fn test_integral_matches_quadrature() {
    for params in [ModelParameters::default(), with_inflows(), complex_params()] {
        let process = SpectralProcess::new(&params).unwrap();
        let flow = process.flow_coefficients();
        assert_eq!(process.integral_to(flow, 0.0).unwrap(), 0.0);

        let t = 9.0;
        let analytic = process.integral_to(flow, t).unwrap();
        let numeric = simpson(|s| process.rate_at(flow, s).unwrap(), t, 2000);
        assert!((analytic - numeric).abs() < 1e-8, "{analytic} vs {numeric}");
    }
}

// ============================================================================
// Convolutions
// ============================================================================

#[test]
fn test_generic_convolution_starts_empty() {
    for params in [ModelParameters::default(), with_inflows(), complex_params()] {
        let process = SpectralProcess::new(&params).unwrap();
        for id in [basis::FORMATION, basis::COOLING, basis::DELAY] {
            let response = process
                .generic_convolution(process.flow_coefficients(), id)
                .unwrap();
            assert!(process.rate_at(&response, 0.0).unwrap().abs() < TOL);
        }
    }
}

#[test]
fn test_generic_convolution_solves_reservoir_equation() {
    // y' = −ω_k·y + s(t) for a reservoir draining at ω_k fed by s
    for params in [ModelParameters::default(), with_inflows(), complex_params()] {
        let process = SpectralProcess::new(&params).unwrap();
        let flow = process.flow_coefficients();
        let id = basis::COOLING;
        let drain = process.frequencies()[id].re;
        let response = process.generic_convolution(flow, id).unwrap();

        for t in [0.0, 0.5, 2.0, 8.0] {
            let lhs = derivative_at(&process, &response, t);
            let rhs = -drain * process.rate_at(&response, t).unwrap()
                + process.rate_at(flow, t).unwrap();
            assert!((lhs - rhs).abs() < 1e-9, "t = {t}: {lhs} vs {rhs}");
        }
    }
}

#[test]
fn test_generic_convolution_dimension_mismatch() {
    let process = SpectralProcess::new(&ModelParameters::default()).unwrap();
    let short = ComplexVector::zeros(3);
    assert_eq!(
        process.generic_convolution(&short, basis::COOLING),
        Err(SpectralError::DimensionMismatch { left: 3, right: 6 })
    );
}

#[test]
fn test_feedback_flow_starts_empty() {
    let params = with_inflows();
    let process = SpectralProcess::new(&params).unwrap();
    let feedback = process.feedback_flow(params.hot_fraction).unwrap();
    assert_eq!(feedback.len(), process.len());
    assert!(process.rate_at(&feedback, 0.0).unwrap().abs() < TOL);
    assert!(process.rate_at(&feedback, 5.0).unwrap() > 0.0);
}

#[test]
fn test_feedback_flow_without_hot_phase() {
    // With no hot share the feedback is the flow passed once through formation
    let process = SpectralProcess::new(&ModelParameters::default()).unwrap();
    let feedback = process.feedback_flow(0.0).unwrap();
    let direct = process
        .generic_convolution(process.flow_coefficients(), basis::FORMATION)
        .unwrap();
    for t in [0.5, 3.0, 10.0] {
        let a = process.rate_at(&feedback, t).unwrap();
        let b = process.rate_at(&direct, t).unwrap();
        assert!((a - b).abs() < TOL);
    }
}
