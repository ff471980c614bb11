//! Tests for single-annulus evaluation

use tempfile::tempdir;

use crate::annulus::{Annulus, TrialModel};
use crate::error::{ConfigError, ModelError};
use crate::model::{ModelParameters, ModelParametersBuilder, SuccessCriteria};
use crate::spectral::basis;

fn short_run() -> ModelParameters {
    ModelParametersBuilder::new()
        .inflow(0.3, 0.2)
        .timing(5.0, 0.5)
        .build()
        .unwrap()
}

#[test]
fn test_initial_state() {
    let params = ModelParameters::default();
    let annulus = Annulus::new(&params).unwrap();
    let start = annulus.sample_at(0.0).unwrap();
    assert!((start.star_formation_rate - params.sfr_rate * params.initial_mass).abs() < 1e-12);
    assert_eq!(start.stars_formed, 0.0);
    assert!(start.feedback_rate.abs() < 1e-12);
    assert!(start.delayed_return_rate.abs() < 1e-12);
}

#[test]
fn test_final_state_is_finite_and_positive() {
    let annulus = Annulus::new(&short_run()).unwrap();
    let state = annulus.final_state().unwrap();
    assert_eq!(state.time, 5.0);
    assert!(state.star_formation_rate > 0.0);
    assert!(state.stars_formed > 0.0);
    assert!(state.feedback_rate.is_finite());
    assert!(state.delayed_return_rate.is_finite());
}

#[test]
fn test_stars_formed_grows_monotonically() {
    let annulus = Annulus::new(&ModelParameters::default()).unwrap();
    let mut previous = 0.0;
    for k in 1..=20 {
        let formed = annulus.sample_at(k as f64).unwrap().stars_formed;
        assert!(formed > previous, "stars formed fell at t = {k}");
        previous = formed;
    }
}

#[test]
fn test_time_vector_covers_horizon() {
    let annulus = Annulus::new(&short_run()).unwrap();
    let times = annulus.time_vector();
    assert_eq!(times.first().copied(), Some(0.0));
    // 1.02 · 5.0 / 0.5 = 10.2 steps
    assert_eq!(times.len(), 11);
    assert!((times[10] - 5.0).abs() < 1e-12);
}

#[test]
fn test_evolve_records_history() {
    let mut annulus = Annulus::new(&short_run()).unwrap();
    assert!(annulus.history().is_empty());
    annulus.evolve().unwrap();

    let history = annulus.history();
    assert_eq!(history.len(), annulus.time_vector().len());
    assert!(
        history
            .windows(2)
            .all(|w| w[1].stars_formed >= w[0].stars_formed)
    );
}

#[test]
fn test_success_criteria() {
    let open = short_run();
    assert!(Annulus::new(&open).unwrap().evaluate_final_state());

    let mut strict = open.clone();
    strict.success = SuccessCriteria {
        min_stellar_mass: Some(1.0e6),
        ..Default::default()
    };
    assert!(!Annulus::new(&strict).unwrap().evaluate_final_state());

    let mut window = open;
    let formed = Annulus::new(&window).unwrap().final_state().unwrap().stars_formed;
    window.success = SuccessCriteria {
        min_stellar_mass: Some(formed * 0.9),
        max_stellar_mass: Some(formed * 1.1),
        min_final_sfr: Some(0.0),
    };
    assert!(Annulus::new(&window).unwrap().evaluate_final_state());
}

#[test]
fn test_invalid_parameters_fail_to_build() {
    let params = ModelParametersBuilder::new()
        .fractions(1.5, 0.1)
        .build_unchecked();
    assert!(matches!(
        Annulus::from_parameters(&params),
        Err(ModelError::Config(ConfigError::OutOfRange {
            name: "hot_fraction",
            ..
        }))
    ));
}

#[test]
fn test_persist_writes_table() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("annulus.dat");

    let mut annulus = Annulus::new(&short_run()).unwrap();
    annulus.evolve().unwrap();
    annulus.persist(&path).unwrap();

    let content = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert!(lines[0].starts_with("# sfr_rate="));
    assert!(lines[1].starts_with("# time"));
    assert_eq!(lines.len(), 2 + annulus.history().len());
    assert_eq!(lines[2].split_whitespace().count(), 5);
    assert!(!dir.path().join("annulus.dat.tmp").exists());
}

#[test]
fn test_builder_settings_reach_the_process() {
    let criteria = SuccessCriteria {
        min_final_sfr: Some(0.0),
        ..Default::default()
    };
    let params = ModelParametersBuilder::new()
        .decays(0.6, 1.2)
        .success(criteria.clone())
        .build()
        .unwrap();
    let annulus = Annulus::new(&params).unwrap();

    assert_eq!(annulus.params().success, criteria);
    let freqs = annulus.process().frequencies();
    assert!((freqs[basis::COOLING].re - 0.6).abs() < 1e-12);
    assert!((freqs[basis::DELAY].re - 1.2).abs() < 1e-12);
    assert!(annulus.evaluate_final_state());
}
