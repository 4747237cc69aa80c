use std::sync::Arc;

use obe_core::{Engine, EngineArgs, Measurement, ObeError};
use obe_engine::{EngineConfig, ParticleEngine};
use obe_grid::{linspace, Pointwise};

fn line_args() -> EngineArgs {
    EngineArgs {
        model: Arc::new(Pointwise::new(|s: &[f64], p: &[f64], _: &[f64]| p[0] * s[0])),
        setting_axes: vec![vec![0.0, 0.5, 1.0]],
        parameter_axes: vec![linspace(-1.0, 1.0, 201)],
        constants: vec![],
    }
}

fn lorentz_args() -> EngineArgs {
    EngineArgs {
        model: Arc::new(Pointwise::new(|s: &[f64], p: &[f64], c: &[f64]| {
            c[0] / (1.0 + (s[0] - p[0]).powi(2) / p[1].powi(2))
        })),
        setting_axes: vec![linspace(0.0, 1.0, 101)],
        parameter_axes: vec![linspace(0.1, 0.9, 41), linspace(0.01, 0.2, 50)],
        constants: vec![1.0],
    }
}

fn config(seed: u64) -> EngineConfig {
    EngineConfig {
        n_particles: 500,
        seed,
        utility_particles: 50,
        ..EngineConfig::default()
    }
}

#[test]
fn prior_is_uniform_and_on_axes() {
    let args = lorentz_args();
    let engine = ParticleEngine::new(&args, config(1)).expect("engine");
    let weights = engine.particle_weights();
    assert_eq!(weights.len(), 500);
    assert!(weights.iter().all(|w| (w - 1.0 / 500.0).abs() < 1e-15));

    let samples = engine.parameters();
    assert_eq!(samples.shape(), &[2, 500]);
    for i in 0..500 {
        let x0 = samples.get(&[0, i]).unwrap();
        assert!(args.parameter_axes[0].contains(&x0));
    }
    assert_eq!(engine.constants(), &[1.0]);
    assert_eq!(engine.setting_grid()[0].shape(), &[101]);
}

#[test]
fn identical_seeds_give_identical_posteriors() {
    let args = lorentz_args();
    let mut a = ParticleEngine::new(&args, config(9)).expect("engine");
    let mut b = ParticleEngine::new(&args, config(9)).expect("engine");
    let m = Measurement::new(vec![0.6], vec![0.8], vec![0.05]).unwrap();
    a.pdf_update(&m).unwrap();
    b.pdf_update(&m).unwrap();
    assert_eq!(a.mean().unwrap(), b.mean().unwrap());
    assert_eq!(a.opt_setting().unwrap(), b.opt_setting().unwrap());
}

#[test]
fn update_moves_the_mean_and_keeps_weights_normalized() {
    let mut engine = ParticleEngine::new(&lorentz_args(), config(3)).expect("engine");
    let before = engine.mean().unwrap();
    for _ in 0..5 {
        engine
            .pdf_update(&Measurement::new(vec![0.6], vec![0.8], vec![0.05]).unwrap())
            .unwrap();
        let total: f64 = engine.particle_weights().iter().sum();
        assert!((total - 1.0).abs() < 1e-9);
        assert!(engine.particle_weights().iter().all(|w| (0.0..=1.0).contains(w)));
    }
    assert_ne!(engine.mean().unwrap(), before);
    assert_eq!(engine.updates(), 5);
}

#[test]
fn informative_measurement_triggers_resampling() {
    let mut engine = ParticleEngine::new(&line_args(), config(5)).expect("engine");
    engine
        .pdf_update(&Measurement::new(vec![1.0], vec![0.5], vec![0.01]).unwrap())
        .unwrap();
    assert_eq!(engine.resamples(), 1);
    let n = engine.particle_weights().len() as f64;
    assert!(engine
        .particle_weights()
        .iter()
        .all(|w| (w - 1.0 / n).abs() < 1e-12));
    let mean = engine.mean().unwrap();
    assert!((mean[0] - 0.5).abs() < 0.05, "mean = {mean:?}");
}

#[test]
fn optimal_setting_maximizes_prediction_spread() {
    let mut engine = ParticleEngine::new(&line_args(), config(11)).expect("engine");
    assert_eq!(engine.opt_setting().unwrap(), vec![1.0]);
    assert_eq!(engine.good_setting(Some(400)).unwrap(), vec![1.0]);

    let picked = engine.good_setting(Some(0)).unwrap();
    assert!([0.0, 0.5, 1.0].contains(&picked[0]));
    let default_pick = engine.good_setting(None).unwrap();
    assert_eq!(default_pick.len(), 1);
}

#[test]
fn statistics_have_consistent_shapes() {
    let engine = ParticleEngine::new(&lorentz_args(), config(2)).expect("engine");
    let std = engine.std().unwrap();
    let cov = engine.covariance().unwrap();
    assert_eq!(std.len(), 2);
    assert_eq!(cov.shape(), &[2, 2]);
    assert_eq!(cov.get(&[0, 1]), cov.get(&[1, 0]));
    for d in 0..2 {
        assert!(std[d] >= 0.0);
        assert!((cov.get(&[d, d]).unwrap() - std[d] * std[d]).abs() < 1e-12);
    }
}

#[test]
fn bad_inputs_are_reported() {
    let mut engine = ParticleEngine::new(&line_args(), config(4)).expect("engine");
    let err = engine
        .pdf_update(&Measurement::new(vec![0.1, 0.2], vec![0.0], vec![1.0]).unwrap())
        .unwrap_err();
    assert!(matches!(err, ObeError::Shape(_)));

    let bad = EngineConfig {
        n_particles: 0,
        ..EngineConfig::default()
    };
    let err = ParticleEngine::new(&line_args(), bad).unwrap_err();
    assert!(matches!(err, ObeError::Configuration(_)));
}

#[test]
fn config_defaults_fill_missing_fields() {
    let cfg: EngineConfig = serde_json::from_str(r#"{"seed": 7}"#).unwrap();
    assert_eq!(cfg.seed, 7);
    assert_eq!(cfg.n_particles, 1000);
    assert_eq!(cfg.default_pickiness, 15);
}
