use std::sync::Arc;

use obe_core::errors::{ErrorInfo, ObeError};
use obe_core::{
    Engine, EngineArgs, EngineFactory, Measurement, ModelArg, ModelFunction, Tensor,
};
use obe_grid::GridEvaluator;
use rand::distributions::{Distribution, WeightedIndex};
use rand::Rng;
use tracing::debug;

use crate::config::EngineConfig;
use crate::determinism::EngineStreams;
use crate::particles::ParticleSet;

/// Sequential Monte Carlo engine over a discretized setting grid.
pub struct ParticleEngine {
    config: EngineConfig,
    model: Arc<dyn ModelFunction>,
    grid: GridEvaluator,
    particles: ParticleSet,
    streams: EngineStreams,
    updates: usize,
    resamples: usize,
}

impl std::fmt::Debug for ParticleEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParticleEngine")
            .field("config", &self.config)
            .field("grid", &self.grid)
            .field("particles", &self.particles.len())
            .field("updates", &self.updates)
            .field("resamples", &self.resamples)
            .finish()
    }
}

impl ParticleEngine {
    /// Validates `config`, builds the grids and draws the prior.
    pub fn new(args: &EngineArgs, config: EngineConfig) -> Result<Self, ObeError> {
        config.validate()?;
        let mut grid = GridEvaluator::with_model(Arc::clone(&args.model));
        grid.configure(&args.setting_axes, &args.parameter_axes, &args.constants)?;
        let mut streams = EngineStreams::from_seed(config.seed);
        let particles =
            ParticleSet::from_prior(grid.parameter_axes(), config.n_particles, &mut streams.prior);
        debug!(
            particles = particles.len(),
            settings = grid.setting_count(),
            seed = config.seed,
            "particle engine initialised"
        );
        Ok(Self {
            config,
            model: Arc::clone(&args.model),
            grid,
            particles,
            streams,
            updates: 0,
            resamples: 0,
        })
    }

    /// Factory for session binding; every engine it builds uses `config`.
    pub fn factory(config: EngineConfig) -> EngineFactory {
        Arc::new(
            move |args: &EngineArgs| -> Result<Box<dyn Engine>, ObeError> {
                Ok(Box::new(ParticleEngine::new(args, config.clone())?))
            },
        )
    }

    /// Tunables the engine was built with.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Measurements absorbed so far.
    pub fn updates(&self) -> usize {
        self.updates
    }

    /// Times the particle set has been resampled.
    pub fn resamples(&self) -> usize {
        self.resamples
    }

    /// Kish effective sample size of the current weights.
    pub fn effective_sample_size(&self) -> f64 {
        self.particles.effective_sample_size()
    }

    /// Expected information gain proxy for every setting cell, row-major.
    ///
    /// The variance of model predictions across particles drawn by weight,
    /// divided by the noise variance.
    pub fn utility(&mut self) -> Result<Vec<f64>, ObeError> {
        let draws = self.config.utility_particles.min(self.particles.len());
        let chooser = WeightedIndex::new(self.particles.weights()).map_err(|err| {
            ObeError::Upstream(ErrorInfo::new("engine.weights", err.to_string()))
        })?;
        let cells = self.grid.setting_count();
        let mut sum = vec![0.0; cells];
        let mut sum_sq = vec![0.0; cells];
        for _ in 0..draws {
            let index = chooser.sample(&mut self.streams.utility);
            let prediction = self
                .grid
                .evaluate_over_setting_grid(&self.particles.particle(index))?;
            for (cell, y) in prediction.data().iter().enumerate() {
                sum[cell] += y;
                sum_sq[cell] += y * y;
            }
        }
        let n = draws as f64;
        let noise = self.config.noise_std * self.config.noise_std;
        Ok(sum
            .iter()
            .zip(&sum_sq)
            .map(|(s, sq)| ((sq / n - (s / n).powi(2)).max(0.0)) / noise)
            .collect())
    }

    fn setting_at(&self, cell: usize) -> Result<Vec<f64>, ObeError> {
        self.grid.setting_point(cell)
    }
}

impl Engine for ParticleEngine {
    fn setting_grid(&self) -> &[Tensor] {
        self.grid.setting_grid()
    }

    fn parameters(&self) -> Tensor {
        self.particles.samples()
    }

    fn constants(&self) -> &[f64] {
        self.grid.constants()
    }

    fn particle_weights(&self) -> &[f64] {
        self.particles.weights()
    }

    fn pdf_update(&mut self, measurement: &Measurement) -> Result<(), ObeError> {
        let setting_axes = self.grid.setting_axes().len();
        if measurement.x.len() != setting_axes {
            return Err(ObeError::Shape(
                ErrorInfo::new(
                    "engine.setting_length",
                    "measurement settings do not match the setting axes",
                )
                .with_context("expected", setting_axes.to_string())
                .with_context("actual", measurement.x.len().to_string()),
            ));
        }
        let predictions = self.model.evaluate(
            ModelArg::Point(&measurement.x),
            ModelArg::Array(self.particles.columns()),
            self.grid.constants(),
        )?;
        if predictions.len() != self.particles.len() {
            return Err(ObeError::Shape(
                ErrorInfo::new(
                    "engine.prediction_length",
                    "model returned the wrong number of predictions",
                )
                .with_context("expected", self.particles.len().to_string())
                .with_context("actual", predictions.len().to_string()),
            ));
        }
        let log_likelihood: Vec<f64> = predictions
            .data()
            .iter()
            .map(|m| {
                measurement
                    .y
                    .iter()
                    .zip(&measurement.s)
                    .map(|(y, s)| -(y - m).powi(2) / (2.0 * s * s))
                    .sum()
            })
            .collect();
        self.particles.reweight(&log_likelihood)?;
        self.updates += 1;

        let ess = self.particles.effective_sample_size();
        if ess < self.config.resample_threshold * self.particles.len() as f64 {
            self.particles
                .resample(self.config.shrinkage, &mut self.streams.resample);
            self.resamples += 1;
            debug!(ess, resamples = self.resamples, "particles resampled");
        }
        Ok(())
    }

    fn good_setting(&mut self, pickiness: Option<u32>) -> Result<Vec<f64>, ObeError> {
        let pickiness = pickiness.unwrap_or(self.config.default_pickiness);
        let utility = self.utility()?;
        let peak = utility.iter().copied().fold(0.0, f64::max);
        let cell = if peak > 0.0 && peak.is_finite() {
            let weights: Vec<f64> = utility
                .iter()
                .map(|u| (u / peak).powi(i32::try_from(pickiness).unwrap_or(i32::MAX)))
                .collect();
            WeightedIndex::new(&weights)
                .map_err(|err| {
                    ObeError::Upstream(ErrorInfo::new("engine.utility_weights", err.to_string()))
                })?
                .sample(&mut self.streams.select)
        } else {
            self.streams.select.gen_range(0..utility.len())
        };
        debug!(pickiness, cell, "good setting selected");
        self.setting_at(cell)
    }

    fn opt_setting(&mut self) -> Result<Vec<f64>, ObeError> {
        let utility = self.utility()?;
        let mut best = 0usize;
        for (cell, value) in utility.iter().enumerate() {
            if *value > utility[best] {
                best = cell;
            }
        }
        self.setting_at(best)
    }

    fn mean(&self) -> Result<Vec<f64>, ObeError> {
        Ok(self.particles.mean())
    }

    fn std(&self) -> Result<Vec<f64>, ObeError> {
        let cov = self.particles.covariance();
        Ok((0..self.particles.dims())
            .map(|d| cov[(d, d)].max(0.0).sqrt())
            .collect())
    }

    fn covariance(&self) -> Result<Tensor, ObeError> {
        let cov = self.particles.covariance();
        Ok(Tensor::from_fn(
            vec![cov.nrows(), cov.ncols()],
            |ix| cov[(ix[0], ix[1])],
        ))
    }
}
