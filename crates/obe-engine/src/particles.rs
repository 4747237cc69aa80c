//! Weighted particle approximation of the parameter posterior.

use nalgebra::DMatrix;
use obe_core::errors::{ErrorInfo, ObeError};
use obe_core::{RngHandle, Tensor};
use obe_grid::Axis;
use rand::Rng;
use rand_distr::{Distribution, Normal};

/// Particles stored column-wise: `columns[d][i]` is parameter `d` of particle `i`.
#[derive(Debug, Clone)]
pub struct ParticleSet {
    columns: Vec<Tensor>,
    weights: Vec<f64>,
}

impl ParticleSet {
    /// Draws `n` particles, each parameter uniformly from its axis values.
    pub fn from_prior(axes: &[Axis], n: usize, rng: &mut RngHandle) -> Self {
        let columns = axes
            .iter()
            .map(|axis| {
                let values = axis.values();
                Tensor::vector((0..n).map(|_| values[rng.gen_range(0..values.len())]).collect())
            })
            .collect();
        Self {
            columns,
            weights: vec![1.0 / n as f64; n],
        }
    }

    /// Number of particles.
    pub fn len(&self) -> usize {
        self.weights.len()
    }

    /// Whether there are no particles.
    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    /// Number of parameters per particle.
    pub fn dims(&self) -> usize {
        self.columns.len()
    }

    /// One tensor per parameter, ready to pass as a model array argument.
    pub fn columns(&self) -> &[Tensor] {
        &self.columns
    }

    /// Normalized weights.
    pub fn weights(&self) -> &[f64] {
        &self.weights
    }

    /// Parameter vector of particle `i`.
    pub fn particle(&self, i: usize) -> Vec<f64> {
        self.columns.iter().map(|c| c.data()[i]).collect()
    }

    /// Samples as a `[dims, particles]` tensor.
    pub fn samples(&self) -> Tensor {
        let columns = &self.columns;
        Tensor::from_fn(vec![self.dims(), self.len()], |ix| columns[ix[0]].data()[ix[1]])
    }

    /// Kish effective sample size `1 / Σ w²`.
    pub fn effective_sample_size(&self) -> f64 {
        1.0 / self.weights.iter().map(|w| w * w).sum::<f64>()
    }

    /// Multiplies weights by `exp(log_likelihood)` and renormalizes.
    ///
    /// Weights are left untouched when no particle keeps a finite weight.
    pub fn reweight(&mut self, log_likelihood: &[f64]) -> Result<(), ObeError> {
        let log_weights: Vec<f64> = self
            .weights
            .iter()
            .zip(log_likelihood)
            .map(|(w, ll)| w.ln() + ll)
            .collect();
        let peak = log_weights
            .iter()
            .copied()
            .filter(|v| !v.is_nan())
            .fold(f64::NEG_INFINITY, f64::max);
        if !peak.is_finite() {
            return Err(ObeError::Upstream(ErrorInfo::new(
                "engine.degenerate_likelihood",
                "measurement has zero likelihood for every particle",
            )
            .with_hint("check the reported uncertainty and the parameter ranges")));
        }
        let unnormalized: Vec<f64> = log_weights
            .iter()
            .map(|lw| if lw.is_nan() { 0.0 } else { (lw - peak).exp() })
            .collect();
        let total: f64 = unnormalized.iter().sum();
        self.weights = unnormalized.into_iter().map(|w| w / total).collect();
        Ok(())
    }

    /// Weighted mean per parameter.
    pub fn mean(&self) -> Vec<f64> {
        self.columns
            .iter()
            .map(|c| c.data().iter().zip(&self.weights).map(|(x, w)| x * w).sum())
            .collect()
    }

    /// Weighted population covariance, exactly symmetric.
    pub fn covariance(&self) -> DMatrix<f64> {
        let mean = self.mean();
        let (dims, n) = (self.dims(), self.len());
        let deviations =
            DMatrix::from_fn(dims, n, |d, i| self.columns[d].data()[i] - mean[d]);
        let weighted = DMatrix::from_fn(dims, n, |d, i| deviations[(d, i)] * self.weights[i]);
        let cov = weighted * deviations.transpose();
        (&cov + cov.transpose()) * 0.5
    }

    /// Systematic resampling followed by Liu-West shrinkage and jitter.
    ///
    /// Weights are uniform afterwards.
    pub fn resample(&mut self, shrinkage: f64, rng: &mut RngHandle) {
        let n = self.len();
        let mean = self.mean();
        let cov = self.covariance();
        let spread = (1.0 - shrinkage * shrinkage).max(0.0).sqrt();

        let step = 1.0 / n as f64;
        let mut target = rng.gen_range(0.0..step);
        let mut cumulative = 0.0;
        let mut source = 0usize;
        let mut picks = Vec::with_capacity(n);
        for _ in 0..n {
            while source + 1 < n && cumulative + self.weights[source] < target {
                cumulative += self.weights[source];
                source += 1;
            }
            picks.push(source);
            target += step;
        }

        let columns = self
            .columns
            .iter()
            .enumerate()
            .map(|(d, column)| {
                let sd = spread * cov[(d, d)].max(0.0).sqrt();
                let jitter = Normal::new(0.0, sd).ok().filter(|_| sd > 0.0);
                let values = picks
                    .iter()
                    .map(|&i| {
                        let shrunk = shrinkage * column.data()[i] + (1.0 - shrinkage) * mean[d];
                        match &jitter {
                            Some(normal) => shrunk + normal.sample(rng),
                            None => shrunk,
                        }
                    })
                    .collect();
                Tensor::vector(values)
            })
            .collect();
        self.columns = columns;
        self.weights = vec![step; n];
    }
}
