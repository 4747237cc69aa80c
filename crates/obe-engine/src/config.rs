use obe_core::errors::{ErrorInfo, ObeError};
use serde::{Deserialize, Serialize};

/// Tunables of a [`ParticleEngine`](crate::ParticleEngine).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Number of particles drawn from the prior.
    #[serde(default = "default_particles")]
    pub n_particles: usize,
    /// Master seed; all randomness is derived from it.
    #[serde(default)]
    pub seed: u64,
    /// Resample when the effective sample size drops below this fraction of the particles.
    #[serde(default = "default_resample_threshold")]
    pub resample_threshold: f64,
    /// Liu-West shrinkage factor `a` applied after resampling.
    #[serde(default = "default_shrinkage")]
    pub shrinkage: f64,
    /// Particles drawn when estimating utility.
    #[serde(default = "default_utility_particles")]
    pub utility_particles: usize,
    /// Expected measurement noise used to scale utility.
    #[serde(default = "default_noise_std")]
    pub noise_std: f64,
    /// Pickiness used by `good_setting` when the caller gives none.
    #[serde(default = "default_pickiness")]
    pub default_pickiness: u32,
}

fn default_particles() -> usize {
    1000
}

fn default_resample_threshold() -> f64 {
    0.5
}

fn default_shrinkage() -> f64 {
    0.98
}

fn default_utility_particles() -> usize {
    100
}

fn default_noise_std() -> f64 {
    1.0
}

fn default_pickiness() -> u32 {
    15
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            n_particles: default_particles(),
            seed: 0,
            resample_threshold: default_resample_threshold(),
            shrinkage: default_shrinkage(),
            utility_particles: default_utility_particles(),
            noise_std: default_noise_std(),
            default_pickiness: default_pickiness(),
        }
    }
}

impl EngineConfig {
    /// Rejects empty particle sets and out-of-range tunables.
    pub fn validate(&self) -> Result<(), ObeError> {
        if self.n_particles == 0 {
            return Err(invalid("engine.n_particles", "n_particles must be at least 1"));
        }
        if self.utility_particles == 0 {
            return Err(invalid(
                "engine.utility_particles",
                "utility_particles must be at least 1",
            ));
        }
        if !(0.0..=1.0).contains(&self.resample_threshold) {
            return Err(invalid(
                "engine.resample_threshold",
                "resample_threshold must lie in [0, 1]",
            ));
        }
        if !(self.shrinkage > 0.0 && self.shrinkage <= 1.0) {
            return Err(invalid("engine.shrinkage", "shrinkage must lie in (0, 1]"));
        }
        if !(self.noise_std.is_finite() && self.noise_std > 0.0) {
            return Err(invalid("engine.noise_std", "noise_std must be finite and positive"));
        }
        Ok(())
    }
}

fn invalid(code: &str, message: &str) -> ObeError {
    ObeError::Configuration(ErrorInfo::new(code, message))
}
