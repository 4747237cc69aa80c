#![deny(missing_docs)]
//! Reference particle engine.
//!
//! The posterior over model parameters is a weighted particle set drawn from a
//! uniform prior over the parameter axes. Measurements reweight the particles
//! by a Gaussian likelihood, and resampling with Liu-West shrinkage keeps the
//! effective sample size up. Settings are ranked by the spread of model
//! predictions across the posterior.

mod config;
mod determinism;
mod engine;
mod particles;

pub use config::EngineConfig;
pub use determinism::EngineStreams;
pub use engine::ParticleEngine;
pub use particles::ParticleSet;
