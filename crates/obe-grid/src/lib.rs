#![deny(missing_docs)]
//! Grid evaluation for experimental models.
//!
//! A [`GridEvaluator`] holds two independent spaces: measurement settings and
//! model parameters. It evaluates a model over every cell of one space while
//! the other is held at a single point.

mod axis;
mod grid;
mod pointwise;

pub use axis::{linspace, validate_axes, Axis, SpaceKind};
pub use grid::{build_grid, GridEvaluator};
pub use pointwise::{Pointwise, TryPointwise};
