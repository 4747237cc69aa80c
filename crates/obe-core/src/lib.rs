#![deny(missing_docs)]
#![doc = "Core traits and data types shared by the grid evaluator, the engines and the session server."]

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

pub mod errors;
pub mod rng;
pub mod tensor;

pub use errors::{ErrorInfo, ObeError};
pub use rng::{derive_substream_seed, RngHandle};
pub use tensor::{element_count, unravel_index, Tensor};

/// One argument of a [`ModelFunction`] call.
///
/// `Point` carries one value per axis. `Array` carries one tensor per axis, all
/// sharing one shape; that shape becomes the shape of the model output.
#[derive(Debug, Clone, Copy)]
pub enum ModelArg<'a> {
    /// A single point, one value per axis.
    Point(&'a [f64]),
    /// One equally shaped tensor per axis.
    Array(&'a [Tensor]),
}

impl<'a> ModelArg<'a> {
    /// Number of axes carried by the argument.
    pub fn arity(&self) -> usize {
        match self {
            ModelArg::Point(values) => values.len(),
            ModelArg::Array(tensors) => tensors.len(),
        }
    }

    /// Shape shared by the array components, `None` for a point.
    pub fn shape(&self) -> Option<&'a [usize]> {
        match self {
            ModelArg::Point(_) => None,
            ModelArg::Array(tensors) => tensors.first().map(Tensor::shape),
        }
    }

    /// Value of component `axis` at row-major position `flat`.
    ///
    /// Points ignore `flat`.
    pub fn component(&self, axis: usize, flat: usize) -> f64 {
        match self {
            ModelArg::Point(values) => values[axis],
            ModelArg::Array(tensors) => tensors[axis].data()[flat],
        }
    }
}

/// Experimental model evaluated by grid evaluators and engines.
pub trait ModelFunction: Send + Sync {
    /// Evaluates the model. The array-valued argument, if any, fixes the output shape.
    fn evaluate(
        &self,
        settings: ModelArg<'_>,
        parameters: ModelArg<'_>,
        constants: &[f64],
    ) -> Result<Tensor, ObeError>;
}

impl<T: ModelFunction + ?Sized> ModelFunction for Arc<T> {
    fn evaluate(
        &self,
        settings: ModelArg<'_>,
        parameters: ModelArg<'_>,
        constants: &[f64],
    ) -> Result<Tensor, ObeError> {
        (**self).evaluate(settings, parameters, constants)
    }
}

/// One combined measurement record: settings, measured values and uncertainties.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    /// Settings at which the measurement was taken, one per setting axis.
    pub x: Vec<f64>,
    /// Measured mean values.
    pub y: Vec<f64>,
    /// Standard deviation of each measured value.
    pub s: Vec<f64>,
}

impl Measurement {
    /// Builds a measurement, checking lengths and uncertainties.
    pub fn new(x: Vec<f64>, y: Vec<f64>, s: Vec<f64>) -> Result<Self, ObeError> {
        if x.is_empty() || y.is_empty() {
            return Err(ObeError::Protocol(ErrorInfo::new(
                "measurement.empty",
                "measurement needs at least one setting and one value",
            )));
        }
        if y.len() != s.len() {
            return Err(ObeError::Protocol(
                ErrorInfo::new(
                    "measurement.length_mismatch",
                    "\"y\" and \"s\" must have the same length",
                )
                .with_context("y", y.len().to_string())
                .with_context("s", s.len().to_string()),
            ));
        }
        if let Some(bad) = s.iter().find(|v| !(v.is_finite() && **v > 0.0)) {
            return Err(ObeError::Protocol(
                ErrorInfo::new(
                    "measurement.uncertainty",
                    "uncertainties must be finite and strictly positive",
                )
                .with_context("value", bad.to_string()),
            ));
        }
        Ok(Self { x, y, s })
    }
}

/// Bayesian engine bound to a session.
pub trait Engine: Send {
    /// Setting grid, one tensor per setting axis.
    fn setting_grid(&self) -> &[Tensor];

    /// Posterior parameter samples, shape `[parameter dims, particles]`.
    fn parameters(&self) -> Tensor;

    /// Model constants, verbatim.
    fn constants(&self) -> &[f64];

    /// Particle weights, normalized to sum to one.
    fn particle_weights(&self) -> &[f64];

    /// Refines the posterior with one measurement record.
    fn pdf_update(&mut self, measurement: &Measurement) -> Result<(), ObeError>;

    /// Setting chosen at random favouring high utility.
    ///
    /// `None` selects the engine's own default pickiness.
    fn good_setting(&mut self, pickiness: Option<u32>) -> Result<Vec<f64>, ObeError>;

    /// Setting with maximum utility.
    fn opt_setting(&mut self) -> Result<Vec<f64>, ObeError>;

    /// Posterior mean per parameter.
    fn mean(&self) -> Result<Vec<f64>, ObeError>;

    /// Posterior standard deviation per parameter.
    fn std(&self) -> Result<Vec<f64>, ObeError>;

    /// Posterior covariance, `[dims, dims]`.
    fn covariance(&self) -> Result<Tensor, ObeError>;
}

/// Constructor arguments for an engine, mirroring the grid configuration contract.
#[derive(Clone)]
pub struct EngineArgs {
    /// Experimental model.
    pub model: Arc<dyn ModelFunction>,
    /// Setting axes in order.
    pub setting_axes: Vec<Vec<f64>>,
    /// Parameter axes in order.
    pub parameter_axes: Vec<Vec<f64>>,
    /// Model constants.
    pub constants: Vec<f64>,
}

impl fmt::Debug for EngineArgs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EngineArgs")
            .field("setting_axes", &self.setting_axes)
            .field("parameter_axes", &self.parameter_axes)
            .field("constants", &self.constants)
            .finish_non_exhaustive()
    }
}

/// Factory producing a fresh engine from [`EngineArgs`].
pub type EngineFactory =
    Arc<dyn Fn(&EngineArgs) -> Result<Box<dyn Engine>, ObeError> + Send + Sync>;
