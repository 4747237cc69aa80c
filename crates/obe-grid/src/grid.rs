//! Setting and parameter grids with late-bound model evaluation.

use std::fmt;
use std::sync::Arc;

use obe_core::errors::{ErrorInfo, ObeError};
use obe_core::{element_count, unravel_index, ModelArg, ModelFunction, Tensor};

use crate::axis::{validate_axes, Axis, SpaceKind};

/// Builds the `ij`-indexed grid of `axes`: one tensor per axis, dimension `i`
/// of every tensor running along axis `i`.
///
/// Values are looked up by multi-index, so axis order can never be transposed.
pub fn build_grid(axes: &[Axis]) -> Vec<Tensor> {
    let shape: Vec<usize> = axes.iter().map(Axis::len).collect();
    axes.iter()
        .enumerate()
        .map(|(k, axis)| {
            let values = axis.values();
            Tensor::from_fn(shape.clone(), |index| values[index[k]])
        })
        .collect()
}

#[derive(Debug, Clone)]
struct Configured {
    setting_axes: Vec<Axis>,
    parameter_axes: Vec<Axis>,
    setting_grid: Vec<Tensor>,
    parameter_grid: Vec<Tensor>,
    constants: Vec<f64>,
}

impl Configured {
    fn setting_shape(&self) -> Vec<usize> {
        self.setting_axes.iter().map(Axis::len).collect()
    }

    fn parameter_shape(&self) -> Vec<usize> {
        self.parameter_axes.iter().map(Axis::len).collect()
    }
}

/// Evaluates a model over the full grid of one space while the other is held at a point.
#[derive(Clone, Default)]
pub struct GridEvaluator {
    model: Option<Arc<dyn ModelFunction>>,
    configured: Option<Configured>,
}

impl fmt::Debug for GridEvaluator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GridEvaluator")
            .field("has_model", &self.model.is_some())
            .field("setting_shape", &self.setting_shape())
            .field("parameter_shape", &self.parameter_shape())
            .finish()
    }
}

impl GridEvaluator {
    /// Evaluator with no model and no grids.
    pub fn new() -> Self {
        Self::default()
    }

    /// Evaluator with its model supplied up front.
    pub fn with_model(model: Arc<dyn ModelFunction>) -> Self {
        Self {
            model: Some(model),
            configured: None,
        }
    }

    /// Supplies or replaces the model function.
    pub fn set_model(&mut self, model: Arc<dyn ModelFunction>) {
        self.model = Some(model);
    }

    /// Whether a model has been supplied.
    pub fn has_model(&self) -> bool {
        self.model.is_some()
    }

    /// Builds both grids, replacing any previous configuration.
    ///
    /// On error the previous configuration is left untouched.
    pub fn configure(
        &mut self,
        setting_axes: &[Vec<f64>],
        parameter_axes: &[Vec<f64>],
        constants: &[f64],
    ) -> Result<(), ObeError> {
        let setting_axes = validate_axes(SpaceKind::Settings, setting_axes)?;
        let parameter_axes = validate_axes(SpaceKind::Parameters, parameter_axes)?;
        let setting_grid = build_grid(&setting_axes);
        let parameter_grid = build_grid(&parameter_axes);
        self.configured = Some(Configured {
            setting_axes,
            parameter_axes,
            setting_grid,
            parameter_grid,
            constants: constants.to_vec(),
        });
        Ok(())
    }

    /// Whether `configure` has succeeded.
    pub fn is_configured(&self) -> bool {
        self.configured.is_some()
    }

    /// Settings fixed at `setting_point`, parameters swept over the parameter grid.
    pub fn evaluate_over_parameter_grid(&self, setting_point: &[f64]) -> Result<Tensor, ObeError> {
        let (model, configured) = self.ready()?;
        check_point(SpaceKind::Settings, setting_point, configured.setting_axes.len())?;
        let out = model.evaluate(
            ModelArg::Point(setting_point),
            ModelArg::Array(&configured.parameter_grid),
            &configured.constants,
        )?;
        check_output(SpaceKind::Parameters, &out, &configured.parameter_shape())?;
        Ok(out)
    }

    /// Parameters fixed at `parameter_point`, settings swept over the setting grid.
    pub fn evaluate_over_setting_grid(&self, parameter_point: &[f64]) -> Result<Tensor, ObeError> {
        let (model, configured) = self.ready()?;
        check_point(SpaceKind::Parameters, parameter_point, configured.parameter_axes.len())?;
        let out = model.evaluate(
            ModelArg::Array(&configured.setting_grid),
            ModelArg::Point(parameter_point),
            &configured.constants,
        )?;
        check_output(SpaceKind::Settings, &out, &configured.setting_shape())?;
        Ok(out)
    }

    /// Grid tensors over the setting space, empty before `configure`.
    pub fn setting_grid(&self) -> &[Tensor] {
        self.configured
            .as_ref()
            .map(|c| c.setting_grid.as_slice())
            .unwrap_or(&[])
    }

    /// Grid tensors over the parameter space, empty before `configure`.
    pub fn parameter_grid(&self) -> &[Tensor] {
        self.configured
            .as_ref()
            .map(|c| c.parameter_grid.as_slice())
            .unwrap_or(&[])
    }

    /// Axis lengths of the setting space.
    pub fn setting_shape(&self) -> Option<Vec<usize>> {
        self.configured.as_ref().map(Configured::setting_shape)
    }

    /// Axis lengths of the parameter space.
    pub fn parameter_shape(&self) -> Option<Vec<usize>> {
        self.configured.as_ref().map(Configured::parameter_shape)
    }

    /// Setting axes in order.
    pub fn setting_axes(&self) -> &[Axis] {
        self.configured
            .as_ref()
            .map(|c| c.setting_axes.as_slice())
            .unwrap_or(&[])
    }

    /// Parameter axes in order.
    pub fn parameter_axes(&self) -> &[Axis] {
        self.configured
            .as_ref()
            .map(|c| c.parameter_axes.as_slice())
            .unwrap_or(&[])
    }

    /// Constants passed verbatim to every evaluation.
    pub fn constants(&self) -> &[f64] {
        self.configured
            .as_ref()
            .map(|c| c.constants.as_slice())
            .unwrap_or(&[])
    }

    /// Number of cells in the setting grid, zero before `configure`.
    pub fn setting_count(&self) -> usize {
        self.setting_shape().map(|s| element_count(&s)).unwrap_or(0)
    }

    /// Setting values at row-major cell `flat`, one per setting axis.
    pub fn setting_point(&self, flat: usize) -> Result<Vec<f64>, ObeError> {
        let configured = self.configured.as_ref().ok_or_else(not_configured_grid)?;
        let shape = configured.setting_shape();
        let count = element_count(&shape);
        if flat >= count {
            return Err(ObeError::Shape(
                ErrorInfo::new("grid.cell_out_of_range", "setting cell index out of range")
                    .with_context("index", flat.to_string())
                    .with_context("cells", count.to_string()),
            ));
        }
        let mut index = vec![0usize; shape.len()];
        unravel_index(flat, &shape, &mut index);
        Ok(configured
            .setting_axes
            .iter()
            .zip(&index)
            .map(|(axis, &i)| axis.values()[i])
            .collect())
    }

    fn ready(&self) -> Result<(&dyn ModelFunction, &Configured), ObeError> {
        let model = self.model.as_deref().ok_or_else(|| {
            ObeError::NotConfigured(
                ErrorInfo::new("grid.no_model", "no model function has been supplied")
                    .with_hint("call set_model or construct with GridEvaluator::with_model"),
            )
        })?;
        let configured = self.configured.as_ref().ok_or_else(not_configured_grid)?;
        Ok((model, configured))
    }
}

fn not_configured_grid() -> ObeError {
    ObeError::NotConfigured(
        ErrorInfo::new("grid.unconfigured", "grids have not been configured")
            .with_hint("call configure before evaluating"),
    )
}

fn check_point(kind: SpaceKind, point: &[f64], axes: usize) -> Result<(), ObeError> {
    if point.len() != axes {
        return Err(ObeError::Shape(
            ErrorInfo::new(
                "grid.point_length",
                "point length does not match the number of axes",
            )
            .with_context("space", kind.as_str())
            .with_context("expected", axes.to_string())
            .with_context("actual", point.len().to_string()),
        ));
    }
    Ok(())
}

fn check_output(kind: SpaceKind, out: &Tensor, expected: &[usize]) -> Result<(), ObeError> {
    if out.shape() != expected {
        return Err(ObeError::Shape(
            ErrorInfo::new(
                "grid.model_output_shape",
                "model output shape does not match the swept grid",
            )
            .with_context("space", kind.as_str())
            .with_context("expected", format!("{expected:?}"))
            .with_context("actual", format!("{:?}", out.shape())),
        ));
    }
    Ok(())
}
