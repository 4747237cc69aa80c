//! Lifts scalar closures into [`ModelFunction`]s.

use obe_core::errors::{ErrorInfo, ObeError};
use obe_core::{element_count, ModelArg, ModelFunction, Tensor};

/// Model defined one cell at a time by `f(settings, parameters, constants)`.
pub struct Pointwise<F> {
    f: F,
}

impl<F> Pointwise<F>
where
    F: Fn(&[f64], &[f64], &[f64]) -> f64 + Send + Sync,
{
    /// Wraps a cell function.
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> ModelFunction for Pointwise<F>
where
    F: Fn(&[f64], &[f64], &[f64]) -> f64 + Send + Sync,
{
    fn evaluate(
        &self,
        settings: ModelArg<'_>,
        parameters: ModelArg<'_>,
        constants: &[f64],
    ) -> Result<Tensor, ObeError> {
        sweep(settings, parameters, |s, p| Ok((self.f)(s, p, constants)))
    }
}

/// Like [`Pointwise`], for cell functions that can fail.
///
/// The first error aborts the sweep and is returned as is.
pub struct TryPointwise<F> {
    f: F,
}

impl<F> TryPointwise<F>
where
    F: Fn(&[f64], &[f64], &[f64]) -> Result<f64, ObeError> + Send + Sync,
{
    /// Wraps a cell function.
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> ModelFunction for TryPointwise<F>
where
    F: Fn(&[f64], &[f64], &[f64]) -> Result<f64, ObeError> + Send + Sync,
{
    fn evaluate(
        &self,
        settings: ModelArg<'_>,
        parameters: ModelArg<'_>,
        constants: &[f64],
    ) -> Result<Tensor, ObeError> {
        sweep(settings, parameters, |s, p| (self.f)(s, p, constants))
    }
}

fn sweep(
    settings: ModelArg<'_>,
    parameters: ModelArg<'_>,
    mut cell: impl FnMut(&[f64], &[f64]) -> Result<f64, ObeError>,
) -> Result<Tensor, ObeError> {
    let shape = output_shape(&settings, &parameters)?;
    let count = element_count(&shape);
    let mut s = vec![0.0; settings.arity()];
    let mut p = vec![0.0; parameters.arity()];
    let mut data = Vec::with_capacity(count);
    for flat in 0..count {
        for (axis, slot) in s.iter_mut().enumerate() {
            *slot = settings.component(axis, flat);
        }
        for (axis, slot) in p.iter_mut().enumerate() {
            *slot = parameters.component(axis, flat);
        }
        data.push(cell(&s, &p)?);
    }
    Tensor::new(shape, data)
}

fn output_shape(settings: &ModelArg<'_>, parameters: &ModelArg<'_>) -> Result<Vec<usize>, ObeError> {
    check_components(settings, "settings")?;
    check_components(parameters, "parameters")?;
    match (settings.shape(), parameters.shape()) {
        (Some(a), Some(b)) if a != b => Err(ObeError::Shape(
            ErrorInfo::new(
                "model.array_mismatch",
                "settings and parameters arrays have different shapes",
            )
            .with_context("settings", format!("{a:?}"))
            .with_context("parameters", format!("{b:?}")),
        )),
        (Some(shape), _) | (None, Some(shape)) => Ok(shape.to_vec()),
        (None, None) => Ok(Vec::new()),
    }
}

fn check_components(arg: &ModelArg<'_>, name: &str) -> Result<(), ObeError> {
    if let ModelArg::Array(tensors) = arg {
        if let Some(first) = tensors.first() {
            if tensors.iter().any(|t| t.shape() != first.shape()) {
                return Err(ObeError::Shape(
                    ErrorInfo::new("model.ragged_array", "array components differ in shape")
                        .with_context("argument", name),
                ));
            }
        }
    }
    Ok(())
}
