//! Axes and axis validation.

use obe_core::errors::{ErrorInfo, ObeError};
use serde::{Deserialize, Serialize};

/// Which of the two independent spaces an axis belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SpaceKind {
    /// Measurement settings.
    Settings,
    /// Unknown model parameters.
    Parameters,
}

impl SpaceKind {
    /// Name used in error context.
    pub fn as_str(&self) -> &'static str {
        match self {
            SpaceKind::Settings => "settings",
            SpaceKind::Parameters => "parameters",
        }
    }
}

/// Non-empty ordered sequence of finite values spanning one quantity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Axis(Vec<f64>);

impl Axis {
    /// Rejects empty axes and non-finite values.
    pub fn new(values: Vec<f64>) -> Result<Self, ObeError> {
        if values.is_empty() {
            return Err(ObeError::Configuration(ErrorInfo::new(
                "grid.empty_axis",
                "axis must contain at least one value",
            )));
        }
        if let Some(pos) = values.iter().position(|v| !v.is_finite()) {
            return Err(ObeError::Configuration(
                ErrorInfo::new("grid.non_finite", "axis values must be finite")
                    .with_context("position", pos.to_string()),
            ));
        }
        Ok(Self(values))
    }

    /// Values in order.
    pub fn values(&self) -> &[f64] {
        &self.0
    }

    /// Number of values.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false for a validated axis.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Validates an ordered list of raw axes belonging to `kind`.
pub fn validate_axes(kind: SpaceKind, axes: &[Vec<f64>]) -> Result<Vec<Axis>, ObeError> {
    if axes.is_empty() {
        return Err(ObeError::Configuration(
            ErrorInfo::new("grid.no_axes", "a space needs at least one axis")
                .with_context("space", kind.as_str()),
        ));
    }
    axes.iter()
        .enumerate()
        .map(|(idx, values)| {
            Axis::new(values.clone()).map_err(|err| match err {
                ObeError::Configuration(info) => ObeError::Configuration(
                    info.with_context("space", kind.as_str())
                        .with_context("axis", idx.to_string()),
                ),
                other => other,
            })
        })
        .collect()
}

/// `n` evenly spaced values from `start` to `stop`, both included.
pub fn linspace(start: f64, stop: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (stop - start) / (n as f64 - 1.0);
            (0..n)
                .map(|i| if i == n - 1 { stop } else { start + step * i as f64 })
                .collect()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn linspace_includes_endpoints() {
        let v = linspace(0.0, 1.0, 101);
        assert_eq!(v.len(), 101);
        assert_eq!(v[0], 0.0);
        assert_eq!(v[100], 1.0);
        assert!((v[60] - 0.6).abs() < 1e-12);
    }

    #[test]
    fn empty_axis_reports_position() {
        let err = validate_axes(SpaceKind::Parameters, &[vec![1.0], vec![]]).unwrap_err();
        let info = err.info();
        assert_eq!(info.code, "grid.empty_axis");
        assert_eq!(info.context.get("axis").map(String::as_str), Some("1"));
        assert_eq!(info.context.get("space").map(String::as_str), Some("parameters"));
    }
}
