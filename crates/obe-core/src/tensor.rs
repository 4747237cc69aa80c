//! Dense row-major tensors of `f64`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::{ErrorInfo, ObeError};

/// Dense row-major `f64` tensor.
///
/// A tensor with an empty shape holds exactly one value (a scalar).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tensor {
    shape: Vec<usize>,
    data: Vec<f64>,
}

impl Tensor {
    /// Wraps `data` with the given shape, checking that the element counts agree.
    pub fn new(shape: Vec<usize>, data: Vec<f64>) -> Result<Self, ObeError> {
        let expected = element_count(&shape);
        if expected != data.len() {
            return Err(ObeError::Shape(
                ErrorInfo::new(
                    "tensor.length_mismatch",
                    "tensor data length does not match its shape",
                )
                .with_context("shape", format!("{shape:?}"))
                .with_context("expected", expected.to_string())
                .with_context("actual", data.len().to_string()),
            ));
        }
        Ok(Self { shape, data })
    }

    /// Builds a tensor by visiting every multi-index in row-major order.
    pub fn from_fn(shape: Vec<usize>, mut f: impl FnMut(&[usize]) -> f64) -> Self {
        let count = element_count(&shape);
        let mut data = Vec::with_capacity(count);
        let mut index = vec![0usize; shape.len()];
        for flat in 0..count {
            unravel_index(flat, &shape, &mut index);
            data.push(f(&index));
        }
        Self { shape, data }
    }

    /// One-dimensional tensor holding `values`.
    pub fn vector(values: Vec<f64>) -> Self {
        Self {
            shape: vec![values.len()],
            data: values,
        }
    }

    /// Zero-dimensional tensor holding `value`.
    pub fn scalar(value: f64) -> Self {
        Self {
            shape: Vec::new(),
            data: vec![value],
        }
    }

    /// Two-dimensional tensor from equally sized rows.
    pub fn from_rows(rows: &[Vec<f64>]) -> Result<Self, ObeError> {
        let cols = rows.first().map(Vec::len).unwrap_or(0);
        let mut data = Vec::with_capacity(rows.len() * cols);
        for (idx, row) in rows.iter().enumerate() {
            if row.len() != cols {
                return Err(ObeError::Shape(
                    ErrorInfo::new("tensor.ragged_rows", "rows have different lengths")
                        .with_context("row", idx.to_string())
                        .with_context("expected", cols.to_string())
                        .with_context("actual", row.len().to_string()),
                ));
            }
            data.extend_from_slice(row);
        }
        Self::new(vec![rows.len(), cols], data)
    }

    /// Dimensions in order.
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Row-major element buffer.
    pub fn data(&self) -> &[f64] {
        &self.data
    }

    /// Consumes the tensor, returning its buffer.
    pub fn into_data(self) -> Vec<f64> {
        self.data
    }

    /// Number of dimensions.
    pub fn ndim(&self) -> usize {
        self.shape.len()
    }

    /// Total number of elements.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the tensor holds no elements.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Element at a multi-index, `None` when out of bounds or of wrong rank.
    pub fn get(&self, index: &[usize]) -> Option<f64> {
        if index.len() != self.shape.len() {
            return None;
        }
        let mut flat = 0usize;
        for (&i, &dim) in index.iter().zip(&self.shape) {
            if i >= dim {
                return None;
            }
            flat = flat * dim + i;
        }
        self.data.get(flat).copied()
    }

    /// Applies `f` elementwise, keeping the shape.
    pub fn map(&self, f: impl Fn(f64) -> f64) -> Tensor {
        Tensor {
            shape: self.shape.clone(),
            data: self.data.iter().map(|&v| f(v)).collect(),
        }
    }

    /// Plain nested-array JSON representation.
    ///
    /// Non-finite values become `null`, as JSON has no representation for them.
    pub fn to_nested(&self) -> Value {
        if self.shape.is_empty() {
            return Value::from(self.data.first().copied().unwrap_or(f64::NAN));
        }
        nest(&self.shape, &self.data)
    }
}

fn nest(shape: &[usize], data: &[f64]) -> Value {
    match shape {
        [] => Value::Null,
        [_] => Value::Array(data.iter().map(|&v| Value::from(v)).collect()),
        [outer, rest @ ..] => {
            let stride = element_count(rest);
            Value::Array(
                (0..*outer)
                    .map(|i| nest(rest, &data[i * stride..(i + 1) * stride]))
                    .collect(),
            )
        }
    }
}

/// Product of the dimensions, `1` for an empty shape.
pub fn element_count(shape: &[usize]) -> usize {
    shape.iter().product()
}

/// Writes the row-major multi-index of `flat` into `out`.
pub fn unravel_index(mut flat: usize, shape: &[usize], out: &mut [usize]) {
    for axis in (0..shape.len()).rev() {
        let dim = shape[axis].max(1);
        out[axis] = flat % dim;
        flat /= dim;
    }
}
