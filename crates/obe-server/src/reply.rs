//! Outbound replies and their single conversion to plain JSON.

use obe_core::{ObeError, Tensor};
use serde_json::{json, Value};

/// Reply produced by one dispatched command.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    /// Literal `"OK"`.
    Ack,
    /// Flat array.
    Vector(Vec<f64>),
    /// Nested array following the tensor shape.
    Tensor(Tensor),
    /// One tensor per axis, sent as an outer array.
    Tensors(Vec<Tensor>),
    /// Sent as `{"error": ...}`.
    Error(ObeError),
}

impl Reply {
    /// Whether the reply reports a failure.
    pub fn is_error(&self) -> bool {
        matches!(self, Reply::Error(_))
    }

    /// Converts to wire JSON. Every value crossing the transport passes through here.
    pub fn to_wire(&self) -> Value {
        match self {
            Reply::Ack => Value::String("OK".into()),
            Reply::Vector(values) => Value::Array(values.iter().map(|&v| Value::from(v)).collect()),
            Reply::Tensor(tensor) => tensor.to_nested(),
            Reply::Tensors(tensors) => Value::Array(tensors.iter().map(Tensor::to_nested).collect()),
            Reply::Error(err) => {
                let detail = serde_json::to_value(err).unwrap_or_else(|_| Value::String(err.to_string()));
                json!({ "error": detail })
            }
        }
    }
}

impl From<ObeError> for Reply {
    fn from(err: ObeError) -> Self {
        Reply::Error(err)
    }
}
