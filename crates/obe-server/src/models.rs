//! Built-in model catalogue selectable from configuration.

use std::sync::Arc;

use obe_core::errors::{ErrorInfo, ObeError};
use obe_core::ModelFunction;
use obe_grid::Pointwise;

/// A named model with the axis and constant counts it expects.
#[derive(Debug, Clone, Copy)]
pub struct CatalogueEntry {
    /// Name used in `[model] name`.
    pub name: &'static str,
    /// Human readable formula and argument order.
    pub formula: &'static str,
    /// Expected setting axes.
    pub settings: usize,
    /// Expected parameter axes.
    pub parameters: usize,
    /// Expected constants.
    pub constants: usize,
    build: fn() -> Arc<dyn ModelFunction>,
}

impl CatalogueEntry {
    /// New instance of the model.
    pub fn build(&self) -> Arc<dyn ModelFunction> {
        (self.build)()
    }

    /// Checks that a configuration supplies the counts this model reads.
    pub fn check_arity(
        &self,
        settings: usize,
        parameters: usize,
        constants: usize,
    ) -> Result<(), ObeError> {
        let mismatch = [
            ("settings", self.settings, settings),
            ("parameters", self.parameters, parameters),
            ("constants", self.constants, constants),
        ]
        .into_iter()
        .find(|(_, expected, actual)| expected != actual);
        match mismatch {
            None => Ok(()),
            Some((what, expected, actual)) => Err(ObeError::Configuration(
                ErrorInfo::new("config.model_arity", format!("wrong number of {what}"))
                    .with_context("model", self.name)
                    .with_context("expected", expected.to_string())
                    .with_context("actual", actual.to_string())
                    .with_hint(self.formula),
            )),
        }
    }
}

/// Every built-in model.
pub const CATALOGUE: &[CatalogueEntry] = &[
    CatalogueEntry {
        name: "lorentzian",
        formula: "a / (1 + ((x - x0) / dx)^2); settings [x], parameters [x0, dx], constants [a]",
        settings: 1,
        parameters: 2,
        constants: 1,
        build: lorentzian,
    },
    CatalogueEntry {
        name: "gaussian",
        formula: "a * exp(-(x - x0)^2 / (2 sigma^2)) + b; settings [x], parameters [x0, sigma], constants [a, b]",
        settings: 1,
        parameters: 2,
        constants: 2,
        build: gaussian,
    },
    CatalogueEntry {
        name: "line",
        formula: "m * x + b; settings [x], parameters [m, b], no constants",
        settings: 1,
        parameters: 2,
        constants: 0,
        build: line,
    },
];

/// Catalogue entry named `name`.
pub fn lookup(name: &str) -> Result<&'static CatalogueEntry, ObeError> {
    CATALOGUE
        .iter()
        .find(|entry| entry.name == name)
        .ok_or_else(|| {
            let known: Vec<&str> = CATALOGUE.iter().map(|entry| entry.name).collect();
            ObeError::Configuration(
                ErrorInfo::new("config.unknown_model", "unknown model")
                    .with_context("model", name)
                    .with_hint(format!("known models: {}", known.join(", "))),
            )
        })
}

fn lorentzian() -> Arc<dyn ModelFunction> {
    Arc::new(Pointwise::new(|s: &[f64], p: &[f64], c: &[f64]| {
        let z = (s[0] - p[0]) / p[1];
        c[0] / (1.0 + z * z)
    }))
}

fn gaussian() -> Arc<dyn ModelFunction> {
    Arc::new(Pointwise::new(|s: &[f64], p: &[f64], c: &[f64]| {
        let d = s[0] - p[0];
        c[0] * (-d * d / (2.0 * p[1] * p[1])).exp() + c[1]
    }))
}

fn line() -> Arc<dyn ModelFunction> {
    Arc::new(Pointwise::new(|s: &[f64], p: &[f64], _: &[f64]| {
        p[0] * s[0] + p[1]
    }))
}
