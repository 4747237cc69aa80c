//! TOML server configuration.

use std::fs;
use std::path::Path;
use std::time::Duration;

use obe_core::errors::{ErrorInfo, ObeError};
use obe_core::EngineArgs;
use obe_engine::EngineConfig;
use obe_grid::{linspace, validate_axes, SpaceKind};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::hook::{NoopHook, RebindHook, RunHook};
use crate::models;

/// Listen address used when none is configured.
pub const DEFAULT_ADDRESS: &str = "127.0.0.1";
/// Listen port used when none is configured.
pub const DEFAULT_PORT: u16 = 61981;

/// Complete server configuration. Every section is optional; the defaults
/// describe a Lorentzian peak scanned over `x` in `[0, 1]`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    /// `[server]` table.
    #[serde(default)]
    pub server: ServerSection,
    /// `[model]` table.
    #[serde(default)]
    pub model: ModelSection,
    /// Setting axes, in order.
    #[serde(default = "default_settings")]
    pub settings: Vec<AxisSpec>,
    /// Parameter axes, in order.
    #[serde(default = "default_parameters")]
    pub parameters: Vec<AxisSpec>,
    /// Particle engine tunables.
    #[serde(default)]
    pub engine: EngineConfig,
}

/// Network and session behaviour.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerSection {
    /// Host or IP to listen on.
    #[serde(default = "default_address")]
    pub address: String,
    /// TCP port.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Seconds to wait for the next command before giving up on the client.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub read_timeout_secs: Option<u64>,
    /// Effect of the `newrun` command.
    #[serde(default)]
    pub on_newrun: NewRunAction,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            address: default_address(),
            port: default_port(),
            read_timeout_secs: None,
            on_newrun: NewRunAction::default(),
        }
    }
}

/// What the `newrun` command does to the bound engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NewRunAction {
    /// Acknowledge only.
    #[default]
    Ignore,
    /// Rebuild the engine from its birth record.
    Rebind,
}

/// Model picked from the built-in catalogue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSection {
    /// Catalogue name.
    pub name: String,
    /// Model constants, verbatim.
    #[serde(default)]
    pub constants: Vec<f64>,
}

impl Default for ModelSection {
    fn default() -> Self {
        Self {
            name: "lorentzian".into(),
            constants: vec![1.0],
        }
    }
}

/// One axis, given either as explicit `values` or as `start`/`stop`/`steps`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AxisSpec {
    /// Label used in error context.
    #[serde(default)]
    pub name: String,
    /// Explicit values.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<f64>>,
    /// First value of a range.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<f64>,
    /// Last value of a range, included.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop: Option<f64>,
    /// Number of values in a range.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub steps: Option<usize>,
}

impl AxisSpec {
    /// Evenly spaced axis.
    pub fn range(name: &str, start: f64, stop: f64, steps: usize) -> Self {
        Self {
            name: name.into(),
            values: None,
            start: Some(start),
            stop: Some(stop),
            steps: Some(steps),
        }
    }

    /// Axis with explicit values.
    pub fn values(name: &str, values: Vec<f64>) -> Self {
        Self {
            name: name.into(),
            values: Some(values),
            start: None,
            stop: None,
            steps: None,
        }
    }

    /// Expands into concrete axis values.
    pub fn resolve(&self) -> Result<Vec<f64>, ObeError> {
        let has_range = self.start.is_some() || self.stop.is_some() || self.steps.is_some();
        match (&self.values, self.start, self.stop, self.steps) {
            (Some(_), ..) if has_range => Err(self.error(
                "config.axis_ambiguous",
                "give either values or start/stop/steps, not both",
            )),
            (Some(values), ..) => Ok(values.clone()),
            (None, Some(_), Some(_), Some(0)) => {
                Err(self.error("config.axis_steps", "steps must be at least 1"))
            }
            (None, Some(start), Some(stop), Some(steps)) => Ok(linspace(start, stop, steps)),
            _ => Err(self
                .error("config.axis_incomplete", "axis needs values or start/stop/steps")),
        }
    }

    fn error(&self, code: &str, message: &str) -> ObeError {
        ObeError::Configuration(ErrorInfo::new(code, message).with_context("axis", self.name.clone()))
    }
}

fn default_address() -> String {
    DEFAULT_ADDRESS.into()
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_settings() -> Vec<AxisSpec> {
    vec![AxisSpec::range("x", 0.0, 1.0, 101)]
}

fn default_parameters() -> Vec<AxisSpec> {
    vec![
        AxisSpec::range("x0", 0.1, 0.9, 41),
        AxisSpec::range("dx", 0.01, 0.2, 50),
    ]
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            server: ServerSection::default(),
            model: ModelSection::default(),
            settings: default_settings(),
            parameters: default_parameters(),
            engine: EngineConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Reads and parses a TOML file without validating it.
    pub fn load(path: &Path) -> Result<Self, ObeError> {
        let contents = fs::read_to_string(path).map_err(|err| {
            ObeError::Serde(
                ErrorInfo::new("config.read", err.to_string())
                    .with_context("path", path.display().to_string()),
            )
        })?;
        Self::from_toml_str(&contents).map_err(|err| match err {
            ObeError::Serde(info) => {
                ObeError::Serde(info.with_context("path", path.display().to_string()))
            }
            other => other,
        })
    }

    /// Parses TOML text without validating it.
    pub fn from_toml_str(contents: &str) -> Result<Self, ObeError> {
        toml::from_str(contents)
            .map_err(|err| ObeError::Serde(ErrorInfo::new("config.parse", err.to_string())))
    }

    /// Pretty TOML, as printed by `--print-config`.
    pub fn to_toml_string(&self) -> Result<String, ObeError> {
        toml::to_string_pretty(self)
            .map_err(|err| ObeError::Serde(ErrorInfo::new("config.serialize", err.to_string())))
    }

    /// Checks everything an engine will need, without building one.
    pub fn validate(&self) -> Result<(), ObeError> {
        if self.server.address.trim().is_empty() {
            return Err(ObeError::Configuration(ErrorInfo::new(
                "config.address",
                "server address must not be empty",
            )));
        }
        if self.server.read_timeout_secs == Some(0) {
            return Err(ObeError::Configuration(
                ErrorInfo::new("config.read_timeout", "read_timeout_secs must be positive")
                    .with_hint("omit the key to wait indefinitely"),
            ));
        }
        let (settings, parameters) = self.resolve_axes()?;
        validate_axes(SpaceKind::Settings, &settings)?;
        validate_axes(SpaceKind::Parameters, &parameters)?;
        if let Some(pos) = self.model.constants.iter().position(|c| !c.is_finite()) {
            return Err(ObeError::Configuration(
                ErrorInfo::new("config.constants", "constants must be finite")
                    .with_context("position", pos.to_string()),
            ));
        }
        models::lookup(&self.model.name)?.check_arity(
            settings.len(),
            parameters.len(),
            self.model.constants.len(),
        )?;
        self.engine.validate()
    }

    /// Arguments for the engine factory: catalogue model plus resolved axes.
    pub fn engine_args(&self) -> Result<EngineArgs, ObeError> {
        let entry = models::lookup(&self.model.name)?;
        let (setting_axes, parameter_axes) = self.resolve_axes()?;
        entry.check_arity(
            setting_axes.len(),
            parameter_axes.len(),
            self.model.constants.len(),
        )?;
        Ok(EngineArgs {
            model: entry.build(),
            setting_axes,
            parameter_axes,
            constants: self.model.constants.clone(),
        })
    }

    /// `address:port`.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.address, self.server.port)
    }

    /// Socket read timeout, `None` to block.
    pub fn read_timeout(&self) -> Option<Duration> {
        self.server.read_timeout_secs.map(Duration::from_secs)
    }

    /// Hook matching `on_newrun`.
    pub fn run_hook(&self) -> Box<dyn RunHook> {
        match self.server.on_newrun {
            NewRunAction::Ignore => Box::new(NoopHook),
            NewRunAction::Rebind => Box::new(RebindHook),
        }
    }

    /// Hex SHA-256 of the canonical JSON form; equal configs share a fingerprint.
    pub fn fingerprint(&self) -> Result<String, ObeError> {
        let bytes = serde_json::to_vec(self)
            .map_err(|err| ObeError::Serde(ErrorInfo::new("config.fingerprint", err.to_string())))?;
        Ok(hex::encode(Sha256::digest(bytes)))
    }

    fn resolve_axes(&self) -> Result<(Vec<Vec<f64>>, Vec<Vec<f64>>), ObeError> {
        let settings = self
            .settings
            .iter()
            .map(AxisSpec::resolve)
            .collect::<Result<Vec<_>, _>>()?;
        let parameters = self
            .parameters
            .iter()
            .map(AxisSpec::resolve)
            .collect::<Result<Vec<_>, _>>()?;
        Ok((settings, parameters))
    }
}
