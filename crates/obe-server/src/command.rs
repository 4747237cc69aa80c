//! Command vocabulary and request field extraction.

use obe_core::errors::{ErrorInfo, ObeError};
use obe_core::Measurement;
use serde_json::{Map, Value};

/// Closed set of commands understood by a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandKind {
    /// Setting grid, one nested array per axis.
    GetSet,
    /// Posterior parameter samples.
    GetPar,
    /// Model constants.
    GetCon,
    /// Particle weights.
    GetWgt,
    /// Posterior mean.
    GetMean,
    /// Posterior standard deviation.
    GetStd,
    /// Posterior covariance.
    GetCov,
    /// Utility-weighted random setting.
    GoodSet,
    /// Maximum-utility setting.
    OptSet,
    /// New measurement record.
    NewDat,
    /// Start of a new run, handed to the session's hook.
    NewRun,
    /// End of the session.
    Done,
}

/// Commands answered by the bound engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EngineCommand {
    /// See [`CommandKind::GetSet`].
    GetSet,
    /// See [`CommandKind::GetPar`].
    GetPar,
    /// See [`CommandKind::GetCon`].
    GetCon,
    /// See [`CommandKind::GetWgt`].
    GetWgt,
    /// See [`CommandKind::GetMean`].
    GetMean,
    /// See [`CommandKind::GetStd`].
    GetStd,
    /// See [`CommandKind::GetCov`].
    GetCov,
    /// See [`CommandKind::GoodSet`].
    GoodSet,
    /// See [`CommandKind::OptSet`].
    OptSet,
    /// See [`CommandKind::NewDat`].
    NewDat,
}

/// Where a command is handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    /// Closes the session.
    Done,
    /// Runs the session's `newrun` hook.
    NewRun,
    /// Needs a bound engine.
    Engine(EngineCommand),
}

impl CommandKind {
    /// Every command, in command-table order.
    pub const ALL: [CommandKind; 12] = [
        CommandKind::GetSet,
        CommandKind::GetPar,
        CommandKind::GetCon,
        CommandKind::GetWgt,
        CommandKind::GetMean,
        CommandKind::GetStd,
        CommandKind::GetCov,
        CommandKind::GoodSet,
        CommandKind::OptSet,
        CommandKind::NewDat,
        CommandKind::NewRun,
        CommandKind::Done,
    ];

    /// Wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            CommandKind::GetSet => "getset",
            CommandKind::GetPar => "getpar",
            CommandKind::GetCon => "getcon",
            CommandKind::GetWgt => "getwgt",
            CommandKind::GetMean => "getmean",
            CommandKind::GetStd => "getstd",
            CommandKind::GetCov => "getcov",
            CommandKind::GoodSet => "goodset",
            CommandKind::OptSet => "optset",
            CommandKind::NewDat => "newdat",
            CommandKind::NewRun => "newrun",
            CommandKind::Done => "done",
        }
    }

    /// Exact, case-sensitive lookup.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|kind| kind.as_str() == name)
    }

    /// Session-level or engine-level handling.
    pub fn route(&self) -> Route {
        let engine = match self {
            CommandKind::Done => return Route::Done,
            CommandKind::NewRun => return Route::NewRun,
            CommandKind::GetSet => EngineCommand::GetSet,
            CommandKind::GetPar => EngineCommand::GetPar,
            CommandKind::GetCon => EngineCommand::GetCon,
            CommandKind::GetWgt => EngineCommand::GetWgt,
            CommandKind::GetMean => EngineCommand::GetMean,
            CommandKind::GetStd => EngineCommand::GetStd,
            CommandKind::GetCov => EngineCommand::GetCov,
            CommandKind::GoodSet => EngineCommand::GoodSet,
            CommandKind::OptSet => EngineCommand::OptSet,
            CommandKind::NewDat => EngineCommand::NewDat,
        };
        Route::Engine(engine)
    }

    /// Whether the command fails while no engine is bound.
    pub fn requires_engine(&self) -> bool {
        matches!(self.route(), Route::Engine(_))
    }
}

/// A decoded inbound message.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    /// Command named by the `"command"` field.
    pub kind: CommandKind,
    /// The whole message object, `"command"` included.
    pub fields: Map<String, Value>,
}

impl Request {
    /// Decodes a message, rejecting non-objects and unknown commands.
    pub fn parse(message: &Value) -> Result<Self, ObeError> {
        let fields = message.as_object().ok_or_else(|| {
            ObeError::Protocol(
                ErrorInfo::new("protocol.not_an_object", "message must be a JSON object")
                    .with_hint("send {\"command\": \"<name>\", ...}"),
            )
        })?;
        let name = match fields.get("command") {
            None => {
                return Err(ObeError::Protocol(ErrorInfo::new(
                    "protocol.missing_command",
                    "message has no \"command\" field",
                )))
            }
            Some(Value::String(name)) => name,
            Some(other) => {
                return Err(ObeError::Protocol(
                    ErrorInfo::new("protocol.command_type", "\"command\" must be a string")
                        .with_context("found", json_type(other)),
                ))
            }
        };
        let kind = CommandKind::from_name(name).ok_or_else(|| {
            ObeError::Protocol(
                ErrorInfo::new("protocol.unknown_command", "unknown command")
                    .with_context("command", name.clone()),
            )
        })?;
        Ok(Self {
            kind,
            fields: fields.clone(),
        })
    }

    /// Optional `"pickiness"`; an integral non-negative number when present.
    pub fn pickiness(&self) -> Result<Option<u32>, ObeError> {
        let Some(value) = self.fields.get("pickiness") else {
            return Ok(None);
        };
        let parsed = match value {
            Value::Number(n) => n.as_u64().or_else(|| {
                n.as_f64()
                    .filter(|f| f.fract() == 0.0 && *f >= 0.0 && *f <= f64::from(u32::MAX))
                    .map(|f| f as u64)
            }),
            _ => None,
        };
        parsed
            .and_then(|n| u32::try_from(n).ok())
            .map(Some)
            .ok_or_else(|| {
                ObeError::Protocol(
                    ErrorInfo::new(
                        "protocol.field_type",
                        "\"pickiness\" must be a non-negative integer",
                    )
                    .with_context("field", "pickiness")
                    .with_context("found", value.to_string()),
                )
            })
    }

    /// The `"x"`, `"y"` and `"s"` fields as one measurement record.
    pub fn measurement(&self) -> Result<Measurement, ObeError> {
        let x = self.number_sequence("x")?;
        let y = self.number_sequence("y")?;
        let s = self.number_sequence("s")?;
        Measurement::new(x, y, s)
    }

    /// A number or an array of numbers; a bare number becomes a one-element sequence.
    pub fn number_sequence(&self, field: &str) -> Result<Vec<f64>, ObeError> {
        let value = self.fields.get(field).ok_or_else(|| {
            ObeError::Protocol(
                ErrorInfo::new("protocol.missing_field", format!("missing \"{field}\""))
                    .with_context("command", self.kind.as_str())
                    .with_context("field", field),
            )
        })?;
        let type_error = || {
            ObeError::Protocol(
                ErrorInfo::new(
                    "protocol.field_type",
                    format!("\"{field}\" must be a number or an array of numbers"),
                )
                .with_context("field", field)
                .with_context("found", json_type(value)),
            )
        };
        match value {
            Value::Number(n) => n.as_f64().map(|v| vec![v]).ok_or_else(type_error),
            Value::Array(items) => items
                .iter()
                .map(|item| item.as_f64().ok_or_else(type_error))
                .collect(),
            _ => Err(type_error()),
        }
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
