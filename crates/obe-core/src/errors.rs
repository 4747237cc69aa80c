//! Structured error types shared across OBE crates.

use std::collections::BTreeMap;
use std::fmt::{self, Display};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Payload carried by every [`ObeError`]: a dotted code such as
/// `protocol.missing_field`, a message, string context and an optional hint.
///
/// Serialized as-is inside error replies, so field names are part of the wire format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorInfo {
    /// Dotted machine readable code, stable across releases.
    pub code: String,
    /// Diagnostic text for humans.
    pub message: String,
    /// Offending values keyed by name, e.g. `field` or `expected`.
    #[serde(default)]
    pub context: BTreeMap<String, String>,
    /// What the caller can change to succeed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

impl ErrorInfo {
    /// Payload with empty context and no hint.
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            context: BTreeMap::new(),
            hint: None,
        }
    }

    /// Records `key = value`, replacing an earlier value for `key`.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.context.insert(key.into(), value.into());
        self
    }

    /// Attaches a remediation hint.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}

/// Canonical error type for the experiment design server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(tag = "family", content = "detail", rename_all = "snake_case")]
pub enum ObeError {
    /// Invalid axis or constant input while configuring a grid.
    #[error("configuration error: {0}")]
    Configuration(ErrorInfo),
    /// Point length or tensor shape mismatch.
    #[error("shape error: {0}")]
    Shape(ErrorInfo),
    /// A grid or model function was used before it was supplied.
    #[error("not configured: {0}")]
    NotConfigured(ErrorInfo),
    /// Malformed or incomplete command.
    #[error("protocol error: {0}")]
    Protocol(ErrorInfo),
    /// Command requires an engine but none is bound.
    #[error("engine not bound: {0}")]
    EngineNotBound(ErrorInfo),
    /// An operation on the bound engine failed.
    #[error("upstream engine error: {0}")]
    Upstream(ErrorInfo),
    /// Framing or socket failure; fatal to a session.
    #[error("transport error: {0}")]
    Transport(ErrorInfo),
    /// Serialization and schema errors.
    #[error("serde error: {0}")]
    Serde(ErrorInfo),
}

impl Display for ErrorInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)?;
        let mut pairs = self.context.iter();
        if let Some((key, value)) = pairs.next() {
            write!(f, " ({key}={value}")?;
            for (key, value) in pairs {
                write!(f, ", {key}={value}")?;
            }
            write!(f, ")")?;
        }
        match &self.hint {
            Some(hint) => write!(f, "; hint: {hint}"),
            None => Ok(()),
        }
    }
}

impl ObeError {
    /// Payload shared by all families.
    pub fn info(&self) -> &ErrorInfo {
        match self {
            ObeError::Configuration(info)
            | ObeError::Shape(info)
            | ObeError::NotConfigured(info)
            | ObeError::Protocol(info)
            | ObeError::EngineNotBound(info)
            | ObeError::Upstream(info)
            | ObeError::Transport(info)
            | ObeError::Serde(info) => info,
        }
    }

    /// Consumes the error, keeping only its payload.
    pub fn into_info(self) -> ErrorInfo {
        match self {
            ObeError::Configuration(info)
            | ObeError::Shape(info)
            | ObeError::NotConfigured(info)
            | ObeError::Protocol(info)
            | ObeError::EngineNotBound(info)
            | ObeError::Upstream(info)
            | ObeError::Transport(info)
            | ObeError::Serde(info) => info,
        }
    }

    /// Stable family name, identical to the serialized `family` tag.
    pub fn family(&self) -> &'static str {
        match self {
            ObeError::Configuration(_) => "configuration",
            ObeError::Shape(_) => "shape",
            ObeError::NotConfigured(_) => "not_configured",
            ObeError::Protocol(_) => "protocol",
            ObeError::EngineNotBound(_) => "engine_not_bound",
            ObeError::Upstream(_) => "upstream",
            ObeError::Transport(_) => "transport",
            ObeError::Serde(_) => "serde",
        }
    }

    /// Re-labels an error raised by an engine operation as [`ObeError::Upstream`].
    ///
    /// The original family is kept in the context under `source_family`.
    pub fn into_upstream(self) -> ObeError {
        if let ObeError::Upstream(info) = self {
            return ObeError::Upstream(info);
        }
        let family = self.family();
        ObeError::Upstream(self.into_info().with_context("source_family", family))
    }

    /// Whether the error must end the session it occurred in.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ObeError::Transport(_))
    }
}
