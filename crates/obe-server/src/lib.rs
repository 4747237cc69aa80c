#![deny(missing_docs)]
//! Command session server for adaptive Bayesian experiment design.
//!
//! One client connects, issues commands such as `getset`, `newdat` and
//! `goodset`, and receives exactly one reply per command. The session owns a
//! single [`Engine`](obe_core::Engine) built from a factory and its arguments.

/// Command names and request fields.
pub mod command;
/// TOML configuration.
pub mod config;
/// `newrun` hooks.
pub mod hook;
/// Built-in models.
pub mod models;
/// Replies and their JSON form.
pub mod reply;
/// Listening entry points.
pub mod server;
/// Session state machine and loop.
pub mod session;

pub use command::{CommandKind, EngineCommand, Request, Route};
pub use config::{AxisSpec, ModelSection, NewRunAction, ServerConfig, ServerSection};
pub use hook::{NoopHook, RebindHook, RunHook};
pub use reply::Reply;
pub use server::{serve, serve_on};
pub use session::{BirthRecord, Phase, Session, SessionState, SessionSummary};
