//! Per-connection command session.

use std::fmt;

use obe_core::errors::{ErrorInfo, ObeError};
use obe_core::{Engine, EngineArgs, EngineFactory};
use obe_wire::Transport;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::command::{CommandKind, EngineCommand, Request, Route};
use crate::hook::{NoopHook, RunHook};
use crate::reply::Reply;

/// Lifecycle phase of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No engine bound.
    Idle,
    /// An engine serves commands.
    Bound,
    /// `done` was received.
    Closed,
}

/// Factory and arguments an engine was built from, kept for rebinding.
#[derive(Clone)]
pub struct BirthRecord {
    factory: EngineFactory,
    args: EngineArgs,
}

impl BirthRecord {
    /// Pairs a factory with its arguments.
    pub fn new(factory: EngineFactory, args: EngineArgs) -> Self {
        Self { factory, args }
    }

    /// Arguments the engine is built from.
    pub fn args(&self) -> &EngineArgs {
        &self.args
    }

    /// Builds a fresh engine.
    pub fn instantiate(&self) -> Result<Box<dyn Engine>, ObeError> {
        (self.factory)(&self.args)
    }
}

impl fmt::Debug for BirthRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BirthRecord")
            .field("args", &self.args)
            .finish_non_exhaustive()
    }
}

/// Engine slot plus its birth record.
#[derive(Default)]
pub struct SessionState {
    engine: Option<Box<dyn Engine>>,
    birth: Option<BirthRecord>,
    closed: bool,
}

impl fmt::Debug for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionState")
            .field("phase", &self.phase())
            .field("birth", &self.birth)
            .finish()
    }
}

impl SessionState {
    /// Current lifecycle phase.
    pub fn phase(&self) -> Phase {
        if self.closed {
            Phase::Closed
        } else if self.engine.is_some() {
            Phase::Bound
        } else {
            Phase::Idle
        }
    }

    /// Builds an engine and binds it, replacing any bound engine.
    ///
    /// A failing factory leaves the state as it was.
    pub fn bind_engine(&mut self, factory: EngineFactory, args: EngineArgs) -> Result<(), ObeError> {
        let birth = BirthRecord::new(factory, args);
        self.bind_record(birth)
    }

    /// Rebuilds the engine from the stored birth record, discarding posterior state.
    pub fn rebind(&mut self) -> Result<(), ObeError> {
        let birth = self.birth.clone().ok_or_else(|| {
            ObeError::EngineNotBound(
                ErrorInfo::new("session.no_birth_record", "no engine has ever been bound")
                    .with_hint("bind an engine before requesting a rebind"),
            )
        })?;
        self.bind_record(birth)
    }

    /// Drops the engine and returns it; the birth record is kept.
    pub fn unbind(&mut self) -> Option<Box<dyn Engine>> {
        self.engine.take()
    }

    /// Bound engine, if any.
    pub fn engine(&self) -> Option<&dyn Engine> {
        self.engine.as_deref()
    }

    /// Record of the latest successful bind.
    pub fn birth_record(&self) -> Option<&BirthRecord> {
        self.birth.as_ref()
    }

    fn bind_record(&mut self, birth: BirthRecord) -> Result<(), ObeError> {
        if self.closed {
            return Err(ObeError::Protocol(ErrorInfo::new(
                "session.closed",
                "session has already been closed",
            )));
        }
        let engine = birth.instantiate()?;
        debug!(args = ?birth.args(), "engine bound");
        self.engine = Some(engine);
        self.birth = Some(birth);
        Ok(())
    }

    fn engine_mut(&mut self, kind: CommandKind) -> Result<&mut (dyn Engine + 'static), ObeError> {
        self.engine.as_deref_mut().ok_or_else(|| {
            ObeError::EngineNotBound(
                ErrorInfo::new("session.engine_not_bound", "command requires a bound engine")
                    .with_context("command", kind.as_str()),
            )
        })
    }
}

/// Counters reported when a session ends.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SessionSummary {
    /// Messages handled.
    pub commands: usize,
    /// Error replies sent.
    pub errors: usize,
}

/// Strictly sequential request/reply loop over one transport.
pub struct Session<T> {
    transport: T,
    state: SessionState,
    hook: Box<dyn RunHook>,
    summary: SessionSummary,
}

impl<T: Transport> Session<T> {
    /// Idle session with the no-op hook.
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            state: SessionState::default(),
            hook: Box::new(NoopHook),
            summary: SessionSummary::default(),
        }
    }

    /// Replaces the `newrun` hook.
    pub fn with_hook(mut self, hook: impl RunHook + 'static) -> Self {
        self.hook = Box::new(hook);
        self
    }

    /// Session state.
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Mutable session state.
    pub fn state_mut(&mut self) -> &mut SessionState {
        &mut self.state
    }

    /// See [`SessionState::bind_engine`].
    pub fn bind_engine(&mut self, factory: EngineFactory, args: EngineArgs) -> Result<(), ObeError> {
        self.state.bind_engine(factory, args)
    }

    /// Counters so far.
    pub fn summary(&self) -> SessionSummary {
        self.summary
    }

    /// Gives back the transport.
    pub fn into_transport(self) -> T {
        self.transport
    }

    /// Serves messages until `done` or a transport failure.
    ///
    /// Per-command errors are replied and the loop continues. Transport errors
    /// end the session and are returned.
    pub fn run(&mut self) -> Result<SessionSummary, ObeError> {
        info!(phase = ?self.state.phase(), "session started");
        while self.state.phase() != Phase::Closed {
            let message = self.transport.receive().map_err(|err| {
                warn!(error = %err, "session ended by transport failure");
                err
            })?;
            let reply = self.handle(&message);
            self.transport.send(&reply.to_wire()).map_err(|err| {
                warn!(error = %err, "reply could not be delivered");
                err
            })?;
        }
        info!(
            commands = self.summary.commands,
            errors = self.summary.errors,
            "session closed"
        );
        Ok(self.summary)
    }

    /// Dispatches one decoded message and returns its reply.
    ///
    /// A `done` message moves the session to [`Phase::Closed`].
    pub fn handle(&mut self, message: &Value) -> Reply {
        self.summary.commands += 1;
        let reply = match Request::parse(message) {
            Ok(request) => {
                debug!(command = request.kind.as_str(), "dispatching");
                self.dispatch(&request).unwrap_or_else(Reply::Error)
            }
            Err(err) => Reply::Error(err),
        };
        if let Reply::Error(err) = &reply {
            self.summary.errors += 1;
            warn!(family = err.family(), code = %err.info().code, "command failed");
        }
        reply
    }

    fn dispatch(&mut self, request: &Request) -> Result<Reply, ObeError> {
        let command = match request.kind.route() {
            Route::Done => {
                self.state.closed = true;
                self.state.engine = None;
                return Ok(Reply::Ack);
            }
            Route::NewRun => {
                self.hook.newrun(&mut self.state, &request.fields)?;
                return Ok(Reply::Ack);
            }
            Route::Engine(command) => command,
        };

        let engine = self.state.engine_mut(request.kind)?;
        let reply = match command {
            EngineCommand::GetSet => Reply::Tensors(engine.setting_grid().to_vec()),
            EngineCommand::GetPar => Reply::Tensor(engine.parameters()),
            EngineCommand::GetCon => Reply::Vector(engine.constants().to_vec()),
            EngineCommand::GetWgt => Reply::Vector(engine.particle_weights().to_vec()),
            EngineCommand::GetMean => Reply::Vector(engine.mean().map_err(ObeError::into_upstream)?),
            EngineCommand::GetStd => Reply::Vector(engine.std().map_err(ObeError::into_upstream)?),
            EngineCommand::GetCov => {
                Reply::Tensor(engine.covariance().map_err(ObeError::into_upstream)?)
            }
            EngineCommand::GoodSet => {
                let pickiness = request.pickiness()?;
                Reply::Vector(
                    engine
                        .good_setting(pickiness)
                        .map_err(ObeError::into_upstream)?,
                )
            }
            EngineCommand::OptSet => {
                Reply::Vector(engine.opt_setting().map_err(ObeError::into_upstream)?)
            }
            EngineCommand::NewDat => {
                let measurement = request.measurement()?;
                engine
                    .pdf_update(&measurement)
                    .map_err(ObeError::into_upstream)?;
                Reply::Ack
            }
        };
        Ok(reply)
    }
}
