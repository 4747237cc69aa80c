//! Behaviour of the `newrun` command.

use obe_core::ObeError;
use serde_json::{Map, Value};
use tracing::info;

use crate::session::SessionState;

/// Extension point invoked for every `newrun` command.
///
/// `command` is the full decoded message, so a hook may read extra fields.
pub trait RunHook: Send {
    /// Called once per `newrun`; an error becomes the reply.
    fn newrun(
        &mut self,
        state: &mut SessionState,
        command: &Map<String, Value>,
    ) -> Result<(), ObeError>;
}

/// Acknowledges `newrun` and keeps the current engine.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopHook;

impl RunHook for NoopHook {
    fn newrun(&mut self, _: &mut SessionState, _: &Map<String, Value>) -> Result<(), ObeError> {
        Ok(())
    }
}

/// Replaces the engine with a fresh one built from the recorded birth arguments.
#[derive(Debug, Default, Clone, Copy)]
pub struct RebindHook;

impl RunHook for RebindHook {
    fn newrun(&mut self, state: &mut SessionState, _: &Map<String, Value>) -> Result<(), ObeError> {
        state.rebind()?;
        info!("engine rebound for a new run");
        Ok(())
    }
}

impl<H: RunHook + ?Sized> RunHook for Box<H> {
    fn newrun(
        &mut self,
        state: &mut SessionState,
        command: &Map<String, Value>,
    ) -> Result<(), ObeError> {
        (**self).newrun(state, command)
    }
}
