use obe_core::ObeError;
use obe_engine::ParticleEngine;
use obe_wire::Listener;
use tracing::info;

use crate::config::ServerConfig;
use crate::session::{Session, SessionSummary};

/// Binds the configured address and serves one client.
pub fn serve(config: &ServerConfig) -> Result<SessionSummary, ObeError> {
    let listener = Listener::bind(config.bind_address())?;
    serve_on(&listener, config)
}

/// Accepts one connection on `listener`, binds a particle engine built from
/// `config` and runs the session until `done`.
///
/// The configuration is validated before the first client is accepted.
pub fn serve_on(listener: &Listener, config: &ServerConfig) -> Result<SessionSummary, ObeError> {
    config.validate()?;
    let args = config.engine_args()?;
    info!(address = %listener.local_addr()?, model = %config.model.name, "server ready");
    let (transport, peer) = listener.accept(config.read_timeout())?;
    let mut session = Session::new(transport).with_hook(config.run_hook());
    session.bind_engine(ParticleEngine::factory(config.engine.clone()), args)?;
    info!(%peer, particles = config.engine.n_particles, "engine bound");
    session.run()
}
