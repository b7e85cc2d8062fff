//! Server orchestration.
//!
//! [`GameServer`] owns the session registry, the lobby registry and the
//! multiplayer engine, and wires the external collaborators into them. Inbound
//! frames enter through [`GameServer::dispatch`]; the per-concern handlers live
//! in the child modules.

use std::sync::Arc;

use crate::auth::{Authenticator, StaticAuthenticator};
use crate::cache::{GameStateMirror, InMemoryGameStateMirror};
use crate::config::Config;
use crate::database::{InMemoryPersistence, Persistence};
use crate::lobby::LobbyRegistry;
use crate::messaging::{InMemoryMessaging, MessagingService};
use crate::metrics::ServerMetrics;
use crate::multiplayer::MultiplayerEngine;
use crate::session::SessionRegistry;

mod game_handlers;
mod heartbeat;
mod lifecycle;
mod maintenance;
pub mod packet_router;
mod session_handlers;

#[cfg(test)]
mod game_handlers_tests;
#[cfg(test)]
mod lifecycle_tests;
#[cfg(test)]
mod packet_router_tests;
#[cfg(test)]
mod test_support;

pub use packet_router::{handler_for, Handler};

/// External services the server talks to. Every field has an in-memory
/// implementation so the binary runs stand-alone.
#[derive(Clone)]
pub struct Collaborators {
    pub persistence: Arc<dyn Persistence>,
    pub mirror: Arc<dyn GameStateMirror>,
    pub messaging: Arc<dyn MessagingService>,
    pub authenticator: Arc<dyn Authenticator>,
}

impl Collaborators {
    pub fn in_memory(config: &Config) -> Self {
        Self {
            persistence: Arc::new(InMemoryPersistence::new()),
            mirror: Arc::new(InMemoryGameStateMirror::new()),
            messaging: Arc::new(InMemoryMessaging::new()),
            authenticator: Arc::new(StaticAuthenticator::new(&config.auth)),
        }
    }
}

pub struct GameServer {
    config: Arc<Config>,
    sessions: Arc<SessionRegistry>,
    lobby: Arc<LobbyRegistry>,
    engine: Arc<MultiplayerEngine>,
    persistence: Arc<dyn Persistence>,
    authenticator: Arc<dyn Authenticator>,
    metrics: Arc<ServerMetrics>,
}

impl GameServer {
    /// Build a server backed by the in-memory collaborators.
    pub async fn new(config: Arc<Config>) -> anyhow::Result<Arc<Self>> {
        let collaborators = Collaborators::in_memory(&config);
        Self::with_collaborators(config, collaborators).await
    }

    pub async fn with_collaborators(
        config: Arc<Config>,
        collaborators: Collaborators,
    ) -> anyhow::Result<Arc<Self>> {
        collaborators.persistence.initialize().await?;

        let metrics = Arc::new(ServerMetrics::new());
        let sessions = Arc::new(SessionRegistry::new(metrics.clone()));
        let lobby = Arc::new(LobbyRegistry::new());
        let engine = Arc::new(MultiplayerEngine::new(
            config.multiplayer.clone(),
            sessions.clone(),
            lobby.clone(),
            collaborators.persistence.clone(),
            collaborators.mirror,
            collaborators.messaging,
            metrics.clone(),
        ));

        tracing::info!(
            countdown_ms = config.multiplayer.countdown_ms,
            max_concurrent_games = config.multiplayer.max_concurrent_games,
            allow_guests = config.auth.allow_guests,
            "Game server initialised"
        );

        Ok(Arc::new(Self {
            config,
            sessions,
            lobby,
            engine,
            persistence: collaborators.persistence,
            authenticator: collaborators.authenticator,
            metrics,
        }))
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn sessions(&self) -> &Arc<SessionRegistry> {
        &self.sessions
    }

    pub fn lobby(&self) -> &Arc<LobbyRegistry> {
        &self.lobby
    }

    pub fn engine(&self) -> &Arc<MultiplayerEngine> {
        &self.engine
    }

    pub fn metrics(&self) -> Arc<ServerMetrics> {
        self.metrics.clone()
    }

    pub async fn health_check(&self) -> bool {
        self.persistence.health_check().await
    }
}
