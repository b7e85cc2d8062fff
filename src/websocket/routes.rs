use crate::metrics::MetricsSnapshot;
use crate::server::GameServer;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::Json;
use serde::Serialize;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use super::handler::websocket_handler;

/// Create the Axum router with WebSocket support
pub fn create_router(cors_origins: &str) -> axum::Router<Arc<GameServer>> {
    use tower_http::cors::{Any, CorsLayer};
    use tower_http::trace::TraceLayer;

    let cors = if cors_origins == "*" {
        CorsLayer::permissive()
    } else {
        let origins: Vec<_> = cors_origins
            .split(',')
            .filter_map(|s| s.trim().parse::<axum::http::HeaderValue>().ok())
            .collect();

        if origins.is_empty() {
            tracing::warn!("No valid CORS origins configured, using permissive CORS");
            CorsLayer::permissive()
        } else {
            CorsLayer::new()
                .allow_origin(origins)
                .allow_methods(Any)
                .allow_headers(Any)
        }
    };

    axum::Router::new()
        .route("/ws", get(websocket_handler))
        .route("/health", get(health_check))
        .route("/metrics", get(metrics_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

/// Health check endpoint
async fn health_check(
    State(server): State<Arc<GameServer>>,
) -> axum::response::Result<&'static str> {
    if server.health_check().await {
        Ok("OK")
    } else {
        Err(StatusCode::SERVICE_UNAVAILABLE.into())
    }
}

#[derive(Debug, Serialize)]
pub struct MetricsResponse {
    #[serde(flatten)]
    pub counters: MetricsSnapshot,
    pub online_users: usize,
    pub active_games: usize,
    pub lobby_members: usize,
}

/// Counter snapshot plus live registry sizes.
pub async fn metrics_handler(State(server): State<Arc<GameServer>>) -> Json<MetricsResponse> {
    Json(MetricsResponse {
        counters: server.metrics().snapshot(),
        online_users: server.sessions().online_count().await,
        active_games: server.engine().active_games(),
        lobby_members: server.lobby().len().await,
    })
}

/// Serve the game protocol on `listener` until the process stops. The
/// stale-session sweep runs alongside and stops with the server.
pub async fn serve(listener: TcpListener, server: Arc<GameServer>) -> anyhow::Result<()> {
    let shutdown = CancellationToken::new();
    let cleanup = tokio::spawn(server.clone().cleanup_task(shutdown.clone()));

    let app = create_router(&server.config().server.cors_origins).with_state(server);
    let addr = listener.local_addr()?;
    tracing::info!(%addr, "Cadence server listening");

    let result = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await;

    shutdown.cancel();
    if let Err(err) = cleanup.await {
        tracing::warn!(error = %err, "Cleanup task ended abnormally");
    }
    result.map_err(Into::into)
}
