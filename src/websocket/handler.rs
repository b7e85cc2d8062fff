use crate::server::GameServer;
use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{ConnectInfo, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::Arc;

use super::connection::handle_socket;

/// Query string of the upgrade request.
#[derive(Debug, Default, Deserialize)]
pub struct LoginQuery {
    /// Base64 JSON login handshake.
    #[serde(default)]
    pub login: String,
}

/// WebSocket handler for the game protocol. The login is verified before the
/// upgrade; a rejected login never gets a socket.
pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(server): State<Arc<GameServer>>,
    Query(query): Query<LoginQuery>,
) -> Response {
    let user = match server.authenticate_login(&query.login).await {
        Ok(user) => user,
        Err(err) => {
            server.metrics().increment_login_failures();
            tracing::warn!(client_addr = %addr, error = %err, "Login rejected");
            return (StatusCode::UNAUTHORIZED, err.to_string()).into_response();
        }
    };

    let max_message_size = server.config().server.max_message_size;
    ws.max_message_size(max_message_size)
        .on_upgrade(move |socket| handle_socket(socket, server, addr, user))
}
