// WebSocket module
//
// - handler: upgrade handler, verifies the login handshake before upgrading
// - connection: per-connection read loop, send task and ping ticker
// - routes: HTTP routes (ws, health, metrics) and the serve entry point

mod connection;
mod handler;
mod routes;

pub use handler::{websocket_handler, LoginQuery};
pub use routes::{create_router, metrics_handler, serve, MetricsResponse};
