#![cfg_attr(not(test), deny(clippy::panic))]
#![allow(
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::struct_excessive_bools,
    clippy::too_many_arguments,
    clippy::too_many_lines,
    clippy::similar_names
)]

//! # Cadence Server
//!
//! Real-time multiplayer backend for a competitive rhythm game. Clients
//! connect over WebSocket, browse a lobby of games, join one, ready up and
//! play a synchronised match whose results are scored and broadcast to the
//! room.
//!
//! All state lives in memory. Persistence, the shared cache mirror and
//! cross-node messaging sit behind traits with in-memory defaults.

/// Login handshake and ticket verification
pub mod auth;

/// Shared key-value mirror of game state
pub mod cache;

/// Server configuration and environment variables
pub mod config;

/// Persistence abstraction (in-memory implementation)
pub mod database;

/// Users browsing the game list
pub mod lobby;

/// Structured logging configuration
pub mod logging;

/// Game chat channel membership
pub mod messaging;

/// Metrics collection and reporting
pub mod metrics;

/// Game rooms, countdowns and matches
pub mod multiplayer;

/// Wire packets and the JSON envelope
pub mod protocol;

/// Judgement tallies, accuracy and performance rating
pub mod scoring;

/// Main server orchestration
pub mod server;

/// Connected users and their outbound queues
pub mod session;

/// WebSocket connection handling
pub mod websocket;
