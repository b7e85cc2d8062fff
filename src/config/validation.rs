//! Configuration validation functions.

use super::Config;
use std::collections::HashSet;

/// Reject configurations the server cannot run with. This is the only fatal
/// error path and it is checked once at startup.
pub fn validate_config(config: &Config) -> anyhow::Result<()> {
    if config.port == 0 {
        anyhow::bail!("port must be non-zero");
    }

    let server = &config.server;
    if server.ping_interval_secs == 0 {
        anyhow::bail!("server.ping_interval_secs must be at least 1 second");
    }
    if server.ping_timeout_secs <= server.ping_interval_secs {
        anyhow::bail!(
            "server.ping_timeout_secs ({}) must exceed server.ping_interval_secs ({})",
            server.ping_timeout_secs,
            server.ping_interval_secs
        );
    }
    if server.cleanup_interval_secs == 0 {
        anyhow::bail!("server.cleanup_interval_secs must be at least 1 second");
    }
    if server.outbound_queue_capacity == 0 {
        anyhow::bail!("server.outbound_queue_capacity must be at least 1");
    }
    if server.max_message_size < 1024 {
        anyhow::bail!(
            "server.max_message_size must be at least 1024 bytes (configured: {})",
            server.max_message_size
        );
    }

    if config.multiplayer.countdown_ms == 0 {
        anyhow::bail!("multiplayer.countdown_ms must be non-zero");
    }
    if config.multiplayer.max_concurrent_games == 0 {
        anyhow::bail!("multiplayer.max_concurrent_games must be at least 1");
    }

    let mut tickets = HashSet::new();
    let mut ids = HashSet::new();
    for user in &config.auth.users {
        if user.ticket.trim().is_empty() {
            anyhow::bail!("auth.users entry for `{}` has an empty ticket", user.username);
        }
        if !tickets.insert(user.ticket.as_str()) {
            anyhow::bail!("auth.users contains a duplicate ticket for `{}`", user.username);
        }
        if !ids.insert(user.id) {
            anyhow::bail!("auth.users contains duplicate user id {}", user.id);
        }
        if user.id >= config.auth.guest_id_start {
            anyhow::bail!(
                "auth.users id {} collides with the guest id range starting at {}",
                user.id,
                config.auth.guest_id_start
            );
        }
    }

    config.websocket.validate()?;

    Ok(())
}
