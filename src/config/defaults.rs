//! Fallbacks for `server`, `multiplayer` and `auth` fields missing from a
//! partial document.

pub const fn default_port() -> u16 {
    8085
}

pub const fn default_ping_interval_secs() -> u64 {
    15
}

/// Must stay above the ping interval or every client times out.
pub const fn default_ping_timeout_secs() -> u64 {
    60
}

pub const fn default_cleanup_interval_secs() -> u64 {
    30
}

/// Packets queued per connection before the socket writer falls behind.
pub const fn default_outbound_queue_capacity() -> usize {
    256
}

pub const fn default_max_message_size() -> usize {
    64 * 1024
}

pub fn default_cors_origins() -> String {
    "*".to_string()
}

/// Delay between a host's countdown request and the match start.
pub const fn default_countdown_ms() -> u64 {
    5000
}

pub const fn default_max_concurrent_games() -> usize {
    2000
}

pub const fn default_allow_guests() -> bool {
    true
}

/// Guest ids are handed out upward from here, clear of registered users.
pub const fn default_guest_id_start() -> i32 {
    1_000_000
}
