//! Silent-repair rules for every bounded match setting.
//!
//! Out-of-range values are never rejected; they are clamped or truncated. The
//! same functions run at creation and in every later setter.

use crate::protocol::{free_mod, GameMode, MapIdentity, MapPayload, MatchFilters, Ruleset};

pub const MAX_NAME_CHARS: usize = 50;
pub const MIN_PLAYERS: i32 = 2;
pub const MAX_PLAYERS: i32 = 16;
pub const MAX_HASH_CHARS: usize = 32;
pub const MAX_MAP_NAME_CHARS: usize = 250;
pub const MIN_AUDIO_RATE: f64 = 0.5;
pub const MAX_AUDIO_RATE: f64 = 2.0;
pub const MAX_LONG_NOTE_PERCENT: i32 = 100;
/// One entry per playback rate from 0.5x to 2.0x in 0.05x steps.
pub const RATE_TABLE_LEN: usize = 21;

const MAX_FILTER_VALUE: f64 = i32::MAX as f64;

pub fn truncate_chars(value: &str, max_chars: usize) -> String {
    value.chars().take(max_chars).collect()
}

pub fn clamp_name(name: &str) -> String {
    truncate_chars(name, MAX_NAME_CHARS)
}

pub fn clamp_max_players(requested: i32) -> i32 {
    requested.clamp(MIN_PLAYERS, MAX_PLAYERS)
}

/// A password counts as set only when non-empty.
pub fn normalize_password(password: Option<String>) -> Option<String> {
    password.filter(|value| !value.is_empty())
}

pub fn clamp_ruleset(raw: i32) -> Ruleset {
    Ruleset::from_clamped(raw)
}

pub fn clamp_free_mod(raw: i32) -> i32 {
    free_mod::clamp(raw)
}

pub fn clamp_difficulty(value: f64) -> f64 {
    if value.is_nan() {
        return 0.0;
    }
    value.clamp(0.0, MAX_FILTER_VALUE)
}

pub fn clamp_song_length(seconds: i64) -> i32 {
    seconds.clamp(0, i64::from(i32::MAX)) as i32
}

pub fn clamp_long_note_percent(percent: i64) -> i32 {
    percent.clamp(0, i64::from(MAX_LONG_NOTE_PERCENT)) as i32
}

pub fn clamp_audio_rate(rate: f64) -> f64 {
    if rate.is_nan() {
        return MIN_AUDIO_RATE;
    }
    rate.clamp(MIN_AUDIO_RATE, MAX_AUDIO_RATE)
}

/// Keep the table only when it has exactly one entry per playback rate.
pub fn clamp_rate_table(table: Vec<f64>) -> Vec<f64> {
    if table.len() == RATE_TABLE_LEN {
        table
    } else {
        Vec::new()
    }
}

/// Clamp each requested mode and drop duplicates. An empty list allows every
/// mode.
pub fn clamp_allowed_modes(requested: &[i32]) -> Vec<GameMode> {
    let mut modes: Vec<GameMode> = Vec::new();
    for raw in requested {
        let mode = GameMode::from_clamped(*raw);
        if !modes.contains(&mode) {
            modes.push(mode);
        }
    }
    if modes.is_empty() {
        return all_modes();
    }
    modes.sort_by_key(|mode| *mode as i32);
    modes
}

fn all_modes() -> Vec<GameMode> {
    vec![GameMode::Keys4, GameMode::Keys7]
}

/// Order a clamped range so that `min <= max`.
pub fn ordered<T: PartialOrd>(a: T, b: T) -> (T, T) {
    if a > b {
        (b, a)
    } else {
        (a, b)
    }
}

pub fn clamp_map(map: MapPayload) -> MapIdentity {
    MapIdentity {
        md5: truncate_chars(&map.md5, MAX_HASH_CHARS),
        alternative_md5: truncate_chars(&map.alternative_md5, MAX_HASH_CHARS),
        map_id: map.map_id,
        mapset_id: map.mapset_id,
        name: truncate_chars(&map.name, MAX_MAP_NAME_CHARS),
        game_mode: GameMode::from_clamped(map.game_mode),
        difficulty_rating: clamp_difficulty(map.difficulty_rating),
        difficulty_ratings_by_rate: clamp_rate_table(map.difficulty_ratings_by_rate),
    }
}

impl MatchFilters {
    /// Bounds that admit every map.
    pub fn permissive() -> Self {
        Self {
            min_difficulty: 0.0,
            max_difficulty: MAX_FILTER_VALUE,
            max_song_length: i32::MAX,
            min_long_note_percent: 0,
            max_long_note_percent: MAX_LONG_NOTE_PERCENT,
            min_audio_rate: MIN_AUDIO_RATE,
            allowed_game_modes: all_modes(),
        }
    }
}

impl Default for MatchFilters {
    fn default() -> Self {
        Self::permissive()
    }
}
