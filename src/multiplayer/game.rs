use std::collections::{BTreeMap, BTreeSet, HashMap};

use super::settings;
use crate::cache::MirrorFields;
use crate::protocol::messages::GameSettingsPayload;
use crate::protocol::{
    free_mod, GameId, GameView, MapIdentity, MatchFilters, Modifiers, Ruleset, Team, UserId,
};
use crate::scoring::ScoreProcessor;

/// Lifecycle position of a match. Derived from the flags on [`Game`], never
/// stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchState {
    Idle,
    CountdownPending,
    InProgress,
    Disbanded,
}

/// Authoritative state of one match. Only touched through the engine's
/// per-game lock.
#[derive(Debug)]
pub struct Game {
    pub id: GameId,
    pub public_id: String,
    pub name: String,
    password: Option<String>,
    pub max_players: i32,
    pub map: MapIdentity,
    pub ruleset: Ruleset,
    pub host_id: UserId,
    pub referee_id: Option<UserId>,
    pub created_by: UserId,
    pub roster: Vec<UserId>,
    pub players_without_map: BTreeSet<UserId>,
    pub players_ready: BTreeSet<UserId>,
    pub player_modifiers: BTreeMap<UserId, Modifiers>,
    pub red_team: Vec<UserId>,
    pub blue_team: Vec<UserId>,
    pub player_wins: BTreeMap<UserId, i32>,
    pub red_team_wins: i32,
    pub blue_team_wins: i32,
    pub in_progress: bool,
    /// Unix millis of the pending countdown, `0` when none.
    pub countdown_started_at: i64,
    countdown_generation: u64,
    pub modifiers: Modifiers,
    pub free_mod_type: i32,
    pub tournament_mode: bool,
    pub host_rotation: bool,
    pub host_selecting_map: bool,
    pub enable_preview: bool,
    pub filters: MatchFilters,
    pub disbanded: bool,
    /// Members taking part in the running match.
    pub playing: Vec<UserId>,
    pub finished: BTreeSet<UserId>,
    pub scores: HashMap<UserId, ScoreProcessor>,
}

impl Game {
    /// Build a clamped match shell. The numeric id is assigned once the shell
    /// is persisted and the creator is added as the first member afterwards.
    pub fn new(
        requested: GameSettingsPayload,
        password: Option<String>,
        public_id: String,
        creator: UserId,
    ) -> Self {
        let defaults = MatchFilters::permissive();
        let (min_difficulty, max_difficulty) = settings::ordered(
            requested
                .min_difficulty
                .map_or(defaults.min_difficulty, settings::clamp_difficulty),
            requested
                .max_difficulty
                .map_or(defaults.max_difficulty, settings::clamp_difficulty),
        );
        let (min_long_note_percent, max_long_note_percent) = settings::ordered(
            requested
                .min_long_note_percent
                .map_or(defaults.min_long_note_percent, |value| {
                    settings::clamp_long_note_percent(i64::from(value))
                }),
            requested
                .max_long_note_percent
                .map_or(defaults.max_long_note_percent, |value| {
                    settings::clamp_long_note_percent(i64::from(value))
                }),
        );
        let filters = MatchFilters {
            min_difficulty,
            max_difficulty,
            max_song_length: requested
                .max_song_length
                .map_or(defaults.max_song_length, |value| {
                    settings::clamp_song_length(i64::from(value))
                }),
            min_long_note_percent,
            max_long_note_percent,
            min_audio_rate: requested
                .min_audio_rate
                .map_or(defaults.min_audio_rate, settings::clamp_audio_rate),
            allowed_game_modes: requested
                .allowed_game_modes
                .as_deref()
                .map_or(defaults.allowed_game_modes.clone(), settings::clamp_allowed_modes),
        };

        Self {
            id: 0,
            public_id,
            name: settings::clamp_name(&requested.name),
            password: settings::normalize_password(password),
            max_players: settings::clamp_max_players(requested.max_players),
            map: settings::clamp_map(requested.map),
            ruleset: settings::clamp_ruleset(requested.ruleset),
            host_id: creator,
            referee_id: None,
            created_by: creator,
            roster: Vec::new(),
            players_without_map: BTreeSet::new(),
            players_ready: BTreeSet::new(),
            player_modifiers: BTreeMap::new(),
            red_team: Vec::new(),
            blue_team: Vec::new(),
            player_wins: BTreeMap::new(),
            red_team_wins: 0,
            blue_team_wins: 0,
            in_progress: false,
            countdown_started_at: 0,
            countdown_generation: 0,
            modifiers: requested.modifiers,
            free_mod_type: settings::clamp_free_mod(requested.free_mod_type),
            tournament_mode: requested.tournament_mode,
            host_rotation: requested.host_rotation,
            host_selecting_map: false,
            enable_preview: false,
            filters,
            disbanded: false,
            playing: Vec::new(),
            finished: BTreeSet::new(),
            scores: HashMap::new(),
        }
    }

    pub fn state(&self) -> MatchState {
        if self.disbanded {
            MatchState::Disbanded
        } else if self.in_progress {
            MatchState::InProgress
        } else if self.countdown_started_at != 0 {
            MatchState::CountdownPending
        } else {
            MatchState::Idle
        }
    }

    pub fn has_password(&self) -> bool {
        self.password.is_some()
    }

    pub fn password_matches(&self, supplied: Option<&str>) -> bool {
        match self.password.as_deref() {
            None => true,
            Some(expected) => supplied == Some(expected),
        }
    }

    /// Returns `true` when the stored password changed.
    pub fn replace_password(&mut self, password: Option<String>) -> bool {
        if self.password == password {
            return false;
        }
        self.password = password;
        true
    }

    pub fn is_member(&self, user_id: UserId) -> bool {
        self.roster.contains(&user_id)
    }

    pub fn is_full(&self) -> bool {
        self.roster.len() >= self.max_players.max(0) as usize
    }

    /// Host and referee may change match-wide settings.
    pub fn has_host_authority(&self, user_id: UserId) -> bool {
        self.host_id == user_id || self.referee_id == Some(user_id)
    }

    pub fn team_of(&self, user_id: UserId) -> Option<Team> {
        if self.red_team.contains(&user_id) {
            Some(Team::Red)
        } else if self.blue_team.contains(&user_id) {
            Some(Team::Blue)
        } else {
            None
        }
    }

    /// Add a member after admission checks passed.
    pub fn add_member(&mut self, user_id: UserId) {
        if self.is_member(user_id) {
            return;
        }
        self.roster.push(user_id);
        self.player_wins.entry(user_id).or_insert(0);
        if self.ruleset == Ruleset::Team {
            self.assign_team(user_id);
        }
    }

    fn assign_team(&mut self, user_id: UserId) {
        if self.blue_team.len() < self.red_team.len() {
            self.blue_team.push(user_id);
        } else {
            self.red_team.push(user_id);
        }
    }

    /// Move a member to a team. Returns `false` when nothing changed.
    pub fn set_team(&mut self, user_id: UserId, team: Team) -> bool {
        if self.team_of(user_id) == Some(team) {
            return false;
        }
        self.red_team.retain(|id| *id != user_id);
        self.blue_team.retain(|id| *id != user_id);
        match team {
            Team::Red => self.red_team.push(user_id),
            Team::Blue => self.blue_team.push(user_id),
        }
        true
    }

    /// Switch rulesets, rebuilding team lists so that team membership only
    /// exists under [`Ruleset::Team`].
    pub fn apply_ruleset(&mut self, ruleset: Ruleset) -> bool {
        if self.ruleset == ruleset {
            return false;
        }
        self.ruleset = ruleset;
        self.red_team.clear();
        self.blue_team.clear();
        if ruleset == Ruleset::Team {
            let roster = self.roster.clone();
            for user_id in roster {
                self.assign_team(user_id);
            }
        }
        true
    }

    /// Drop a member from every per-player collection. Returns the new host
    /// when the departing member was the host and someone remains.
    pub fn remove_member(&mut self, user_id: UserId) -> Option<UserId> {
        self.roster.retain(|id| *id != user_id);
        self.players_without_map.remove(&user_id);
        self.players_ready.remove(&user_id);
        self.player_modifiers.remove(&user_id);
        self.player_wins.remove(&user_id);
        self.red_team.retain(|id| *id != user_id);
        self.blue_team.retain(|id| *id != user_id);
        self.playing.retain(|id| *id != user_id);
        self.finished.remove(&user_id);
        self.scores.remove(&user_id);
        if self.referee_id == Some(user_id) {
            self.referee_id = None;
        }

        if self.host_id != user_id {
            return None;
        }
        let next = self.roster.first().copied()?;
        self.host_id = next;
        Some(next)
    }

    /// Member after the current host in roster order, wrapping around.
    pub fn next_host_in_rotation(&self) -> Option<UserId> {
        if self.roster.len() < 2 {
            return None;
        }
        let position = self.roster.iter().position(|id| *id == self.host_id)?;
        self.roster.get((position + 1) % self.roster.len()).copied()
    }

    /// Arm a countdown and return its generation token. `None` when a
    /// countdown is already pending or the match is running.
    pub fn arm_countdown(&mut self, now_millis: i64) -> Option<u64> {
        if self.in_progress || self.countdown_started_at != 0 {
            return None;
        }
        self.countdown_started_at = now_millis;
        self.countdown_generation = self.countdown_generation.wrapping_add(1);
        Some(self.countdown_generation)
    }

    /// Withdraw any pending countdown. Returns `true` when one was pending.
    pub fn disarm_countdown(&mut self) -> bool {
        let was_pending = self.countdown_started_at != 0;
        self.countdown_started_at = 0;
        self.countdown_generation = self.countdown_generation.wrapping_add(1);
        was_pending
    }

    /// A scheduled start is only honoured when nothing has stopped, restarted
    /// or superseded the countdown since it was armed.
    pub fn countdown_is_current(&self, generation: u64) -> bool {
        !self.disbanded
            && !self.in_progress
            && self.countdown_started_at != 0
            && self.countdown_generation == generation
    }

    /// Modifiers a player plays with: the match-wide set plus their own
    /// selection when free mod is enabled.
    pub fn effective_modifiers(&self, user_id: UserId) -> Modifiers {
        if self.free_mod_type == free_mod::NONE {
            return self.modifiers;
        }
        self.modifiers | self.player_modifiers.get(&user_id).copied().unwrap_or(0)
    }

    /// Begin a match with every member that has the map. Returns `false` when
    /// nobody can play.
    pub fn begin_match(&mut self) -> bool {
        if self.in_progress {
            return false;
        }
        let playing: Vec<UserId> = self
            .roster
            .iter()
            .copied()
            .filter(|id| !self.players_without_map.contains(id))
            .collect();
        if playing.is_empty() {
            return false;
        }

        self.countdown_started_at = 0;
        self.countdown_generation = self.countdown_generation.wrapping_add(1);
        self.in_progress = true;
        self.finished.clear();
        self.scores = playing
            .iter()
            .map(|id| {
                (
                    *id,
                    ScoreProcessor::new(self.map.difficulty_rating, self.effective_modifiers(*id)),
                )
            })
            .collect();
        self.playing = playing;
        true
    }

    pub fn all_playing_finished(&self) -> bool {
        self.in_progress && self.playing.iter().all(|id| self.finished.contains(id))
    }

    pub fn view(&self) -> GameView {
        GameView {
            id: self.id,
            public_id: self.public_id.clone(),
            name: self.name.clone(),
            has_password: self.has_password(),
            max_players: self.max_players,
            map: self.map.clone(),
            ruleset: self.ruleset,
            host_id: self.host_id,
            referee_id: self.referee_id,
            player_ids: self.roster.clone(),
            players_without_map: self.players_without_map.iter().copied().collect(),
            players_ready: self.players_ready.iter().copied().collect(),
            player_modifiers: self.player_modifiers.clone(),
            red_team: self.red_team.clone(),
            blue_team: self.blue_team.clone(),
            player_wins: self.player_wins.clone(),
            red_team_wins: self.red_team_wins,
            blue_team_wins: self.blue_team_wins,
            in_progress: self.in_progress,
            countdown_started_at: self.countdown_started_at,
            modifiers: self.modifiers,
            free_mod_type: self.free_mod_type,
            tournament_mode: self.tournament_mode,
            host_rotation: self.host_rotation,
            host_selecting_map: self.host_selecting_map,
            enable_preview: self.enable_preview,
            filters: self.filters.clone(),
        }
    }

    /// Flattened read-mostly fields for the external cache.
    pub fn mirror_fields(&self) -> MirrorFields {
        let join = |ids: &[UserId]| {
            ids.iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(",")
        };
        vec![
            ("id".to_string(), self.id.to_string()),
            ("name".to_string(), self.name.clone()),
            ("has_password".to_string(), self.has_password().to_string()),
            ("max_players".to_string(), self.max_players.to_string()),
            ("player_count".to_string(), self.roster.len().to_string()),
            ("player_ids".to_string(), join(&self.roster)),
            ("host_id".to_string(), self.host_id.to_string()),
            ("ruleset".to_string(), (self.ruleset as i32).to_string()),
            ("map_md5".to_string(), self.map.md5.clone()),
            ("map_id".to_string(), self.map.map_id.to_string()),
            ("map_name".to_string(), self.map.name.clone()),
            ("game_mode".to_string(), (self.map.game_mode as i32).to_string()),
            ("in_progress".to_string(), self.in_progress.to_string()),
            ("modifiers".to_string(), self.modifiers.to_string()),
            ("free_mod_type".to_string(), self.free_mod_type.to_string()),
            ("host_rotation".to_string(), self.host_rotation.to_string()),
            ("tournament_mode".to_string(), self.tournament_mode.to_string()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn game(max_players: i32) -> Game {
        let settings = GameSettingsPayload {
            name: "Evening lobby".to_string(),
            max_players,
            ..GameSettingsPayload::default()
        };
        let mut game = Game::new(settings, Some("pw".to_string()), "pub".to_string(), 1);
        game.id = 9;
        game.add_member(1);
        game
    }

    #[test]
    fn state_follows_flags() {
        let mut game = game(4);
        assert_eq!(game.state(), MatchState::Idle);
        assert!(game.arm_countdown(1_000).is_some());
        assert_eq!(game.state(), MatchState::CountdownPending);
        assert!(game.begin_match());
        assert_eq!(game.state(), MatchState::InProgress);
        game.disbanded = true;
        assert_eq!(game.state(), MatchState::Disbanded);
    }

    #[test]
    fn countdown_generation_invalidates_stale_timers() {
        let mut game = game(4);
        let first = game.arm_countdown(10).unwrap_or_default();
        assert!(game.arm_countdown(20).is_none());
        assert!(game.disarm_countdown());
        let second = game.arm_countdown(30).unwrap_or_default();
        assert!(!game.countdown_is_current(first));
        assert!(game.countdown_is_current(second));
    }

    #[test]
    fn host_leaving_promotes_first_remaining_member() {
        let mut game = game(4);
        game.add_member(2);
        game.add_member(3);
        game.players_ready.insert(1);
        assert_eq!(game.remove_member(1), Some(2));
        assert_eq!(game.host_id, 2);
        assert!(!game.players_ready.contains(&1));
        assert_eq!(game.remove_member(3), None);
        assert_eq!(game.roster, vec![2]);
    }

    #[test]
    fn view_hides_password_and_reports_presence() {
        let game = game(4);
        let view = game.view();
        assert!(view.has_password);
        assert!(game.password_matches(Some("pw")));
        assert!(!game.password_matches(Some("nope")));
        assert!(!game.password_matches(None));
        let json = serde_json::to_string(&view).unwrap();
        assert!(!json.contains("\"pw\""));
    }

    #[test]
    fn team_ruleset_balances_members() {
        let mut game = game(8);
        game.add_member(2);
        game.add_member(3);
        assert!(game.apply_ruleset(Ruleset::Team));
        assert_eq!(game.red_team, vec![1, 3]);
        assert_eq!(game.blue_team, vec![2]);
        game.add_member(4);
        assert_eq!(game.team_of(4), Some(Team::Blue));
        assert!(game.set_team(4, Team::Red));
        assert!(!game.set_team(4, Team::Red));
        assert!(game.apply_ruleset(Ruleset::FreeForAll));
        assert!(game.red_team.is_empty() && game.blue_team.is_empty());
    }

    #[test]
    fn match_excludes_members_without_the_map() {
        let mut game = game(4);
        game.add_member(2);
        game.players_without_map.insert(2);
        assert!(game.begin_match());
        assert_eq!(game.playing, vec![1]);
        game.finished.insert(1);
        assert!(game.all_playing_finished());
    }

    #[test]
    fn rotation_wraps_around_roster() {
        let mut game = game(4);
        game.add_member(2);
        assert_eq!(game.next_host_in_rotation(), Some(2));
        game.host_id = 2;
        assert_eq!(game.next_host_in_rotation(), Some(1));
    }
}
