//! Settings and roster changes requested by members of a match.
//!
//! Match-wide settings require host authority (host or referee). Per-player
//! settings only ever apply to the caller. Values are clamped first, and an
//! unchanged value produces no packet.

use std::sync::Arc;

use super::engine::{
    depart, require_authority, require_member, EngineError, MultiplayerEngine,
};
use super::settings;
use crate::protocol::messages::{
    GameDifficultiesPayload, GameFiltersPayload, GameFlagPayload, GameFreeModPayload,
    GameIdPayload, GameInvitePayload, GameMapPayload, GameMaxPlayersPayload,
    GameModifiersPayload, GameNamePayload, GamePlayerModifiersPayload, GamePlayerPayload,
    GameRefereePayload, GameRulesetPayload, GameTeamPayload,
};
use crate::protocol::{
    free_mod, GameId, MapPayload, MatchFilters, Modifiers, Ruleset, ServerPacket, Team, UserId,
};

fn filters_changed(game_id: GameId, filters: &MatchFilters) -> Vec<ServerPacket> {
    vec![ServerPacket::GameFiltersChanged(GameFiltersPayload {
        game_id,
        filters: filters.clone(),
    })]
}

impl MultiplayerEngine {
    /// Select a new map. Readiness and map-availability reset because they
    /// referred to the previous map.
    pub async fn change_map(
        &self,
        game_id: GameId,
        caller: UserId,
        map: MapPayload,
    ) -> Result<bool, EngineError> {
        let map = settings::clamp_map(map);
        self.mutate(game_id, |game| {
            require_authority(game, caller)?;
            if game.in_progress || game.map == map {
                return Ok(Vec::new());
            }
            game.map = map.clone();
            game.players_ready.clear();
            game.players_without_map.clear();
            Ok(vec![ServerPacket::GameMapChanged(GameMapPayload { game_id, map })])
        })
        .await
    }

    pub async fn change_name(
        &self,
        game_id: GameId,
        caller: UserId,
        name: &str,
    ) -> Result<bool, EngineError> {
        let name = settings::clamp_name(name);
        self.mutate(game_id, |game| {
            require_authority(game, caller)?;
            if game.name == name {
                return Ok(Vec::new());
            }
            game.name = name.clone();
            Ok(vec![ServerPacket::GameNameChanged(GameNamePayload { game_id, name })])
        })
        .await
    }

    pub async fn set_password(
        &self,
        game_id: GameId,
        caller: UserId,
        password: Option<String>,
    ) -> Result<bool, EngineError> {
        let password = settings::normalize_password(password);
        self.mutate(game_id, |game| {
            require_authority(game, caller)?;
            if !game.replace_password(password) {
                return Ok(Vec::new());
            }
            Ok(vec![ServerPacket::GamePasswordChanged(GameFlagPayload {
                game_id,
                enabled: game.has_password(),
            })])
        })
        .await
    }

    /// Capacity never drops below the current roster size.
    pub async fn set_max_player_count(
        &self,
        game_id: GameId,
        caller: UserId,
        requested: i32,
    ) -> Result<bool, EngineError> {
        let clamped = settings::clamp_max_players(requested);
        self.mutate(game_id, |game| {
            require_authority(game, caller)?;
            let roster = i32::try_from(game.roster.len()).unwrap_or(i32::MAX);
            let max_players = clamped.max(roster);
            if game.max_players == max_players {
                return Ok(Vec::new());
            }
            game.max_players = max_players;
            Ok(vec![ServerPacket::GameMaxPlayersChanged(GameMaxPlayersPayload {
                game_id,
                max_players,
            })])
        })
        .await
    }

    pub async fn set_global_modifiers(
        &self,
        game_id: GameId,
        caller: UserId,
        modifiers: Modifiers,
    ) -> Result<bool, EngineError> {
        self.mutate(game_id, |game| {
            require_authority(game, caller)?;
            if game.in_progress || game.modifiers == modifiers {
                return Ok(Vec::new());
            }
            game.modifiers = modifiers;
            Ok(vec![ServerPacket::GameModifiersChanged(GameModifiersPayload {
                game_id,
                modifiers,
            })])
        })
        .await
    }

    /// The caller's own modifier selection. Only accepted while free mod is
    /// enabled.
    pub async fn set_player_modifiers(
        &self,
        game_id: GameId,
        caller: UserId,
        modifiers: Modifiers,
    ) -> Result<bool, EngineError> {
        self.mutate(game_id, |game| {
            require_member(game, caller)?;
            if game.free_mod_type == free_mod::NONE {
                return Err(EngineError::NotFound);
            }
            if game.in_progress || game.player_modifiers.get(&caller) == Some(&modifiers) {
                return Ok(Vec::new());
            }
            game.player_modifiers.insert(caller, modifiers);
            Ok(vec![ServerPacket::GamePlayerModifiersChanged(
                GamePlayerModifiersPayload {
                    game_id,
                    user_id: caller,
                    modifiers,
                },
            )])
        })
        .await
    }

    /// Disabling free mod discards every per-player selection.
    pub async fn set_free_mod(
        &self,
        game_id: GameId,
        caller: UserId,
        free_mod_type: i32,
    ) -> Result<bool, EngineError> {
        let free_mod_type = settings::clamp_free_mod(free_mod_type);
        self.mutate(game_id, |game| {
            require_authority(game, caller)?;
            if game.in_progress || game.free_mod_type == free_mod_type {
                return Ok(Vec::new());
            }
            game.free_mod_type = free_mod_type;
            if free_mod_type == free_mod::NONE {
                game.player_modifiers.clear();
            }
            Ok(vec![ServerPacket::GameFreeModChanged(GameFreeModPayload {
                game_id,
                free_mod_type,
            })])
        })
        .await
    }

    pub async fn set_host_selecting_map(
        &self,
        game_id: GameId,
        caller: UserId,
        enabled: bool,
    ) -> Result<bool, EngineError> {
        self.mutate(game_id, |game| {
            require_authority(game, caller)?;
            if game.host_selecting_map == enabled {
                return Ok(Vec::new());
            }
            game.host_selecting_map = enabled;
            Ok(vec![ServerPacket::GameHostSelectingMap(GameFlagPayload {
                game_id,
                enabled,
            })])
        })
        .await
    }

    pub async fn set_enable_preview(
        &self,
        game_id: GameId,
        caller: UserId,
        enabled: bool,
    ) -> Result<bool, EngineError> {
        self.mutate(game_id, |game| {
            require_authority(game, caller)?;
            if game.enable_preview == enabled {
                return Ok(Vec::new());
            }
            game.enable_preview = enabled;
            Ok(vec![ServerPacket::GamePreviewChanged(GameFlagPayload {
                game_id,
                enabled,
            })])
        })
        .await
    }

    /// Host-computed difficulty per playback rate. Tables of the wrong length
    /// are stored as empty.
    pub async fn set_client_provided_difficulty_ratings(
        &self,
        game_id: GameId,
        caller: UserId,
        difficulties: Vec<f64>,
    ) -> Result<bool, EngineError> {
        let difficulties = settings::clamp_rate_table(difficulties);
        self.mutate(game_id, |game| {
            require_authority(game, caller)?;
            if game.map.difficulty_ratings_by_rate == difficulties {
                return Ok(Vec::new());
            }
            game.map.difficulty_ratings_by_rate = difficulties.clone();
            Ok(vec![ServerPacket::GameDifficultyRatingsChanged(
                GameDifficultiesPayload {
                    game_id,
                    difficulties,
                },
            )])
        })
        .await
    }

    pub async fn set_player_has_map(
        &self,
        game_id: GameId,
        caller: UserId,
    ) -> Result<bool, EngineError> {
        self.mutate(game_id, |game| {
            require_member(game, caller)?;
            if !game.players_without_map.remove(&caller) {
                return Ok(Vec::new());
            }
            Ok(vec![ServerPacket::GamePlayerHasMap(GamePlayerPayload {
                game_id,
                user_id: caller,
            })])
        })
        .await
    }

    /// A member without the map cannot stay ready.
    pub async fn set_player_doesnt_have_map(
        &self,
        game_id: GameId,
        caller: UserId,
    ) -> Result<bool, EngineError> {
        self.mutate(game_id, |game| {
            require_member(game, caller)?;
            if !game.players_without_map.insert(caller) {
                return Ok(Vec::new());
            }
            let mut packets = vec![ServerPacket::GamePlayerNoMap(GamePlayerPayload {
                game_id,
                user_id: caller,
            })];
            if game.players_ready.remove(&caller) {
                packets.push(ServerPacket::GamePlayerNotReady(GamePlayerPayload {
                    game_id,
                    user_id: caller,
                }));
            }
            Ok(packets)
        })
        .await
    }

    pub async fn set_player_ready(
        &self,
        game_id: GameId,
        caller: UserId,
    ) -> Result<bool, EngineError> {
        self.mutate(game_id, |game| {
            require_member(game, caller)?;
            if game.in_progress || !game.players_ready.insert(caller) {
                return Ok(Vec::new());
            }
            Ok(vec![ServerPacket::GamePlayerReady(GamePlayerPayload {
                game_id,
                user_id: caller,
            })])
        })
        .await
    }

    pub async fn set_player_not_ready(
        &self,
        game_id: GameId,
        caller: UserId,
    ) -> Result<bool, EngineError> {
        self.mutate(game_id, |game| {
            require_member(game, caller)?;
            if game.in_progress || !game.players_ready.remove(&caller) {
                return Ok(Vec::new());
            }
            Ok(vec![ServerPacket::GamePlayerNotReady(GamePlayerPayload {
                game_id,
                user_id: caller,
            })])
        })
        .await
    }

    pub async fn change_host(
        &self,
        game_id: GameId,
        caller: UserId,
        new_host: UserId,
    ) -> Result<bool, EngineError> {
        self.mutate(game_id, |game| {
            require_authority(game, caller)?;
            require_member(game, new_host)?;
            if game.host_id == new_host {
                return Ok(Vec::new());
            }
            game.host_id = new_host;
            Ok(vec![ServerPacket::GameHostChanged(GamePlayerPayload {
                game_id,
                user_id: new_host,
            })])
        })
        .await
    }

    pub async fn change_ruleset(
        &self,
        game_id: GameId,
        caller: UserId,
        ruleset: i32,
    ) -> Result<bool, EngineError> {
        let ruleset = settings::clamp_ruleset(ruleset);
        self.mutate(game_id, |game| {
            require_authority(game, caller)?;
            if game.in_progress || !game.apply_ruleset(ruleset) {
                return Ok(Vec::new());
            }
            Ok(vec![ServerPacket::GameRulesetChanged(GameRulesetPayload {
                game_id,
                ruleset,
            })])
        })
        .await
    }

    /// Members pick their own team while the team ruleset is active.
    pub async fn change_team(
        &self,
        game_id: GameId,
        caller: UserId,
        team: i32,
    ) -> Result<bool, EngineError> {
        let team = Team::from_clamped(team);
        self.mutate(game_id, |game| {
            require_member(game, caller)?;
            if game.in_progress
                || game.ruleset != Ruleset::Team
                || !game.set_team(caller, team)
            {
                return Ok(Vec::new());
            }
            Ok(vec![ServerPacket::GameTeamChanged(GameTeamPayload {
                game_id,
                user_id: caller,
                team,
            })])
        })
        .await
    }

    /// Remove another member. The target is told it was kicked.
    pub async fn kick_player(
        &self,
        game_id: GameId,
        caller: UserId,
        target: UserId,
    ) -> Result<bool, EngineError> {
        let departure = self
            .run_locked(game_id, |game| {
                if !game.has_host_authority(caller) || caller == target || !game.is_member(target)
                {
                    return Err(EngineError::NotFound);
                }
                Ok(depart(game, target))
            })
            .await
            .ok_or(EngineError::NotFound)??;

        self.finish_departure(game_id, target, departure).await;
        self.sessions
            .send_to(
                ServerPacket::GameKicked(GameIdPayload { game_id }),
                &[target],
            )
            .await;
        tracing::info!(game_id, caller, target, "Player kicked");
        Ok(true)
    }

    pub async fn set_host_rotation(
        &self,
        game_id: GameId,
        caller: UserId,
        enabled: bool,
    ) -> Result<bool, EngineError> {
        self.mutate(game_id, |game| {
            require_authority(game, caller)?;
            if game.host_rotation == enabled {
                return Ok(Vec::new());
            }
            game.host_rotation = enabled;
            Ok(vec![ServerPacket::GameHostRotationChanged(GameFlagPayload {
                game_id,
                enabled,
            })])
        })
        .await
    }

    pub async fn set_tournament_mode(
        &self,
        game_id: GameId,
        caller: UserId,
        enabled: bool,
    ) -> Result<bool, EngineError> {
        self.mutate(game_id, |game| {
            require_authority(game, caller)?;
            if game.tournament_mode == enabled {
                return Ok(Vec::new());
            }
            game.tournament_mode = enabled;
            Ok(vec![ServerPacket::GameTournamentModeChanged(GameFlagPayload {
                game_id,
                enabled,
            })])
        })
        .await
    }

    /// Appoint or clear the referee. The referee must be a member.
    pub async fn set_referee(
        &self,
        game_id: GameId,
        caller: UserId,
        referee: Option<UserId>,
    ) -> Result<bool, EngineError> {
        self.mutate(game_id, |game| {
            require_authority(game, caller)?;
            if let Some(user_id) = referee {
                require_member(game, user_id)?;
            }
            if game.referee_id == referee {
                return Ok(Vec::new());
            }
            game.referee_id = referee;
            Ok(vec![ServerPacket::GameRefereeChanged(GameRefereePayload {
                game_id,
                user_id: referee,
            })])
        })
        .await
    }

    pub async fn set_difficulty_filter(
        &self,
        game_id: GameId,
        caller: UserId,
        min: f64,
        max: f64,
    ) -> Result<bool, EngineError> {
        let (min, max) =
            settings::ordered(settings::clamp_difficulty(min), settings::clamp_difficulty(max));
        self.mutate(game_id, |game| {
            require_authority(game, caller)?;
            if game.filters.min_difficulty == min && game.filters.max_difficulty == max {
                return Ok(Vec::new());
            }
            game.filters.min_difficulty = min;
            game.filters.max_difficulty = max;
            Ok(filters_changed(game_id, &game.filters))
        })
        .await
    }

    pub async fn set_max_song_length(
        &self,
        game_id: GameId,
        caller: UserId,
        seconds: i64,
    ) -> Result<bool, EngineError> {
        let seconds = settings::clamp_song_length(seconds);
        self.mutate(game_id, |game| {
            require_authority(game, caller)?;
            if game.filters.max_song_length == seconds {
                return Ok(Vec::new());
            }
            game.filters.max_song_length = seconds;
            Ok(filters_changed(game_id, &game.filters))
        })
        .await
    }

    pub async fn set_long_note_filter(
        &self,
        game_id: GameId,
        caller: UserId,
        min: i64,
        max: i64,
    ) -> Result<bool, EngineError> {
        let (min, max) = settings::ordered(
            settings::clamp_long_note_percent(min),
            settings::clamp_long_note_percent(max),
        );
        self.mutate(game_id, |game| {
            require_authority(game, caller)?;
            if game.filters.min_long_note_percent == min
                && game.filters.max_long_note_percent == max
            {
                return Ok(Vec::new());
            }
            game.filters.min_long_note_percent = min;
            game.filters.max_long_note_percent = max;
            Ok(filters_changed(game_id, &game.filters))
        })
        .await
    }

    pub async fn set_min_audio_rate(
        &self,
        game_id: GameId,
        caller: UserId,
        rate: f64,
    ) -> Result<bool, EngineError> {
        let rate = settings::clamp_audio_rate(rate);
        self.mutate(game_id, |game| {
            require_authority(game, caller)?;
            if game.filters.min_audio_rate == rate {
                return Ok(Vec::new());
            }
            game.filters.min_audio_rate = rate;
            Ok(filters_changed(game_id, &game.filters))
        })
        .await
    }

    pub async fn set_allowed_game_modes(
        &self,
        game_id: GameId,
        caller: UserId,
        modes: &[i32],
    ) -> Result<bool, EngineError> {
        let modes = settings::clamp_allowed_modes(modes);
        self.mutate(game_id, |game| {
            require_authority(game, caller)?;
            if game.filters.allowed_game_modes == modes {
                return Ok(Vec::new());
            }
            game.filters.allowed_game_modes = modes;
            Ok(filters_changed(game_id, &game.filters))
        })
        .await
    }

    /// Invite an online non-member. Only members may invite.
    pub async fn invite(
        &self,
        game_id: GameId,
        sender: UserId,
        target: UserId,
    ) -> Result<bool, EngineError> {
        let game_name = self
            .run_locked(game_id, |game| -> Result<Option<String>, EngineError> {
                require_member(game, sender)?;
                if game.is_member(target) {
                    return Ok(None);
                }
                Ok(Some(game.name.clone()))
            })
            .await
            .ok_or(EngineError::NotFound)??;

        let Some(game_name) = game_name else {
            return Ok(false);
        };
        let Some(session) = self.sessions.by_id(target).await else {
            return Ok(false);
        };
        let invite = ServerPacket::GameInvite(GameInvitePayload {
            game_id,
            game_name,
            sender_id: sender,
        });
        Ok(session.send(Arc::new(invite)))
    }
}
