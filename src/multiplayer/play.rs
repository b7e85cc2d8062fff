use chrono::Utc;

use super::engine::{require_member, EngineError, MultiplayerEngine, Outcome};
use super::game::Game;
use crate::database::MatchScoreRecord;
use crate::protocol::messages::{GameEndedPayload, GameJudgementsPayload, GamePlayerPayload};
use crate::protocol::{GameId, PlayerScore, Ruleset, ServerPacket, Team, UserId};
use crate::scoring::Judgement;

/// Packets and score records produced when a match ends.
pub(super) struct Conclusion {
    pub(super) packets: Vec<ServerPacket>,
    pub(super) records: Vec<MatchScoreRecord>,
}

/// End the running match: award wins, reset per-match state and rotate the
/// host when rotation is enabled.
pub(super) fn conclude_match(game: &mut Game) -> Conclusion {
    let played_at = Utc::now();
    let scores: Vec<PlayerScore> = game
        .playing
        .iter()
        .filter_map(|user_id| {
            game.scores.get(user_id).map(|processor| PlayerScore {
                user_id: *user_id,
                team: game.team_of(*user_id),
                modifiers: processor.modifiers(),
                summary: processor.result(),
            })
        })
        .collect();

    let winners = match game.ruleset {
        Ruleset::FreeForAll => {
            let winner = best_player(&scores);
            if let Some(user_id) = winner {
                *game.player_wins.entry(user_id).or_insert(0) += 1;
            }
            winner.into_iter().collect::<Vec<_>>()
        }
        Ruleset::Team => match winning_team(&scores) {
            Some(Team::Red) => {
                game.red_team_wins += 1;
                members_of(&scores, Team::Red)
            }
            Some(Team::Blue) => {
                game.blue_team_wins += 1;
                members_of(&scores, Team::Blue)
            }
            None => Vec::new(),
        },
    };

    let records = scores
        .iter()
        .map(|score| MatchScoreRecord {
            game_id: game.id,
            user_id: score.user_id,
            map_md5: game.map.md5.clone(),
            modifiers: score.modifiers,
            team: score.team,
            accuracy: score.summary.accuracy,
            performance_rating: score.summary.performance_rating,
            max_combo: score.summary.max_combo,
            judgement_counts: score.summary.counts,
            won: winners.contains(&score.user_id),
            played_at,
        })
        .collect();

    game.in_progress = false;
    game.countdown_started_at = 0;
    game.playing.clear();
    game.finished.clear();
    game.scores.clear();
    game.players_ready.clear();

    let mut packets = vec![ServerPacket::GameEnded(GameEndedPayload {
        game_id: game.id,
        scores,
        player_wins: game.player_wins.clone(),
        red_team_wins: game.red_team_wins,
        blue_team_wins: game.blue_team_wins,
    })];

    if game.host_rotation {
        if let Some(next) = game.next_host_in_rotation() {
            game.host_id = next;
            packets.push(ServerPacket::GameHostChanged(GamePlayerPayload {
                game_id: game.id,
                user_id: next,
            }));
        }
    }

    Conclusion { packets, records }
}

/// Highest performance rating wins; the earlier roster position takes ties.
fn best_player(scores: &[PlayerScore]) -> Option<UserId> {
    let mut best: Option<&PlayerScore> = None;
    for score in scores {
        match best {
            Some(current)
                if score.summary.performance_rating <= current.summary.performance_rating => {}
            _ => best = Some(score),
        }
    }
    best.map(|score| score.user_id)
}

/// Team with the higher average performance rating. A team without players
/// loses to any team with players; equal averages produce no winner.
fn winning_team(scores: &[PlayerScore]) -> Option<Team> {
    let average = |team: Team| {
        let ratings: Vec<f64> = scores
            .iter()
            .filter(|score| score.team == Some(team))
            .map(|score| score.summary.performance_rating)
            .collect();
        if ratings.is_empty() {
            None
        } else {
            Some(ratings.iter().sum::<f64>() / ratings.len() as f64)
        }
    };

    match (average(Team::Red), average(Team::Blue)) {
        (Some(red), Some(blue)) if red > blue => Some(Team::Red),
        (Some(red), Some(blue)) if blue > red => Some(Team::Blue),
        (Some(_), None) => Some(Team::Red),
        (None, Some(_)) => Some(Team::Blue),
        _ => None,
    }
}

fn members_of(scores: &[PlayerScore], team: Team) -> Vec<UserId> {
    scores
        .iter()
        .filter(|score| score.team == Some(team))
        .map(|score| score.user_id)
        .collect()
}

impl MultiplayerEngine {
    /// Feed a batch of judgements into the caller's score processor and relay
    /// it to the rest of the roster.
    pub async fn submit_judgements(
        &self,
        game_id: GameId,
        user_id: UserId,
        judgements: Vec<Judgement>,
    ) -> Result<bool, EngineError> {
        if judgements.is_empty() {
            return Ok(false);
        }

        let outcome = self
            .run_locked(game_id, |game| -> Result<Option<Outcome>, EngineError> {
                require_member(game, user_id)?;
                if !game.in_progress || game.finished.contains(&user_id) {
                    return Ok(None);
                }
                let Some(processor) = game.scores.get_mut(&user_id) else {
                    return Ok(None);
                };
                processor.add_judgements(&judgements);
                tracing::trace!(
                    game_id,
                    user_id,
                    accuracy = processor.accuracy(),
                    combo = processor.combo(),
                    "Judgements applied"
                );
                let relayed = ServerPacket::GameJudgements(GameJudgementsPayload {
                    game_id,
                    user_id,
                    judgements,
                });
                Ok(Some(Outcome::quiet(game, vec![relayed]).except(user_id)))
            })
            .await
            .ok_or(EngineError::NotFound)??;

        match outcome {
            Some(outcome) => {
                self.publish(outcome).await;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Mark the caller as done with the current play. Ends the match once
    /// every playing member has finished.
    pub async fn player_finished(
        &self,
        game_id: GameId,
        user_id: UserId,
    ) -> Result<bool, EngineError> {
        let outcome = self
            .run_locked(game_id, |game| -> Result<Option<Outcome>, EngineError> {
                require_member(game, user_id)?;
                if !game.in_progress
                    || !game.playing.contains(&user_id)
                    || !game.finished.insert(user_id)
                {
                    return Ok(None);
                }

                let mut packets = vec![ServerPacket::GamePlayerFinished(GamePlayerPayload {
                    game_id,
                    user_id,
                })];
                if !game.all_playing_finished() {
                    return Ok(Some(Outcome::quiet(game, packets)));
                }

                let conclusion = conclude_match(game);
                packets.extend(conclusion.packets);
                Ok(Some(
                    Outcome::capture(game, packets).with_scores(conclusion.records),
                ))
            })
            .await
            .ok_or(EngineError::NotFound)??;

        match outcome {
            Some(outcome) => {
                if outcome.concluded {
                    tracing::info!(game_id, "Match finished");
                }
                self.publish(outcome).await;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
