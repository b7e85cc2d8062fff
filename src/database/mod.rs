use crate::protocol::{GameId, Modifiers, Ruleset, Team, UserId};
use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};

/// Shell record written when a match is created.
#[derive(Debug, Clone, PartialEq)]
pub struct GameRecord {
    pub public_id: String,
    pub name: String,
    pub has_password: bool,
    pub max_players: i32,
    pub ruleset: Ruleset,
    pub map_md5: String,
    pub created_by: UserId,
    pub created_at: chrono::DateTime<chrono::Utc>,
}

/// One player's result in a finished match.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchScoreRecord {
    pub game_id: GameId,
    pub user_id: UserId,
    pub map_md5: String,
    pub modifiers: Modifiers,
    pub team: Option<Team>,
    pub accuracy: f64,
    pub performance_rating: f64,
    pub max_combo: u32,
    pub judgement_counts: [u32; 6],
    pub won: bool,
    pub played_at: chrono::DateTime<chrono::Utc>,
}

/// Storage boundary for match history
#[async_trait]
pub trait Persistence: Send + Sync {
    /// Initialize the backing store
    async fn initialize(&self) -> Result<()>;

    /// Persist a new match shell and return its numeric id
    async fn insert_game(&self, record: &GameRecord) -> Result<GameId>;

    /// Persist one player's final score for a match
    async fn insert_match_score(&self, record: &MatchScoreRecord) -> Result<()>;

    /// Health check
    async fn health_check(&self) -> bool;
}

/// Persistence configuration. Only the in-memory backend ships with the server.
#[derive(Debug, Clone, Default)]
pub enum PersistenceConfig {
    #[default]
    InMemory,
}

/// Create a persistence backend based on configuration
pub async fn create_persistence(config: PersistenceConfig) -> Result<Box<dyn Persistence>> {
    match config {
        PersistenceConfig::InMemory => Ok(Box::new(InMemoryPersistence::new())),
    }
}

/// Process-local store for single-instance deployments and tests
pub struct InMemoryPersistence {
    next_game_id: AtomicI64,
    games: tokio::sync::RwLock<HashMap<GameId, GameRecord>>,
    scores: tokio::sync::RwLock<Vec<MatchScoreRecord>>,
}

impl InMemoryPersistence {
    pub fn new() -> Self {
        Self {
            next_game_id: AtomicI64::new(1),
            games: tokio::sync::RwLock::new(HashMap::new()),
            scores: tokio::sync::RwLock::new(Vec::new()),
        }
    }

    pub async fn game(&self, game_id: GameId) -> Option<GameRecord> {
        self.games.read().await.get(&game_id).cloned()
    }

    pub async fn scores_for(&self, game_id: GameId) -> Vec<MatchScoreRecord> {
        self.scores
            .read()
            .await
            .iter()
            .filter(|record| record.game_id == game_id)
            .cloned()
            .collect()
    }
}

impl Default for InMemoryPersistence {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Persistence for InMemoryPersistence {
    async fn initialize(&self) -> Result<()> {
        Ok(())
    }

    async fn insert_game(&self, record: &GameRecord) -> Result<GameId> {
        let game_id = self.next_game_id.fetch_add(1, Ordering::Relaxed);
        self.games.write().await.insert(game_id, record.clone());
        Ok(game_id)
    }

    async fn insert_match_score(&self, record: &MatchScoreRecord) -> Result<()> {
        let games = self.games.read().await;
        if !games.contains_key(&record.game_id) {
            anyhow::bail!("game {} has no persisted record", record.game_id);
        }
        drop(games);
        self.scores.write().await.push(record.clone());
        Ok(())
    }

    async fn health_check(&self) -> bool {
        true
    }
}
