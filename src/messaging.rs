//! Boundary with the text-chat subsystem. The engine only manages the
//! lifecycle of per-match channels.

use anyhow::Result;
use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::BTreeSet;

use crate::protocol::{GameId, UserId};

pub fn game_channel_name(game_id: GameId) -> String {
    format!("#multiplayer_{game_id}")
}

#[async_trait]
pub trait MessagingService: Send + Sync {
    async fn join_game_channel(&self, game_id: GameId, user_id: UserId) -> Result<()>;

    async fn leave_game_channel(&self, game_id: GameId, user_id: UserId) -> Result<()>;

    async fn remove_game_channel(&self, game_id: GameId) -> Result<()>;
}

/// Tracks channel membership locally without relaying any chat.
#[derive(Default)]
pub struct InMemoryMessaging {
    channels: DashMap<GameId, BTreeSet<UserId>>,
}

impl InMemoryMessaging {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn members(&self, game_id: GameId) -> Vec<UserId> {
        self.channels
            .get(&game_id)
            .map(|entry| entry.value().iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn has_channel(&self, game_id: GameId) -> bool {
        self.channels.contains_key(&game_id)
    }
}

#[async_trait]
impl MessagingService for InMemoryMessaging {
    async fn join_game_channel(&self, game_id: GameId, user_id: UserId) -> Result<()> {
        self.channels.entry(game_id).or_default().insert(user_id);
        tracing::debug!(channel = %game_channel_name(game_id), user_id, "Joined chat channel");
        Ok(())
    }

    async fn leave_game_channel(&self, game_id: GameId, user_id: UserId) -> Result<()> {
        if let Some(mut members) = self.channels.get_mut(&game_id) {
            members.remove(&user_id);
        }
        Ok(())
    }

    async fn remove_game_channel(&self, game_id: GameId) -> Result<()> {
        self.channels.remove(&game_id);
        Ok(())
    }
}
