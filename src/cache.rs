//! Cross-process mirror of read-mostly match state.
//!
//! The in-memory engine stays authoritative. Mirror writes are best effort
//! and a missing or stale entry never affects engine behaviour.

use anyhow::Result;
use async_trait::async_trait;
use dashmap::DashMap;

/// Flattened `(field, value)` list stored under one key.
pub type MirrorFields = Vec<(String, String)>;

pub fn game_key(public_id: &str) -> String {
    format!("multiplayer:games:{public_id}")
}

#[async_trait]
pub trait GameStateMirror: Send + Sync {
    /// Replace the stored fields for one match.
    async fn mirror(&self, public_id: &str, fields: MirrorFields) -> Result<()>;

    /// Drop the entry of a disbanded match.
    async fn remove(&self, public_id: &str) -> Result<()>;
}

/// Process-local mirror used when no external cache is configured.
#[derive(Default)]
pub struct InMemoryGameStateMirror {
    entries: DashMap<String, MirrorFields>,
}

impl InMemoryGameStateMirror {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, public_id: &str) -> Option<MirrorFields> {
        self.entries
            .get(&game_key(public_id))
            .map(|entry| entry.value().clone())
    }

    pub fn field(&self, public_id: &str, name: &str) -> Option<String> {
        self.entries.get(&game_key(public_id)).and_then(|entry| {
            entry
                .value()
                .iter()
                .find(|(field, _)| field == name)
                .map(|(_, value)| value.clone())
        })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[async_trait]
impl GameStateMirror for InMemoryGameStateMirror {
    async fn mirror(&self, public_id: &str, fields: MirrorFields) -> Result<()> {
        self.entries.insert(game_key(public_id), fields);
        Ok(())
    }

    async fn remove(&self, public_id: &str) -> Result<()> {
        self.entries.remove(&game_key(public_id));
        Ok(())
    }
}
