use std::collections::BTreeSet;

use tokio::sync::RwLock;

use crate::protocol::UserId;

/// Users currently browsing the match list, outside any specific game.
#[derive(Default)]
pub struct LobbyRegistry {
    members: RwLock<BTreeSet<UserId>>,
}

impl LobbyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns true if the user was not already in the lobby.
    pub async fn join(&self, user_id: UserId) -> bool {
        self.members.write().await.insert(user_id)
    }

    /// Returns true if the user was in the lobby.
    pub async fn leave(&self, user_id: UserId) -> bool {
        self.members.write().await.remove(&user_id)
    }

    pub async fn contains(&self, user_id: UserId) -> bool {
        self.members.read().await.contains(&user_id)
    }

    pub async fn members(&self) -> Vec<UserId> {
        self.members.read().await.iter().copied().collect()
    }

    pub async fn len(&self) -> usize {
        self.members.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.members.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn join_and_leave_report_membership_changes() {
        let lobby = LobbyRegistry::new();
        assert!(lobby.join(3).await);
        assert!(!lobby.join(3).await);
        assert!(lobby.join(1).await);
        assert_eq!(lobby.members().await, vec![1, 3]);
        assert!(lobby.contains(3).await);

        assert!(lobby.leave(3).await);
        assert!(!lobby.leave(3).await);
        assert_eq!(lobby.len().await, 1);
        assert!(!lobby.is_empty().await);
    }
}
