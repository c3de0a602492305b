//! User identity anchor.
//!
//! Not itself part of the money model, but the foreign-key root for every
//! ledger and match entity. Users are never deleted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::UserId;

/// A registered user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    /// Unique platform handle.
    pub handle: String,
    /// Unique external game-identity tag. Required before joining a match.
    pub game_tag: Option<String>,
    /// Platform owner: may settle/cancel any match and grant roles.
    pub is_owner: bool,
    /// Referee: may create and settle matches it owns.
    pub is_referee: bool,
    pub created_at: DateTime<Utc>,
}

impl User {
    #[must_use]
    pub fn new(handle: impl Into<String>, game_tag: Option<String>) -> Self {
        Self {
            id: UserId::new(),
            handle: handle.into(),
            game_tag,
            is_owner: false,
            is_referee: false,
            created_at: Utc::now(),
        }
    }

    /// Whether this user may create or settle a match they referee.
    #[must_use]
    pub fn can_referee(&self) -> bool {
        self.is_referee || self.is_owner
    }
}

/// Test helpers. **Never use in production.**
#[cfg(any(test, feature = "test-helpers"))]
impl User {
    /// A registered player with a random handle and a linked game tag.
    pub fn dummy_player() -> Self {
        let nonce: u32 = rand::random();
        Self::new(format!("player_{nonce:08x}"), Some(format!("Tag#{nonce}")))
    }

    /// A referee with a random handle.
    pub fn dummy_referee() -> Self {
        let nonce: u32 = rand::random();
        let mut user = Self::new(format!("ref_{nonce:08x}"), None);
        user.is_referee = true;
        user
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_user_has_no_roles() {
        let user = User::new("ace", Some("Ace#123".into()));
        assert!(!user.is_owner);
        assert!(!user.is_referee);
        assert!(!user.can_referee());
    }

    #[test]
    fn owner_can_referee() {
        let mut user = User::new("boss", None);
        user.is_owner = true;
        assert!(user.can_referee());
    }

    #[test]
    fn dummy_player_has_game_tag() {
        let user = User::dummy_player();
        assert!(user.game_tag.is_some());
        assert!(!user.can_referee());
    }

    #[test]
    fn dummy_referee_can_referee() {
        assert!(User::dummy_referee().can_referee());
    }
}
