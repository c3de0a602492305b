//! User registration and role grants.
//!
//! The identity/session provider upstream is trusted to authenticate; this
//! directory only anchors ids, enforces handle/game-tag uniqueness, and
//! holds the role flags the match engine checks for authorization.

use std::collections::HashMap;

use wagerbook_types::{Result, User, UserId, WagerbookError};

/// In-process registry of registered users.
#[derive(Debug, Default)]
pub struct UserDirectory {
    users: HashMap<UserId, User>,
    by_handle: HashMap<String, UserId>,
    by_game_tag: HashMap<String, UserId>,
}

impl UserDirectory {
    /// Create a new empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self {
            users: HashMap::new(),
            by_handle: HashMap::new(),
            by_game_tag: HashMap::new(),
        }
    }

    /// Register a new user.
    ///
    /// # Errors
    /// - `HandleTaken` if the handle is already registered
    /// - `GameTagTaken` if the game tag is already linked to another user
    pub fn register(&mut self, handle: &str, game_tag: Option<&str>) -> Result<UserId> {
        if self.by_handle.contains_key(handle) {
            return Err(WagerbookError::HandleTaken(handle.to_string()));
        }
        if let Some(tag) = game_tag {
            if self.by_game_tag.contains_key(tag) {
                return Err(WagerbookError::GameTagTaken(tag.to_string()));
            }
        }

        let user = User::new(handle, game_tag.map(String::from));
        let id = user.id;
        self.by_handle.insert(handle.to_string(), id);
        if let Some(tag) = game_tag {
            self.by_game_tag.insert(tag.to_string(), id);
        }
        self.users.insert(id, user);
        tracing::info!(user = %id, handle, "user registered");
        Ok(id)
    }

    /// Link or replace a user's game identity tag.
    ///
    /// # Errors
    /// - `UserNotFound` if the user does not exist
    /// - `GameTagTaken` if the tag belongs to another user
    pub fn set_game_tag(&mut self, user_id: UserId, game_tag: &str) -> Result<()> {
        match self.by_game_tag.get(game_tag) {
            Some(owner) if *owner != user_id => {
                return Err(WagerbookError::GameTagTaken(game_tag.to_string()));
            }
            _ => {}
        }
        let user = self
            .users
            .get_mut(&user_id)
            .ok_or(WagerbookError::UserNotFound(user_id))?;
        if let Some(old) = user.game_tag.take() {
            self.by_game_tag.remove(&old);
        }
        user.game_tag = Some(game_tag.to_string());
        self.by_game_tag.insert(game_tag.to_string(), user_id);
        Ok(())
    }

    /// Grant the referee role. Owner-only upstream.
    ///
    /// # Errors
    /// Returns `UserNotFound` if the user does not exist.
    pub fn grant_referee(&mut self, user_id: UserId) -> Result<()> {
        let user = self
            .users
            .get_mut(&user_id)
            .ok_or(WagerbookError::UserNotFound(user_id))?;
        user.is_referee = true;
        tracing::info!(user = %user_id, "referee role granted");
        Ok(())
    }

    /// Grant the owner role.
    ///
    /// # Errors
    /// Returns `UserNotFound` if the user does not exist.
    pub fn grant_owner(&mut self, user_id: UserId) -> Result<()> {
        let user = self
            .users
            .get_mut(&user_id)
            .ok_or(WagerbookError::UserNotFound(user_id))?;
        user.is_owner = true;
        Ok(())
    }

    /// Look up a user by id.
    ///
    /// # Errors
    /// Returns `UserNotFound` if the user does not exist.
    pub fn get(&self, user_id: UserId) -> Result<&User> {
        self.users
            .get(&user_id)
            .ok_or(WagerbookError::UserNotFound(user_id))
    }

    /// Look up a user by handle.
    #[must_use]
    pub fn by_handle(&self, handle: &str) -> Option<&User> {
        self.by_handle.get(handle).and_then(|id| self.users.get(id))
    }

    /// Number of registered users.
    #[must_use]
    pub fn len(&self) -> usize {
        self.users.len()
    }

    /// Whether no users are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}
