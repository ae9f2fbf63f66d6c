//! User registry: identity and isolation of per-user dosage data.
//!
//! The registry guarantees at least one user always exists and that the
//! current-user pointer is always valid. Colors and emojis are assigned
//! from fixed rotating palettes by user count at add time.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{User, UserUpdate};

/// Rotating color palette for new users
const USER_COLORS: [&str; 6] = [
    "#4ADE80", "#9B87F5", "#7E69AB", "#0EA5E9", "#D946EF", "#F97316",
];

/// Rotating emoji palette for new users
const USER_EMOJIS: [&str; 10] = ["👤", "👥", "🧑", "👩", "👨", "🧔", "👱", "👸", "🦸", "🦹"];

/// The set of tracked users and the active-user pointer
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UserRegistry {
    users: Vec<User>,
    current_id: Uuid,
}

impl Default for UserRegistry {
    fn default() -> Self {
        let user = User {
            id: Uuid::new_v4(),
            name: "User 1".into(),
            color: USER_COLORS[0].into(),
            emoji: USER_EMOJIS[0].into(),
        };
        let current_id = user.id;
        Self {
            users: vec![user],
            current_id,
        }
    }
}

impl UserRegistry {
    pub fn list(&self) -> &[User] {
        &self.users
    }

    pub fn current_id(&self) -> Uuid {
        self.current_id
    }

    /// The active user; the registry invariant makes this infallible
    pub fn current(&self) -> &User {
        self.users
            .iter()
            .find(|u| u.id == self.current_id)
            .unwrap_or(&self.users[0])
    }

    pub fn find(&self, id: Uuid) -> Option<&User> {
        self.users.iter().find(|u| u.id == id)
    }

    pub fn find_by_name(&self, name: &str) -> Option<&User> {
        self.users.iter().find(|u| u.name == name)
    }

    /// Switch the active user; returns false for an unknown id
    pub fn switch_to(&mut self, id: Uuid) -> bool {
        if self.users.iter().any(|u| u.id == id) {
            self.current_id = id;
            true
        } else {
            tracing::warn!("Cannot switch to unknown user {}", id);
            false
        }
    }

    /// Add a user and make them active
    ///
    /// Without a name, users are numbered; color and emoji come from the
    /// rotating palettes indexed by the current user count.
    pub fn add(&mut self, name: Option<String>) -> &User {
        let count = self.users.len();
        let user = User {
            id: Uuid::new_v4(),
            name: name.unwrap_or_else(|| format!("User {}", count + 1)),
            color: USER_COLORS[count % USER_COLORS.len()].into(),
            emoji: USER_EMOJIS[count % USER_EMOJIS.len()].into(),
        };
        tracing::info!("Added user {:?} ({})", user.name, user.id);
        self.current_id = user.id;
        self.users.push(user);
        self.users.last().expect("just pushed")
    }

    /// Remove a user; a no-op when they are the last one remaining
    ///
    /// Removing the active user switches to the first remaining one.
    /// Returns true when a user was removed.
    pub fn remove(&mut self, id: Uuid) -> bool {
        if self.users.len() <= 1 {
            tracing::warn!("Refusing to remove the last remaining user");
            return false;
        }
        let before = self.users.len();
        self.users.retain(|u| u.id != id);
        if self.users.len() == before {
            return false;
        }
        if self.current_id == id {
            self.current_id = self.users[0].id;
        }
        true
    }

    /// Apply a partial update to a user; unknown ids are a no-op
    pub fn update(&mut self, id: Uuid, update: UserUpdate) {
        let Some(user) = self.users.iter_mut().find(|u| u.id == id) else {
            tracing::warn!("Cannot update unknown user {}", id);
            return;
        };
        if let Some(name) = update.name {
            user.name = name;
        }
        if let Some(color) = update.color {
            user.color = color;
        }
        if let Some(emoji) = update.emoji {
            user.emoji = emoji;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_registry_has_one_active_user() {
        let registry = UserRegistry::default();
        assert_eq!(registry.list().len(), 1);
        assert_eq!(registry.current().name, "User 1");
        assert_eq!(registry.current().color, USER_COLORS[0]);
    }

    #[test]
    fn add_assigns_palette_by_count_and_activates() {
        let mut registry = UserRegistry::default();
        let second = registry.add(None).clone();

        assert_eq!(second.name, "User 2");
        assert_eq!(second.color, USER_COLORS[1]);
        assert_eq!(second.emoji, USER_EMOJIS[1]);
        assert_eq!(registry.current_id(), second.id);
    }

    #[test]
    fn palettes_rotate_past_their_length() {
        let mut registry = UserRegistry::default();
        for _ in 0..6 {
            registry.add(None);
        }
        // Seventh user wraps the 6-entry color palette
        let seventh = registry.list().last().unwrap();
        assert_eq!(seventh.color, USER_COLORS[0]);
        assert_eq!(seventh.emoji, USER_EMOJIS[6]);
    }

    #[test]
    fn removing_last_user_is_a_noop() {
        let mut registry = UserRegistry::default();
        let only = registry.current_id();
        assert!(!registry.remove(only));
        assert_eq!(registry.list().len(), 1);
    }

    #[test]
    fn removing_active_user_switches_to_first_remaining() {
        let mut registry = UserRegistry::default();
        let first = registry.current_id();
        let second = registry.add(None).id;

        assert_eq!(registry.current_id(), second);
        assert!(registry.remove(second));
        assert_eq!(registry.current_id(), first);
        assert_eq!(registry.list().len(), 1);
    }

    #[test]
    fn switch_to_unknown_user_is_rejected() {
        let mut registry = UserRegistry::default();
        let original = registry.current_id();
        assert!(!registry.switch_to(Uuid::new_v4()));
        assert_eq!(registry.current_id(), original);
    }

    #[test]
    fn update_renames_in_place() {
        let mut registry = UserRegistry::default();
        let id = registry.current_id();
        registry.update(
            id,
            UserUpdate {
                name: Some("Alex".into()),
                ..Default::default()
            },
        );
        assert_eq!(registry.current().name, "Alex");
    }
}
