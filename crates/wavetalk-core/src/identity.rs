//! User records and the identity store.
//!
//! The store is a total mapping from [`UserId`] to [`User`]: lookups of
//! unknown ids return `None` and updates against them are no-ops. Users are
//! never removed; chats and messages reference them by id only.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::ids::UserId;

/// Presence state shown next to a user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Presence {
    /// Available.
    #[default]
    Online,
    /// Idle.
    Away,
    /// Do not disturb.
    Busy,
    /// Not connected.
    Offline,
}

impl Presence {
    /// All presence states in display order.
    pub const ALL: [Presence; 4] = [Self::Online, Self::Away, Self::Busy, Self::Offline];

    /// Lowercase label.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Online => "online",
            Self::Away => "away",
            Self::Busy => "busy",
            Self::Offline => "offline",
        }
    }

    /// Parse a lowercase label. `None` if unknown.
    pub fn parse(label: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.as_str().eq_ignore_ascii_case(label.trim()))
    }
}

/// Optional contact details.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContactInfo {
    /// Email address.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Phone number.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    /// Free-form location.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

/// A user known to the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    /// Stable identifier.
    pub id: UserId,
    /// Name shown in lists and headers.
    #[serde(rename = "name")]
    pub display_name: String,
    /// Opaque avatar reference.
    #[serde(rename = "avatar")]
    pub avatar_ref: String,
    /// Current presence.
    #[serde(rename = "status")]
    pub presence: Presence,
    /// "Last seen" label for users that are not online.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_active: Option<String>,
    /// Transient typing flag.
    #[serde(default)]
    pub is_typing: bool,
    /// Contact details.
    #[serde(flatten)]
    pub contact: ContactInfo,
    /// Whether the user is in the session user's contact list.
    #[serde(default)]
    pub is_contact: bool,
}

/// Fields supplied when creating a new contact.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserDraft {
    /// Name shown in lists and headers.
    pub display_name: String,
    /// Opaque avatar reference.
    pub avatar_ref: String,
    /// Initial presence.
    pub presence: Presence,
    /// Contact details.
    pub contact: ContactInfo,
}

/// Ordered mapping from id to user.
#[derive(Debug, Clone, Default)]
pub struct IdentityStore {
    users: HashMap<UserId, User>,
    /// Insertion order, for stable listings.
    order: Vec<UserId>,
    next_id: u64,
}

impl IdentityStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from existing records. Later duplicates replace earlier
    /// ones but keep the first position.
    pub fn from_users(users: impl IntoIterator<Item = User>) -> Self {
        let mut store = Self::new();
        for user in users {
            store.insert(user);
        }
        store
    }

    fn insert(&mut self, user: User) {
        if !self.users.contains_key(&user.id) {
            self.order.push(user.id.clone());
        }
        self.users.insert(user.id.clone(), user);
    }

    /// Look up a user. `None` if unknown.
    pub fn find_by_id(&self, id: &UserId) -> Option<&User> {
        self.users.get(id)
    }

    /// First user whose display name matches exactly.
    pub fn find_by_name(&self, name: &str) -> Option<&User> {
        self.users().find(|u| u.display_name == name)
    }

    /// First user whose contact email matches, ignoring ASCII case.
    pub fn find_by_email(&self, email: &str) -> Option<&User> {
        let email = email.trim();
        self.users()
            .find(|u| u.contact.email.as_deref().is_some_and(|e| e.eq_ignore_ascii_case(email)))
    }

    /// True if the id resolves.
    pub fn contains(&self, id: &UserId) -> bool {
        self.users.contains_key(id)
    }

    /// Users in insertion order.
    pub fn users(&self) -> impl Iterator<Item = &User> {
        self.order.iter().filter_map(|id| self.users.get(id))
    }

    /// Number of users.
    pub fn len(&self) -> usize {
        self.users.len()
    }

    /// True if there are no users.
    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    /// Set a user's presence. Returns false for unknown ids.
    pub fn update_status(&mut self, id: &UserId, presence: Presence) -> bool {
        self.users.get_mut(id).map(|u| u.presence = presence).is_some()
    }

    /// Set a user's contact flag. Returns false for unknown ids.
    pub fn set_contact(&mut self, id: &UserId, is_contact: bool) -> bool {
        self.users.get_mut(id).map(|u| u.is_contact = is_contact).is_some()
    }

    /// Set a user's typing flag. Returns false for unknown ids.
    pub fn set_typing(&mut self, id: &UserId, typing: bool) -> bool {
        self.users.get_mut(id).map(|u| u.is_typing = typing).is_some()
    }

    /// Create a contact with a fresh id.
    pub fn create(&mut self, draft: UserDraft) -> &User {
        let id = self.fresh_id();
        let user = User {
            id: id.clone(),
            display_name: draft.display_name,
            avatar_ref: draft.avatar_ref,
            presence: draft.presence,
            last_active: None,
            is_typing: false,
            contact: draft.contact,
            is_contact: true,
        };
        self.insert(user);
        &self.users[&id]
    }

    fn fresh_id(&mut self) -> UserId {
        loop {
            self.next_id += 1;
            let id = UserId::new(format!("user-{}", self.next_id));
            if !self.users.contains_key(&id) {
                return id;
            }
        }
    }
}
