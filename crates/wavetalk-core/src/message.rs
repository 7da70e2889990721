//! Messages and their reaction sets.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Deserializer, Serialize};

use crate::ids::{MessageId, UserId};

/// Body that replaces the content of a soft-deleted message.
pub const DELETED_PLACEHOLDER: &str = "This message was deleted";

/// Outcome of [`Reactions::toggle`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReactionChange {
    /// The actor was added to the emoji's set.
    Added,
    /// The actor was removed from the emoji's set.
    Removed,
    /// Nothing changed (the message is a tombstone).
    Unchanged,
}

/// Set-valued map from emoji to the users who reacted with it.
///
/// # Invariants
///
/// - Each user appears at most once per emoji.
/// - No emoji maps to an empty set.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Reactions(BTreeMap<String, BTreeSet<UserId>>);

impl Reactions {
    /// Empty reaction map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `(emoji, users)` pairs, dropping empty sets.
    pub fn from_pairs<I, U>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (String, U)>,
        U: IntoIterator<Item = UserId>,
    {
        let mut map = BTreeMap::new();
        for (emoji, users) in pairs {
            let set: &mut BTreeSet<UserId> = map.entry(emoji).or_default();
            set.extend(users);
        }
        map.retain(|_, users: &mut BTreeSet<UserId>| !users.is_empty());
        Self(map)
    }

    /// Add `actor` to `emoji` if absent, remove it if present.
    ///
    /// Removing the last actor removes the emoji key.
    pub fn toggle(&mut self, emoji: &str, actor: &UserId) -> ReactionChange {
        let Some(users) = self.0.get_mut(emoji) else {
            self.0.insert(emoji.to_owned(), BTreeSet::from([actor.clone()]));
            return ReactionChange::Added;
        };

        if users.insert(actor.clone()) {
            return ReactionChange::Added;
        }

        users.remove(actor);
        if users.is_empty() {
            self.0.remove(emoji);
        }
        ReactionChange::Removed
    }

    /// Users who reacted with `emoji`. `None` if nobody did.
    pub fn users(&self, emoji: &str) -> Option<&BTreeSet<UserId>> {
        self.0.get(emoji)
    }

    /// True if `actor` reacted with `emoji`.
    pub fn contains(&self, emoji: &str, actor: &UserId) -> bool {
        self.0.get(emoji).is_some_and(|users| users.contains(actor))
    }

    /// Number of users who reacted with `emoji`.
    pub fn count(&self, emoji: &str) -> usize {
        self.0.get(emoji).map_or(0, BTreeSet::len)
    }

    /// `(emoji, users)` pairs in emoji order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &BTreeSet<UserId>)> {
        self.0.iter().map(|(emoji, users)| (emoji.as_str(), users))
    }

    /// True if nobody reacted.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'de> Deserialize<'de> for Reactions {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = BTreeMap::<String, Vec<UserId>>::deserialize(deserializer)?;
        Ok(Self::from_pairs(raw))
    }
}

/// A single entry in a chat's message log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// Identifier, unique within the store.
    pub id: MessageId,
    /// Author.
    pub sender_id: UserId,
    /// Text content, or [`DELETED_PLACEHOLDER`] once deleted.
    #[serde(rename = "content")]
    pub body: String,
    /// Human-readable time label.
    #[serde(rename = "timestamp")]
    pub created_at: String,
    /// Store-wide ordering key. Strictly increasing in append order.
    pub sequence: u64,
    /// Reactions keyed by emoji.
    pub reactions: Reactions,
    /// Whether the message has been seen.
    #[serde(rename = "isRead")]
    pub read: bool,
    /// Soft-delete tombstone.
    #[serde(default)]
    pub deleted: bool,
}

impl Message {
    /// Label carried by a quick status message (`"[label]"`). `None` for
    /// ordinary text.
    pub fn quick_status(&self) -> Option<&str> {
        if self.deleted {
            return None;
        }
        self.body
            .strip_prefix('[')
            .and_then(|rest| rest.strip_suffix(']'))
            .filter(|label| !label.is_empty())
    }

    /// Replace content with the placeholder. Returns false if already deleted.
    pub(crate) fn tombstone(&mut self) -> bool {
        if self.deleted {
            return false;
        }
        self.deleted = true;
        DELETED_PLACEHOLDER.clone_into(&mut self.body);
        true
    }
}

/// Wraps a label in the quick status delimiters.
pub(crate) fn quick_status_body(label: &str) -> String {
    format!("[{label}]")
}
