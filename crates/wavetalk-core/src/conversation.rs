//! Chats and the conversation store.
//!
//! The store exclusively owns every [`Chat`] and, through it, every
//! [`Message`]. Message logs are append-only: deletion is a tombstone on the
//! message, never a removal. Whole chats are the exception, since a chat is
//! not a shared record and [`ConversationStore::delete_chat`] removes it.

use serde::{Deserialize, Serialize};

use crate::{
    ids::{ChatId, MessageId, UserId},
    message::Message,
};

/// Direct or group conversation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ChatKind {
    /// Two-participant conversation.
    Direct,
    /// Named conversation with any number of participants.
    Group {
        /// Display name.
        name: String,
        /// Opaque avatar reference.
        avatar: String,
    },
}

/// A conversation and its message log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chat {
    /// Identifier.
    pub id: ChatId,
    /// Direct or group.
    pub kind: ChatKind,
    /// Participants in display order, without duplicates.
    pub participants: Vec<UserId>,
    /// Append-only log in chronological order.
    pub messages: Vec<Message>,
    /// Unread messages counted since the chat was last selected.
    pub unread_count: u32,
}

impl Chat {
    /// Direct chat between two users.
    pub fn direct(id: ChatId, a: UserId, b: UserId) -> Self {
        Self { id, kind: ChatKind::Direct, participants: vec![a, b], messages: Vec::new(), unread_count: 0 }
    }

    /// Group chat. Duplicate participants are dropped, keeping first position.
    pub fn group(id: ChatId, name: String, avatar: String, participants: Vec<UserId>) -> Self {
        let mut unique: Vec<UserId> = Vec::with_capacity(participants.len());
        for participant in participants {
            if !unique.contains(&participant) {
                unique.push(participant);
            }
        }
        Self {
            id,
            kind: ChatKind::Group { name, avatar },
            participants: unique,
            messages: Vec::new(),
            unread_count: 0,
        }
    }

    /// True for group chats.
    pub fn is_group(&self) -> bool {
        matches!(self.kind, ChatKind::Group { .. })
    }

    /// Group name. `None` for direct chats.
    pub fn group_name(&self) -> Option<&str> {
        match &self.kind {
            ChatKind::Group { name, .. } => Some(name),
            ChatKind::Direct => None,
        }
    }

    /// True if `user` participates.
    pub fn has_participant(&self, user: &UserId) -> bool {
        self.participants.contains(user)
    }

    /// Participants other than `me`, in display order.
    pub fn others<'a>(&'a self, me: &'a UserId) -> impl Iterator<Item = &'a UserId> + 'a {
        self.participants.iter().filter(move |p| *p != me)
    }

    /// True if this is a direct chat between exactly `a` and `b`.
    pub fn is_direct_between(&self, a: &UserId, b: &UserId) -> bool {
        !self.is_group()
            && self.participants.len() == 2
            && self.has_participant(a)
            && self.has_participant(b)
    }

    /// Look up a message.
    pub fn message(&self, id: &MessageId) -> Option<&Message> {
        self.messages.iter().find(|m| &m.id == id)
    }

    pub(crate) fn message_mut(&mut self, id: &MessageId) -> Option<&mut Message> {
        self.messages.iter_mut().find(|m| &m.id == id)
    }

    /// Most recent message, deleted or not.
    pub fn last_message(&self) -> Option<&Message> {
        self.messages.last()
    }
}

/// Owner of all chats plus the current selection.
#[derive(Debug, Clone, Default)]
pub struct ConversationStore {
    chats: Vec<Chat>,
    selected: Option<ChatId>,
    /// Last sequence number handed to a message.
    sequence: u64,
    next_chat: u64,
}

impl ConversationStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from existing chats, keeping their order.
    ///
    /// The sequence counter starts after the highest sequence already present.
    pub fn from_chats(chats: Vec<Chat>) -> Self {
        let sequence =
            chats.iter().flat_map(|c| c.messages.iter()).map(|m| m.sequence).max().unwrap_or(0);
        Self { chats, selected: None, sequence, next_chat: 0 }
    }

    /// Look up a chat.
    pub fn find_chat(&self, id: &ChatId) -> Option<&Chat> {
        self.chats.iter().find(|c| &c.id == id)
    }

    pub(crate) fn find_chat_mut(&mut self, id: &ChatId) -> Option<&mut Chat> {
        self.chats.iter_mut().find(|c| &c.id == id)
    }

    /// All chats in creation order.
    pub fn list_chats(&self) -> &[Chat] {
        &self.chats
    }

    /// Direct chat between `a` and `b`, created if none exists yet.
    pub fn create_direct(&mut self, a: UserId, b: UserId) -> &Chat {
        let index = match self.chats.iter().position(|c| c.is_direct_between(&a, &b)) {
            Some(index) => index,
            None => {
                let id = self.fresh_chat_id("chat");
                tracing::debug!(chat = %id, %a, %b, "Created direct chat");
                self.chats.push(Chat::direct(id, a, b));
                self.chats.len() - 1
            },
        };
        &self.chats[index]
    }

    /// New group chat.
    pub fn create_group(&mut self, name: String, avatar: String, members: Vec<UserId>) -> &Chat {
        let id = self.fresh_chat_id("group");
        tracing::debug!(chat = %id, %name, members = members.len(), "Created group chat");
        self.chats.push(Chat::group(id, name, avatar, members));
        let index = self.chats.len() - 1;
        &self.chats[index]
    }

    /// Remove a chat. Clears the selection if it pointed at it.
    ///
    /// Returns the removed chat. `None` if unknown.
    pub fn delete_chat(&mut self, id: &ChatId) -> Option<Chat> {
        let index = self.chats.iter().position(|c| &c.id == id)?;
        if self.selected.as_ref() == Some(id) {
            self.selected = None;
        }
        Some(self.chats.remove(index))
    }

    /// Currently selected chat id.
    pub fn selected(&self) -> Option<&ChatId> {
        self.selected.as_ref()
    }

    /// Currently selected chat.
    pub fn selected_chat(&self) -> Option<&Chat> {
        self.selected.as_ref().and_then(|id| self.find_chat(id))
    }

    /// Select a chat. Returns false (and keeps the old selection) if unknown.
    pub fn select(&mut self, id: &ChatId) -> bool {
        if self.find_chat(id).is_none() {
            return false;
        }
        self.selected = Some(id.clone());
        true
    }

    /// Clear the selection.
    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    /// Next message sequence number.
    pub(crate) fn next_sequence(&mut self) -> u64 {
        self.sequence += 1;
        self.sequence
    }

    /// Fresh message id, unique across all chats.
    pub(crate) fn fresh_message_id(&self, sequence: u64) -> MessageId {
        let mut candidate = MessageId::new(format!("msg-{sequence}"));
        let mut suffix = 0u32;
        while self.chats.iter().any(|c| c.message(&candidate).is_some()) {
            suffix += 1;
            candidate = MessageId::new(format!("msg-{sequence}-{suffix}"));
        }
        candidate
    }

    fn fresh_chat_id(&mut self, prefix: &str) -> ChatId {
        loop {
            self.next_chat += 1;
            let id = ChatId::new(format!("{prefix}-{}", self.next_chat));
            if self.find_chat(&id).is_none() {
                return id;
            }
        }
    }
}
