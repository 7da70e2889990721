//! Observable state snapshots for invariant checking.
//!
//! Snapshots capture what a rendering layer could observe from a
//! [`ChatEngine`] at one point in time. Invariants operate on snapshots
//! rather than the live engine so every check sees the same state.

use wavetalk_core::{ChatEngine, ChatId, DELETED_PLACEHOLDER, Environment, MessageId, SessionStorage, UserId};

/// Snapshot of the whole engine.
#[derive(Debug, Clone, Default)]
pub struct EngineSnapshot {
    /// Logged-in user. `None` if anonymous.
    pub session_user: Option<UserId>,
    /// Selected chat. `None` if nothing is selected.
    pub selected: Option<ChatId>,
    /// Chat the presence simulator is armed for. `None` if disarmed.
    pub simulated: Option<ChatId>,
    /// All known users.
    pub users: Vec<UserSnapshot>,
    /// All chats in list order.
    pub chats: Vec<ChatSnapshot>,
}

impl EngineSnapshot {
    /// Snapshot with no users or chats.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Capture the observable state of `engine`.
    pub fn from_engine<E: Environment, S: SessionStorage>(engine: &ChatEngine<E, S>) -> Self {
        let users = engine
            .users()
            .map(|u| UserSnapshot { id: u.id.clone(), is_typing: u.is_typing })
            .collect();

        let chats = engine
            .chats()
            .iter()
            .map(|chat| ChatSnapshot {
                id: chat.id.clone(),
                is_group: chat.is_group(),
                participants: chat.participants.clone(),
                unread_count: chat.unread_count,
                messages: chat
                    .messages
                    .iter()
                    .map(|m| MessageSnapshot {
                        id: m.id.clone(),
                        sender_id: m.sender_id.clone(),
                        sequence: m.sequence,
                        read: m.read,
                        deleted: m.deleted,
                        shows_placeholder: m.body == DELETED_PLACEHOLDER,
                        reaction_sizes: m.reactions.iter().map(|(emoji, users)| (emoji.to_owned(), users.len())).collect(),
                    })
                    .collect(),
            })
            .collect();

        Self {
            session_user: engine.current_user_id().cloned(),
            selected: engine.conversations().selected().cloned(),
            simulated: engine.presence().active_chat().cloned(),
            users,
            chats,
        }
    }

    /// Look up a chat snapshot.
    pub fn chat(&self, id: &ChatId) -> Option<&ChatSnapshot> {
        self.chats.iter().find(|c| &c.id == id)
    }
}

/// Snapshot of one user.
#[derive(Debug, Clone)]
pub struct UserSnapshot {
    /// User id.
    pub id: UserId,
    /// Typing flag.
    pub is_typing: bool,
}

/// Snapshot of one chat.
#[derive(Debug, Clone)]
pub struct ChatSnapshot {
    /// Chat id.
    pub id: ChatId,
    /// Group or direct.
    pub is_group: bool,
    /// Participants in display order.
    pub participants: Vec<UserId>,
    /// Unread counter.
    pub unread_count: u32,
    /// Message log.
    pub messages: Vec<MessageSnapshot>,
}

/// Snapshot of one message.
#[derive(Debug, Clone)]
pub struct MessageSnapshot {
    /// Message id.
    pub id: MessageId,
    /// Author.
    pub sender_id: UserId,
    /// Store-wide sequence number.
    pub sequence: u64,
    /// Read flag.
    pub read: bool,
    /// Tombstone flag.
    pub deleted: bool,
    /// Whether the body is the deletion placeholder.
    pub shows_placeholder: bool,
    /// Number of users per reaction emoji.
    pub reaction_sizes: Vec<(String, usize)>,
}
