//! Message operations over the conversation store.
//!
//! Pure mutation functions: they validate their inputs against the store and
//! apply one change. Session gating lives in [`crate::ChatEngine`], which is
//! the only caller that knows who is logged in.

use crate::{
    conversation::{Chat, ConversationStore},
    error::{EngineError, EntityKind},
    ids::{ChatId, MessageId, UserId},
    message::{Message, ReactionChange, Reactions, quick_status_body},
};

fn chat_mut<'a>(
    store: &'a mut ConversationStore,
    chat_id: &ChatId,
) -> Result<&'a mut Chat, EngineError> {
    store.find_chat_mut(chat_id).ok_or_else(|| EngineError::not_found(EntityKind::Chat, chat_id))
}

/// Append a message to a chat's log.
///
/// The message starts unread with no reactions. `unread_count` is left alone:
/// the author has obviously seen their own message.
///
/// # Errors
///
/// - `NotFound` if the chat does not exist
/// - `InvalidState` if `body` is blank or `sender_id` is not a participant
pub fn send<'a>(
    store: &'a mut ConversationStore,
    chat_id: &ChatId,
    sender_id: &UserId,
    body: &str,
    created_at: String,
) -> Result<&'a Message, EngineError> {
    if body.trim().is_empty() {
        return Err(EngineError::invalid("message body is empty"));
    }

    let chat = store
        .find_chat(chat_id)
        .ok_or_else(|| EngineError::not_found(EntityKind::Chat, chat_id))?;
    if !chat.has_participant(sender_id) {
        return Err(EngineError::invalid(format!("{sender_id} is not a participant of {chat_id}")));
    }

    let sequence = store.next_sequence();
    let id = store.fresh_message_id(sequence);
    let chat = chat_mut(store, chat_id)?;
    chat.messages.push(Message {
        id,
        sender_id: sender_id.clone(),
        body: body.to_owned(),
        created_at,
        sequence,
        reactions: Reactions::new(),
        read: false,
        deleted: false,
    });

    let appended = chat.messages.len() - 1;
    Ok(&chat.messages[appended])
}

/// Append a message from another participant and count it as unread.
///
/// Uses the same path as [`send`], then bumps `unread_count` whether or not
/// the chat is selected. Selection only clears the count when it happens.
///
/// # Errors
///
/// Same as [`send`].
pub fn deliver_inbound<'a>(
    store: &'a mut ConversationStore,
    chat_id: &ChatId,
    sender_id: &UserId,
    body: &str,
    created_at: String,
) -> Result<&'a Message, EngineError> {
    let id = send(store, chat_id, sender_id, body, created_at)?.id.clone();
    let chat = chat_mut(store, chat_id)?;
    chat.unread_count = chat.unread_count.saturating_add(1);
    chat.message(&id).ok_or_else(|| EngineError::not_found(EntityKind::Message, &id))
}

/// Send a status line such as `"[Be right back]"`.
///
/// A content convention only: the message is stored like any other and the
/// rendering layer recognises it through [`Message::quick_status`].
///
/// # Errors
///
/// Same as [`send`], with `InvalidState` for a blank label.
pub fn send_quick_status<'a>(
    store: &'a mut ConversationStore,
    chat_id: &ChatId,
    sender_id: &UserId,
    label: &str,
    created_at: String,
) -> Result<&'a Message, EngineError> {
    let label = label.trim();
    if label.is_empty() {
        return Err(EngineError::invalid("status label is empty"));
    }
    send(store, chat_id, sender_id, &quick_status_body(label), created_at)
}

/// Toggle `actor_id`'s `emoji` reaction on a message.
///
/// Tombstoned messages keep their reactions frozen and report
/// [`ReactionChange::Unchanged`].
///
/// # Errors
///
/// - `NotFound` if the chat or message does not exist
/// - `InvalidState` if `emoji` is blank
pub fn toggle_reaction(
    store: &mut ConversationStore,
    chat_id: &ChatId,
    message_id: &MessageId,
    emoji: &str,
    actor_id: &UserId,
) -> Result<ReactionChange, EngineError> {
    if emoji.trim().is_empty() {
        return Err(EngineError::invalid("reaction emoji is empty"));
    }

    let message = chat_mut(store, chat_id)?
        .message_mut(message_id)
        .ok_or_else(|| EngineError::not_found(EntityKind::Message, message_id))?;

    if message.deleted {
        return Ok(ReactionChange::Unchanged);
    }
    Ok(message.reactions.toggle(emoji, actor_id))
}

/// Tombstone a message.
///
/// Returns false if it was already deleted.
///
/// # Errors
///
/// - `NotFound` if the chat or message does not exist
pub fn soft_delete(
    store: &mut ConversationStore,
    chat_id: &ChatId,
    message_id: &MessageId,
) -> Result<bool, EngineError> {
    let message = chat_mut(store, chat_id)?
        .message_mut(message_id)
        .ok_or_else(|| EngineError::not_found(EntityKind::Message, message_id))?;
    Ok(message.tombstone())
}

/// Mark every message read and reset the unread count.
///
/// Returns how many messages flipped from unread to read.
///
/// # Errors
///
/// - `NotFound` if the chat does not exist
pub fn mark_all_read(store: &mut ConversationStore, chat_id: &ChatId) -> Result<usize, EngineError> {
    let chat = chat_mut(store, chat_id)?;
    let mut flipped = 0;
    for message in chat.messages.iter_mut().filter(|m| !m.read) {
        message.read = true;
        flipped += 1;
    }
    chat.unread_count = 0;
    Ok(flipped)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::DELETED_PLACEHOLDER;

    fn uid(id: &str) -> UserId {
        UserId::from(id)
    }

    fn store_with_chat() -> (ConversationStore, ChatId) {
        let mut store = ConversationStore::new();
        let chat = store.create_direct(uid("1"), uid("2")).id.clone();
        (store, chat)
    }

    fn label() -> String {
        "10:00".to_owned()
    }

    #[test]
    fn send_appends_unread_without_touching_count() {
        let (mut store, chat) = store_with_chat();

        let message = send(&mut store, &chat, &uid("2"), "hi", label()).unwrap().clone();

        let stored = store.find_chat(&chat).unwrap();
        assert_eq!(stored.messages.len(), 1);
        assert_eq!(stored.unread_count, 0);
        assert!(!message.read);
        assert!(message.reactions.is_empty());
    }

    #[test]
    fn send_rejects_blank_body_and_strangers() {
        let (mut store, chat) = store_with_chat();

        assert!(matches!(
            send(&mut store, &chat, &uid("2"), "  \n", label()),
            Err(EngineError::InvalidState { .. })
        ));
        assert!(matches!(
            send(&mut store, &chat, &uid("9"), "hello", label()),
            Err(EngineError::InvalidState { .. })
        ));
        assert!(matches!(
            send(&mut store, &"missing".into(), &uid("2"), "hello", label()),
            Err(EngineError::NotFound { kind: EntityKind::Chat, .. })
        ));
        assert!(store.find_chat(&chat).unwrap().messages.is_empty());
    }

    #[test]
    fn sequences_increase_across_chats() {
        let mut store = ConversationStore::new();
        let a = store.create_direct(uid("1"), uid("2")).id.clone();
        let b = store.create_direct(uid("1"), uid("3")).id.clone();

        let first = send(&mut store, &a, &uid("1"), "one", label()).unwrap().sequence;
        let second = send(&mut store, &b, &uid("1"), "two", label()).unwrap().sequence;
        let third = send(&mut store, &a, &uid("2"), "three", label()).unwrap().sequence;

        assert!(first < second && second < third);
    }

    #[test]
    fn inbound_increments_unread() {
        let (mut store, chat) = store_with_chat();

        deliver_inbound(&mut store, &chat, &uid("1"), "ping", label()).unwrap();
        deliver_inbound(&mut store, &chat, &uid("1"), "ping again", label()).unwrap();

        assert_eq!(store.find_chat(&chat).unwrap().unread_count, 2);
    }

    #[test]
    fn quick_status_wraps_label() {
        let (mut store, chat) = store_with_chat();

        let message = send_quick_status(&mut store, &chat, &uid("2"), " Busy ", label()).unwrap();

        assert_eq!(message.body, "[Busy]");
        assert_eq!(message.quick_status(), Some("Busy"));
        assert!(send_quick_status(&mut store, &chat, &uid("2"), "", label()).is_err());
    }

    #[test]
    fn reactions_freeze_on_tombstone() {
        let (mut store, chat) = store_with_chat();
        let id = send(&mut store, &chat, &uid("1"), "hi", label()).unwrap().id.clone();

        toggle_reaction(&mut store, &chat, &id, "👍", &uid("2")).unwrap();
        assert!(soft_delete(&mut store, &chat, &id).unwrap());
        assert!(!soft_delete(&mut store, &chat, &id).unwrap());

        let change = toggle_reaction(&mut store, &chat, &id, "👍", &uid("2")).unwrap();
        assert_eq!(change, ReactionChange::Unchanged);

        let message = store.find_chat(&chat).unwrap().message(&id).unwrap();
        assert_eq!(message.body, DELETED_PLACEHOLDER);
        assert_eq!(message.reactions.count("👍"), 1);
    }

    #[test]
    fn toggle_unknown_message_is_not_found() {
        let (mut store, chat) = store_with_chat();

        let result = toggle_reaction(&mut store, &chat, &"nope".into(), "👍", &uid("2"));
        assert!(matches!(result, Err(EngineError::NotFound { kind: EntityKind::Message, .. })));
    }

    #[test]
    fn mark_all_read_resets_count() {
        let (mut store, chat) = store_with_chat();
        deliver_inbound(&mut store, &chat, &uid("1"), "a", label()).unwrap();
        deliver_inbound(&mut store, &chat, &uid("1"), "b", label()).unwrap();

        assert_eq!(mark_all_read(&mut store, &chat).unwrap(), 2);
        assert_eq!(mark_all_read(&mut store, &chat).unwrap(), 0);

        let stored = store.find_chat(&chat).unwrap();
        assert_eq!(stored.unread_count, 0);
        assert!(stored.messages.iter().all(|m| m.read));
    }
}
