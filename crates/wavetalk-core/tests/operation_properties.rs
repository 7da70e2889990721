//! Property tests for message operations.
//!
//! Each property starts from the demo dataset and applies randomly chosen
//! operations directly to the conversation store.

use proptest::prelude::*;
use wavetalk_core::{
    ChatId, ConversationStore, DELETED_PLACEHOLDER, Dataset, MessageId, REACTION_PALETTE, ReactionChange, UserId,
    operations, search,
};

fn demo_store() -> ConversationStore {
    ConversationStore::from_chats(Dataset::demo().chats)
}

/// Every `(chat, message)` pair in the store.
fn message_refs(store: &ConversationStore) -> Vec<(ChatId, MessageId)> {
    store
        .list_chats()
        .iter()
        .flat_map(|chat| chat.messages.iter().map(|m| (chat.id.clone(), m.id.clone())))
        .collect()
}

fn actor() -> impl Strategy<Value = UserId> {
    (1u8..=8).prop_map(|n| UserId::new(n.to_string()))
}

fn emoji() -> impl Strategy<Value = &'static str> {
    prop::sample::select(REACTION_PALETTE.to_vec())
}

proptest! {
    /// Toggling the same reaction twice restores the prior state exactly.
    #[test]
    fn prop_toggle_twice_is_identity(pick in any::<prop::sample::Index>(), emoji in emoji(), actor in actor()) {
        let mut store = demo_store();
        let refs = message_refs(&store);
        let (chat, message) = pick.get(&refs).clone();
        let before = store.find_chat(&chat).unwrap().message(&message).unwrap().reactions.clone();

        let first = operations::toggle_reaction(&mut store, &chat, &message, emoji, &actor).unwrap();
        let second = operations::toggle_reaction(&mut store, &chat, &message, emoji, &actor).unwrap();

        prop_assert_ne!(first, second);
        let after = &store.find_chat(&chat).unwrap().message(&message).unwrap().reactions;
        prop_assert_eq!(&before, after);
    }

    /// No sequence of toggles leaves an emoji with an empty user set.
    #[test]
    fn prop_reaction_keys_never_empty(
        toggles in prop::collection::vec((any::<prop::sample::Index>(), emoji(), actor()), 1..40),
    ) {
        let mut store = demo_store();
        let refs = message_refs(&store);

        for (pick, emoji, actor) in toggles {
            let (chat, message) = pick.get(&refs);
            operations::toggle_reaction(&mut store, chat, message, emoji, &actor).unwrap();
        }

        for chat in store.list_chats() {
            for message in &chat.messages {
                for (emoji, users) in message.reactions.iter() {
                    prop_assert!(!users.is_empty(), "{} on {} is empty", emoji, message.id);
                }
            }
        }
    }

    /// Soft delete is idempotent and freezes reactions.
    #[test]
    fn prop_soft_delete_idempotent(pick in any::<prop::sample::Index>(), emoji in emoji(), actor in actor()) {
        let mut store = demo_store();
        let refs = message_refs(&store);
        let (chat, message) = pick.get(&refs).clone();

        prop_assert!(operations::soft_delete(&mut store, &chat, &message).unwrap());
        let once = store.find_chat(&chat).unwrap().message(&message).unwrap().clone();
        prop_assert!(!operations::soft_delete(&mut store, &chat, &message).unwrap());

        let change = operations::toggle_reaction(&mut store, &chat, &message, emoji, &actor).unwrap();
        prop_assert_eq!(change, ReactionChange::Unchanged);

        let twice = store.find_chat(&chat).unwrap().message(&message).unwrap();
        prop_assert_eq!(&once, twice);
        prop_assert_eq!(twice.body.as_str(), DELETED_PLACEHOLDER);
    }

    /// After mark-all-read the count is zero and every message is read.
    #[test]
    fn prop_mark_all_read(chat_pick in any::<prop::sample::Index>(), inbound in 0usize..5) {
        let mut store = demo_store();
        let chats: Vec<ChatId> = store.list_chats().iter().map(|c| c.id.clone()).collect();
        let chat = chat_pick.get(&chats).clone();
        let sender = store.find_chat(&chat).unwrap().participants[0].clone();

        for n in 0..inbound {
            operations::deliver_inbound(&mut store, &chat, &sender, &format!("ping {n}"), "09:00".into()).unwrap();
        }
        operations::mark_all_read(&mut store, &chat).unwrap();

        let chat = store.find_chat(&chat).unwrap();
        prop_assert_eq!(chat.unread_count, 0);
        prop_assert!(chat.messages.iter().all(|m| m.read));
    }

    /// Search results never include tombstones, whatever was deleted.
    #[test]
    fn prop_search_excludes_tombstones(
        deletes in prop::collection::vec(any::<prop::sample::Index>(), 0..12),
        term in "[a-z]{1,3}",
    ) {
        let mut store = demo_store();
        let refs = message_refs(&store);
        for pick in deletes {
            let (chat, message) = pick.get(&refs);
            operations::soft_delete(&mut store, chat, message).unwrap();
        }

        let hits = search::search_all(&store, &term).unwrap();
        for hit in hits {
            prop_assert!(!hit.messages.is_empty());
            for message in hit.messages {
                prop_assert!(!message.deleted);
                prop_assert!(message.body.to_lowercase().contains(&term));
            }
        }
    }

    /// Blank terms never search.
    #[test]
    fn prop_blank_search_is_none(term in "[ \t\n]{0,6}") {
        prop_assert!(search::search_all(&demo_store(), &term).is_none());
    }
}

#[test]
fn toggling_thumbs_up_twice_removes_key() {
    let mut store = demo_store();
    let chat = ChatId::from("chat2");
    let message = MessageId::from("msg4");
    let me = UserId::from("6");

    let first = operations::toggle_reaction(&mut store, &chat, &message, "👍", &me).unwrap();
    let second = operations::toggle_reaction(&mut store, &chat, &message, "👍", &me).unwrap();

    assert_eq!((first, second), (ReactionChange::Added, ReactionChange::Removed));
    let reactions = &store.find_chat(&chat).unwrap().message(&message).unwrap().reactions;
    assert!(reactions.users("👍").is_none());
    assert!(reactions.is_empty());
}

#[test]
fn removing_last_reactor_drops_seeded_key() {
    let mut store = demo_store();
    let chat = ChatId::from("chat1");
    let message = MessageId::from("msg2");

    let change = operations::toggle_reaction(&mut store, &chat, &message, "👍", &UserId::from("1")).unwrap();

    assert_eq!(change, ReactionChange::Removed);
    assert!(store.find_chat(&chat).unwrap().message(&message).unwrap().reactions.is_empty());
}
