//! Ad-hoc content search across every chat.

use crate::{conversation::ConversationStore, ids::ChatId, message::Message};

/// Messages in one chat that matched a search.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    /// Chat the messages belong to.
    pub chat_id: ChatId,
    /// Matching messages in chronological order.
    pub messages: Vec<Message>,
}

/// Case-insensitive substring search over non-deleted message bodies.
///
/// Returns `None` when `term` is empty or whitespace-only: no search was
/// performed, which callers must distinguish from `Some(vec![])` (searched,
/// nothing matched). Surrounding whitespace only decides blankness; a
/// non-blank term matches as typed, spaces included. Chats without matches
/// are omitted; the rest keep chat order, and messages keep log order.
pub fn search_all(store: &ConversationStore, term: &str) -> Option<Vec<SearchHit>> {
    if term.trim().is_empty() {
        return None;
    }
    let needle = term.to_lowercase();

    let hits = store
        .list_chats()
        .iter()
        .filter_map(|chat| {
            let messages: Vec<Message> = chat
                .messages
                .iter()
                .filter(|m| !m.deleted && m.body.to_lowercase().contains(&needle))
                .cloned()
                .collect();
            (!messages.is_empty()).then(|| SearchHit { chat_id: chat.id.clone(), messages })
        })
        .collect();

    Some(hits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{ids::UserId, operations};

    fn seeded() -> (ConversationStore, ChatId, ChatId) {
        let mut store = ConversationStore::new();
        let a = store.create_direct("1".into(), "6".into()).id.clone();
        let b = store.create_direct("2".into(), "6".into()).id.clone();
        let me = UserId::from("6");
        for (chat, body) in [(&a, "Hiking this weekend?"), (&b, "Files are ready"), (&a, "hiking boots")] {
            operations::send(&mut store, chat, &me, body, "09:00".into()).unwrap();
        }
        (store, a, b)
    }

    #[test]
    fn blank_term_is_no_search() {
        let (store, _, _) = seeded();
        assert_eq!(search_all(&store, ""), None);
        assert_eq!(search_all(&store, "   "), None);
    }

    #[test]
    fn no_match_is_empty_result() {
        let (store, _, _) = seeded();
        assert_eq!(search_all(&store, "xylophone"), Some(vec![]));
    }

    #[test]
    fn matches_ignore_case_and_keep_order() {
        let (store, a, _) = seeded();

        let hits = search_all(&store, "HIKING").unwrap();

        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].chat_id, a);
        let bodies: Vec<_> = hits[0].messages.iter().map(|m| m.body.as_str()).collect();
        assert_eq!(bodies, ["Hiking this weekend?", "hiking boots"]);
    }

    #[test]
    fn surrounding_spaces_are_part_of_the_term() {
        let mut store = ConversationStore::new();
        let chat = store.create_direct("1".into(), "6".into()).id.clone();
        let me = UserId::from("6");
        for body in ["see the", "another"] {
            operations::send(&mut store, &chat, &me, body, "09:00".into()).unwrap();
        }

        assert_eq!(search_all(&store, "the "), Some(vec![]));
        let hits = search_all(&store, " the").unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].messages[0].body, "see the");
    }

    #[test]
    fn tombstones_never_match() {
        let (mut store, _, b) = seeded();
        let id = store.find_chat(&b).unwrap().messages[0].id.clone();
        operations::soft_delete(&mut store, &b, &id).unwrap();

        assert_eq!(search_all(&store, "files"), Some(vec![]));
        assert_eq!(search_all(&store, "deleted"), Some(vec![]));
    }
}
