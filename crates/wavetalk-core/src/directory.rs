//! Sidebar directory views: filtered user and chat listings.

use crate::{
    conversation::{Chat, ConversationStore},
    identity::{IdentityStore, User},
    ids::UserId,
};

/// Which sidebar tab is showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum DirectoryView {
    /// Direct conversations.
    #[default]
    Chats,
    /// Users flagged as contacts.
    Contacts,
    /// Group conversations.
    Groups,
}

impl DirectoryView {
    /// Parse a tab name, ignoring case.
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "chats" => Some(Self::Chats),
            "contacts" => Some(Self::Contacts),
            "groups" => Some(Self::Groups),
            _ => None,
        }
    }
}

fn matches(name: &str, needle: &str) -> bool {
    needle.is_empty() || name.to_lowercase().contains(needle)
}

/// Users other than `me` whose name contains `term`, ignoring case.
///
/// The Contacts view keeps only users flagged as contacts. With no session
/// user, nobody is excluded.
pub fn filter_users<'a>(
    identity: &'a IdentityStore,
    me: Option<&UserId>,
    term: &str,
    view: DirectoryView,
) -> Vec<&'a User> {
    let needle = term.trim().to_lowercase();
    identity
        .users()
        .filter(|u| Some(&u.id) != me)
        .filter(|u| view != DirectoryView::Contacts || u.is_contact)
        .filter(|u| matches(&u.display_name, &needle))
        .collect()
}

/// Chats listed under `view` whose title contains `term`, ignoring case.
///
/// Direct chats are titled by their counterpart's name, groups by their own
/// name. The Contacts view lists no chats.
pub fn filter_chats<'a>(
    conversations: &'a ConversationStore,
    identity: &IdentityStore,
    me: Option<&UserId>,
    term: &str,
    view: DirectoryView,
) -> Vec<&'a Chat> {
    let needle = term.trim().to_lowercase();
    conversations
        .list_chats()
        .iter()
        .filter(|chat| match view {
            DirectoryView::Chats => {
                !chat.is_group()
                    && chat
                        .participants
                        .iter()
                        .filter(|p| Some(*p) != me)
                        .filter_map(|id| identity.find_by_id(id))
                        .any(|u| matches(&u.display_name, &needle))
            },
            DirectoryView::Groups => chat.group_name().is_some_and(|name| matches(name, &needle)),
            DirectoryView::Contacts => false,
        })
        .collect()
}
