//! Standard invariant checks.
//!
//! These capture properties of the chat state that must hold after every
//! operation and every tick, whatever sequence led there.

use std::collections::HashSet;

use super::{EngineSnapshot, Invariant, InvariantResult, Violation};

fn violation(invariant: &'static str, message: String) -> InvariantResult {
    Err(Violation { invariant, message })
}

/// The selected chat must exist.
///
/// Deleting the selected chat clears the selection, so a dangling selection
/// means a delete path forgot to.
pub struct SelectedChatExists;

impl Invariant for SelectedChatExists {
    fn name(&self) -> &'static str {
        "selected_chat_exists"
    }

    fn check(&self, state: &EngineSnapshot) -> InvariantResult {
        match &state.selected {
            Some(selected) if state.chat(selected).is_none() => {
                violation(self.name(), format!("selected chat {selected} does not exist"))
            },
            _ => Ok(()),
        }
    }
}

/// The simulator is armed for the selected chat, and only while logged in.
pub struct SimulatorFollowsSelection;

impl Invariant for SimulatorFollowsSelection {
    fn name(&self) -> &'static str {
        "simulator_follows_selection"
    }

    fn check(&self, state: &EngineSnapshot) -> InvariantResult {
        let Some(simulated) = &state.simulated else {
            return Ok(());
        };
        if state.session_user.is_none() {
            return violation(self.name(), format!("simulator armed for {simulated} without a session"));
        }
        if state.selected.as_ref() != Some(simulated) {
            return violation(
                self.name(),
                format!("simulator armed for {simulated} but selection is {:?}", state.selected),
            );
        }
        Ok(())
    }
}

/// Only counterparts in the simulated chat may be typing.
///
/// Every arm or disarm clears the flag it raised, so a typing user outside
/// the active chat means a stale timer leaked through.
pub struct TypingOnlyInActiveChat;

impl Invariant for TypingOnlyInActiveChat {
    fn name(&self) -> &'static str {
        "typing_only_in_active_chat"
    }

    fn check(&self, state: &EngineSnapshot) -> InvariantResult {
        let participants: HashSet<_> = state
            .simulated
            .as_ref()
            .and_then(|id| state.chat(id))
            .map(|chat| chat.participants.iter().collect())
            .unwrap_or_default();

        for user in state.users.iter().filter(|u| u.is_typing) {
            if state.session_user.as_ref() == Some(&user.id) {
                return violation(self.name(), format!("session user {} flagged typing", user.id));
            }
            if !participants.contains(&user.id) {
                return violation(
                    self.name(),
                    format!("{} typing outside the active chat {:?}", user.id, state.simulated),
                );
            }
        }
        Ok(())
    }
}

/// Direct chats have exactly two distinct participants.
pub struct DirectChatsHaveTwoParticipants;

impl Invariant for DirectChatsHaveTwoParticipants {
    fn name(&self) -> &'static str {
        "direct_chats_have_two_participants"
    }

    fn check(&self, state: &EngineSnapshot) -> InvariantResult {
        for chat in state.chats.iter().filter(|c| !c.is_group) {
            let distinct: HashSet<_> = chat.participants.iter().collect();
            if chat.participants.len() != 2 || distinct.len() != 2 {
                return violation(
                    self.name(),
                    format!("direct chat {} has participants {:?}", chat.id, chat.participants),
                );
            }
        }
        Ok(())
    }
}

/// No reaction emoji maps to an empty user set.
pub struct ReactionSetsNonEmpty;

impl Invariant for ReactionSetsNonEmpty {
    fn name(&self) -> &'static str {
        "reaction_sets_non_empty"
    }

    fn check(&self, state: &EngineSnapshot) -> InvariantResult {
        for chat in &state.chats {
            for message in &chat.messages {
                if let Some((emoji, _)) = message.reaction_sizes.iter().find(|(_, n)| *n == 0) {
                    return violation(
                        self.name(),
                        format!("chat {} message {}: empty set for {emoji}", chat.id, message.id),
                    );
                }
            }
        }
        Ok(())
    }
}

/// A message shows the deletion placeholder exactly when it is tombstoned.
pub struct TombstonesScrubbed;

impl Invariant for TombstonesScrubbed {
    fn name(&self) -> &'static str {
        "tombstones_scrubbed"
    }

    fn check(&self, state: &EngineSnapshot) -> InvariantResult {
        for chat in &state.chats {
            for message in &chat.messages {
                if message.deleted && !message.shows_placeholder {
                    return violation(
                        self.name(),
                        format!("chat {} message {} deleted but body kept", chat.id, message.id),
                    );
                }
            }
        }
        Ok(())
    }
}

/// Message ids are unique across all chats.
pub struct MessageIdsUnique;

impl Invariant for MessageIdsUnique {
    fn name(&self) -> &'static str {
        "message_ids_unique"
    }

    fn check(&self, state: &EngineSnapshot) -> InvariantResult {
        let mut seen = HashSet::new();
        for chat in &state.chats {
            for message in &chat.messages {
                if !seen.insert(&message.id) {
                    return violation(self.name(), format!("duplicate message id {}", message.id));
                }
            }
        }
        Ok(())
    }
}

/// Sequence numbers strictly increase along each chat's log.
pub struct SequencesIncreasing;

impl Invariant for SequencesIncreasing {
    fn name(&self) -> &'static str {
        "sequences_increasing"
    }

    fn check(&self, state: &EngineSnapshot) -> InvariantResult {
        for chat in &state.chats {
            for window in chat.messages.windows(2) {
                if window[1].sequence <= window[0].sequence {
                    return violation(
                        self.name(),
                        format!(
                            "chat {}: sequence {} follows {}",
                            chat.id, window[1].sequence, window[0].sequence
                        ),
                    );
                }
            }
        }
        Ok(())
    }
}

/// Messages are authored by participants of their chat.
pub struct SendersAreParticipants;

impl Invariant for SendersAreParticipants {
    fn name(&self) -> &'static str {
        "senders_are_participants"
    }

    fn check(&self, state: &EngineSnapshot) -> InvariantResult {
        for chat in &state.chats {
            if let Some(message) = chat.messages.iter().find(|m| !chat.participants.contains(&m.sender_id)) {
                return violation(
                    self.name(),
                    format!("chat {} message {} from outsider {}", chat.id, message.id, message.sender_id),
                );
            }
        }
        Ok(())
    }
}

/// The session user resolves in the identity store.
pub struct SessionUserKnown;

impl Invariant for SessionUserKnown {
    fn name(&self) -> &'static str {
        "session_user_known"
    }

    fn check(&self, state: &EngineSnapshot) -> InvariantResult {
        match &state.session_user {
            Some(user) if !state.users.iter().any(|u| &u.id == user) => {
                violation(self.name(), format!("session user {user} unknown"))
            },
            _ => Ok(()),
        }
    }
}
