//! Chat state checks run between simulation steps.
//!
//! A [`wavetalk_core::ChatEngine`] is copied into an [`EngineSnapshot`]
//! (session user, selection, simulator target, users, chats and their logs)
//! and every registered [`Invariant`] inspects that copy. [`SimDriver`]
//! does this after each tick; scenario and property tests call it after
//! direct mutations.
//!
//! The standard set covers selection and simulator agreement, typing flags,
//! direct chat shape, reaction and tombstone hygiene, message id and
//! sequence ordering, and message authorship.
//!
//! [`SimDriver`]: crate::SimDriver
//!
//! # Usage
//!
//! ```ignore
//! let registry = InvariantRegistry::standard();
//! let snapshot = EngineSnapshot::from_engine(&engine);
//! registry.check_all(&snapshot)?;
//! ```

mod checks;
mod snapshot;

pub use checks::{
    DirectChatsHaveTwoParticipants, MessageIdsUnique, ReactionSetsNonEmpty, SelectedChatExists,
    SendersAreParticipants, SequencesIncreasing, SessionUserKnown, SimulatorFollowsSelection,
    TombstonesScrubbed, TypingOnlyInActiveChat,
};
pub use snapshot::{ChatSnapshot, EngineSnapshot, MessageSnapshot, UserSnapshot};

/// Outcome of one check.
pub type InvariantResult = Result<(), Violation>;

/// A failed check, naming the chat, message or user at fault.
#[derive(Debug, Clone)]
pub struct Violation {
    /// Check that failed.
    pub invariant: &'static str,
    /// Offending ids and the observed state.
    pub message: String,
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.invariant, self.message)
    }
}

impl std::error::Error for Violation {}

/// A property of chat state that holds between any two steps.
pub trait Invariant: Send + Sync {
    /// Snake-case name shown in failures.
    fn name(&self) -> &'static str;

    /// Inspect one snapshot.
    fn check(&self, state: &EngineSnapshot) -> InvariantResult;
}

/// Ordered set of checks applied to each snapshot.
pub struct InvariantRegistry {
    invariants: Vec<Box<dyn Invariant>>,
}

impl Default for InvariantRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl InvariantRegistry {
    /// Registry with no checks.
    pub fn new() -> Self {
        Self { invariants: Vec::new() }
    }

    /// Every chat state check, in the order failures are reported:
    /// - [`SelectedChatExists`]: selection never dangles
    /// - [`SimulatorFollowsSelection`]: timers only run for the selected chat
    /// - [`TypingOnlyInActiveChat`]: no stale typing flags
    /// - [`DirectChatsHaveTwoParticipants`]: direct chat shape
    /// - [`ReactionSetsNonEmpty`]: no empty reaction keys
    /// - [`TombstonesScrubbed`]: deleted bodies replaced
    /// - [`MessageIdsUnique`]: ids unique across chats
    /// - [`SequencesIncreasing`]: logs in chronological order
    /// - [`SendersAreParticipants`]: no messages from outsiders
    /// - [`SessionUserKnown`]: the session user exists
    pub fn standard() -> Self {
        let mut registry = Self::new();
        registry.add(SelectedChatExists);
        registry.add(SimulatorFollowsSelection);
        registry.add(TypingOnlyInActiveChat);
        registry.add(DirectChatsHaveTwoParticipants);
        registry.add(ReactionSetsNonEmpty);
        registry.add(TombstonesScrubbed);
        registry.add(MessageIdsUnique);
        registry.add(SequencesIncreasing);
        registry.add(SendersAreParticipants);
        registry.add(SessionUserKnown);
        registry
    }

    /// Register one more check.
    pub fn add<I: Invariant + 'static>(&mut self, invariant: I) {
        self.invariants.push(Box::new(invariant));
    }

    /// Run every check, collecting all failures rather than stopping at the
    /// first.
    pub fn check_all(&self, state: &EngineSnapshot) -> Result<(), Vec<Violation>> {
        let violations: Vec<_> =
            self.invariants.iter().filter_map(|inv| inv.check(state).err()).collect();

        if violations.is_empty() { Ok(()) } else { Err(violations) }
    }

    /// Like [`check_all`](Self::check_all) but panics, prefixing the report
    /// with `context` (for example "after tick 12").
    #[allow(clippy::panic)]
    pub fn assert_all(&self, state: &EngineSnapshot, context: &str) {
        if let Err(violations) = self.check_all(state) {
            let messages: Vec<_> = violations.iter().map(ToString::to_string).collect();
            panic!("chat state broken {context}:\n  {}", messages.join("\n  "));
        }
    }

    /// Number of checks.
    pub fn len(&self) -> usize {
        self.invariants.len()
    }

    /// True when no checks are registered.
    pub fn is_empty(&self) -> bool {
        self.invariants.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use wavetalk_core::{ChatEngine, Dataset, EngineConfig, MemoryStorage};

    use super::*;
    use crate::SimEnv;

    #[test]
    fn standard_registry_has_invariants() {
        let registry = InvariantRegistry::standard();
        assert_eq!(registry.len(), 10);
    }

    #[test]
    fn empty_snapshot_passes_invariants() {
        let registry = InvariantRegistry::standard();
        assert!(registry.check_all(&EngineSnapshot::empty()).is_ok());
    }

    #[test]
    fn demo_dataset_passes_invariants() {
        let engine = ChatEngine::new(SimEnv::new(), MemoryStorage::new(), EngineConfig::default(), Dataset::demo());
        InvariantRegistry::standard().assert_all(&EngineSnapshot::from_engine(&engine), "at startup");
    }
}
