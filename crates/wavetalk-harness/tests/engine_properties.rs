//! Property-based tests for the chat engine.
//!
//! Random operation sequences interleaved with virtual time. The standard
//! invariant registry runs after every operation and every tick.

use std::time::Duration;

use proptest::prelude::*;
use wavetalk_core::{
    ChatId, Credentials, Dataset, EngineConfig, EngineEvent, Presence, PresenceConfig, REACTION_PALETTE, UserId,
};
use wavetalk_harness::{InvariantRegistry, SimDriver};

/// One user-level step. Indices are resolved against the live state.
#[derive(Debug, Clone)]
enum Op {
    Login,
    Logout,
    Select(prop::sample::Index),
    ClearSelection,
    Send(prop::sample::Index, String),
    React(prop::sample::Index, prop::sample::Index, usize),
    Delete(prop::sample::Index, prop::sample::Index),
    MarkRead(prop::sample::Index),
    OpenDirect(u8),
    DeleteChat(prop::sample::Index),
    Presence(usize),
    Compose,
    Advance(u64),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        1 => Just(Op::Login),
        1 => Just(Op::Logout),
        3 => any::<prop::sample::Index>().prop_map(Op::Select),
        1 => Just(Op::ClearSelection),
        3 => (any::<prop::sample::Index>(), "[a-z ]{0,12}").prop_map(|(c, b)| Op::Send(c, b)),
        2 => (any::<prop::sample::Index>(), any::<prop::sample::Index>(), 0..REACTION_PALETTE.len())
            .prop_map(|(c, m, e)| Op::React(c, m, e)),
        1 => (any::<prop::sample::Index>(), any::<prop::sample::Index>()).prop_map(|(c, m)| Op::Delete(c, m)),
        1 => any::<prop::sample::Index>().prop_map(Op::MarkRead),
        1 => (1u8..=8).prop_map(Op::OpenDirect),
        1 => any::<prop::sample::Index>().prop_map(Op::DeleteChat),
        1 => (0..Presence::ALL.len()).prop_map(Op::Presence),
        1 => Just(Op::Compose),
        4 => (1u64..60).prop_map(Op::Advance),
    ]
}

fn chat_at(driver: &SimDriver, pick: &prop::sample::Index) -> Option<ChatId> {
    let chats = driver.engine().chats();
    (!chats.is_empty()).then(|| pick.get(chats).id.clone())
}

/// Apply an operation. Errors are expected for many random inputs; only the
/// invariants matter.
fn apply(driver: &mut SimDriver, op: &Op) {
    let me = driver.engine().current_user_id().cloned().unwrap_or_else(|| UserId::from("6"));
    match op {
        Op::Login => {
            let _ = driver.engine_mut().login(&Credentials::default());
        },
        Op::Logout => driver.engine_mut().logout(),
        Op::Select(pick) => {
            if let Some(chat) = chat_at(driver, pick) {
                let _ = driver.engine_mut().select_chat(&chat);
            }
        },
        Op::ClearSelection => driver.engine_mut().clear_selection(),
        Op::Send(pick, body) => {
            if let Some(chat) = chat_at(driver, pick) {
                let _ = driver.engine_mut().send(&chat, &me, body);
            }
        },
        Op::React(pick, message, emoji) => {
            if let Some(chat) = chat_at(driver, pick) {
                let ids: Vec<_> =
                    driver.engine().find_chat(&chat).map(|c| c.messages.iter().map(|m| m.id.clone()).collect()).unwrap_or_default();
                if !ids.is_empty() {
                    let id = message.get(&ids).clone();
                    let _ = driver.engine_mut().toggle_reaction(&chat, &id, REACTION_PALETTE[*emoji], &me);
                }
            }
        },
        Op::Delete(pick, message) => {
            if let Some(chat) = chat_at(driver, pick) {
                let ids: Vec<_> =
                    driver.engine().find_chat(&chat).map(|c| c.messages.iter().map(|m| m.id.clone()).collect()).unwrap_or_default();
                if !ids.is_empty() {
                    let id = message.get(&ids).clone();
                    let _ = driver.engine_mut().soft_delete(&chat, &id);
                }
            }
        },
        Op::MarkRead(pick) => {
            if let Some(chat) = chat_at(driver, pick) {
                let _ = driver.engine_mut().mark_all_read(&chat);
            }
        },
        Op::OpenDirect(user) => {
            let _ = driver.engine_mut().open_direct(&UserId::new(user.to_string()));
        },
        Op::DeleteChat(pick) => {
            if let Some(chat) = chat_at(driver, pick) {
                let _ = driver.engine_mut().delete_chat(&chat);
            }
        },
        Op::Presence(index) => {
            let _ = driver.engine_mut().update_presence(Presence::ALL[*index]);
        },
        Op::Compose => {
            let _ = driver.engine_mut().notify_composing();
        },
        Op::Advance(secs) => {
            driver.run_for(Duration::from_secs(*secs));
        },
    }
}

fn lively_config() -> EngineConfig {
    EngineConfig {
        presence: PresenceConfig { typing_probability: 0.7, inbound_probability: 0.6, ..PresenceConfig::default() },
        ..EngineConfig::default()
    }
}

proptest! {
    /// Engine invariants hold under arbitrary operation sequences.
    #[test]
    fn prop_engine_invariants_hold(seed in any::<u64>(), ops in prop::collection::vec(op_strategy(), 0..60)) {
        let mut driver = SimDriver::new(seed, lively_config(), Dataset::demo())
            .with_invariants(InvariantRegistry::standard());

        for op in &ops {
            apply(&mut driver, op);
            driver.check(&format!("after {op:?}"));
        }
    }

    /// Once the selection moves away from a chat, no simulated event targets
    /// it again.
    #[test]
    fn prop_no_synthetic_mutation_after_switch(
        seed in any::<u64>(),
        before in 0u64..120,
        after in 1u64..400,
        target in 1usize..4,
    ) {
        let config = EngineConfig { presence: PresenceConfig::always_fire(), ..EngineConfig::default() };
        let mut driver = SimDriver::new(seed, config, Dataset::demo())
            .with_invariants(InvariantRegistry::standard())
            .logged_in();
        driver.run_for(Duration::from_secs(before));

        let old = ChatId::from("chat1");
        let snapshot = driver.engine().find_chat(&old).cloned();
        let next = driver.engine().chats()[target].id.clone();
        driver.engine_mut().select_chat(&next).unwrap();
        driver.take_events();

        driver.run_for(Duration::from_secs(after));

        prop_assert_eq!(driver.engine().find_chat(&old).cloned(), snapshot);
        for event in driver.take_events() {
            match event {
                EngineEvent::MessageAppended { chat_id, .. } | EngineEvent::TypingChanged { chat_id, .. } => {
                    prop_assert_eq!(chat_id, next.clone());
                },
                _ => {},
            }
        }
    }

    /// The same seed and operations produce the same state.
    #[test]
    fn prop_simulation_is_deterministic(seed in any::<u64>(), ops in prop::collection::vec(op_strategy(), 0..30)) {
        let run = || {
            let mut driver = SimDriver::new(seed, lively_config(), Dataset::demo());
            for op in &ops {
                apply(&mut driver, op);
            }
            driver.engine().chats().to_vec()
        };

        prop_assert_eq!(run(), run());
    }
}
