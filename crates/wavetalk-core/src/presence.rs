//! Presence simulator.
//!
//! Fabricates a live counterpart for the active chat: a typing ticker that
//! raises and later clears a typing flag, and an inbound ticker that
//! occasionally delivers a canned message.
//!
//! Uses the action pattern: the simulator takes time as input and returns
//! [`PresenceAction`]s that the engine applies. It never touches the stores
//! itself, which keeps it deterministic under a virtual clock.
//!
//! # Cancellation
//!
//! The simulator is told the active chat on every switch. [`arm`] always
//! cancels the previous tickers before scheduling new ones, and [`disarm`]
//! cancels without rescheduling, so at most one instance of each ticker
//! exists. Every arm/disarm bumps [`generation`]; a driver holding a deadline
//! from an older generation just finds nothing due when it wakes.
//!
//! [`arm`]: PresenceSimulator::arm
//! [`disarm`]: PresenceSimulator::disarm
//! [`generation`]: PresenceSimulator::generation

use std::{
    ops::{Add, Sub},
    time::Duration,
};

use crate::{
    config::PresenceConfig,
    env::Environment,
    ids::{ChatId, UserId},
};

/// Mutation requested by the simulator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PresenceAction {
    /// Set or clear a participant's typing flag.
    SetTyping {
        /// Chat the flag was raised for
        chat_id: ChatId,
        /// Participant whose flag changes
        user_id: UserId,
        /// New flag value
        typing: bool,
    },
    /// Deliver a synthetic inbound message.
    DeliverInbound {
        /// Target chat
        chat_id: ChatId,
        /// Simulated author
        sender_id: UserId,
        /// Message body
        body: String,
    },
}

impl PresenceAction {
    /// Chat this action targets.
    pub fn chat_id(&self) -> &ChatId {
        match self {
            Self::SetTyping { chat_id, .. } | Self::DeliverInbound { chat_id, .. } => chat_id,
        }
    }
}

/// A repeating timer.
#[derive(Debug, Clone, Copy)]
struct Ticker<I> {
    period: Duration,
    next_fire: I,
}

impl<I> Ticker<I>
where
    I: Copy + Ord + Add<Duration, Output = I>,
{
    fn starting_at(now: I, period: Duration) -> Self {
        Self { period, next_fire: now + period }
    }

    /// True if due at `now`. A due ticker is rescheduled one period after
    /// `now`, so a late driver sees one firing rather than a burst.
    fn poll(&mut self, now: I) -> bool {
        if now < self.next_fire {
            return false;
        }
        self.next_fire = now + self.period;
        true
    }
}

/// Tickers bound to one active chat.
#[derive(Debug, Clone)]
struct Target<I> {
    chat_id: ChatId,
    /// Non-self participants the simulation may speak for.
    counterparts: Vec<UserId>,
    typing: Ticker<I>,
    inbound: Ticker<I>,
    /// Raised typing flag and when to clear it.
    typing_clear: Option<(UserId, I)>,
}

/// Timer-driven simulation of a live counterpart.
#[derive(Debug, Clone)]
pub struct PresenceSimulator<I> {
    config: PresenceConfig,
    target: Option<Target<I>>,
    generation: u64,
}

impl<I> PresenceSimulator<I>
where
    I: Copy + Ord + Add<Duration, Output = I> + Sub<Output = Duration>,
{
    /// Create a disarmed simulator.
    pub fn new(config: PresenceConfig) -> Self {
        Self { config, target: None, generation: 0 }
    }

    /// Point the simulator at `chat_id`.
    ///
    /// Cancels any live tickers first (returning the actions that undo their
    /// effects), then schedules fresh ones relative to `now`. With no
    /// counterparts the simulator stays disarmed.
    pub fn arm(&mut self, chat_id: ChatId, counterparts: Vec<UserId>, now: I) -> Vec<PresenceAction> {
        let actions = self.disarm();

        if counterparts.is_empty() {
            tracing::debug!(chat = %chat_id, "No counterpart to simulate");
            return actions;
        }

        self.generation += 1;
        tracing::debug!(chat = %chat_id, generation = self.generation, "Presence simulator armed");
        self.target = Some(Target {
            chat_id,
            counterparts,
            typing: Ticker::starting_at(now, self.config.typing_interval),
            inbound: Ticker::starting_at(now, self.config.inbound_interval),
            typing_clear: None,
        });
        actions
    }

    /// Cancel both tickers.
    ///
    /// A typing flag raised by the simulator is cleared immediately, since
    /// its pending clear is cancelled along with the tickers.
    pub fn disarm(&mut self) -> Vec<PresenceAction> {
        let Some(target) = self.target.take() else {
            return Vec::new();
        };

        self.generation += 1;
        tracing::debug!(chat = %target.chat_id, generation = self.generation, "Presence simulator disarmed");

        target
            .typing_clear
            .map(|(user_id, _)| PresenceAction::SetTyping {
                chat_id: target.chat_id,
                user_id,
                typing: false,
            })
            .into_iter()
            .collect()
    }

    /// Fire whatever is due at `now`.
    pub fn handle_tick<E>(&mut self, now: I, env: &E) -> Vec<PresenceAction>
    where
        E: Environment<Instant = I>,
    {
        let Some(target) = self.target.as_mut() else {
            return Vec::new();
        };
        let mut actions = Vec::new();

        if let Some((user_id, clear_at)) = target.typing_clear.take() {
            if now >= clear_at {
                actions.push(PresenceAction::SetTyping {
                    chat_id: target.chat_id.clone(),
                    user_id,
                    typing: false,
                });
            } else {
                target.typing_clear = Some((user_id, clear_at));
            }
        }

        if target.typing.poll(now) && env.random_unit() < self.config.typing_probability {
            let user_id = target.counterparts[env.random_index(target.counterparts.len())].clone();

            if let Some((previous, _)) = target.typing_clear.take()
                && previous != user_id
            {
                actions.push(PresenceAction::SetTyping {
                    chat_id: target.chat_id.clone(),
                    user_id: previous,
                    typing: false,
                });
            }

            target.typing_clear = Some((user_id.clone(), now + self.config.typing_duration));
            actions.push(PresenceAction::SetTyping {
                chat_id: target.chat_id.clone(),
                user_id,
                typing: true,
            });
        }

        if target.inbound.poll(now)
            && !self.config.phrases.is_empty()
            && env.random_unit() < self.config.inbound_probability
        {
            let sender_id = target.counterparts[env.random_index(target.counterparts.len())].clone();
            let body = self.config.phrases[env.random_index(self.config.phrases.len())].clone();
            actions.push(PresenceAction::DeliverInbound {
                chat_id: target.chat_id.clone(),
                sender_id,
                body,
            });
        }

        actions
    }

    /// Earliest instant at which [`handle_tick`](Self::handle_tick) has work.
    /// `None` while disarmed.
    pub fn next_deadline(&self) -> Option<I> {
        let target = self.target.as_ref()?;
        let tickers = target.typing.next_fire.min(target.inbound.next_fire);
        Some(target.typing_clear.as_ref().map_or(tickers, |(_, at)| tickers.min(*at)))
    }

    /// Chat the tickers are bound to. `None` while disarmed.
    pub fn active_chat(&self) -> Option<&ChatId> {
        self.target.as_ref().map(|t| &t.chat_id)
    }

    /// True while tickers are live.
    pub fn is_armed(&self) -> bool {
        self.target.is_some()
    }

    /// Incremented on every arm and disarm.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Simulator configuration.
    pub fn config(&self) -> &PresenceConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use std::time::Instant;

    use super::*;

    /// Environment whose random draws are always zero: every roll passes and
    /// every pick is the first candidate.
    #[derive(Clone)]
    struct ZeroEnv;

    impl Environment for ZeroEnv {
        type Instant = Instant;

        fn now(&self) -> Instant {
            Instant::now()
        }

        fn sleep(&self, _duration: Duration) -> impl std::future::Future<Output = ()> + Send {
            std::future::ready(())
        }

        fn random_bytes(&self, buffer: &mut [u8]) {
            buffer.fill(0);
        }

        fn wall_clock_secs(&self) -> u64 {
            0
        }
    }

    fn secs(n: u64) -> Duration {
        Duration::from_secs(n)
    }

    fn armed(t0: Instant) -> PresenceSimulator<Instant> {
        let mut sim = PresenceSimulator::new(PresenceConfig::always_fire());
        let actions = sim.arm("chat1".into(), vec!["1".into()], t0);
        assert!(actions.is_empty());
        sim
    }

    #[test]
    fn nothing_fires_before_first_period() {
        let t0 = Instant::now();
        let mut sim = armed(t0);

        assert!(sim.handle_tick(t0 + secs(7), &ZeroEnv).is_empty());
        assert_eq!(sim.next_deadline(), Some(t0 + secs(8)));
    }

    #[test]
    fn typing_sets_then_clears() {
        let t0 = Instant::now();
        let mut sim = armed(t0);

        let actions = sim.handle_tick(t0 + secs(8), &ZeroEnv);
        assert_eq!(actions, vec![PresenceAction::SetTyping {
            chat_id: "chat1".into(),
            user_id: "1".into(),
            typing: true,
        }]);
        assert_eq!(sim.next_deadline(), Some(t0 + secs(11)));

        let actions = sim.handle_tick(t0 + secs(11), &ZeroEnv);
        assert_eq!(actions, vec![PresenceAction::SetTyping {
            chat_id: "chat1".into(),
            user_id: "1".into(),
            typing: false,
        }]);
    }

    #[test]
    fn inbound_fires_on_its_own_period() {
        let t0 = Instant::now();
        let mut sim = armed(t0);

        let actions = sim.handle_tick(t0 + secs(45), &ZeroEnv);
        assert!(actions.iter().any(|a| matches!(
            a,
            PresenceAction::DeliverInbound { body, .. } if body == "Hey, how's it going?"
        )));
    }

    #[test]
    fn zero_probability_never_fires() {
        let t0 = Instant::now();
        let config =
            PresenceConfig { typing_probability: 0.0, inbound_probability: 0.0, ..Default::default() };
        let mut sim = PresenceSimulator::new(config);
        sim.arm("chat1".into(), vec!["1".into()], t0);

        for step in 1..=20 {
            assert!(sim.handle_tick(t0 + secs(step * 10), &ZeroEnv).is_empty());
        }
    }

    #[test]
    fn rearm_cancels_and_clears_typing() {
        let t0 = Instant::now();
        let mut sim = armed(t0);
        sim.handle_tick(t0 + secs(8), &ZeroEnv);
        let before = sim.generation();

        let actions = sim.arm("chat2".into(), vec!["2".into()], t0 + secs(9));

        assert_eq!(actions, vec![PresenceAction::SetTyping {
            chat_id: "chat1".into(),
            user_id: "1".into(),
            typing: false,
        }]);
        assert_eq!(sim.active_chat(), Some(&ChatId::from("chat2")));
        assert!(sim.generation() > before);

        // Old deadlines are gone: next typing fire is relative to the re-arm.
        assert_eq!(sim.next_deadline(), Some(t0 + secs(17)));
        for action in sim.handle_tick(t0 + secs(60), &ZeroEnv) {
            assert_eq!(action.chat_id(), &ChatId::from("chat2"));
        }
    }

    #[test]
    fn disarm_stops_everything() {
        let t0 = Instant::now();
        let mut sim = armed(t0);

        assert!(sim.disarm().is_empty());
        assert!(!sim.is_armed());
        assert_eq!(sim.next_deadline(), None);
        assert!(sim.handle_tick(t0 + secs(100), &ZeroEnv).is_empty());
        assert!(sim.disarm().is_empty());
    }

    #[test]
    fn no_counterparts_stays_disarmed() {
        let t0 = Instant::now();
        let mut sim = PresenceSimulator::new(PresenceConfig::always_fire());

        sim.arm("solo".into(), Vec::new(), t0);

        assert!(!sim.is_armed());
    }

    #[test]
    fn late_driver_sees_single_firing() {
        let t0 = Instant::now();
        let mut sim = armed(t0);

        let actions = sim.handle_tick(t0 + secs(200), &ZeroEnv);
        let typing_on =
            actions.iter().filter(|a| matches!(a, PresenceAction::SetTyping { typing: true, .. })).count();
        let inbound = actions.iter().filter(|a| matches!(a, PresenceAction::DeliverInbound { .. })).count();

        assert_eq!(typing_on, 1);
        assert_eq!(inbound, 1);
        assert_eq!(sim.next_deadline(), Some(t0 + secs(203)));
    }
}
