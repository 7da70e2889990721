//! Virtual-time driver for the chat engine.
//!
//! `SimDriver` owns a [`ChatEngine`] over a [`SimEnv`] and plays the part of
//! the runtime loop: it jumps the virtual clock from deadline to deadline and
//! ticks the engine at each one. With invariants enabled, the full registry
//! runs after every tick.

use std::time::Duration;

use wavetalk_core::{ChatEngine, Credentials, Dataset, EngineConfig, EngineEvent, Environment, MemoryStorage};

use crate::{
    invariants::{EngineSnapshot, InvariantRegistry},
    sim_env::SimEnv,
};

/// Engine type driven by the simulation.
pub type SimEngine = ChatEngine<SimEnv, MemoryStorage>;

/// Deterministic driver for a single engine.
pub struct SimDriver {
    env: SimEnv,
    storage: MemoryStorage,
    engine: SimEngine,
    invariants: Option<InvariantRegistry>,
    /// Events drained from the engine, oldest first.
    events: Vec<EngineEvent>,
}

impl SimDriver {
    /// Create a driver over `dataset` with the given seed and configuration.
    pub fn new(seed: u64, config: EngineConfig, dataset: Dataset) -> Self {
        Self::with_storage(seed, config, dataset, MemoryStorage::new())
    }

    /// Create a driver whose engine restores from `storage`.
    pub fn with_storage(seed: u64, config: EngineConfig, dataset: Dataset, storage: MemoryStorage) -> Self {
        let env = SimEnv::with_seed(seed);
        let engine = ChatEngine::new(env.clone(), storage.clone(), config, dataset);
        Self { env, storage, engine, invariants: None, events: Vec::new() }
    }

    /// Demo dataset with default configuration.
    pub fn demo(seed: u64) -> Self {
        Self::new(seed, EngineConfig::default(), Dataset::demo())
    }

    /// Enable invariant checking after every step.
    #[must_use]
    pub fn with_invariants(mut self, registry: InvariantRegistry) -> Self {
        self.invariants = Some(registry);
        self
    }

    /// Log in with empty credentials, panicking on failure.
    #[allow(clippy::expect_used)]
    pub fn logged_in(mut self) -> Self {
        self.engine.login(&Credentials::default()).expect("demo login resolves");
        self.drain();
        self
    }

    /// The engine.
    pub fn engine(&self) -> &SimEngine {
        &self.engine
    }

    /// The engine, mutably. Call [`check`](Self::check) afterwards to run
    /// invariants.
    pub fn engine_mut(&mut self) -> &mut SimEngine {
        &mut self.engine
    }

    /// The environment shared with the engine.
    pub fn env(&self) -> &SimEnv {
        &self.env
    }

    /// The storage shared with the engine.
    pub fn storage(&self) -> &MemoryStorage {
        &self.storage
    }

    /// Advance virtual time by `duration`, ticking the engine at every
    /// deadline on the way. Returns the number of ticks.
    pub fn run_for(&mut self, duration: Duration) -> usize {
        let end = self.env.now() + duration;
        let mut ticks = 0;

        while let Some(deadline) = self.engine.next_deadline() {
            if deadline > end {
                break;
            }
            self.env.advance_to(deadline);
            self.engine.tick();
            ticks += 1;
            self.drain();
            self.check("after tick");
        }

        self.env.advance_to(end);
        ticks
    }

    /// Move the engine's events into the driver's log.
    fn drain(&mut self) {
        self.events.extend(self.engine.take_events());
    }

    /// Take every event observed so far.
    pub fn take_events(&mut self) -> Vec<EngineEvent> {
        self.drain();
        std::mem::take(&mut self.events)
    }

    /// Run the invariant registry, if enabled.
    pub fn check(&self, context: &str) {
        if let Some(registry) = &self.invariants {
            registry.assert_all(&EngineSnapshot::from_engine(&self.engine), context);
        }
    }
}
