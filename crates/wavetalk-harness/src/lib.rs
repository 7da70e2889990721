//! Deterministic simulation harness for the WaveTalk chat engine.
//!
//! Provides a virtual-clock [`Environment`](wavetalk_core::Environment)
//! implementation, a driver that steps the engine from deadline to deadline,
//! and invariant checks over engine snapshots.
//!
//! # Invariant Testing
//!
//! The `invariants` module verifies WHAT must be true across all execution
//! paths, not specific scenarios. Use [`InvariantRegistry::standard()`] for
//! the full set.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod invariants;
pub mod sim_driver;
pub mod sim_env;

pub use invariants::{
    ChatSnapshot, EngineSnapshot, Invariant, InvariantRegistry, InvariantResult, MessageSnapshot,
    UserSnapshot, Violation,
};
pub use sim_driver::{SimDriver, SimEngine};
pub use sim_env::{SimEnv, SimInstant};
