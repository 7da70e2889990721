//! Deterministic environment for simulation tests.
//!
//! Time only moves when the test calls [`SimEnv::advance`] (or awaits
//! [`Environment::sleep`], which advances the clock instantly). Randomness
//! comes from a seeded ChaCha8 RNG, so a seed fully determines which
//! simulated typing and inbound events fire.

use std::{
    ops::{Add, Sub},
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

use rand::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;
use wavetalk_core::Environment;

/// Wall-clock origin for simulated labels: 2024-01-01T09:00:00Z.
const DEFAULT_WALL_CLOCK: u64 = 1_704_099_600;

/// Virtual monotonic instant: time elapsed since the simulation started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct SimInstant(Duration);

impl SimInstant {
    /// Instant at simulation start.
    pub const ZERO: Self = Self(Duration::ZERO);

    /// Time elapsed since simulation start.
    pub fn elapsed(self) -> Duration {
        self.0
    }
}

impl Add<Duration> for SimInstant {
    type Output = Self;

    fn add(self, rhs: Duration) -> Self {
        Self(self.0 + rhs)
    }
}

impl Sub for SimInstant {
    type Output = Duration;

    /// Saturates at zero, like `std::time::Instant`.
    fn sub(self, rhs: Self) -> Duration {
        self.0.saturating_sub(rhs.0)
    }
}

struct SimState {
    now: SimInstant,
    rng: ChaCha8Rng,
}

/// Simulated environment with a virtual clock and seeded RNG.
///
/// Clones share the same clock and RNG.
#[derive(Clone)]
pub struct SimEnv {
    state: Arc<Mutex<SimState>>,
    wall_clock_origin: u64,
}

impl SimEnv {
    /// Create an environment with seed 0.
    pub fn new() -> Self {
        Self::with_seed(0)
    }

    /// Create an environment with a specific RNG seed.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            state: Arc::new(Mutex::new(SimState {
                now: SimInstant::ZERO,
                rng: ChaCha8Rng::seed_from_u64(seed),
            })),
            wall_clock_origin: DEFAULT_WALL_CLOCK,
        }
    }

    /// Use a different wall-clock origin for message labels.
    pub fn with_wall_clock(mut self, secs: u64) -> Self {
        self.wall_clock_origin = secs;
        self
    }

    fn lock(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    /// Move the virtual clock forward.
    pub fn advance(&self, duration: Duration) {
        let mut state = self.lock();
        state.now = state.now + duration;
        tracing::trace!(elapsed = ?state.now.elapsed(), "Advanced virtual clock");
    }

    /// Move the virtual clock to `instant`. Never moves backwards.
    pub fn advance_to(&self, instant: SimInstant) {
        let mut state = self.lock();
        if instant > state.now {
            state.now = instant;
        }
    }

    /// Time elapsed since simulation start.
    pub fn elapsed(&self) -> Duration {
        self.lock().now.elapsed()
    }
}

impl Default for SimEnv {
    fn default() -> Self {
        Self::new()
    }
}

impl Environment for SimEnv {
    type Instant = SimInstant;

    fn now(&self) -> SimInstant {
        self.lock().now
    }

    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send {
        self.advance(duration);
        std::future::ready(())
    }

    fn random_bytes(&self, buffer: &mut [u8]) {
        self.lock().rng.fill_bytes(buffer);
    }

    fn wall_clock_secs(&self) -> u64 {
        self.wall_clock_origin + self.elapsed().as_secs()
    }
}
