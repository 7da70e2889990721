//! Production environment backed by the system clock and OS RNG.
//!
//! Time comes from `tokio::time::Instant`, sleeping from tokio and randomness
//! from getrandom. The tokio clock reads the system clock unless a test pauses
//! it. Nothing here is reproducible; deterministic runs use the harness
//! `SimEnv` instead.

use std::time::Duration;

use wavetalk_core::Environment;

/// Production environment using system time and OS randomness.
///
/// # Panics
///
/// `random_bytes` panics if the OS RNG fails. The engine only draws
/// simulation choices and avatar picks from it, but an OS without a working
/// RNG is not one the process can sensibly keep running on.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemEnv;

impl SystemEnv {
    /// Create a new system environment.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl Environment for SystemEnv {
    type Instant = tokio::time::Instant;

    #[allow(clippy::disallowed_methods)]
    fn now(&self) -> Self::Instant {
        tokio::time::Instant::now()
    }

    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send {
        tokio::time::sleep(duration)
    }

    #[allow(clippy::expect_used)]
    fn random_bytes(&self, buffer: &mut [u8]) {
        getrandom::fill(buffer).expect("invariant: OS RNG is available");
    }

    #[allow(clippy::disallowed_methods)]
    fn wall_clock_secs(&self) -> u64 {
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map_or(0, |elapsed| elapsed.as_secs())
    }
}
