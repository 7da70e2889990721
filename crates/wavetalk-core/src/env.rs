//! Environment abstraction for deterministic testing.
//!
//! Decouples engine logic from system resources (time, randomness). Enables
//! deterministic simulation (virtual clock, seeded RNG) and production use
//! with real system resources.

use std::time::Duration;

/// Abstract environment providing time, randomness, and async primitives.
///
/// Implementations MUST guarantee:
///
/// - `now()` never goes backwards
/// - Given the same seed, simulation implementations produce the same
///   sequence of random bytes
pub trait Environment: Clone + Send + Sync + 'static {
    /// The specific instant type used by this environment.
    ///
    /// Production environments use a real monotonic clock, while simulation
    /// environments use virtual time.
    type Instant: Copy + Ord + Send + Sync + std::fmt::Debug + std::ops::Sub<Output = Duration>
        + std::ops::Add<Duration, Output = Self::Instant>;

    /// Current time (monotonic).
    fn now(&self) -> Self::Instant;

    /// Sleeps for the specified duration.
    ///
    /// Only used by driver code, never by engine logic.
    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send;

    /// Fills the provided buffer with random bytes.
    fn random_bytes(&self, buffer: &mut [u8]);

    /// Wall-clock seconds since the Unix epoch.
    ///
    /// Only used for human-readable message labels. Ordering never depends on
    /// it.
    fn wall_clock_secs(&self) -> u64;

    /// Generates a random `u64`.
    fn random_u64(&self) -> u64 {
        let mut bytes = [0u8; 8];
        self.random_bytes(&mut bytes);
        u64::from_be_bytes(bytes)
    }

    /// Uniform sample in `[0, 1)` built from the top 53 bits of a `u64`.
    fn random_unit(&self) -> f64 {
        (self.random_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    /// Uniform index in `0..len`. Returns 0 when `len` is 0.
    ///
    /// Draws in the partial bucket above the last multiple of `len` are
    /// rejected, so small ranges carry no modulo bias.
    fn random_index(&self, len: usize) -> usize {
        if len == 0 {
            return 0;
        }
        let len = len as u64;
        let zone = u64::MAX - u64::MAX % len;
        loop {
            let draw = self.random_u64();
            if draw < zone {
                return (draw % len) as usize;
            }
        }
    }
}

/// Formats wall-clock seconds as a UTC `HH:MM` label.
pub(crate) fn clock_label(secs: u64) -> String {
    format!("{:02}:{:02}", (secs / 3600) % 24, (secs / 60) % 60)
}
