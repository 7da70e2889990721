//! Engine configuration.

use std::time::Duration;

/// Storage key holding the persisted session record.
pub const DEFAULT_STORAGE_KEY: &str = "wavetalk_auth";

/// Display name of the user every demo login resolves to.
pub const DEFAULT_DEMO_USER: &str = "Noah Smith";

/// Period of the simulated typing ticker.
pub const DEFAULT_TYPING_INTERVAL: Duration = Duration::from_secs(8);

/// How long a simulated typing flag stays set.
pub const DEFAULT_TYPING_DURATION: Duration = Duration::from_secs(3);

/// Period of the simulated inbound-message ticker.
pub const DEFAULT_INBOUND_INTERVAL: Duration = Duration::from_secs(45);

/// How long the local composer typing flag stays set after the last keystroke.
pub const DEFAULT_COMPOSING_TIMEOUT: Duration = Duration::from_secs(3);

/// Phrases the simulated counterpart picks from.
pub const DEFAULT_PHRASES: [&str; 5] = [
    "Hey, how's it going?",
    "Did you see that new movie?",
    "I'm heading out for lunch, want to join?",
    "Can you send me those files when you get a chance?",
    "Let's catch up soon!",
];

/// How login credentials are resolved to a user.
///
/// There is no credential verification in either rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginRule {
    /// Every login succeeds as the user with this display name, if present.
    Fixed {
        /// Display name to log in as
        display_name: String,
    },
    /// Login succeeds as the user whose contact email matches the
    /// credential's identifier.
    Email,
}

impl Default for LoginRule {
    fn default() -> Self {
        Self::Fixed { display_name: DEFAULT_DEMO_USER.to_owned() }
    }
}

/// Presence simulator configuration.
#[derive(Debug, Clone)]
pub struct PresenceConfig {
    /// Period of the typing ticker
    pub typing_interval: Duration,
    /// How long a typing flag stays set
    pub typing_duration: Duration,
    /// Period of the inbound-message ticker
    pub inbound_interval: Duration,
    /// Chance in `[0, 1]` that a typing tick sets a flag
    pub typing_probability: f64,
    /// Chance in `[0, 1]` that an inbound tick delivers a message
    pub inbound_probability: f64,
    /// Phrase set for inbound messages
    pub phrases: Vec<String>,
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self {
            typing_interval: DEFAULT_TYPING_INTERVAL,
            typing_duration: DEFAULT_TYPING_DURATION,
            inbound_interval: DEFAULT_INBOUND_INTERVAL,
            typing_probability: 0.9,
            inbound_probability: 0.2,
            phrases: DEFAULT_PHRASES.iter().map(|p| (*p).to_owned()).collect(),
        }
    }
}

impl PresenceConfig {
    /// Configuration where every tick fires. Useful for deterministic tests.
    pub fn always_fire() -> Self {
        Self { typing_probability: 1.0, inbound_probability: 1.0, ..Self::default() }
    }
}

/// Top-level engine configuration.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Storage key for the persisted session record
    pub storage_key: String,
    /// Login lookup rule
    pub login_rule: LoginRule,
    /// Presence simulator settings
    pub presence: PresenceConfig,
    /// Local composer typing timeout
    pub composing_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            storage_key: DEFAULT_STORAGE_KEY.to_owned(),
            login_rule: LoginRule::default(),
            presence: PresenceConfig::default(),
            composing_timeout: DEFAULT_COMPOSING_TIMEOUT,
        }
    }
}
