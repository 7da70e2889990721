//! Session state and its persisted record.
//!
//! # State Machine
//!
//! ```text
//! ┌───────────┐   login    ┌───────────────┐
//! │ Anonymous │───────────>│ Authenticated │
//! └───────────┘            └───────────────┘
//!       ^                          │
//!       └────────── logout ────────┘
//! ```
//!
//! The persisted record is a JSON object `{isAuthenticated, currentUser}`
//! under a single storage key. Anything unreadable there decodes as the
//! anonymous session.

use serde::{Deserialize, Serialize};

use crate::{
    identity::{Presence, User},
    ids::UserId,
};

/// Login form input.
///
/// No rule verifies the secret; it exists so callers can pass what the user
/// typed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Credentials {
    /// Email or user name
    pub identifier: String,
    /// Password (ignored)
    pub secret: String,
}

impl Credentials {
    /// Credentials with the given identifier and an empty secret.
    pub fn identifier(identifier: impl Into<String>) -> Self {
        Self { identifier: identifier.into(), secret: String::new() }
    }
}

/// Current session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Session {
    /// Nobody is logged in.
    #[default]
    Anonymous,
    /// A user is logged in.
    Authenticated {
        /// Snapshot of the logged-in user
        user: User,
    },
}

impl Session {
    /// True while a user is logged in.
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated { .. })
    }

    /// Logged-in user. `None` if anonymous.
    pub fn current_user(&self) -> Option<&User> {
        match self {
            Self::Authenticated { user } => Some(user),
            Self::Anonymous => None,
        }
    }

    /// Logged-in user id. `None` if anonymous.
    pub fn user_id(&self) -> Option<&UserId> {
        self.current_user().map(|u| &u.id)
    }

    pub(crate) fn set_presence(&mut self, presence: Presence) {
        if let Self::Authenticated { user } = self {
            user.presence = presence;
        }
    }

    /// Record to persist for this session.
    pub fn to_record(&self) -> SessionRecord {
        SessionRecord {
            is_authenticated: self.is_authenticated(),
            current_user: self.current_user().cloned(),
        }
    }
}

/// Serialized session descriptor.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
    /// Whether a user was logged in
    pub is_authenticated: bool,
    /// The logged-in user
    pub current_user: Option<User>,
}

impl SessionRecord {
    /// Encode as JSON.
    pub fn encode(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Decode from JSON.
    pub fn decode(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }

    /// Session described by this record.
    ///
    /// A record claiming authentication without a user is anonymous.
    pub fn into_session(self) -> Session {
        match (self.is_authenticated, self.current_user) {
            (true, Some(user)) => Session::Authenticated { user },
            _ => Session::Anonymous,
        }
    }
}
