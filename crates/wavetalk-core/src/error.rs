//! Error types for the chat engine.
//!
//! Engine errors are all recoverable: the caller decides whether to prompt a
//! login, show a toast, or ignore them. Storage errors stay separate because
//! the engine never lets them fail a session transition.

use std::fmt;

use thiserror::Error;

/// Kind of entity an identifier refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    /// A user record.
    User,
    /// A chat.
    Chat,
    /// A message inside a chat.
    Message,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::User => "user",
            Self::Chat => "chat",
            Self::Message => "message",
        };
        f.write_str(name)
    }
}

/// Errors returned by engine operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// A mutating call was made without an authenticated session.
    #[error("must log in")]
    Unauthenticated,

    /// An identifier did not resolve.
    #[error("{kind} not found: {id}")]
    NotFound {
        /// What was being looked up
        kind: EntityKind,
        /// The identifier that missed
        id: String,
    },

    /// The operation is not valid for the current state or inputs.
    #[error("invalid state: {reason}")]
    InvalidState {
        /// Human-readable reason
        reason: String,
    },

    /// Login lookup found no matching user.
    #[error("authentication failed")]
    AuthFailed,
}

impl EngineError {
    pub(crate) fn not_found(kind: EntityKind, id: impl fmt::Display) -> Self {
        Self::NotFound { kind, id: id.to_string() }
    }

    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        Self::InvalidState { reason: reason.into() }
    }

    /// Returns true if the caller should prompt for a login.
    pub fn requires_login(&self) -> bool {
        matches!(self, Self::Unauthenticated | Self::AuthFailed)
    }
}

/// Errors from session storage backends.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Underlying I/O failure.
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Record could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Key is not usable by this backend.
    #[error("invalid storage key: {0:?}")]
    InvalidKey(String),
}
