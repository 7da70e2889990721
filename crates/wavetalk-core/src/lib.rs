//! WaveTalk chat state engine.
//!
//! Sans-IO model of users, chats and messages for a chat client running over
//! an in-memory dataset. All mutation happens through [`ChatEngine`], which
//! owns the stores, gates every mutation on an authenticated session and
//! drives the presence simulator from explicit time inputs.
//!
//! # Architecture
//!
//! Like the protocol state machines this crate is modelled on, nothing here
//! performs I/O on its own. Time and randomness come from an [`Environment`],
//! the persisted session record goes through a [`SessionStorage`], and timers
//! are expressed as deadlines: the driver asks [`ChatEngine::next_deadline`],
//! sleeps, then calls [`ChatEngine::tick`].
//!
//! # Components
//!
//! - [`IdentityStore`]: user records
//! - [`ConversationStore`]: chats, message logs and the current selection
//! - [`operations`]: send, react, soft-delete, mark-read
//! - [`search`]: content search across every chat
//! - [`PresenceSimulator`]: typing and inbound-message tickers
//! - [`Session`]: session lifecycle and its persisted record

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
mod conversation;
mod dataset;
pub mod directory;
mod engine;
pub mod env;
mod error;
mod identity;
mod ids;
mod message;
pub mod operations;
mod presence;
pub mod search;
mod session;
mod storage;

pub use config::{EngineConfig, LoginRule, PresenceConfig};
pub use conversation::{Chat, ChatKind, ConversationStore};
pub use dataset::{Dataset, REACTION_PALETTE};
pub use directory::DirectoryView;
pub use engine::{ChatEngine, EngineEvent};
pub use env::Environment;
pub use error::{EngineError, EntityKind, StorageError};
pub use identity::{ContactInfo, IdentityStore, Presence, User, UserDraft};
pub use ids::{ChatId, MessageId, UserId};
pub use message::{DELETED_PLACEHOLDER, Message, ReactionChange, Reactions};
pub use presence::{PresenceAction, PresenceSimulator};
pub use search::SearchHit;
pub use session::{Credentials, Session, SessionRecord};
pub use storage::{MemoryStorage, SessionStorage};
