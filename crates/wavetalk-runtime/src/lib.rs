//! WaveTalk production runtime.
//!
//! Production glue around [`wavetalk_core`]'s sans-IO engine: real time and
//! OS randomness, file-backed session storage, and a tokio task that owns the
//! engine and drives its timers.
//!
//! # Components
//!
//! - [`SystemEnv`]: production environment (tokio clock, getrandom)
//! - [`FileStorage`]: one JSON file per storage key
//! - [`actor`]: single-owner engine task and its [`EngineHandle`]
//! - [`command`] and [`console`]: line-oriented front end used by the binary

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod actor;
pub mod command;
pub mod console;
mod file_storage;
mod system_env;

pub use actor::{EngineHandle, RuntimeError, spawn};
pub use file_storage::FileStorage;
pub use system_env::SystemEnv;
