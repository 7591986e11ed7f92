//! # stagekv core
//!
//! Staging engine for a key-value store with client-scoped nested
//! transactions over one shared, durable mapping.
//!
//! This crate provides:
//! - [`StagingEngine`]: begin / commit / rollback / get / put / delete
//! - per-session [`TransactionStack`]s of [`OverlayFrame`]s
//! - the [`SessionRegistry`] that owns session lifecycle
//! - the [`DurableStore`] contract and its commit-log implementation,
//!   [`LogStore`]
//! - an observational [`CommitHistory`] of every durable apply
//!
//! Writes made inside a transaction stay in the session's topmost frame.
//! Committing an inner level folds it into its parent; committing the
//! outermost level flushes the net effect to the durable store in one
//! atomic apply. Outside a transaction every write is applied directly
//! (autocommit).
//!
//! ```rust
//! use stagekv_core::{StagingEngine, Value};
//!
//! let engine = StagingEngine::open_in_memory().unwrap();
//! let session = engine.create_session();
//!
//! engine.begin(&session).unwrap();
//! engine.put(Some(&session), "user:1", Value::from("Ava")).unwrap();
//! assert!(engine.get(None, "user:1").is_err());
//!
//! assert_eq!(engine.commit(&session).unwrap(), 0);
//! assert_eq!(engine.get(None, "user:1").unwrap(), Value::from("Ava"));
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod engine;
mod error;
mod history;
mod session;
mod store;
mod transaction;
mod types;
mod value;

pub use config::Config;
pub use engine::StagingEngine;
pub use error::{CoreError, CoreResult};
pub use history::{CommitHistory, CommitKind, CommitRecord};
pub use session::{SessionHandle, SessionId, SessionRegistry};
#[cfg(feature = "std")]
pub use store::StoreDir;
pub use store::{DurableStore, LogStore, WriteBatch};
pub use transaction::{CommitStep, FrameLookup, OverlayFrame, TransactionStack};
pub use types::SequenceNumber;
pub use value::{Key, Value};

/// Crate version, as recorded by the CLI's `version` command.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
