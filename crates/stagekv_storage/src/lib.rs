//! # stagekv storage
//!
//! Byte-store backends for the stagekv commit log.
//!
//! A backend is an **opaque, append-only byte store**. It knows nothing
//! about commit records, keys or values; `stagekv_core` owns the framing
//! of everything it writes here.
//!
//! ## Available Backends
//!
//! - [`InMemoryBackend`] - ephemeral stores and tests
//! - [`FileBackend`] - a single file on the local file system
//!
//! ## Example
//!
//! ```rust
//! use stagekv_storage::{InMemoryBackend, StorageBackend};
//!
//! let mut backend = InMemoryBackend::new();
//! let offset = backend.append(b"record-1").unwrap();
//! assert_eq!(backend.read_at(offset, 8).unwrap(), b"record-1");
//! assert_eq!(backend.read_all().unwrap(), b"record-1");
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod error;
mod file;
mod memory;

pub use backend::StorageBackend;
pub use error::{StorageError, StorageResult};
pub use file::FileBackend;
pub use memory::InMemoryBackend;
