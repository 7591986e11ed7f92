//! The durable store: the single committed source of truth.
//!
//! The staging engine consumes the store only through [`DurableStore`]:
//! point reads, an atomic bulk apply, and a read-only dump. The store
//! knows nothing about sessions or frames.
//!
//! [`LogStore`] is the implementation shipped with the crate. It keeps an
//! in-memory index of the committed mapping and persists every apply as
//! one framed record in an append-only commit log:
//!
//! ```text
//! | magic "SKVL" (4) | version (2) | length (4) | payload (N) | crc32 (4) |
//! ```
//!
//! The payload is CBOR. Replay at load time tolerates a truncated final
//! record (a crash mid-append) and refuses to open on any other damage.

#[cfg(feature = "std")]
mod dir;
mod log;
mod record;

#[cfg(feature = "std")]
pub use dir::StoreDir;
pub use log::LogStore;

use crate::error::CoreResult;
use crate::types::SequenceNumber;
use crate::value::{Key, Value};
use std::collections::{BTreeMap, BTreeSet};

/// A borrowed set of puts and deletes applied as one unit.
///
/// No key appears in both halves; batches are built from an
/// [`crate::OverlayFrame`], which maintains that invariant.
#[derive(Debug, Clone, Copy)]
pub struct WriteBatch<'a> {
    puts: &'a BTreeMap<Key, Value>,
    deletes: &'a BTreeSet<Key>,
}

impl<'a> WriteBatch<'a> {
    /// Creates a batch view over staged puts and deletes.
    #[must_use]
    pub fn new(puts: &'a BTreeMap<Key, Value>, deletes: &'a BTreeSet<Key>) -> Self {
        Self { puts, deletes }
    }

    /// Keys to write, in key order.
    pub fn puts(&self) -> impl Iterator<Item = (&'a Key, &'a Value)> {
        self.puts.iter()
    }

    /// Keys to remove, in key order.
    pub fn deletes(&self) -> impl Iterator<Item = &'a Key> {
        self.deletes.iter()
    }

    /// Returns true if the batch changes nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.puts.is_empty() && self.deletes.is_empty()
    }

    /// Number of keys the batch touches.
    #[must_use]
    pub fn len(&self) -> usize {
        self.puts.len() + self.deletes.len()
    }
}

/// Contract between the staging engine and durable storage.
///
/// # Invariants
///
/// - `apply` is atomic: after it returns, every put and delete in the
///   batch is visible, or (on error) none is
/// - concurrent `apply` calls are serialised by the store
/// - `get` and `dump` only ever observe fully applied batches
pub trait DurableStore: Send + Sync {
    /// Reads the committed value of `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn get(&self, key: &str) -> CoreResult<Option<Value>>;

    /// Atomically applies `batch` and returns its sequence number.
    ///
    /// An empty batch writes nothing and returns the current
    /// [`DurableStore::committed_seq`].
    ///
    /// # Errors
    ///
    /// Returns an error if the batch could not be made durable; the
    /// committed state is then unchanged.
    fn apply(&self, batch: &WriteBatch<'_>) -> CoreResult<SequenceNumber>;

    /// Returns a snapshot of the whole committed mapping.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    fn dump(&self) -> CoreResult<BTreeMap<Key, Value>>;

    /// Sequence number of the latest successful apply.
    fn committed_seq(&self) -> SequenceNumber;
}
