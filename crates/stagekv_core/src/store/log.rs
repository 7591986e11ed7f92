//! Commit-log backed durable store.

use crate::error::{CoreError, CoreResult};
use crate::store::record::FlushRecord;
use crate::store::{DurableStore, WriteBatch};
use crate::types::SequenceNumber;
use crate::value::{Key, Value};
use parking_lot::{Mutex, RwLock};
use stagekv_storage::{InMemoryBackend, StorageBackend};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{info, warn};

/// A durable store made of an append-only commit log plus an in-memory
/// index of the committed mapping.
///
/// ## Atomic apply
///
/// Writers are serialised by the backend mutex. An apply appends exactly
/// one record and flushes it before the batch is published to the index
/// under the index write lock, so a reader sees either none or all of a
/// batch. If the append or the flush fails, the backend is truncated back
/// to its previous size and the index is left untouched.
pub struct LogStore {
    /// Commit log. The mutex doubles as the writer lock.
    backend: Mutex<Box<dyn StorageBackend>>,
    /// Committed mapping rebuilt from the log.
    index: RwLock<BTreeMap<Key, Value>>,
    /// Sequence of the latest applied record.
    committed_seq: AtomicU64,
    /// Whether to `sync` (rather than `flush`) after each append.
    sync_on_commit: bool,
}

impl LogStore {
    /// Opens a store over `backend`, replaying its commit log.
    ///
    /// A truncated final record is discarded and the backend is cut back
    /// to the last complete record.
    ///
    /// # Errors
    ///
    /// Returns `LogCorruption` or `ChecksumMismatch` if any complete record
    /// is damaged, and storage errors if the backend cannot be read.
    pub fn load(mut backend: Box<dyn StorageBackend>, sync_on_commit: bool) -> CoreResult<Self> {
        let bytes = backend.read_all()?;
        let mut index = BTreeMap::new();
        let mut last_seq = 0u64;
        let mut records = 0usize;
        let mut offset = 0usize;

        while offset < bytes.len() {
            let Some((record, consumed)) = FlushRecord::decode(&bytes[offset..], offset as u64)?
            else {
                warn!(
                    offset,
                    discarded = bytes.len() - offset,
                    "discarding truncated commit log tail"
                );
                backend.truncate(offset as u64)?;
                break;
            };

            if record.sequence <= last_seq {
                return Err(CoreError::log_corruption(
                    offset as u64,
                    format!(
                        "sequence {} does not follow {}",
                        record.sequence, last_seq
                    ),
                ));
            }
            for key in &record.deletes {
                index.remove(key);
            }
            for (key, value) in record.decoded_puts()? {
                index.insert(key, value);
            }

            last_seq = record.sequence;
            records += 1;
            offset += consumed;
        }

        info!(records, keys = index.len(), committed_seq = last_seq, "commit log replayed");

        Ok(Self {
            backend: Mutex::new(backend),
            index: RwLock::new(index),
            committed_seq: AtomicU64::new(last_seq),
            sync_on_commit,
        })
    }

    /// Creates an empty store that lives only in memory.
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            backend: Mutex::new(Box::new(InMemoryBackend::new())),
            index: RwLock::new(BTreeMap::new()),
            committed_seq: AtomicU64::new(0),
            sync_on_commit: false,
        }
    }

    /// Number of committed keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.index.read().len()
    }

    /// Returns true if nothing is committed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.index.read().is_empty()
    }

    /// Size of the commit log in bytes.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend size cannot be determined.
    pub fn log_size(&self) -> CoreResult<u64> {
        Ok(self.backend.lock().size()?)
    }

    fn append_durably(&self, backend: &mut dyn StorageBackend, bytes: &[u8]) -> CoreResult<()> {
        backend.append(bytes)?;
        if self.sync_on_commit {
            backend.sync()?;
        } else {
            backend.flush()?;
        }
        Ok(())
    }
}

impl DurableStore for LogStore {
    fn get(&self, key: &str) -> CoreResult<Option<Value>> {
        Ok(self.index.read().get(key).cloned())
    }

    fn apply(&self, batch: &WriteBatch<'_>) -> CoreResult<SequenceNumber> {
        if batch.is_empty() {
            return Ok(self.committed_seq());
        }

        let mut backend = self.backend.lock();
        let sequence = self.committed_seq().next();
        let bytes = FlushRecord::from_batch(sequence, batch)?.encode()?;
        let start = backend.size()?;

        if let Err(err) = self.append_durably(&mut **backend, &bytes) {
            if let Err(undo) = backend.truncate(start) {
                warn!(error = %undo, offset = start, "could not roll back a failed commit log append");
            }
            return Err(err);
        }

        {
            let mut index = self.index.write();
            for key in batch.deletes() {
                index.remove(key);
            }
            for (key, value) in batch.puts() {
                index.insert(key.clone(), value.clone());
            }
        }
        self.committed_seq.store(sequence.as_u64(), Ordering::SeqCst);

        Ok(sequence)
    }

    fn dump(&self) -> CoreResult<BTreeMap<Key, Value>> {
        Ok(self.index.read().clone())
    }

    fn committed_seq(&self) -> SequenceNumber {
        SequenceNumber::new(self.committed_seq.load(Ordering::SeqCst))
    }
}

impl std::fmt::Debug for LogStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogStore")
            .field("committed_seq", &self.committed_seq())
            .field("keys", &self.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transaction::OverlayFrame;
    use stagekv_storage::{StorageError, StorageResult};
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;

    /// Shares its bytes with the test so a log image can be reopened, and
    /// fails appends on demand.
    #[derive(Clone, Default)]
    struct SharedBackend {
        data: Arc<RwLock<Vec<u8>>>,
        fail_append: Arc<AtomicBool>,
    }

    impl StorageBackend for SharedBackend {
        fn read_at(&self, offset: u64, len: usize) -> StorageResult<Vec<u8>> {
            InMemoryBackend::with_data(self.data.read().clone()).read_at(offset, len)
        }

        fn append(&mut self, bytes: &[u8]) -> StorageResult<u64> {
            let mut data = self.data.write();
            let offset = data.len() as u64;
            if self.fail_append.load(Ordering::SeqCst) {
                // Leave half a record behind, as a crashed write would.
                data.extend_from_slice(&bytes[..bytes.len() / 2]);
                return Err(StorageError::Closed);
            }
            data.extend_from_slice(bytes);
            Ok(offset)
        }

        fn flush(&mut self) -> StorageResult<()> {
            Ok(())
        }

        fn sync(&mut self) -> StorageResult<()> {
            Ok(())
        }

        fn size(&self) -> StorageResult<u64> {
            Ok(self.data.read().len() as u64)
        }

        fn truncate(&mut self, new_size: u64) -> StorageResult<()> {
            self.data.write().truncate(new_size as usize);
            Ok(())
        }
    }

    fn frame(puts: &[(&str, i64)], deletes: &[&str]) -> OverlayFrame {
        let mut frame = OverlayFrame::new();
        for (key, n) in puts {
            frame.set(*key, Value::from(*n));
        }
        for key in deletes {
            frame.delete(*key);
        }
        frame
    }

    #[test]
    fn apply_publishes_puts_and_deletes() {
        let store = LogStore::in_memory();
        store.apply(&frame(&[("a", 1), ("b", 2)], &[]).as_batch()).unwrap();
        let seq = store.apply(&frame(&[("c", 3)], &["a"]).as_batch()).unwrap();

        assert_eq!(seq, SequenceNumber::new(2));
        assert_eq!(store.get("a").unwrap(), None);
        assert_eq!(store.get("b").unwrap(), Some(Value::from(2)));
        assert_eq!(store.dump().unwrap().keys().collect::<Vec<_>>(), vec!["b", "c"]);
    }

    #[test]
    fn empty_batch_writes_nothing() {
        let store = LogStore::in_memory();
        let seq = store.apply(&OverlayFrame::new().as_batch()).unwrap();
        assert_eq!(seq, SequenceNumber::new(0));
        assert_eq!(store.log_size().unwrap(), 0);
    }

    #[test]
    fn replay_rebuilds_the_mapping() {
        let backend = SharedBackend::default();
        {
            let store = LogStore::load(Box::new(backend.clone()), true).unwrap();
            store.apply(&frame(&[("a", 1), ("b", 2)], &[]).as_batch()).unwrap();
            store.apply(&frame(&[("b", 3)], &["a"]).as_batch()).unwrap();
        }

        let store = LogStore::load(Box::new(backend), true).unwrap();
        assert_eq!(store.committed_seq(), SequenceNumber::new(2));
        assert_eq!(store.get("a").unwrap(), None);
        assert_eq!(store.get("b").unwrap(), Some(Value::from(3)));
    }

    #[test]
    fn replay_discards_a_torn_tail() {
        let backend = SharedBackend::default();
        let good_size;
        {
            let store = LogStore::load(Box::new(backend.clone()), false).unwrap();
            store.apply(&frame(&[("a", 1)], &[]).as_batch()).unwrap();
            good_size = store.log_size().unwrap();
        }
        let record = backend.data.read()[..good_size as usize].to_vec();
        backend.data.write().extend_from_slice(&record[..record.len() - 3]);

        let store = LogStore::load(Box::new(backend.clone()), false).unwrap();
        assert_eq!(store.get("a").unwrap(), Some(Value::from(1)));
        assert_eq!(backend.data.read().len() as u64, good_size);
    }

    #[test]
    fn replay_refuses_a_corrupt_record() {
        let backend = SharedBackend::default();
        {
            let store = LogStore::load(Box::new(backend.clone()), false).unwrap();
            store.apply(&frame(&[("a", 1)], &[]).as_batch()).unwrap();
        }
        let last = backend.data.read().len() - 6;
        backend.data.write()[last] ^= 0xFF;

        assert!(matches!(
            LogStore::load(Box::new(backend), false),
            Err(CoreError::ChecksumMismatch { .. })
        ));
    }

    #[test]
    fn failed_append_leaves_no_trace() {
        let backend = SharedBackend::default();
        let store = LogStore::load(Box::new(backend.clone()), false).unwrap();
        store.apply(&frame(&[("a", 1)], &[]).as_batch()).unwrap();
        let size = store.log_size().unwrap();

        backend.fail_append.store(true, Ordering::SeqCst);
        let err = store.apply(&frame(&[("b", 2)], &["a"]).as_batch()).unwrap_err();
        assert!(matches!(err, CoreError::Storage(StorageError::Closed)));

        assert_eq!(store.log_size().unwrap(), size);
        assert_eq!(store.get("a").unwrap(), Some(Value::from(1)));
        assert_eq!(store.get("b").unwrap(), None);
        assert_eq!(store.committed_seq(), SequenceNumber::new(1));

        backend.fail_append.store(false, Ordering::SeqCst);
        let seq = store.apply(&frame(&[("b", 2)], &[]).as_batch()).unwrap();
        assert_eq!(seq, SequenceNumber::new(2));
        drop(store);

        let reopened = LogStore::load(Box::new(backend), false).unwrap();
        assert_eq!(reopened.get("b").unwrap(), Some(Value::from(2)));
    }
}
