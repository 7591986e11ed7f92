//! The staging engine: nested transactions over one durable store.

use crate::config::Config;
use crate::error::{CoreError, CoreResult};
use crate::history::{CommitHistory, CommitKind, CommitRecord};
use crate::session::{SessionId, SessionRegistry};
#[cfg(feature = "std")]
use crate::store::StoreDir;
use crate::store::{DurableStore, LogStore, WriteBatch};
use crate::transaction::{CommitStep, FrameLookup, TransactionStack};
use crate::types::SequenceNumber;
use crate::value::{validate_key, Key, Value};
use std::collections::{BTreeMap, BTreeSet};
#[cfg(feature = "std")]
use std::path::Path;
use parking_lot::{Mutex, MutexGuard};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// The staging engine.
///
/// `StagingEngine` mediates every read and write from client sessions.
/// Each session owns a stack of overlay frames; writes inside a
/// transaction land in the top frame and stay invisible to every other
/// reader until the outermost commit flushes the merged frame to the
/// durable store in a single atomic apply.
///
/// Without a session, or with a session at depth 0, reads and writes go
/// straight to the store (autocommit).
///
/// # Locking
///
/// Each operation holds the lock of the session it touches for its whole
/// duration. Durable applies, together with their history records and
/// the visibility check of an autocommit delete, run under one writer
/// lock. A session lock is never held while waiting on the registry lock,
/// and the writer lock is only ever taken after a session lock.
///
/// ```rust
/// use stagekv_core::{StagingEngine, Value};
///
/// let engine = StagingEngine::open_in_memory().unwrap();
/// let s = engine.create_session();
///
/// engine.begin(&s).unwrap();
/// engine.put(Some(&s), "nested:key", Value::from("outer")).unwrap();
/// engine.begin(&s).unwrap();
/// engine.put(Some(&s), "nested:key", Value::from("inner")).unwrap();
///
/// assert_eq!(engine.commit(&s).unwrap(), 1);
/// assert_eq!(engine.get(Some(&s), "nested:key").unwrap(), Value::from("inner"));
///
/// assert_eq!(engine.rollback(&s).unwrap(), 0);
/// assert!(engine.get(Some(&s), "nested:key").is_err());
/// ```
pub struct StagingEngine {
    config: Config,
    store: Arc<dyn DurableStore>,
    sessions: SessionRegistry,
    history: CommitHistory,
    writer: Mutex<()>,
    /// Store directory (holds the lock). None for engines built on a
    /// caller-supplied store.
    #[cfg(feature = "std")]
    dir: Option<StoreDir>,
}

impl StagingEngine {
    /// Creates an engine over an existing store.
    ///
    /// The commit history is kept in memory only; `config.history_file`
    /// is ignored since there is no store directory to place it in.
    #[must_use]
    pub fn new(store: Arc<dyn DurableStore>, config: Config) -> Self {
        let history = CommitHistory::new(config.max_history);
        Self {
            config,
            store,
            sessions: SessionRegistry::new(),
            history,
            writer: Mutex::new(()),
            #[cfg(feature = "std")]
            dir: None,
        }
    }

    /// Opens (or creates) a store directory and replays its commit log.
    ///
    /// # Errors
    ///
    /// Returns `StoreLocked` if another process has the directory open,
    /// or an error if the commit log is corrupt or cannot be read.
    #[cfg(feature = "std")]
    pub fn open(path: &Path, config: Config) -> CoreResult<Self> {
        let dir = StoreDir::open(path, config.create_if_missing)?;
        let backend = stagekv_storage::FileBackend::open(&dir.log_path())?;
        let store = LogStore::load(Box::new(backend), config.sync_on_commit)?;

        let history = match &config.history_file {
            Some(name) => CommitHistory::with_sink(config.max_history, &dir.file_path(name))?,
            None => CommitHistory::new(config.max_history),
        };

        info!(
            path = %dir.path().display(),
            keys = store.len(),
            committed_seq = store.committed_seq().as_u64(),
            "opened store"
        );

        Ok(Self {
            config,
            store: Arc::new(store),
            sessions: SessionRegistry::new(),
            history,
            writer: Mutex::new(()),
            dir: Some(dir),
        })
    }

    /// Creates an engine over an empty in-memory store.
    ///
    /// Useful for tests and ephemeral data; nothing survives the process.
    ///
    /// # Errors
    ///
    /// Infallible today; returns `CoreResult` to match [`StagingEngine::open`].
    pub fn open_in_memory() -> CoreResult<Self> {
        Ok(Self::new(
            Arc::new(LogStore::in_memory()),
            Config::default().history_file(None),
        ))
    }

    /// Returns the engine configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Path of the store directory, if the engine was opened from one.
    #[cfg(feature = "std")]
    pub fn path(&self) -> Option<&Path> {
        self.dir.as_ref().map(StoreDir::path)
    }

    /// Sequence number of the latest durable apply.
    pub fn committed_seq(&self) -> SequenceNumber {
        self.store.committed_seq()
    }

    /// The session registry.
    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    // ========================================================================
    // Sessions
    // ========================================================================

    /// Creates a session in autocommit mode (depth 0).
    pub fn create_session(&self) -> SessionId {
        let id = self.sessions.create();
        debug!(session = %id, "session created");
        id
    }

    /// Closes a session, discarding any open transactions.
    ///
    /// # Errors
    ///
    /// Returns `SessionNotFound` if the session does not exist.
    pub fn close_session(&self, id: &SessionId) -> CoreResult<()> {
        let discarded = self.sessions.remove(id)?;
        debug!(session = %id, discarded, "session closed");
        Ok(())
    }

    /// Current nesting depth of a session.
    ///
    /// # Errors
    ///
    /// Returns `SessionNotFound` if the session does not exist.
    pub fn depth(&self, id: &SessionId) -> CoreResult<usize> {
        Ok(self.sessions.get(id)?.lock()?.depth())
    }

    /// Number of live sessions.
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    // ========================================================================
    // Transactions
    // ========================================================================

    /// Opens a nested transaction and returns the new depth.
    ///
    /// # Errors
    ///
    /// Returns `SessionNotFound` if the session does not exist or is closed
    /// before the lock is taken.
    pub fn begin(&self, id: &SessionId) -> CoreResult<usize> {
        let handle = self.sessions.get(id)?;
        let depth = handle.lock()?.push();
        debug!(session = %id, depth, "begin");
        Ok(depth)
    }

    /// Commits the innermost open transaction and returns the new depth.
    ///
    /// Below the outermost level the frame is folded into its parent and
    /// nothing becomes durable. At the outermost level the merged frame is
    /// applied to the store atomically. If that apply fails, the frame is
    /// put back (depth 1) and `FlushFailed` is returned.
    ///
    /// # Errors
    ///
    /// Returns `SessionNotFound`, `NoOpenTransaction` at depth 0, or
    /// `FlushFailed` if the durable apply failed.
    pub fn commit(&self, id: &SessionId) -> CoreResult<usize> {
        let handle = self.sessions.get(id)?;
        let mut stack = handle.lock()?;

        match stack.commit_top() {
            None => Err(CoreError::no_open_transaction(*id)),
            Some(CommitStep::Merged(depth)) => {
                debug!(session = %id, depth, "merged into parent frame");
                Ok(depth)
            }
            Some(CommitStep::Flush(frame)) => {
                if frame.is_empty() {
                    debug!(session = %id, "outermost commit with nothing to flush");
                    return Ok(0);
                }
                let flushed = self.apply_and_record(&frame.as_batch(), CommitKind::Transaction);
                match flushed {
                    Ok(_) => Ok(0),
                    Err(err) => {
                        let depth = stack.restore(frame);
                        warn!(session = %id, depth, error = %err, "flush failed, frame restored");
                        Err(CoreError::flush_failed(err))
                    }
                }
            }
        }
    }

    /// Discards the innermost open transaction and returns the new depth.
    ///
    /// # Errors
    ///
    /// Returns `SessionNotFound`, or `NoOpenTransaction` at depth 0.
    pub fn rollback(&self, id: &SessionId) -> CoreResult<usize> {
        let handle = self.sessions.get(id)?;
        let mut stack = handle.lock()?;

        let frame = stack
            .pop()
            .ok_or_else(|| CoreError::no_open_transaction(*id))?;
        let depth = stack.depth();
        debug!(session = %id, depth, discarded = frame.len(), "rollback");
        Ok(depth)
    }

    // ========================================================================
    // Reads and writes
    // ========================================================================

    /// Reads the value of `key` visible to the caller.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the key is absent or shadowed by a delete,
    /// or `SessionNotFound` for an unknown session.
    pub fn get(&self, session: Option<&SessionId>, key: &str) -> CoreResult<Value> {
        validate_key(key)?;
        let value = match session {
            None => self.store.get(key)?,
            Some(id) => {
                let handle = self.sessions.get(id)?;
                let stack = handle.lock()?;
                self.visible(&stack, key)?
            }
        };
        value.ok_or_else(|| CoreError::not_found(key))
    }

    /// Writes `key`.
    ///
    /// Inside a transaction the write is staged in the top frame; otherwise
    /// it is applied to the store immediately.
    ///
    /// # Errors
    ///
    /// Returns `SessionNotFound` for an unknown session, `InvalidArgument`
    /// for an empty key, or the store error of a failed autocommit.
    pub fn put(&self, session: Option<&SessionId>, key: impl Into<Key>, value: Value) -> CoreResult<()> {
        let key = key.into();
        validate_key(&key)?;

        let Some(id) = session else {
            return self.autocommit_put(key, value);
        };
        let handle = self.sessions.get(id)?;
        let mut stack = handle.lock()?;
        match stack.top_mut() {
            Some(frame) => {
                frame.set(key, value);
                Ok(())
            }
            None => self.autocommit_put(key, value),
        }
    }

    /// Deletes `key` if it is visible to the caller.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` without changing anything if the key is not
    /// visible, `SessionNotFound` for an unknown session, or the store
    /// error of a failed autocommit.
    pub fn delete(&self, session: Option<&SessionId>, key: &str) -> CoreResult<()> {
        validate_key(key)?;

        let Some(id) = session else {
            return self.autocommit_delete(key);
        };
        let handle = self.sessions.get(id)?;
        let mut stack = handle.lock()?;
        if stack.is_autocommit() {
            return self.autocommit_delete(key);
        }
        if self.visible(&stack, key)?.is_none() {
            return Err(CoreError::not_found(key));
        }
        if let Some(frame) = stack.top_mut() {
            frame.delete(key);
        }
        Ok(())
    }

    // ========================================================================
    // Read-only views
    // ========================================================================

    /// Snapshot of the committed mapping. Never includes staged writes.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read.
    pub fn dump_committed(&self) -> CoreResult<BTreeMap<Key, Value>> {
        self.store.dump()
    }

    /// Every retained history record, oldest first.
    pub fn commit_history(&self) -> Vec<CommitRecord> {
        self.history.records()
    }

    /// History records after `after`, at most `limit` of them.
    pub fn commit_history_since(&self, after: SequenceNumber, limit: usize) -> Vec<CommitRecord> {
        self.history.since(after, limit)
    }

    /// The commit history itself.
    pub fn history(&self) -> &CommitHistory {
        &self.history
    }

    // ========================================================================
    // Internals
    // ========================================================================

    fn visible(&self, stack: &TransactionStack, key: &str) -> CoreResult<Option<Value>> {
        match stack.lookup(key) {
            FrameLookup::Present(value) => Ok(Some(value.clone())),
            FrameLookup::Deleted => Ok(None),
            FrameLookup::Unmentioned => self.store.get(key),
        }
    }

    fn autocommit_put(&self, key: Key, value: Value) -> CoreResult<()> {
        let puts = BTreeMap::from([(key, value)]);
        let deletes = BTreeSet::new();
        self.apply_and_record(&WriteBatch::new(&puts, &deletes), CommitKind::Autocommit)?;
        Ok(())
    }

    fn autocommit_delete(&self, key: &str) -> CoreResult<()> {
        let writer = self.writer.lock();
        if self.store.get(key)?.is_none() {
            return Err(CoreError::not_found(key));
        }
        let puts = BTreeMap::new();
        let deletes = BTreeSet::from([key.to_string()]);
        self.apply_locked(&writer, &WriteBatch::new(&puts, &deletes), CommitKind::Autocommit)?;
        Ok(())
    }

    fn apply_and_record(&self, batch: &WriteBatch<'_>, kind: CommitKind) -> CoreResult<SequenceNumber> {
        let writer = self.writer.lock();
        self.apply_locked(&writer, batch, kind)
    }

    /// Applies `batch` and records it. The caller holds the writer lock,
    /// so history records land in sequence order.
    fn apply_locked(
        &self,
        _writer: &MutexGuard<'_, ()>,
        batch: &WriteBatch<'_>,
        kind: CommitKind,
    ) -> CoreResult<SequenceNumber> {
        let sequence = self.store.apply(batch)?;
        info!(
            sequence = sequence.as_u64(),
            ?kind,
            puts = batch.puts().count(),
            deletes = batch.deletes().count(),
            "applied batch"
        );
        self.history.record(CommitRecord::from_batch(sequence, kind, batch));
        Ok(sequence)
    }
}

impl std::fmt::Debug for StagingEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StagingEngine")
            .field("sessions", &self.sessions.len())
            .field("committed_seq", &self.store.committed_seq())
            .field("history", &self.history)
            .finish_non_exhaustive()
    }
}
