//! Observational history of durable applies.
//!
//! Every batch the engine makes durable is described by one
//! [`CommitRecord`]. The history is for inspection only: the engine writes
//! it after each successful apply and never reads it back.

use crate::error::{CoreError, CoreResult};
use crate::store::WriteBatch;
use crate::types::SequenceNumber;
use crate::value::{Key, Value};
use parking_lot::{Mutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// What triggered a durable apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitKind {
    /// Outermost commit of a transaction.
    Transaction,
    /// A single put or delete made outside any transaction.
    Autocommit,
}

/// One durable apply, as recorded in the history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommitRecord {
    /// Sequence number assigned by the store.
    pub sequence: SequenceNumber,
    /// Transaction commit or autocommit write.
    pub kind: CommitKind,
    /// Keys written, with their new values.
    pub writes: BTreeMap<Key, Value>,
    /// Keys removed, sorted.
    pub deletes: Vec<Key>,
    /// Wall-clock time of the apply (Unix timestamp in milliseconds).
    pub timestamp_ms: u64,
    /// Name of the thread that performed the apply, if it has one.
    pub thread: Option<String>,
}

impl CommitRecord {
    /// Describes `batch`, applied just now on the current thread.
    pub fn from_batch(sequence: SequenceNumber, kind: CommitKind, batch: &WriteBatch<'_>) -> Self {
        let timestamp_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64;

        Self {
            sequence,
            kind,
            writes: batch.puts().map(|(k, v)| (k.clone(), v.clone())).collect(),
            deletes: batch.deletes().cloned().collect(),
            timestamp_ms,
            thread: std::thread::current().name().map(String::from),
        }
    }

    /// Encodes the record as one compact JSON line, without the newline.
    pub fn to_json_line(&self) -> CoreResult<String> {
        serde_json::to_string(self).map_err(|e| CoreError::codec(e.to_string()))
    }
}

/// Bounded, sequence-ordered list of [`CommitRecord`]s.
///
/// Thread-safe. When `max_history` is exceeded the oldest records are
/// evicted. An optional sink file receives every record as a JSON line;
/// sink failures are logged and otherwise ignored.
pub struct CommitHistory {
    records: RwLock<VecDeque<CommitRecord>>,
    max_history: usize,
    sink: Option<Mutex<HistorySink>>,
}

struct HistorySink {
    path: PathBuf,
    file: File,
}

impl CommitHistory {
    /// Creates an in-memory history keeping at most `max_history` records.
    #[must_use]
    pub fn new(max_history: usize) -> Self {
        Self {
            records: RwLock::new(VecDeque::new()),
            max_history,
            sink: None,
        }
    }

    /// Creates a history that also appends every record to `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the sink file cannot be opened for appending.
    pub fn with_sink(max_history: usize, path: &Path) -> CoreResult<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            sink: Some(Mutex::new(HistorySink {
                path: path.to_path_buf(),
                file,
            })),
            ..Self::new(max_history)
        })
    }

    /// Adds a record.
    ///
    /// Records applied concurrently may arrive out of order; each is
    /// inserted at its sequence position.
    pub fn record(&self, record: CommitRecord) {
        if let Some(sink) = &self.sink {
            sink.lock().append(&record);
        }

        let mut records = self.records.write();
        let pos = records
            .iter()
            .rposition(|r| r.sequence < record.sequence)
            .map_or(0, |i| i + 1);
        records.insert(pos, record);
        if records.len() > self.max_history {
            let excess = records.len() - self.max_history;
            records.drain(..excess);
        }
    }

    /// All retained records, oldest first.
    pub fn records(&self) -> Vec<CommitRecord> {
        self.records.read().iter().cloned().collect()
    }

    /// Records with a sequence greater than `after`, up to `limit`.
    pub fn since(&self, after: SequenceNumber, limit: usize) -> Vec<CommitRecord> {
        self.records
            .read()
            .iter()
            .filter(|r| r.sequence > after)
            .take(limit)
            .cloned()
            .collect()
    }

    /// Number of retained records.
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Returns true if no record is retained.
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    /// Sequence of the newest retained record, or zero.
    pub fn latest_sequence(&self) -> SequenceNumber {
        self.records
            .read()
            .back()
            .map_or(SequenceNumber::new(0), |r| r.sequence)
    }

    /// Renders every retained record as newline-terminated JSON lines.
    ///
    /// # Errors
    ///
    /// Returns an error if a record cannot be serialised.
    pub fn to_json_lines(&self) -> CoreResult<String> {
        let mut out = String::new();
        for record in self.records.read().iter() {
            out.push_str(&record.to_json_line()?);
            out.push('\n');
        }
        Ok(out)
    }

    /// Path of the sink file, if one is configured.
    pub fn sink_path(&self) -> Option<PathBuf> {
        self.sink.as_ref().map(|s| s.lock().path.clone())
    }
}

impl HistorySink {
    fn append(&mut self, record: &CommitRecord) {
        let result = record.to_json_line().and_then(|mut line| {
            line.push('\n');
            self.file.write_all(line.as_bytes())?;
            self.file.flush()?;
            Ok(())
        });
        if let Err(err) = result {
            tracing::warn!(
                path = %self.path.display(),
                sequence = record.sequence.as_u64(),
                error = %err,
                "failed to append commit history record"
            );
        }
    }
}

impl std::fmt::Debug for CommitHistory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommitHistory")
            .field("len", &self.len())
            .field("max_history", &self.max_history)
            .field("sink", &self.sink_path())
            .finish()
    }
}
