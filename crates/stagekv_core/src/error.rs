//! Error types for stagekv core.

use crate::session::SessionId;
use std::io;
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors returned by the staging engine and the durable store.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The session identifier is unknown to the registry.
    #[error("session not found: {session_id}")]
    SessionNotFound {
        /// The identifier that was looked up.
        session_id: SessionId,
    },

    /// `commit` or `rollback` was called with no open transaction.
    #[error("no open transaction in session {session_id}")]
    NoOpenTransaction {
        /// The session at depth 0.
        session_id: SessionId,
    },

    /// The key is not visible to the caller.
    #[error("key not found: {key}")]
    NotFound {
        /// The key that was looked up.
        key: String,
    },

    /// The durable apply of an outermost commit failed.
    ///
    /// The session is left exactly as it was before the commit: depth 1
    /// with its frame intact, so the caller may retry or roll back.
    #[error("flush to durable store failed: {source}")]
    FlushFailed {
        /// The store fault that aborted the flush.
        #[source]
        source: Box<CoreError>,
    },

    /// Storage backend error.
    #[error("storage error: {0}")]
    Storage(#[from] stagekv_storage::StorageError),

    /// I/O error outside the storage backend (lock file, history sink).
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A value or log record could not be encoded or decoded.
    #[error("codec error: {message}")]
    Codec {
        /// Description of the failure.
        message: String,
    },

    /// The commit log is structurally invalid.
    #[error("commit log corruption at offset {offset}: {message}")]
    LogCorruption {
        /// Offset of the offending record.
        offset: u64,
        /// Description of the corruption.
        message: String,
    },

    /// A commit log record failed its checksum.
    #[error("checksum mismatch at offset {offset}: expected {expected:08x}, got {actual:08x}")]
    ChecksumMismatch {
        /// Offset of the offending record.
        offset: u64,
        /// Checksum stored in the record.
        expected: u32,
        /// Checksum computed over the record.
        actual: u32,
    },

    /// Another process holds the store directory lock.
    #[error("store locked: another process has exclusive access")]
    StoreLocked,

    /// An argument was rejected before touching any state.
    #[error("invalid argument: {message}")]
    InvalidArgument {
        /// Description of the problem.
        message: String,
    },
}

impl CoreError {
    /// Creates a session-not-found error.
    pub fn session_not_found(session_id: SessionId) -> Self {
        Self::SessionNotFound { session_id }
    }

    /// Creates a no-open-transaction error.
    pub fn no_open_transaction(session_id: SessionId) -> Self {
        Self::NoOpenTransaction { session_id }
    }

    /// Creates a not-found error.
    pub fn not_found(key: impl Into<String>) -> Self {
        Self::NotFound { key: key.into() }
    }

    /// Wraps a store fault raised during an outermost commit.
    pub fn flush_failed(source: CoreError) -> Self {
        Self::FlushFailed {
            source: Box::new(source),
        }
    }

    /// Creates a codec error.
    pub fn codec(message: impl Into<String>) -> Self {
        Self::Codec {
            message: message.into(),
        }
    }

    /// Creates a commit log corruption error.
    pub fn log_corruption(offset: u64, message: impl Into<String>) -> Self {
        Self::LogCorruption {
            offset,
            message: message.into(),
        }
    }

    /// Creates an invalid argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Returns true if repeating the same call may succeed.
    ///
    /// Only a failed flush qualifies: the staged frame is still in place.
    #[must_use]
    pub fn is_retriable(&self) -> bool {
        matches!(self, Self::FlushFailed { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn flush_failed_exposes_its_source() {
        let err = CoreError::flush_failed(CoreError::Storage(
            stagekv_storage::StorageError::Closed,
        ));
        assert!(err.is_retriable());
        let source = err.source().unwrap();
        assert!(source.to_string().contains("storage is closed"));
    }

    #[test]
    fn caller_errors_are_not_retriable() {
        let id = SessionId::new();
        assert!(!CoreError::no_open_transaction(id).is_retriable());
        assert!(!CoreError::session_not_found(id).is_retriable());
        assert!(!CoreError::not_found("k").is_retriable());
    }

    #[test]
    fn display_names_the_key() {
        assert_eq!(CoreError::not_found("user:1").to_string(), "key not found: user:1");
    }
}
