//! Storage backend trait definition.

use crate::error::StorageResult;

/// An append-only byte store.
///
/// The commit log of `stagekv_core` is the only writer. It appends one
/// framed record per durable apply and, when an append or flush fails,
/// truncates back to the size it observed before the append so that a
/// half-written record never sits in front of later ones.
///
/// # Invariants
///
/// - `append` returns the offset of the first written byte
/// - `read_at` returns exactly the bytes previously appended at that offset
/// - after `flush`/`sync` succeed the appended bytes survive a process exit
/// - implementations are `Send + Sync`; callers serialise mutation
pub trait StorageBackend: Send + Sync {
    /// Reads `len` bytes starting at `offset`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::StorageError::ReadPastEnd`] if the range is not
    /// fully inside the backend, or an I/O error.
    fn read_at(&self, offset: u64, len: usize) -> StorageResult<Vec<u8>>;

    /// Appends `data` and returns the offset it was written at.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails. The backend may then hold a
    /// partial write; callers restore a known size with [`Self::truncate`].
    fn append(&mut self, data: &[u8]) -> StorageResult<u64>;

    /// Pushes appended bytes out of user-space buffers.
    ///
    /// # Errors
    ///
    /// Returns an error if the flush fails.
    fn flush(&mut self) -> StorageResult<()>;

    /// Forces appended bytes and file metadata onto durable media.
    ///
    /// # Errors
    ///
    /// Returns an error if the sync fails.
    fn sync(&mut self) -> StorageResult<()>;

    /// Returns the current size in bytes, which is the next append offset.
    ///
    /// # Errors
    ///
    /// Returns an error if the size cannot be determined.
    fn size(&self) -> StorageResult<u64>;

    /// Discards every byte at or after `new_size`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::StorageError::TruncateBeyondEnd`] if `new_size` is
    /// larger than the current size, or an I/O error.
    fn truncate(&mut self, new_size: u64) -> StorageResult<()>;

    /// Reads the whole backend into memory.
    ///
    /// Used when the commit log is replayed at load time.
    ///
    /// # Errors
    ///
    /// Returns an error if the size or the read fails.
    fn read_all(&self) -> StorageResult<Vec<u8>> {
        let size = self.size()?;
        self.read_at(0, size as usize)
    }
}
