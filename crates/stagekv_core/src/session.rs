//! Session identifiers and the session registry.

use crate::error::{CoreError, CoreResult};
use crate::transaction::TransactionStack;
use parking_lot::{MappedMutexGuard, Mutex, MutexGuard, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use uuid::Uuid;

/// Identifier of a client session.
///
/// Session IDs are random UUIDs, rendered in hyphenated form.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Creates a new random session ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Wraps an existing UUID.
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SessionId({})", self.0)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl FromStr for SessionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Shared handle to one session's transaction stack.
///
/// Cloning the handle does not copy the stack. All mutation goes through
/// [`SessionHandle::lock`], which serialises operations on the session.
/// A closed session keeps no stack, so a handle looked up before the close
/// sees the closure as soon as it takes the lock.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    id: SessionId,
    stack: Arc<Mutex<Option<TransactionStack>>>,
}

impl SessionHandle {
    fn new(id: SessionId) -> Self {
        Self {
            id,
            stack: Arc::new(Mutex::new(Some(TransactionStack::new()))),
        }
    }

    /// The session's identifier.
    #[must_use]
    pub fn id(&self) -> SessionId {
        self.id
    }

    /// Takes the per-session lock for the duration of one operation.
    ///
    /// # Errors
    ///
    /// Returns `SessionNotFound` if the session was closed, including when
    /// the close happened after this handle was looked up.
    pub fn lock(&self) -> CoreResult<MappedMutexGuard<'_, TransactionStack>> {
        MutexGuard::try_map(self.stack.lock(), Option::as_mut)
            .map_err(|_| CoreError::session_not_found(self.id))
    }

    /// Marks the session closed and hands back its stack.
    fn close(&self) -> Option<TransactionStack> {
        self.stack.lock().take()
    }
}

/// Owns every live session.
///
/// Structural changes (create, remove) take the registry lock; work on a
/// session's stack takes only that session's lock. [`SessionRegistry::get`]
/// releases the registry lock before returning, so a long operation on
/// one session never blocks lookups of another.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: RwLock<HashMap<SessionId, SessionHandle>>,
}

impl SessionRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a new session at depth 0 and returns its ID.
    pub fn create(&self) -> SessionId {
        let mut sessions = self.sessions.write();
        let mut id = SessionId::new();
        while sessions.contains_key(&id) {
            id = SessionId::new();
        }
        sessions.insert(id, SessionHandle::new(id));
        id
    }

    /// Looks up a session.
    ///
    /// # Errors
    ///
    /// Returns `SessionNotFound` if `id` is not registered.
    pub fn get(&self, id: &SessionId) -> CoreResult<SessionHandle> {
        self.sessions
            .read()
            .get(id)
            .cloned()
            .ok_or_else(|| CoreError::session_not_found(*id))
    }

    /// Unregisters a session, discarding any open transactions.
    ///
    /// Returns the depth the session had when it was removed.
    ///
    /// # Errors
    ///
    /// Returns `SessionNotFound` if `id` is not registered.
    pub fn remove(&self, id: &SessionId) -> CoreResult<usize> {
        let handle = self
            .sessions
            .write()
            .remove(id)
            .ok_or_else(|| CoreError::session_not_found(*id))?;
        Ok(handle.close().map_or(0, |stack| stack.depth()))
    }

    /// Returns true if `id` is registered.
    #[must_use]
    pub fn contains(&self, id: &SessionId) -> bool {
        self.sessions.read().contains_key(id)
    }

    /// Number of registered sessions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    /// Returns true if no session is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }

    /// Current depth of every session, ordered by ID.
    #[must_use]
    pub fn depths(&self) -> Vec<(SessionId, usize)> {
        let handles: Vec<SessionHandle> = self.sessions.read().values().cloned().collect();
        let mut depths: Vec<_> = handles
            .iter()
            .filter_map(|handle| handle.lock().ok().map(|stack| (handle.id(), stack.depth())))
            .collect();
        depths.sort_by_key(|(id, _)| *id);
        depths
    }
}
