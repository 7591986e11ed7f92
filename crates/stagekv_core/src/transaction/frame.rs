//! One nesting level's staged mutations.

use crate::store::WriteBatch;
use crate::value::{Key, Value};
use std::collections::{BTreeMap, BTreeSet};

/// What a single frame says about a key.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FrameLookup<'a> {
    /// The frame overrides the key with a value.
    Present(&'a Value),
    /// The frame holds a tombstone: the key is absent at this level.
    Deleted,
    /// The frame does not mention the key; defer to the frame below.
    Unmentioned,
}

/// Pending puts and tombstones for one nesting level.
///
/// A key is never in both sets: the latest `set` or `delete` of a key
/// replaces whatever the frame held for it before.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OverlayFrame {
    puts: BTreeMap<Key, Value>,
    tombstones: BTreeSet<Key>,
}

impl OverlayFrame {
    /// Creates an empty frame.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Stages `key = value`, clearing any tombstone for `key`.
    pub fn set(&mut self, key: impl Into<Key>, value: Value) {
        let key = key.into();
        self.tombstones.remove(&key);
        self.puts.insert(key, value);
    }

    /// Stages a tombstone for `key`, clearing any staged put.
    pub fn delete(&mut self, key: impl Into<Key>) {
        let key = key.into();
        self.puts.remove(&key);
        self.tombstones.insert(key);
    }

    /// Looks up `key` in this frame only.
    #[must_use]
    pub fn lookup(&self, key: &str) -> FrameLookup<'_> {
        if let Some(value) = self.puts.get(key) {
            FrameLookup::Present(value)
        } else if self.tombstones.contains(key) {
            FrameLookup::Deleted
        } else {
            FrameLookup::Unmentioned
        }
    }

    /// Folds this frame into `parent` and consumes it.
    ///
    /// Every key this frame mentions overwrites the parent's entry for
    /// that key, put or tombstone alike. Keys this frame never mentions
    /// keep the parent's state.
    pub fn merge_into(self, parent: &mut OverlayFrame) {
        for key in self.tombstones {
            parent.delete(key);
        }
        for (key, value) in self.puts {
            parent.set(key, value);
        }
    }

    /// Returns true if the frame mentions no key.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.puts.is_empty() && self.tombstones.is_empty()
    }

    /// Number of keys the frame mentions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.puts.len() + self.tombstones.len()
    }

    /// Staged puts, in key order.
    pub fn puts(&self) -> impl Iterator<Item = (&Key, &Value)> {
        self.puts.iter()
    }

    /// Staged tombstones, in key order.
    pub fn tombstones(&self) -> impl Iterator<Item = &Key> {
        self.tombstones.iter()
    }

    /// Borrows the frame as a batch for the durable store.
    #[must_use]
    pub fn as_batch(&self) -> WriteBatch<'_> {
        WriteBatch::new(&self.puts, &self.tombstones)
    }
}
