//! The ordered stack of frames owned by one session.

use crate::transaction::frame::{FrameLookup, OverlayFrame};

/// Result of committing the top frame of a stack.
#[derive(Debug)]
pub enum CommitStep {
    /// The frame was folded into its parent; nothing is durable yet.
    /// Carries the new depth (at least 1).
    Merged(usize),
    /// The outermost frame was popped and now holds the net effect of the
    /// whole transaction. The caller must flush it, or hand it back with
    /// [`TransactionStack::restore`] if the flush fails.
    Flush(OverlayFrame),
}

/// A session's open transactions, bottom (oldest) to top (newest).
///
/// `depth() == 0` means no transaction is open and the session is in
/// autocommit mode.
#[derive(Debug, Default)]
pub struct TransactionStack {
    frames: Vec<OverlayFrame>,
}

impl TransactionStack {
    /// Creates an empty stack.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of open nesting levels.
    #[must_use]
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Returns true when no transaction is open.
    #[must_use]
    pub fn is_autocommit(&self) -> bool {
        self.frames.is_empty()
    }

    /// Opens a nesting level and returns the new depth.
    pub fn push(&mut self) -> usize {
        self.frames.push(OverlayFrame::new());
        self.frames.len()
    }

    /// Removes and returns the top frame.
    pub fn pop(&mut self) -> Option<OverlayFrame> {
        self.frames.pop()
    }

    /// The frame that receives writes, if a transaction is open.
    pub fn top_mut(&mut self) -> Option<&mut OverlayFrame> {
        self.frames.last_mut()
    }

    /// Resolves `key` against the open frames, newest first.
    ///
    /// The first frame that mentions the key decides: a put yields
    /// `Present`, a tombstone yields `Deleted` regardless of anything
    /// below it. `Unmentioned` means the durable store decides.
    #[must_use]
    pub fn lookup(&self, key: &str) -> FrameLookup<'_> {
        self.frames
            .iter()
            .rev()
            .map(|frame| frame.lookup(key))
            .find(|found| !matches!(found, FrameLookup::Unmentioned))
            .unwrap_or(FrameLookup::Unmentioned)
    }

    /// Commits the top frame.
    ///
    /// Returns `None` at depth 0. Otherwise pops the top frame and either
    /// merges it into the new top or, if it was the outermost frame,
    /// returns it for flushing.
    pub fn commit_top(&mut self) -> Option<CommitStep> {
        let top = self.frames.pop()?;
        match self.frames.last_mut() {
            Some(parent) => {
                top.merge_into(parent);
                Some(CommitStep::Merged(self.frames.len()))
            }
            None => Some(CommitStep::Flush(top)),
        }
    }

    /// Puts back an outermost frame whose flush failed.
    ///
    /// Only valid right after [`CommitStep::Flush`], when the stack is
    /// empty; the stack returns to depth 1 with the frame intact.
    pub fn restore(&mut self, frame: OverlayFrame) -> usize {
        debug_assert!(self.frames.is_empty(), "restore onto a non-empty stack");
        self.frames.push(frame);
        self.frames.len()
    }

    /// Drops every open frame and returns how many were discarded.
    pub fn clear(&mut self) -> usize {
        let discarded = self.frames.len();
        self.frames.clear();
        discarded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    fn v(s: &str) -> Value {
        Value::from(s)
    }

    #[test]
    fn push_counts_depth() {
        let mut stack = TransactionStack::new();
        assert!(stack.is_autocommit());
        assert_eq!(stack.push(), 1);
        assert_eq!(stack.push(), 2);
        assert_eq!(stack.depth(), 2);
    }

    #[test]
    fn lookup_prefers_the_newest_frame() {
        let mut stack = TransactionStack::new();
        stack.push();
        stack.top_mut().unwrap().set("k", v("outer"));
        stack.push();
        stack.top_mut().unwrap().set("k", v("inner"));

        assert_eq!(stack.lookup("k"), FrameLookup::Present(&v("inner")));
    }

    #[test]
    fn tombstone_hides_lower_frames() {
        let mut stack = TransactionStack::new();
        stack.push();
        stack.top_mut().unwrap().set("k", v("outer"));
        stack.push();
        stack.top_mut().unwrap().delete("k");

        assert_eq!(stack.lookup("k"), FrameLookup::Deleted);
    }

    #[test]
    fn unmentioned_falls_through() {
        let mut stack = TransactionStack::new();
        stack.push();
        stack.top_mut().unwrap().set("other", v("x"));
        assert_eq!(stack.lookup("k"), FrameLookup::Unmentioned);
    }

    #[test]
    fn commit_top_merges_until_outermost() {
        let mut stack = TransactionStack::new();
        stack.push();
        stack.top_mut().unwrap().set("a", v("1"));
        stack.push();
        stack.top_mut().unwrap().set("b", v("2"));

        assert!(matches!(stack.commit_top(), Some(CommitStep::Merged(1))));
        assert_eq!(stack.lookup("b"), FrameLookup::Present(&v("2")));

        match stack.commit_top() {
            Some(CommitStep::Flush(frame)) => assert_eq!(frame.len(), 2),
            other => panic!("expected flush, got {other:?}"),
        }
        assert_eq!(stack.depth(), 0);
        assert!(stack.commit_top().is_none());
    }

    #[test]
    fn restore_returns_to_depth_one() {
        let mut stack = TransactionStack::new();
        stack.push();
        stack.top_mut().unwrap().set("a", v("1"));

        let Some(CommitStep::Flush(frame)) = stack.commit_top() else {
            panic!("expected flush");
        };
        assert_eq!(stack.restore(frame), 1);
        assert_eq!(stack.lookup("a"), FrameLookup::Present(&v("1")));
    }

    #[test]
    fn pop_discards_only_the_top() {
        let mut stack = TransactionStack::new();
        stack.push();
        stack.top_mut().unwrap().set("k", v("outer"));
        stack.push();
        stack.top_mut().unwrap().set("k", v("inner"));

        stack.pop();
        assert_eq!(stack.lookup("k"), FrameLookup::Present(&v("outer")));
        assert_eq!(stack.clear(), 1);
        assert!(stack.is_autocommit());
    }
}
