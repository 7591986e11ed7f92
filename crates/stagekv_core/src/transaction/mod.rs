//! Per-session transaction state.
//!
//! A session's open transactions form a [`TransactionStack`]: one
//! [`OverlayFrame`] per nesting level, oldest at the bottom. Reads scan
//! the stack from the top down; writes touch only the top frame.
//!
//! Nothing here performs I/O. The staging engine decides when a frame
//! popped off the bottom of the stack is flushed to the durable store.

mod frame;
mod stack;

pub use frame::{FrameLookup, OverlayFrame};
pub use stack::{CommitStep, TransactionStack};
