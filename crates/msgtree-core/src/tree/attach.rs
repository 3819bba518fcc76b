//! Parent resolution for a single message.
//!
//! Resolution only looks at the tree as it is at call time. Batch callers
//! insert every node first and resolve afterwards, so a reply that arrives in
//! the same batch as its parent attaches regardless of array order.

use tracing::warn;

use super::Tree;
use crate::message::Message;

/// Outcome of resolving one message against the tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// No declared parent.
    Root,
    /// Declared parent exists; attach under it.
    Attached(String),
    /// Declared parent is missing (or refused by the cycle guard).
    Orphan,
}

/// Decides where `message` belongs.
///
/// With `cycle_guard` set, a declared parent that already sits inside the
/// message's own subtree is refused and the message is treated as an orphan.
/// The check costs at most the smaller of the parent's depth and the
/// message's subtree size.
pub fn resolve(message: &Message, tree: &Tree, cycle_guard: bool) -> Resolution {
    let Some(parent_id) = message.parent_id() else {
        return Resolution::Root;
    };
    if !tree.contains(parent_id) {
        return Resolution::Orphan;
    }
    if cycle_guard && tree.in_subtree(&message.id, parent_id) {
        warn!(
            id = %message.id,
            parent = parent_id,
            "parent link would form a cycle; treating as orphan"
        );
        return Resolution::Orphan;
    }
    Resolution::Attached(parent_id.to_string())
}
