//! Sibling ordering.
//!
//! Siblings (a node's children, or the root list) are ordered by
//! `versionIndex` when both sides carry one, otherwise by `sequence` with a
//! missing value treated as 0. Equal keys fall back to the message id so the
//! order never depends on arrival order.

use std::cmp::Ordering;
use std::collections::HashMap;

use super::MessageNode;
use crate::message::Message;

/// Compares two sibling messages.
pub fn compare_messages(a: &Message, b: &Message) -> Ordering {
    let primary = match (a.version_index, b.version_index) {
        (Some(va), Some(vb)) => va.cmp(&vb),
        _ => a.sequence.unwrap_or(0).cmp(&b.sequence.unwrap_or(0)),
    };
    primary.then_with(|| a.id.cmp(&b.id))
}

/// Compares two sibling nodes by their payloads.
pub fn compare_nodes(a: &MessageNode, b: &MessageNode) -> Ordering {
    compare_messages(&a.message, &b.message)
}

/// Re-sorts a sibling id list against the node map.
///
/// Each id is looked up once up front. Ids missing from the map compare
/// equal to everything and keep their slot relative to each other.
pub fn sort_siblings(ids: &mut Vec<String>, nodes: &HashMap<String, MessageNode>) {
    if ids.len() < 2 {
        return;
    }
    let mut keyed: Vec<(Option<&Message>, String)> = ids
        .drain(..)
        .map(|id| (nodes.get(&id).map(|node| &node.message), id))
        .collect();
    stable_sort_by(&mut keyed, |(a, _), (b, _)| match (a, b) {
        (Some(a), Some(b)) => compare_messages(a, b),
        _ => Ordering::Equal,
    });
    ids.extend(keyed.into_iter().map(|(_, id)| id));
}

/// Bottom-up stable merge sort.
///
/// `slice::sort_by` may panic when the comparator is not a total order, and
/// mixed version/sequence metadata produces exactly that. This sort accepts
/// any comparator and always terminates with a permutation of the input.
pub(crate) fn stable_sort_by<T>(items: &mut Vec<T>, mut cmp: impl FnMut(&T, &T) -> Ordering) {
    let len = items.len();
    if len < 2 {
        return;
    }

    let mut order: Vec<usize> = (0..len).collect();
    let mut buf = vec![0usize; len];
    let mut width = 1;

    while width < len {
        let mut start = 0;
        while start < len {
            let mid = (start + width).min(len);
            let end = (start + 2 * width).min(len);
            let (mut i, mut j, mut k) = (start, mid, start);

            while i < mid && j < end {
                // Take from the right run only when strictly less (stability).
                if cmp(&items[order[j]], &items[order[i]]) == Ordering::Less {
                    buf[k] = order[j];
                    j += 1;
                } else {
                    buf[k] = order[i];
                    i += 1;
                }
                k += 1;
            }
            buf[k..k + (mid - i)].copy_from_slice(&order[i..mid]);
            k += mid - i;
            buf[k..k + (end - j)].copy_from_slice(&order[j..end]);

            start = end;
        }
        std::mem::swap(&mut order, &mut buf);
        width *= 2;
    }

    let mut slots: Vec<Option<T>> = items.drain(..).map(Some).collect();
    items.extend(order.into_iter().filter_map(|idx| slots[idx].take()));
}
