//! Orphan repair.
//!
//! An orphan is a message whose declared parent is not in the tree, typically
//! because the server deleted the parent without relinking its replies. Repair
//! picks the best remaining anchor, first match wins:
//!
//! 1. the declared grandparent, if present
//! 2. the node with the greatest `sequence` strictly below the orphan's
//! 3. the node with the latest `created_at` strictly before the orphan's
//! 4. the root list
//!
//! Ties in steps 2 and 3 go to the smallest id. Repair is total: every orphan
//! gets a placement.

use std::fmt;

use serde::Serialize;

use super::Tree;
use crate::config::RepairConfig;
use crate::message::Message;

/// Where an orphan ended up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "anchor", rename_all = "snake_case")]
pub enum Placement {
    Grandparent(String),
    ClosestSequence(String),
    ClosestTimestamp(String),
    Root,
}

impl Placement {
    /// The node the orphan was attached under, if any.
    pub fn anchor(&self) -> Option<&str> {
        match self {
            Placement::Grandparent(id)
            | Placement::ClosestSequence(id)
            | Placement::ClosestTimestamp(id) => Some(id),
            Placement::Root => None,
        }
    }
}

impl fmt::Display for Placement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Placement::Grandparent(id) => write!(f, "grandparent {id}"),
            Placement::ClosestSequence(id) => write!(f, "closest sequence {id}"),
            Placement::ClosestTimestamp(id) => write!(f, "closest timestamp {id}"),
            Placement::Root => f.write_str("root"),
        }
    }
}

/// One orphan and its chosen placement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Repair {
    pub id: String,
    pub placement: Placement,
}

/// Chooses a placement for `orphan`.
///
/// With `cycle_guard` set, nodes inside the orphan's own subtree are never
/// chosen as anchors, so repair cannot close a cycle. The guard is only
/// consulted for candidates that would beat the best anchor found so far.
pub fn choose_placement(
    orphan: &Message,
    tree: &Tree,
    steps: RepairConfig,
    cycle_guard: bool,
) -> Placement {
    let allowed = |candidate: &str| !cycle_guard || !tree.in_subtree(&orphan.id, candidate);

    if steps.grandparent
        && let Some(gp) = orphan.grandparent_id()
        && tree.contains(gp)
        && allowed(gp)
    {
        return Placement::Grandparent(gp.to_string());
    }

    if steps.sequence
        && let Some(seq) = orphan.sequence
        && let Some(anchor) = closest_before(tree, seq, |m| m.sequence, &allowed)
    {
        return Placement::ClosestSequence(anchor);
    }

    if steps.timestamp
        && let Some(ts) = orphan.created_at()
        && let Some(anchor) = closest_before(tree, ts, Message::created_at, &allowed)
    {
        return Placement::ClosestTimestamp(anchor);
    }

    Placement::Root
}

/// The node whose key is greatest while strictly below `limit`, smallest id
/// on ties, skipping nodes rejected by `allowed`.
fn closest_before<K: Ord>(
    tree: &Tree,
    limit: K,
    key: impl Fn(&Message) -> Option<K>,
    allowed: &impl Fn(&str) -> bool,
) -> Option<String> {
    let mut best: Option<(K, &str)> = None;
    for node in tree.nodes() {
        let id = node.id();
        let Some(candidate) = key(&node.message) else {
            continue;
        };
        if candidate >= limit {
            continue;
        }
        let beats = match &best {
            Some((best_key, best_id)) => {
                candidate > *best_key || (candidate == *best_key && id < *best_id)
            }
            None => true,
        };
        if beats && allowed(id) {
            best = Some((candidate, id));
        }
    }
    best.map(|(_, id)| id.to_string())
}
