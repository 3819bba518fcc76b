//! Tree store.
//!
//! Owns the canonical forest and applies the four operations (build, add,
//! remove, edit) plus clear. Every operation leaves a fully repaired tree and
//! never fails: missing targets, duplicate ids and orphans are logged and
//! resolved locally.
//!
//! ## Snapshots
//!
//! The tree lives behind an `Arc`. Readers take [`TreeStore::snapshot`] and
//! keep a consistent view for as long as they hold it; mutations copy on
//! write when a snapshot is outstanding, so a reader never sees a
//! half-applied operation.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use chrono::{DateTime, FixedOffset};
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::TreeConfig;
use crate::message::Message;
use crate::mutation::{MutationReport, TreeMutation};
use crate::tree::attach::{self, Resolution};
use crate::tree::repair::{self, Placement, Repair};
use crate::tree::{MessageNode, Tree};

/// Result of a build or add.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BatchReport {
    /// New nodes created.
    pub inserted: usize,
    /// Ids skipped because they were already present.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<String>,
    /// Orphans and where repair put them, in id order.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub repairs: Vec<Repair>,
    /// Previously repaired nodes moved under their declared parent.
    /// Previously repaired nodes that were repaired again show up in
    /// `repairs`.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub adopted: Vec<String>,
}

/// Result of a remove.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RemoveReport {
    pub removed: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub missing: Vec<String>,
    /// Children moved up one level.
    pub promoted: usize,
}

#[derive(Debug, Default)]
pub struct TreeStore {
    tree: Arc<Tree>,
    config: TreeConfig,
    /// Nodes placed by repair rather than under their declared parent, with
    /// the placement repair chose.
    repaired: HashMap<String, Placement>,
    /// A removal may have moved repaired nodes or their anchors; the next add
    /// re-homes all of them.
    rehome_all: bool,
}

impl TreeStore {
    /// Creates an empty store with default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty store with the given configuration.
    pub fn with_config(config: TreeConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &TreeConfig {
        &self.config
    }

    /// Current tree.
    pub fn tree(&self) -> &Tree {
        &self.tree
    }

    /// Shared handle to the current tree. Unaffected by later operations.
    pub fn snapshot(&self) -> Arc<Tree> {
        Arc::clone(&self.tree)
    }

    pub fn messages_count(&self) -> usize {
        self.tree.len()
    }

    /// Rebuilds the tree from scratch.
    ///
    /// The result depends only on the set of messages, not their order.
    pub fn build(&mut self, messages: impl IntoIterator<Item = Message>) -> BatchReport {
        let mut next = Tree::default();
        self.repaired.clear();
        self.rehome_all = false;
        let report = insert_batch(&mut next, &self.config, &mut self.repaired, false, messages);
        self.tree = Arc::new(next);
        report
    }

    /// Merges messages into the existing tree. Ids already present are skipped.
    pub fn add_messages(&mut self, messages: impl IntoIterator<Item = Message>) -> BatchReport {
        let rehome_all = std::mem::take(&mut self.rehome_all);
        insert_batch(
            Arc::make_mut(&mut self.tree),
            &self.config,
            &mut self.repaired,
            rehome_all,
            messages,
        )
    }

    /// Removes messages by id.
    ///
    /// A removed node's children move to the node that held it (or to the
    /// root list), appended after the existing siblings. Unknown ids are
    /// skipped.
    pub fn remove_messages<I, S>(&mut self, ids: I) -> RemoveReport
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let resort = self.config.resort_after_promotion;
        let tree = Arc::make_mut(&mut self.tree);
        let mut report = RemoveReport::default();

        for id in ids {
            let id = id.as_ref();
            let Some(node) = tree.nodes.remove(id) else {
                warn!(id, "remove target not found");
                report.missing.push(id.to_string());
                continue;
            };
            self.repaired.remove(id);

            let promoted = node.children.len();
            match tree.parents.remove(id) {
                Some(parent_id) => {
                    for child in &node.children {
                        tree.parents.insert(child.clone(), parent_id.clone());
                    }
                    if let Some(parent) = tree.nodes.get_mut(&parent_id) {
                        parent.children.retain(|c| c != id);
                        parent.children.extend(node.children);
                    }
                    if resort && promoted > 0 {
                        tree.sort_children(&parent_id);
                    }
                }
                None => {
                    for child in &node.children {
                        tree.parents.remove(child);
                    }
                    tree.roots.retain(|r| r != id);
                    tree.roots.extend(node.children);
                    if resort && promoted > 0 {
                        tree.sort_roots();
                    }
                }
            }

            debug!(id, promoted, "removed message");
            report.promoted += promoted;
            report.removed.push(id.to_string());
        }

        if !report.removed.is_empty() && !self.repaired.is_empty() {
            self.rehome_all = true;
        }
        report
    }

    /// Replaces the payload of an existing message. Children and position are
    /// left untouched. Returns false (and logs) when the id is unknown.
    pub fn edit_message(&mut self, message: Message) -> bool {
        if !self.tree.contains(&message.id) {
            warn!(id = %message.id, "edit target not found");
            return false;
        }
        let tree = Arc::make_mut(&mut self.tree);
        if let Some(node) = tree.nodes.get_mut(&message.id) {
            node.message = message;
        }
        true
    }

    /// Drops every message.
    pub fn clear_messages(&mut self) {
        self.tree = Arc::new(Tree::default());
        self.repaired.clear();
        self.rehome_all = false;
    }

    /// Applies a recorded mutation.
    pub fn apply(&mut self, mutation: TreeMutation) -> MutationReport {
        match mutation {
            TreeMutation::Build { messages } => MutationReport::Batch(self.build(messages)),
            TreeMutation::Add { messages } => MutationReport::Batch(self.add_messages(messages)),
            TreeMutation::Remove { ids } => MutationReport::Remove(self.remove_messages(ids)),
            TreeMutation::Edit { message } => MutationReport::Edit {
                found: self.edit_message(message),
            },
            TreeMutation::Clear => {
                self.clear_messages();
                MutationReport::Clear
            }
        }
    }
}

/// Inserts a batch in two passes: register every new id, then link.
///
/// Nodes placed by repair in earlier batches are provisional. With
/// `rehome_repaired` set, those the batch could move are detached and go
/// through the link pass again alongside the new messages, so the result
/// matches a single build over everything seen. Sibling lists are sorted once
/// per touched parent at the end.
fn insert_batch(
    tree: &mut Tree,
    config: &TreeConfig,
    repaired: &mut HashMap<String, Placement>,
    rehome_all: bool,
    messages: impl IntoIterator<Item = Message>,
) -> BatchReport {
    let mut report = BatchReport::default();

    let mut fresh = Vec::new();
    for message in messages {
        if tree.nodes.contains_key(&message.id) {
            warn!(id = %message.id, "skipping duplicate message id");
            report.skipped.push(message.id);
            continue;
        }
        fresh.push(message.id.clone());
        tree.nodes
            .insert(message.id.clone(), MessageNode::new(message));
    }
    report.inserted = fresh.len();

    let carried: Vec<String> = if !config.rehome_repaired || repaired.is_empty() {
        Vec::new()
    } else if rehome_all {
        repaired.keys().cloned().collect()
    } else {
        rehome_candidates(tree, repaired, &fresh, config)
    };
    for id in &carried {
        repaired.remove(id);
        tree.detach(id);
    }
    if !carried.is_empty() {
        debug!(count = carried.len(), "re-homing repaired messages");
    }

    // One pass in id order over new and carried ids keeps cycle-guard
    // verdicts independent of arrival order and of batch boundaries.
    let mut pending: Vec<(String, bool)> = fresh
        .into_iter()
        .map(|id| (id, false))
        .chain(carried.into_iter().map(|id| (id, true)))
        .collect();
    pending.sort_unstable();

    let mut touched: HashSet<String> = HashSet::new();
    let mut orphans = Vec::new();
    for (id, was_carried) in pending {
        match resolve_in(tree, &id, config) {
            Some(Resolution::Root) => tree.roots.push(id),
            Some(Resolution::Attached(parent)) => {
                tree.link(&parent, &id);
                if was_carried {
                    debug!(id = %id, parent = %parent, "adopted by declared parent");
                    report.adopted.push(id);
                }
                touched.insert(parent);
            }
            Some(Resolution::Orphan) => orphans.push(id),
            None => {}
        }
    }

    for id in orphans {
        let Some(node) = tree.get(&id) else {
            continue;
        };
        let placement =
            repair::choose_placement(&node.message, tree, config.repair, config.cycle_guard);
        match placement.anchor() {
            Some(anchor) => {
                tree.link(anchor, &id);
                touched.insert(anchor.to_string());
            }
            None => tree.roots.push(id.clone()),
        }
        debug!(id = %id, %placement, "repaired orphan");
        repaired.insert(id.clone(), placement.clone());
        report.repairs.push(Repair { id, placement });
    }
    if !report.repairs.is_empty() {
        warn!(count = report.repairs.len(), "repaired orphaned messages");
    }

    for parent in &touched {
        tree.sort_children(parent);
    }
    tree.sort_roots();
    report
}

/// Repaired nodes whose placement the incoming batch could change, in id
/// order.
///
/// A node qualifies when the batch delivers its declared parent or
/// grandparent, or a message whose sequence or timestamp lands between the
/// node's current anchor and the node itself.
///
/// With the cycle guard on, placements also depend on who sits in whose
/// subtree, so the set is widened to repaired ancestors and repaired
/// descendants of qualifying nodes. Moving a qualifying node changes what its
/// ancestors may anchor to, and a single build would have detached the
/// descendants while it linked and repaired.
fn rehome_candidates(
    tree: &Tree,
    repaired: &HashMap<String, Placement>,
    fresh: &[String],
    config: &TreeConfig,
) -> Vec<String> {
    let fresh_ids: HashSet<&str> = fresh.iter().map(String::as_str).collect();
    let mut sequences: Vec<i64> = fresh
        .iter()
        .filter_map(|id| tree.get(id)?.message.sequence)
        .collect();
    sequences.sort_unstable();
    let mut timestamps: Vec<DateTime<FixedOffset>> = fresh
        .iter()
        .filter_map(|id| tree.get(id)?.message.created_at())
        .collect();
    timestamps.sort_unstable();

    let mut affected: HashSet<&str> = HashSet::new();
    for (id, placement) in repaired {
        let Some(node) = tree.get(id) else {
            continue;
        };
        let message = &node.message;
        let declared_arrived = [message.parent_id(), message.grandparent_id()]
            .into_iter()
            .flatten()
            .any(|link| fresh_ids.contains(link));
        if declared_arrived
            || (config.repair.sequence && closer_sequence(tree, message, placement, &sequences))
            || (config.repair.timestamp && closer_timestamp(tree, message, placement, &timestamps))
        {
            affected.insert(id.as_str());
        }
    }

    if config.cycle_guard {
        let seeds: Vec<&str> = affected.iter().copied().collect();
        let mut walked: HashSet<&str> = HashSet::new();
        for seed in seeds {
            let mut current = Some(seed);
            while let Some(id) = current {
                if !walked.insert(id) {
                    break;
                }
                if let Some((key, _)) = repaired.get_key_value(id) {
                    affected.insert(key.as_str());
                }
                current = tree.parent_of(id);
            }
        }

        let mut stack: Vec<&str> = affected.iter().copied().collect();
        let mut visited: HashSet<&str> = HashSet::new();
        while let Some(id) = stack.pop() {
            if !visited.insert(id) {
                continue;
            }
            if let Some((key, _)) = repaired.get_key_value(id) {
                affected.insert(key.as_str());
            }
            stack.extend(tree.children(id).iter().map(String::as_str));
        }
    }

    let mut out: Vec<String> = affected.into_iter().map(str::to_owned).collect();
    out.sort_unstable();
    out
}

/// Whether a new sequence falls in `[anchor, own)` for a node that the
/// sequence step could place.
fn closer_sequence(tree: &Tree, message: &Message, placement: &Placement, fresh: &[i64]) -> bool {
    let Some(own) = message.sequence else {
        return false;
    };
    let floor = match placement {
        Placement::Grandparent(_) => return false,
        Placement::ClosestSequence(anchor) => tree
            .get(anchor)
            .and_then(|node| node.message.sequence)
            .unwrap_or(i64::MIN),
        Placement::ClosestTimestamp(_) | Placement::Root => i64::MIN,
    };
    let idx = fresh.partition_point(|seq| *seq < floor);
    fresh.get(idx).is_some_and(|seq| *seq < own)
}

/// Whether a new timestamp falls in `[anchor, own)` for a node that the
/// timestamp step could place.
fn closer_timestamp(
    tree: &Tree,
    message: &Message,
    placement: &Placement,
    fresh: &[DateTime<FixedOffset>],
) -> bool {
    let Some(own) = message.created_at() else {
        return false;
    };
    let idx = match placement {
        Placement::Grandparent(_) | Placement::ClosestSequence(_) => return false,
        Placement::ClosestTimestamp(anchor) => {
            match tree.get(anchor).and_then(|node| node.message.created_at()) {
                Some(floor) => fresh.partition_point(|ts| *ts < floor),
                None => 0,
            }
        }
        Placement::Root => 0,
    };
    fresh.get(idx).is_some_and(|ts| *ts < own)
}

fn resolve_in(tree: &Tree, id: &str, config: &TreeConfig) -> Option<Resolution> {
    let node = tree.get(id)?;
    Some(attach::resolve(&node.message, tree, config.cycle_guard))
}
