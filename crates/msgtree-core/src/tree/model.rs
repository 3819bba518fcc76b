use std::collections::{BTreeMap, HashMap, HashSet};

use serde::Serialize;

use super::order;
use crate::message::Message;

/// A message plus its ordered children.
///
/// Children are stored as ids resolved against the owning [`Tree`]; a node
/// never points back at its parent.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessageNode {
    pub message: Message,
    pub children: Vec<String>,
}

impl MessageNode {
    pub fn new(message: Message) -> Self {
        Self {
            message,
            children: Vec::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.message.id
    }
}

/// Flat `{ roots, map }` view of the forest for serialization.
///
/// Serializing this never recurses along tree depth, so arbitrarily long
/// conversations are safe to emit. Keys in `map` are sorted.
#[derive(Debug, Clone, Serialize)]
pub struct FlatTree<'a> {
    pub roots: &'a [String],
    pub map: BTreeMap<&'a str, &'a MessageNode>,
}

/// The forest: id-keyed node map plus the ordered root list.
///
/// `parents` indexes every non-root node by the id of the node currently
/// holding it. It mirrors `children` exactly and is kept in sync by
/// [`Tree::link`] and [`Tree::detach`].
///
/// Two trees compare equal when they hold the same payloads in the same
/// positions, which is what "structurally identical" means for this crate.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Tree {
    pub(crate) nodes: HashMap<String, MessageNode>,
    pub(crate) roots: Vec<String>,
    pub(crate) parents: HashMap<String, String>,
}

impl Tree {
    /// Number of messages in the tree.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&MessageNode> {
        self.nodes.get(id)
    }

    /// Root ids in sibling order.
    pub fn roots(&self) -> &[String] {
        &self.roots
    }

    /// Child ids of `id` in sibling order. Empty for unknown ids.
    pub fn children(&self, id: &str) -> &[String] {
        self.nodes
            .get(id)
            .map_or(&[][..], |node| node.children.as_slice())
    }

    /// Iterates all nodes in unspecified order.
    pub fn nodes(&self) -> impl Iterator<Item = &MessageNode> {
        self.nodes.values()
    }

    /// The node that currently holds `id` as a child.
    ///
    /// This is the positional parent, which differs from the declared one
    /// when repair placed the node.
    pub fn parent_of(&self, id: &str) -> Option<&str> {
        self.parents.get(id).map(String::as_str)
    }

    /// Whether `candidate` lies in the subtree rooted at `id` (inclusive).
    ///
    /// Walks up from `candidate` and down from `id` in lockstep and stops as
    /// soon as either search is exhausted, so the cost is bounded by the
    /// smaller of `candidate`'s depth and `id`'s subtree size. Terminates on
    /// cyclic data.
    pub fn in_subtree(&self, id: &str, candidate: &str) -> bool {
        if id == candidate {
            return true;
        }
        let mut up = Some(candidate);
        let mut down = vec![id];
        let mut seen: HashSet<&str> = HashSet::new();

        loop {
            let Some(current) = up else {
                return false;
            };
            if current == id {
                return true;
            }
            up = self.parent_of(current);

            let Some(next) = down.pop() else {
                return false;
            };
            if !seen.insert(next) {
                continue;
            }
            if next == candidate {
                return true;
            }
            if let Some(node) = self.nodes.get(next) {
                down.extend(node.children.iter().map(String::as_str));
            }
        }
    }

    /// Borrowed `{ roots, map }` view, the shape callers read after every
    /// operation.
    pub fn to_flat(&self) -> FlatTree<'_> {
        FlatTree {
            roots: &self.roots,
            map: self.nodes.iter().map(|(id, node)| (id.as_str(), node)).collect(),
        }
    }

    /// Appends `child` under `parent` without re-sorting. Callers sort each
    /// touched list once when they are done linking.
    ///
    /// Returns false when `parent` is not in the tree.
    pub(crate) fn link(&mut self, parent: &str, child: &str) -> bool {
        let Some(node) = self.nodes.get_mut(parent) else {
            return false;
        };
        node.children.push(child.to_string());
        self.parents.insert(child.to_string(), parent.to_string());
        true
    }

    /// Re-sorts the children of `id` in comparator order.
    pub(crate) fn sort_children(&mut self, id: &str) {
        let Some(node) = self.nodes.get_mut(id) else {
            return;
        };
        let mut children = std::mem::take(&mut node.children);
        order::sort_siblings(&mut children, &self.nodes);
        if let Some(node) = self.nodes.get_mut(id) {
            node.children = children;
        }
    }

    /// Re-sorts the root list in comparator order.
    pub(crate) fn sort_roots(&mut self) {
        order::sort_siblings(&mut self.roots, &self.nodes);
    }

    /// Detaches `id` from wherever it currently sits (root list or a parent's
    /// children). The node itself and its subtree stay in the map.
    pub(crate) fn detach(&mut self, id: &str) {
        match self.parents.remove(id) {
            Some(parent_id) => {
                if let Some(parent) = self.nodes.get_mut(&parent_id) {
                    parent.children.retain(|c| c != id);
                }
            }
            None => self.roots.retain(|r| r != id),
        }
    }
}
