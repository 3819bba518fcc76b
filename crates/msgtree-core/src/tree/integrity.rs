//! Structural verification.
//!
//! The store keeps the forest well-formed on its own; these checks exist for
//! tests, the `check` command, and callers that build trees from untrusted
//! snapshots.

use std::collections::HashSet;

use thiserror::Error;

use super::{Tree, order};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IntegrityError {
    #[error("root '{id}' is not in the node map")]
    MissingRoot { id: String },
    #[error("node '{parent}' lists unknown child '{child}'")]
    DanglingChild { parent: String, child: String },
    #[error("node '{id}' is reachable from more than one place")]
    Duplicate { id: String },
    #[error("cycle through node '{id}'")]
    Cycle { id: String },
    #[error("node '{id}' is not reachable from any root")]
    Unreachable { id: String },
}

impl Tree {
    /// Checks that every node sits in exactly one place and that the forest
    /// is acyclic. Returns the first problem found.
    pub fn verify(&self) -> Result<(), IntegrityError> {
        for id in &self.roots {
            if !self.nodes.contains_key(id) {
                return Err(IntegrityError::MissingRoot { id: id.clone() });
            }
        }
        for node in self.nodes.values() {
            if let Some(child) = node.children.iter().find(|c| !self.nodes.contains_key(*c)) {
                return Err(IntegrityError::DanglingChild {
                    parent: node.id().to_string(),
                    child: child.clone(),
                });
            }
        }

        let mut visited: HashSet<&str> = HashSet::with_capacity(self.nodes.len());
        for root in &self.roots {
            self.walk(root, &mut visited)?;
        }

        // Sorted for a deterministic report.
        let mut unreachable: Vec<&String> = self
            .nodes
            .keys()
            .filter(|id| !visited.contains(id.as_str()))
            .collect();
        unreachable.sort();
        match unreachable.first() {
            Some(id) => Err(IntegrityError::Unreachable {
                id: (*id).clone(),
            }),
            None => Ok(()),
        }
    }

    /// Depth-first walk from one root with an explicit stack, so chain depth
    /// is bounded by memory rather than the call stack.
    fn walk<'a>(
        &'a self,
        root: &'a str,
        visited: &mut HashSet<&'a str>,
    ) -> Result<(), IntegrityError> {
        // Each frame is a node on the current path and its next child index.
        let mut stack: Vec<(&'a str, usize)> = Vec::new();
        let mut path: HashSet<&'a str> = HashSet::new();
        let mut next = Some(root);
        loop {
            if let Some(id) = next.take() {
                if path.contains(id) {
                    return Err(IntegrityError::Cycle { id: id.to_string() });
                }
                if !visited.insert(id) {
                    return Err(IntegrityError::Duplicate { id: id.to_string() });
                }
                path.insert(id);
                stack.push((id, 0));
            }
            let Some((id, idx)) = stack.last_mut() else {
                return Ok(());
            };
            match self.nodes.get(*id).and_then(|node| node.children.get(*idx)) {
                Some(child) => {
                    *idx += 1;
                    next = Some(child.as_str());
                }
                None => {
                    path.remove(*id);
                    stack.pop();
                }
            }
        }
    }

    /// Parents whose children are out of comparator order. `None` stands for
    /// the root list.
    ///
    /// Removal appends promoted children without re-sorting (unless
    /// configured otherwise), so a non-empty result is not by itself a
    /// structural fault.
    pub fn order_violations(&self) -> Vec<Option<String>> {
        let out_of_order = |ids: &[String]| {
            ids.windows(2).any(|pair| {
                match (self.nodes.get(&pair[0]), self.nodes.get(&pair[1])) {
                    (Some(a), Some(b)) => order::compare_nodes(a, b).is_gt(),
                    _ => false,
                }
            })
        };

        let mut violations: Vec<Option<String>> = self
            .nodes
            .values()
            .filter(|node| out_of_order(&node.children))
            .map(|node| Some(node.id().to_string()))
            .collect();
        violations.sort();
        if out_of_order(&self.roots) {
            violations.insert(0, None);
        }
        violations
    }
}
