//! Depth-first flattening for display.
//!
//! Turns the forest into a list of rows where each child appears immediately
//! after its parent, indented by depth. Roots and siblings keep tree order.

use std::collections::HashSet;

use super::{MessageNode, Tree};

/// A node prepared for line-oriented display.
#[derive(Debug, Clone)]
pub struct TreeRow<'a> {
    pub node: &'a MessageNode,
    /// Nesting depth (0 = root).
    pub depth: usize,
    /// Number of siblings sharing this node's slot, including itself.
    pub siblings: usize,
}

impl Tree {
    /// Flattens the forest depth-first.
    ///
    /// # Example
    ///
    /// Given roots `A`, `C` where `A` has children `B`, `E` and `B` has child
    /// `D`, the output order is A(0), B(1), D(2), E(1), C(0).
    pub fn flatten(&self) -> Vec<TreeRow<'_>> {
        let mut result = Vec::with_capacity(self.nodes.len());
        // Track visited so malformed data cannot loop forever.
        let mut visited: HashSet<&str> = HashSet::with_capacity(self.nodes.len());

        let mut stack: Vec<(&str, usize, usize)> = self
            .roots
            .iter()
            .rev()
            .map(|id| (id.as_str(), 0, self.roots.len()))
            .collect();

        while let Some((id, depth, siblings)) = stack.pop() {
            if !visited.insert(id) {
                continue;
            }
            let Some(node) = self.nodes.get(id) else {
                continue;
            };
            result.push(TreeRow {
                node,
                depth,
                siblings,
            });
            let count = node.children.len();
            stack.extend(
                node.children
                    .iter()
                    .rev()
                    .map(|child| (child.as_str(), depth + 1, count)),
            );
        }

        result
    }
}
