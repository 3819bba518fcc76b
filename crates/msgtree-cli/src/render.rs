//! Tree rendering for stdout.

use std::fmt::Write as _;

use anyhow::{Context, Result};
use msgtree_core::Tree;

/// One line per message, indented two spaces per level.
///
/// ```text
/// r1 #0
///   q1 #1
///     a1 v0 #2
///     a1-edit v1 #3
/// ```
pub fn tree_text(tree: &Tree) -> String {
    let mut out = String::new();
    for row in tree.flatten() {
        let message = &row.node.message;
        let _ = write!(out, "{}{}", "  ".repeat(row.depth), message.id);
        if let Some(version) = message.version_index {
            let _ = write!(out, " v{version}");
        }
        if let Some(sequence) = message.sequence {
            let _ = write!(out, " #{sequence}");
        }
        out.push('\n');
    }
    out
}

/// `{ "roots": [ids], "map": { id: { "message", "children": [ids] } } }`.
/// Flat so that depth never reaches the serializer's recursion.
pub fn tree_json(tree: &Tree) -> Result<String> {
    serde_json::to_string_pretty(&tree.to_flat()).context("serialize tree")
}

pub fn print_tree(tree: &Tree, json: bool) -> Result<()> {
    if json {
        println!("{}", tree_json(tree)?);
    } else if tree.is_empty() {
        println!("No messages found.");
    } else {
        print!("{}", tree_text(tree));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use msgtree_core::{Message, TreeStore};

    use super::*;

    fn sample() -> TreeStore {
        let mut store = TreeStore::new();
        store.build(vec![
            Message::new("r1").with_sequence(0),
            Message::new("q1").with_parent("r1").with_sequence(1),
            Message::new("a1")
                .with_parent("q1")
                .with_sequence(2)
                .with_version_index(0),
            Message::new("r2").with_sequence(5),
        ]);
        store
    }

    #[test]
    fn test_text_indents_by_depth() {
        let store = sample();
        assert_eq!(
            tree_text(store.tree()),
            "r1 #0\n  q1 #1\n    a1 v0 #2\nr2 #5\n"
        );
    }

    #[test]
    fn test_json_is_roots_plus_id_map() {
        let store = sample();
        let value: serde_json::Value =
            serde_json::from_str(&tree_json(store.tree()).unwrap()).unwrap();
        assert_eq!(value["roots"], serde_json::json!(["r1", "r2"]));
        assert_eq!(value["map"]["r1"]["children"], serde_json::json!(["q1"]));
        assert_eq!(value["map"]["q1"]["children"], serde_json::json!(["a1"]));
        assert_eq!(value["map"]["a1"]["message"]["versionIndex"], 0);
        assert_eq!(value["map"]["r2"]["children"], serde_json::json!([]));
    }

    #[test]
    fn test_json_handles_deep_chain() {
        let mut store = TreeStore::new();
        store.build((0..50_000).map(|i| {
            let m = Message::new(format!("m{i:05}")).with_sequence(i);
            if i == 0 {
                m
            } else {
                m.with_parent(format!("m{:05}", i - 1))
            }
        }));
        let value: serde_json::Value =
            serde_json::from_str(&tree_json(store.tree()).unwrap()).unwrap();
        assert_eq!(value["roots"], serde_json::json!(["m00000"]));
        assert_eq!(value["map"]["m49998"]["children"], serde_json::json!(["m49999"]));
    }
}
