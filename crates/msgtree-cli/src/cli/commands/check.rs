//! Check command handler.

use std::path::Path;

use anyhow::Result;
use msgtree_core::tree::IntegrityError;
use msgtree_core::{TreeConfig, TreeStore};

use crate::input;

/// A check that ran to completion but found problems. Exits with status 2.
#[derive(Debug, thiserror::Error)]
pub enum CheckFailed {
    #[error("integrity check failed")]
    Integrity(#[from] IntegrityError),

    #[error("children of {0} are out of order")]
    Order(String),

    #[error("input needed repair: {repairs} orphaned, {skipped} duplicate")]
    Strict { repairs: usize, skipped: usize },
}

pub fn run(file: &Path, strict: bool, config: TreeConfig) -> Result<()> {
    let messages = input::read_messages(file)?;

    let mut store = TreeStore::with_config(config);
    let report = store.build(messages);
    let tree = store.tree();

    for repair in &report.repairs {
        println!("repaired {} -> {}", repair.id, repair.placement);
    }
    for id in &report.skipped {
        println!("skipped duplicate {id}");
    }
    println!(
        "checked {} messages, {} roots",
        tree.len(),
        tree.roots().len()
    );

    tree.verify().map_err(CheckFailed::from)?;

    if let Some(parent) = tree.order_violations().into_iter().next() {
        let parent = parent.unwrap_or_else(|| "the root list".to_string());
        return Err(CheckFailed::Order(parent).into());
    }

    if strict && !(report.repairs.is_empty() && report.skipped.is_empty()) {
        return Err(CheckFailed::Strict {
            repairs: report.repairs.len(),
            skipped: report.skipped.len(),
        }
        .into());
    }

    println!("ok");
    Ok(())
}
