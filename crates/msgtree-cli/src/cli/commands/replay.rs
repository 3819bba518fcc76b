//! Replay command handler.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use anyhow::{Context, Result};
use msgtree_core::mutation::read_log;
use msgtree_core::{TreeConfig, TreeStore};
use tracing::debug;

use crate::render;

pub fn run(file: &Path, json: bool, config: TreeConfig) -> Result<()> {
    let reader = File::open(file)
        .map(BufReader::new)
        .with_context(|| format!("open mutation log {}", file.display()))?;
    let mutations =
        read_log(reader).with_context(|| format!("read mutation log {}", file.display()))?;

    let mut store = TreeStore::with_config(config);
    for (idx, mutation) in mutations.into_iter().enumerate() {
        let report = store.apply(mutation);
        debug!(step = idx + 1, ?report, "applied mutation");
    }

    render::print_tree(store.tree(), json)
}
