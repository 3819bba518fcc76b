//! Show command handler.

use std::path::Path;

use anyhow::Result;
use msgtree_core::{TreeConfig, TreeStore};

use crate::{input, render};

pub fn run(file: &Path, json: bool, config: TreeConfig) -> Result<()> {
    let messages = input::read_messages(file)?;

    let mut store = TreeStore::with_config(config);
    store.build(messages);

    render::print_tree(store.tree(), json)
}
