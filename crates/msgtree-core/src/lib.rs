//! Message tree engine.
//!
//! Builds a forest of chat messages (replies and edited versions) from a flat,
//! possibly unordered and incomplete collection, and keeps it consistent under
//! incremental add, edit and remove.

pub mod config;
pub mod message;
pub mod mutation;
pub mod store;
pub mod tree;

pub use config::TreeConfig;
pub use message::Message;
pub use mutation::{MutationReport, TreeMutation};
pub use store::{BatchReport, RemoveReport, TreeStore};
pub use tree::{MessageNode, Tree};
