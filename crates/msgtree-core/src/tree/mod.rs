//! Message forest: the node model and the pure pieces the store is built from.
//!
//! - [`order`]: sibling comparator
//! - [`repair`]: orphan placement heuristic
//! - [`attach`]: parent resolution for a single message
//! - [`integrity`]: structural verification
//! - [`flatten`]: depth-first display rows

pub mod attach;
pub mod flatten;
pub mod integrity;
mod model;
pub mod order;
pub mod repair;

pub use flatten::TreeRow;
pub use integrity::IntegrityError;
pub use model::{FlatTree, MessageNode, Tree};
