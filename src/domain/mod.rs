//! Domain layer: location keys, trees, rules and the rule registry
//!
//! This layer is independent of external concerns (no I/O, no CLI, no config loading).

pub mod arena;
pub mod error;
pub mod path_key;
pub mod path_tree;
pub mod registry;
pub mod rule;

pub use arena::{NodeArena, NodeId, TreeNode};
pub use error::{DomainError, DomainResult};
pub use path_key::{PathKey, DEFAULT_SEPARATOR};
pub use path_tree::{InsertMode, PathTree};
pub use registry::ActionRegistry;
pub use rule::{Bindings, FnSource, OutputSource, OutputSpec, Rule};
