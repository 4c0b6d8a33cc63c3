// Modules
pub mod csplit;
pub mod errors;
pub mod frame;
pub mod mermaid;
pub mod model;
pub mod node;
pub mod splits;
pub mod tree;

// Individual classes, and functions
pub use errors::CartError;
pub use model::CartModel;
pub use node::DecisionNode;
pub use tree::{build_tree, merge_trees, BuildOptions};
