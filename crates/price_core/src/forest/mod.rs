//! Deterministic random-forest inference
//!
//! - **Integer-only traversal**: thresholds, leaves and inputs are fixed-point `i64`
//! - **Mean aggregation**: the ensemble output is the integer mean of its trees
//! - **Canonical serialization**: sorted JSON keys for reproducible hashing
//! - **Blake3 hashing**: model identity is the hash of its canonical JSON
//!
//! # Usage
//!
//! ```rust
//! use carprice_core::fixed::SCALE;
//! use carprice_core::forest::{ForestModel, Node, Tree};
//!
//! let tree = Tree::new(vec![
//!     Node::internal(0, 0, 2010 * SCALE, 1, 2, 1),
//!     Node::leaf(1, 6_000 * SCALE),
//!     Node::leaf(2, 14_000 * SCALE),
//! ]);
//! let model = ForestModel::new(vec![tree], 1);
//!
//! assert_eq!(model.predict(&[2015 * SCALE]), 14_000.0);
//! ```

pub mod model;
pub mod tree;

pub use model::{feature_importance, ForestModel, ModelError, MODEL_VERSION};
pub use tree::{Node, Tree};
