//! Regression tree structures for ensemble inference
//!
//! Provides deterministic integer-only tree nodes and traversal.
//! All values are fixed-point integers at SCALE precision.

use serde::{Deserialize, Serialize};

/// A decision tree node (internal or leaf)
///
/// For internal nodes:
/// - `feature_idx >= 0`: index into feature vector
/// - `left` and `right` point to child node indices
/// - `leaf` is `None`
/// - `gain` is the squared-error reduction of the split, in cents squared
///
/// For leaf nodes:
/// - `feature_idx == -1` indicates this is a leaf
/// - `leaf` contains the prediction value
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Node {
    /// Node ID (for reference, not used in traversal)
    pub id: i32,

    /// Left child index (-1 for leaf nodes)
    pub left: i32,

    /// Right child index (-1 for leaf nodes)
    pub right: i32,

    /// Feature index to split on (-1 for leaf nodes)
    pub feature_idx: i32,

    /// Threshold value for split (fixed-point integer)
    pub threshold: i64,

    /// Leaf value (Some for leaf nodes, None for internal nodes)
    pub leaf: Option<i64>,

    /// Split gain (0 for leaf nodes)
    pub gain: i64,
}

impl Node {
    /// Create a new internal (split) node
    pub fn internal(
        id: i32,
        feature_idx: i32,
        threshold: i64,
        left: i32,
        right: i32,
        gain: i64,
    ) -> Self {
        Self {
            id,
            left,
            right,
            feature_idx,
            threshold,
            leaf: None,
            gain,
        }
    }

    /// Create a new leaf node
    pub fn leaf(id: i32, value: i64) -> Self {
        Self {
            id,
            left: -1,
            right: -1,
            feature_idx: -1,
            threshold: 0,
            leaf: Some(value),
            gain: 0,
        }
    }

    /// Check if this node is a leaf
    pub fn is_leaf(&self) -> bool {
        self.feature_idx == -1 || self.leaf.is_some()
    }
}

/// A single regression tree with integer-only nodes
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Tree {
    /// Tree nodes (node 0 is the root, children always follow their parent)
    pub nodes: Vec<Node>,
}

impl Tree {
    pub fn new(nodes: Vec<Node>) -> Self {
        Self { nodes }
    }

    /// Evaluate this tree on a feature vector
    ///
    /// Goes left when `feature <= threshold`. Malformed structure evaluates to 0;
    /// [`Tree::validate`] rejects such trees before they are ever used.
    pub fn evaluate(&self, features: &[i64]) -> i64 {
        let mut idx = 0usize;

        loop {
            let Some(node) = self.nodes.get(idx) else {
                return 0;
            };

            if node.is_leaf() {
                return node.leaf.unwrap_or(0);
            }

            let Some(&value) = usize::try_from(node.feature_idx)
                .ok()
                .and_then(|f| features.get(f))
            else {
                return 0;
            };

            let next = if value <= node.threshold {
                node.left
            } else {
                node.right
            };
            match usize::try_from(next) {
                Ok(next) if next > idx => idx = next,
                _ => return 0,
            }
        }
    }

    /// Number of split nodes
    pub fn split_count(&self) -> usize {
        self.nodes.iter().filter(|n| !n.is_leaf()).count()
    }

    /// Validate tree structure against the model's feature count
    pub fn validate(&self, feature_count: usize) -> Result<(), String> {
        if self.nodes.is_empty() {
            return Err("Tree has no nodes".to_string());
        }

        let len = self.nodes.len() as i64;
        for (i, node) in self.nodes.iter().enumerate() {
            if node.is_leaf() {
                if node.leaf.is_none() {
                    return Err(format!("Leaf node {i} has no leaf value"));
                }
                continue;
            }

            // Children must come after their parent, which also rules out cycles.
            for (side, child) in [("left", node.left), ("right", node.right)] {
                let child = child as i64;
                if child <= i as i64 || child >= len {
                    return Err(format!("Node {i} has invalid {side} child: {child}"));
                }
            }

            if node.feature_idx < 0 || node.feature_idx as usize >= feature_count {
                return Err(format!(
                    "Internal node {} has invalid feature index: {}",
                    i, node.feature_idx
                ));
            }

            if node.gain < 0 {
                return Err(format!("Internal node {} has negative gain", i));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stump() -> Tree {
        Tree::new(vec![
            Node::internal(0, 0, 50, 1, 2, 10),
            Node::leaf(1, 100),
            Node::leaf(2, 200),
        ])
    }

    #[test]
    fn test_node_creation() {
        let internal = Node::internal(0, 3, 12345, 1, 2, 7);
        assert_eq!(internal.feature_idx, 3);
        assert_eq!(internal.gain, 7);
        assert!(!internal.is_leaf());

        let leaf = Node::leaf(1, -234);
        assert_eq!(leaf.feature_idx, -1);
        assert!(leaf.is_leaf());
        assert_eq!(leaf.leaf, Some(-234));
    }

    #[test]
    fn test_tree_evaluation() {
        let tree = stump();
        assert_eq!(tree.evaluate(&[30]), 100);
        assert_eq!(tree.evaluate(&[50]), 100); // Equal goes left
        assert_eq!(tree.evaluate(&[60]), 200);
    }

    #[test]
    fn test_tree_validation() {
        assert!(stump().validate(1).is_ok());

        // feature index beyond the model width
        assert!(stump().validate(0).is_err());

        // left child out of bounds
        let invalid = Tree::new(vec![
            Node::internal(0, 0, 50, 5, 2, 0),
            Node::leaf(1, 100),
            Node::leaf(2, 200),
        ]);
        assert!(invalid.validate(1).is_err());

        // self-loop
        let cyclic = Tree::new(vec![
            Node::internal(0, 0, 50, 0, 1, 0),
            Node::leaf(1, 100),
        ]);
        assert!(cyclic.validate(1).is_err());
        assert_eq!(cyclic.evaluate(&[10]), 0);
    }

    #[test]
    fn test_split_count() {
        assert_eq!(stump().split_count(), 1);
        assert_eq!(Tree::new(vec![Node::leaf(0, 5)]).split_count(), 0);
    }
}
