//! Weighted tree output.
//!
//! The analysis folds the dependency graph into `TreeNode`s, where every
//! node's weight is its own installed size plus the weights of its children.
//! The serialized shape (`label` / `weight` / `groups`) is handed to the
//! reporting stage as-is.

use serde::{Deserialize, Serialize};

/// A node in the weighted dependency tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeNode {
    /// Display label (package name, or `name(version)` for remote leaves).
    pub label: String,
    /// Total weight in bytes: own size plus all children.
    pub weight: u64,
    /// Child subtrees, in declared dependency order.
    pub groups: Vec<TreeNode>,
}

impl TreeNode {
    /// Create a childless node.
    #[must_use]
    pub fn leaf(label: impl Into<String>, weight: u64) -> Self {
        Self {
            label: label.into(),
            weight,
            groups: Vec::new(),
        }
    }

    /// Fold a package's own size and resolved children into a node.
    ///
    /// When there is at least one child, a synthetic leaf carrying the
    /// package's own contribution is appended under `self_label`, so the
    /// node's weight stays the plain sum of its children's weights.
    #[must_use]
    pub fn assemble(
        label: impl Into<String>,
        self_label: impl Into<String>,
        own_weight: u64,
        mut children: Vec<TreeNode>,
    ) -> Self {
        let weight = own_weight + children.iter().map(|c| c.weight).sum::<u64>();
        if !children.is_empty() {
            children.push(Self::leaf(self_label, own_weight));
        }
        Self {
            label: label.into(),
            weight,
            groups: children,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check_additivity(node: &TreeNode) {
        if !node.groups.is_empty() {
            let sum: u64 = node.groups.iter().map(|c| c.weight).sum();
            assert_eq!(node.weight, sum, "weight of {} must equal child sum", node.label);
        }
        for child in &node.groups {
            check_additivity(child);
        }
    }

    #[test]
    fn test_leaf_keeps_weight() {
        let node = TreeNode::leaf("leftpad(1.0.0)", 500);
        assert_eq!(node.weight, 500);
        assert!(node.groups.is_empty());
    }

    #[test]
    fn test_assemble_without_children_is_leaf() {
        let node = TreeNode::assemble("a", "a@1.0.0", 42, Vec::new());
        assert_eq!(node.weight, 42);
        assert!(node.groups.is_empty());
    }

    #[test]
    fn test_assemble_appends_synthetic_self_leaf() {
        let children = vec![TreeNode::leaf("dep1(1.0.0)", 100), TreeNode::leaf("dep2(2.0.0)", 100)];
        let node = TreeNode::assemble("root", "root@1.0.0", 50, children);

        assert_eq!(node.weight, 250);
        assert_eq!(node.groups.len(), 3);
        assert_eq!(node.groups[2].label, "root@1.0.0");
        assert_eq!(node.groups[2].weight, 50);
        check_additivity(&node);
    }

    #[test]
    fn test_serialized_shape() {
        let node = TreeNode::assemble("root", "root@1.0.0", 0, vec![TreeNode::leaf("a(1.0.0)", 10)]);
        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(json["label"], "root");
        assert_eq!(json["weight"], 10);
        assert_eq!(json["groups"][0]["label"], "a(1.0.0)");
        assert_eq!(json["groups"][1]["weight"], 0);
    }
}
