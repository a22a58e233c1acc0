//! Terminal rendering of weighted trees.

use hefty_core::TreeNode;
use std::fmt::Write as _;

/// Format a byte count for humans.
#[must_use]
pub fn format_bytes(bytes: u64) -> String {
    const UNITS: &[&str] = &["B", "KB", "MB", "GB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}

/// Render trees as an indented listing, heaviest sibling first.
#[must_use]
pub fn render(trees: &[TreeNode]) -> String {
    let mut out = String::new();
    for tree in trees {
        render_node(tree, 0, &mut out);
    }
    out
}

fn render_node(node: &TreeNode, depth: usize, out: &mut String) {
    let _ = writeln!(
        out,
        "{:indent$}{} {}",
        "",
        node.label,
        format_bytes(node.weight),
        indent = depth * 2
    );
    let mut children: Vec<&TreeNode> = node.groups.iter().collect();
    children.sort_by(|a, b| b.weight.cmp(&a.weight));
    for child in children {
        render_node(child, depth + 1, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_bytes() {
        assert_eq!(format_bytes(0), "0 B");
        assert_eq!(format_bytes(512), "512 B");
        assert_eq!(format_bytes(2048), "2.0 KB");
        assert_eq!(format_bytes(5 * 1024 * 1024), "5.0 MB");
    }

    #[test]
    fn test_render_sorts_heaviest_first() {
        let tree = TreeNode {
            label: "root".to_string(),
            weight: 300,
            groups: vec![
                TreeNode::leaf("small(1.0.0)", 100),
                TreeNode::leaf("big(1.0.0)", 200),
            ],
        };
        let out = render(&[tree]);
        let big_at = out.find("big").unwrap();
        let small_at = out.find("small").unwrap();
        assert!(big_at < small_at);
        assert!(out.contains("root 300 B"));
    }
}
