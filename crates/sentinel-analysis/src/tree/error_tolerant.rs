//! Locating ERROR and MISSING nodes in a tree-sitter tree.

use tree_sitter::Node;

/// Count ERROR/MISSING nodes and return the 1-based position of the first one
/// in document order.
pub fn count_errors(root: Node) -> (u32, Option<(u32, u32)>) {
    let mut count = 0u32;
    let mut first = None;
    collect_errors(root, &mut count, &mut first);
    (count, first)
}

fn collect_errors(node: Node, count: &mut u32, first: &mut Option<(u32, u32)>) {
    if node.is_error() || node.is_missing() {
        *count += 1;
        if first.is_none() {
            let pos = node.start_position();
            *first = Some((pos.row as u32 + 1, pos.column as u32 + 1));
        }
    }
    if !node.has_error() {
        return;
    }
    let mut cursor = node.walk();
    for child in node.children(&mut cursor) {
        collect_errors(child, count, first);
    }
}
