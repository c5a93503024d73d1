//! Range removal with merge and redistribution.

use super::concat::{collapse, join, settle};
use super::node::{Node, NodePointer, locate};

/// Removes `[start, end)` from a non-empty tree and returns the new root,
/// or `None` when nothing remains.
pub(crate) fn remove_range<T: Clone>(
    root: &NodePointer<T>,
    start: usize,
    end: usize,
) -> Option<NodePointer<T>> {
    remove_from(root, start, end).map(collapse)
}

/// Removes `[start, end)` from a subtree.
///
/// Only the children overlapping the range are visited; the low boundary
/// child keeps its prefix, the high boundary child keeps its suffix and the
/// children between them are dropped. The kept pieces are joined to each
/// other and any under-full child is then repaired against a neighbour. The
/// returned node may itself be under-full, which the caller repairs.
fn remove_from<T: Clone>(node: &NodePointer<T>, start: usize, end: usize) -> Option<NodePointer<T>> {
    if start == 0 && end == node.count() {
        return None;
    }
    if start == end {
        return Some(node.clone());
    }

    match node.as_ref() {
        Node::Leaf(elements) => {
            let mut kept = Vec::with_capacity(elements.len() - (end - start));
            kept.extend_from_slice(&elements[..start]);
            kept.extend_from_slice(&elements[end..]);
            Some(Node::leaf(kept))
        }
        Node::Internal(branches) => {
            let (low, low_start) = locate(branches, start);
            let (high, high_last) = locate(branches, end - 1);
            let high_end = high_last + 1;

            let mut children = Vec::with_capacity(branches.len());
            children.extend(branches[..low].iter().map(|branch| branch.child.clone()));

            if low == high {
                if let Some(child) = remove_from(&branches[low].child, low_start, high_end) {
                    children.push(child);
                }
            } else {
                let low_child = &branches[low].child;
                let prefix = remove_from(low_child, low_start, low_child.count());
                let suffix = remove_from(&branches[high].child, 0, high_end);
                match (prefix, suffix) {
                    (Some(prefix), Some(suffix)) => join(&prefix, &suffix).extend_into(&mut children),
                    (Some(kept), None) | (None, Some(kept)) => children.push(kept),
                    (None, None) => {}
                }
            }

            children.extend(branches[high + 1..].iter().map(|branch| branch.child.clone()));
            settle(&mut children);
            Some(Node::internal(children))
        }
    }
}
