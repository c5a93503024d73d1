//! Indexed lookup and path-copying update.

use super::node::{Node, NodePointer, locate};
use crate::persistent::ReferenceCounter;

/// Returns the element at `index`, which must be below the node's count.
///
/// Descends through the cumulative-count column of each internal node
/// without allocating.
pub(crate) fn get<T>(root: &Node<T>, mut index: usize) -> &T {
    let mut node = root;
    loop {
        match node {
            Node::Leaf(elements) => return &elements[index],
            Node::Internal(branches) => {
                let (position, offset) = locate(branches, index);
                node = &*branches[position].child;
                index = offset;
            }
        }
    }
}

/// Copies the root-to-leaf path of `index`, replacing the element there.
///
/// Every node off that path is shared with `node`. Cumulative counts do not
/// change, so each copied internal node reuses its branch counts.
pub(crate) fn update<T: Clone>(node: &Node<T>, index: usize, value: T) -> NodePointer<T> {
    match node {
        Node::Leaf(elements) => {
            let mut elements = elements.to_vec();
            elements[index] = value;
            Node::leaf(elements)
        }
        Node::Internal(branches) => {
            let (position, offset) = locate(branches, index);
            let child = update(&branches[position].child, offset, value);
            let mut branches = branches.to_vec();
            branches[position].child = child;
            ReferenceCounter::new(Node::Internal(branches.into_boxed_slice()))
        }
    }
}
