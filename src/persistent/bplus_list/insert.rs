//! Single-element insertion with node splitting.
//!
//! [`insert`] splits an overflowing node into two halves with the left half
//! taking the larger share. [`push_back`] only ever walks the rightmost spine
//! and splits asymmetrically: the full node is kept as is and the new element
//! starts a fresh sibling. The trailing edge tolerates under-full nodes, so a
//! long run of appends never rebalances and every node left behind is full.

use super::node::{Node, NodePointer, locate, max_internal, max_leaf, split_evenly};

/// Outcome of inserting into a subtree.
pub(crate) enum Insertion<T> {
    /// The subtree absorbed the element.
    Updated(NodePointer<T>),
    /// The subtree overflowed and was split into two siblings.
    Split(NodePointer<T>, NodePointer<T>),
}

/// Outcome of appending to a subtree.
pub(crate) enum Appended<T> {
    /// The subtree absorbed the element.
    Updated(NodePointer<T>),
    /// The subtree was full; it is unchanged and the element lives in a new
    /// right sibling of the same height.
    Overflowed(NodePointer<T>),
}

/// Inserts `value` at `index` (at most the subtree's count).
pub(crate) fn insert<T: Clone>(node: &Node<T>, index: usize, value: T) -> Insertion<T> {
    match node {
        Node::Leaf(elements) => {
            let mut spliced = Vec::with_capacity(elements.len() + 1);
            spliced.extend_from_slice(&elements[..index]);
            spliced.push(value);
            spliced.extend_from_slice(&elements[index..]);
            if spliced.len() <= max_leaf::<T>() {
                Insertion::Updated(Node::leaf(spliced))
            } else {
                let (left, right) = split_evenly(spliced);
                Insertion::Split(Node::leaf(left), Node::leaf(right))
            }
        }
        Node::Internal(branches) => {
            let (position, offset) = locate(branches, index);
            let mut children = node.children();
            match insert(&branches[position].child, offset, value) {
                Insertion::Updated(child) => children[position] = child,
                Insertion::Split(left, right) => {
                    children[position] = left;
                    children.insert(position + 1, right);
                }
            }
            if children.len() <= max_internal::<T>() {
                Insertion::Updated(Node::internal(children))
            } else {
                let (left, right) = split_evenly(children);
                Insertion::Split(Node::internal(left), Node::internal(right))
            }
        }
    }
}

/// Appends `value` after the last element of the subtree.
pub(crate) fn push_back<T: Clone>(node: &NodePointer<T>, value: T) -> Appended<T> {
    match node.as_ref() {
        Node::Leaf(elements) => {
            if elements.len() < max_leaf::<T>() {
                let mut extended = Vec::with_capacity(elements.len() + 1);
                extended.extend_from_slice(elements);
                extended.push(value);
                Appended::Updated(Node::leaf(extended))
            } else {
                Appended::Overflowed(Node::leaf(vec![value]))
            }
        }
        Node::Internal(branches) => {
            let last = branches.len() - 1;
            match push_back(&branches[last].child, value) {
                Appended::Updated(child) => {
                    let mut branches = branches.to_vec();
                    branches[last].child = child;
                    branches[last].cumulative_count += 1;
                    Appended::Updated(NodePointer::new(Node::Internal(
                        branches.into_boxed_slice(),
                    )))
                }
                Appended::Overflowed(sibling) => {
                    if branches.len() < max_internal::<T>() {
                        let mut children = node.children();
                        children.push(sibling);
                        Appended::Updated(Node::internal(children))
                    } else {
                        Appended::Overflowed(Node::internal([sibling]))
                    }
                }
            }
        }
    }
}
