//! Joining subtrees along their boundary spines.
//!
//! [`join`] is the rebalancing primitive shared by concatenation and range
//! removal. Given two adjacent subtrees of the same height it walks the
//! seam (the right spine of the left subtree and the left spine of the right
//! subtree) down to the leaves, then on the way back up either merges each
//! boundary pair into one node or redistributes it so that both sides meet
//! the minimum occupancy.
//!
//! The seam spines are allowed to be deficient on input: a removal may leave
//! the boundary paths of the kept prefix and suffix under-full, and the left
//! operand of a concatenation carries its old trailing edge. The result never
//! has a deficient node off its own trailing edge except, for
//! [`Joined::Merged`], the merged node itself or a chain of single children
//! below it; the caller repairs those one level up.

use super::node::{Node, NodePointer, max_internal, max_leaf, split_evenly};

/// Outcome of joining two adjacent subtrees.
pub(crate) enum Joined<T> {
    /// The pair fit into a single node.
    Merged(NodePointer<T>),
    /// The pair stays two nodes, both at least half full.
    Balanced(NodePointer<T>, NodePointer<T>),
}

impl<T> Joined<T> {
    /// Appends the joined node or nodes to a child list.
    pub(crate) fn extend_into(self, children: &mut Vec<NodePointer<T>>) {
        match self {
            Self::Merged(node) => children.push(node),
            Self::Balanced(left, right) => {
                children.push(left);
                children.push(right);
            }
        }
    }
}

/// Joins two adjacent subtrees of the same height.
pub(crate) fn join<T: Clone>(left: &NodePointer<T>, right: &NodePointer<T>) -> Joined<T> {
    match (left.as_ref(), right.as_ref()) {
        (Node::Leaf(left_elements), Node::Leaf(right_elements)) => {
            let total = left_elements.len() + right_elements.len();
            if total <= max_leaf::<T>() {
                let mut merged = Vec::with_capacity(total);
                merged.extend_from_slice(left_elements);
                merged.extend_from_slice(right_elements);
                Joined::Merged(Node::leaf(merged))
            } else if !left.is_under_full() && !right.is_under_full() {
                Joined::Balanced(left.clone(), right.clone())
            } else {
                let mut elements = Vec::with_capacity(total);
                elements.extend_from_slice(left_elements);
                elements.extend_from_slice(right_elements);
                let (left_half, right_half) = split_evenly(elements);
                Joined::Balanced(Node::leaf(left_half), Node::leaf(right_half))
            }
        }
        (Node::Internal(left_branches), Node::Internal(right_branches)) => {
            let left_last = left_branches.len() - 1;
            let seam = join(&left_branches[left_last].child, &right_branches[0].child);

            let mut children = Vec::with_capacity(left_branches.len() + right_branches.len());
            children.extend(
                left_branches[..left_last]
                    .iter()
                    .map(|branch| branch.child.clone()),
            );
            seam.extend_into(&mut children);
            children.extend(right_branches[1..].iter().map(|branch| branch.child.clone()));

            settle(&mut children);
            pack(children)
        }
        _ => unreachable!("subtrees of the same height are both leaves or both internal"),
    }
}

/// Repairs every under-full entry of a child list by joining it with its
/// left neighbour, or with its right neighbour when it comes first.
///
/// Afterwards every entry meets the minimum occupancy unless the list has
/// shrunk to a single entry.
pub(crate) fn settle<T: Clone>(children: &mut Vec<NodePointer<T>>) {
    let mut position = 0;
    while position < children.len() && children.len() > 1 {
        if !children[position].is_under_full() {
            position += 1;
            continue;
        }
        let left = position.saturating_sub(1);
        let right = left + 1;
        match join(&children[left], &children[right]) {
            Joined::Merged(node) => {
                children[left] = node;
                children.remove(right);
                position = left;
            }
            Joined::Balanced(left_node, right_node) => {
                children[left] = left_node;
                children[right] = right_node;
                position = right + 1;
            }
        }
    }
}

/// Builds one internal node over `children`, or two when they overflow it.
pub(crate) fn pack<T>(children: Vec<NodePointer<T>>) -> Joined<T> {
    if children.len() <= max_internal::<T>() {
        Joined::Merged(Node::internal(children))
    } else {
        let (left, right) = split_evenly(children);
        Joined::Balanced(Node::internal(left), Node::internal(right))
    }
}

/// Removes single-child internal nodes from the top of a tree.
pub(crate) fn collapse<T>(mut node: NodePointer<T>) -> NodePointer<T> {
    let before = node.height();
    while let Node::Internal(branches) = node.as_ref()
        && branches.len() == 1
    {
        let child = branches[0].child.clone();
        node = child;
    }
    let after = node.height();
    if after < before {
        tracing::trace!(before, after, "collapsed single-child root");
    }
    node
}

/// Joins a shorter subtree after the right spine of a taller one.
fn append_subtree<T: Clone>(
    left: &NodePointer<T>,
    left_height: usize,
    right: &NodePointer<T>,
    right_height: usize,
) -> Joined<T> {
    if left_height == right_height {
        return join(left, right);
    }
    let mut children = left.children();
    let Some(last) = children.pop() else {
        unreachable!("a node above the shorter subtree is internal");
    };
    append_subtree(&last, left_height - 1, right, right_height).extend_into(&mut children);
    settle(&mut children);
    pack(children)
}

/// Joins a shorter subtree before the left spine of a taller one.
fn prepend_subtree<T: Clone>(
    left: &NodePointer<T>,
    left_height: usize,
    right: &NodePointer<T>,
    right_height: usize,
) -> Joined<T> {
    if left_height == right_height {
        return join(left, right);
    }
    let siblings = right.children();
    let Some((first, rest)) = siblings.split_first() else {
        unreachable!("a node above the shorter subtree is internal");
    };
    let mut children = Vec::with_capacity(siblings.len() + 1);
    prepend_subtree(left, left_height, first, right_height - 1).extend_into(&mut children);
    children.extend(rest.iter().cloned());
    settle(&mut children);
    pack(children)
}

/// Concatenates two non-empty trees.
pub(crate) fn concat<T: Clone>(left: &NodePointer<T>, right: &NodePointer<T>) -> NodePointer<T> {
    let left_height = left.height();
    let right_height = right.height();
    if left_height != right_height {
        tracing::trace!(left_height, right_height, "concatenating trees of different heights");
    }

    let joined = if left_height >= right_height {
        append_subtree(left, left_height, right, right_height)
    } else {
        prepend_subtree(left, left_height, right, right_height)
    };

    match joined {
        Joined::Merged(node) => collapse(node),
        Joined::Balanced(left, right) => {
            tracing::trace!(height = left_height.max(right_height) + 1, "concatenation grew a new root");
            Node::internal([left, right])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistent::bplus_list::indexer::get;
    use crate::persistent::bplus_list::insert::{Appended, push_back};
    use crate::persistent::bplus_list::node::validate;
    use rstest::rstest;

    fn leaf_of(range: std::ops::Range<u64>) -> NodePointer<u64> {
        Node::leaf(range.collect())
    }

    fn elements_of(node: &NodePointer<u64>) -> Vec<u64> {
        (0..node.count()).map(|index| *get(node, index)).collect()
    }

    #[rstest]
    fn test_join_small_leaves_merges() {
        let Joined::Merged(node) = join(&leaf_of(0..3), &leaf_of(3..7)) else {
            panic!("expected a merge");
        };
        assert_eq!(elements_of(&node), (0..7).collect::<Vec<_>>());
    }

    #[rstest]
    fn test_join_valid_leaves_shares_both() {
        let left = leaf_of(0..12);
        let right = leaf_of(12..24);
        let Joined::Balanced(new_left, new_right) = join(&left, &right) else {
            panic!("expected two nodes");
        };
        assert!(NodePointer::ptr_eq(&left, &new_left));
        assert!(NodePointer::ptr_eq(&right, &new_right));
    }

    #[rstest]
    fn test_join_redistributes_deficient_leaf() {
        let Joined::Balanced(left, right) = join(&leaf_of(0..16), &leaf_of(16..19)) else {
            panic!("expected two nodes");
        };
        assert_eq!(left.len(), 10);
        assert_eq!(right.len(), 9);
        assert_eq!(*get(&right, 0), 10);
    }

    #[rstest]
    fn test_settle_merges_deficient_entry_into_left_neighbour() {
        let mut children = vec![leaf_of(0..8), leaf_of(8..10), leaf_of(10..20)];
        settle(&mut children);
        assert_eq!(children.len(), 2);
        assert_eq!(children[0].len(), 10);
        let root = Node::internal(children);
        assert_eq!(validate(&root, 20), Ok(()));
    }

    #[rstest]
    fn test_settle_uses_right_neighbour_for_first_entry() {
        let mut children = vec![leaf_of(0..2), leaf_of(2..12), leaf_of(12..24)];
        settle(&mut children);
        assert_eq!(children.len(), 2);
        assert_eq!(children[0].len(), 12);
    }

    #[rstest]
    fn test_collapse_removes_single_child_chain() {
        let chain = Node::internal([Node::internal([leaf_of(0..5)])]);
        let collapsed = collapse(chain);
        assert_eq!(collapsed.height(), 0);
        assert_eq!(collapsed.count(), 5);
    }

    #[rstest]
    #[case(1, 1)]
    #[case(5, 200)]
    #[case(200, 5)]
    #[case(17, 17)]
    #[case(1000, 3)]
    #[case(3, 1000)]
    #[case(129, 4000)]
    fn test_concat_keeps_order_and_invariants(#[case] left_count: u64, #[case] right_count: u64) {
        let left = build(0..left_count);
        let right = build(left_count..left_count + right_count);
        let root = concat(&left, &right);
        let total = usize::try_from(left_count + right_count).unwrap_or(usize::MAX);
        assert_eq!(validate(&root, total), Ok(()));
        assert_eq!(elements_of(&root), (0..left_count + right_count).collect::<Vec<_>>());
    }

    fn build(range: std::ops::Range<u64>) -> NodePointer<u64> {
        let mut root: Option<NodePointer<u64>> = None;
        for value in range {
            root = Some(match root {
                None => leaf_of(value..value + 1),
                Some(node) => match push_back(&node, value) {
                    Appended::Updated(node) => node,
                    Appended::Overflowed(sibling) => Node::internal([node, sibling]),
                },
            });
        }
        root.unwrap_or_else(|| leaf_of(0..0))
    }
}
