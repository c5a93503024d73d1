//! Node layout, capacities and the structural checker.

use std::mem::size_of;

use crate::persistent::ReferenceCounter;

// =============================================================================
// Capacities
// =============================================================================

/// Maximum number of elements in a leaf, chosen so that a leaf's payload
/// stays within one or two cache lines.
pub(crate) const fn max_leaf<T>() -> usize {
    match size_of::<T>() {
        0 | 1 => 128,
        2 => 64,
        3 | 4 => 32,
        5..=8 => 16,
        _ => 8,
    }
}

/// Maximum number of children in an internal node.
pub(crate) const fn max_internal<T>() -> usize {
    match size_of::<T>() {
        0 | 1 => 64,
        2 => 32,
        3 | 4 => 16,
        _ => 8,
    }
}

/// Node arities used for a given element type.
///
/// Every node that is not on the trailing edge (the path from the root
/// through each node's last child) holds between `min_*` and `max_*` entries.
///
/// # Examples
///
/// ```rust
/// use bplus_list::persistent::NodeCapacity;
///
/// let capacity = NodeCapacity::of::<u64>();
/// assert_eq!(capacity.max_leaf, 16);
/// assert_eq!(capacity.min_leaf, 8);
/// assert_eq!(capacity.max_internal, 8);
/// assert_eq!(capacity.min_internal, 4);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeCapacity {
    /// Maximum number of elements in a leaf.
    pub max_leaf: usize,
    /// Minimum number of elements in a leaf off the trailing edge.
    pub min_leaf: usize,
    /// Maximum number of children in an internal node.
    pub max_internal: usize,
    /// Minimum number of children in an internal node off the trailing edge.
    pub min_internal: usize,
}

impl NodeCapacity {
    /// Returns the capacities used for lists of `T`.
    #[must_use]
    pub const fn of<T>() -> Self {
        Self {
            max_leaf: max_leaf::<T>(),
            min_leaf: max_leaf::<T>() / 2,
            max_internal: max_internal::<T>(),
            min_internal: max_internal::<T>() / 2,
        }
    }
}

// =============================================================================
// Node Definition
// =============================================================================

/// Shared pointer to an immutable node.
pub(crate) type NodePointer<T> = ReferenceCounter<Node<T>>;

/// An immutable tree node.
pub(crate) enum Node<T> {
    /// Elements in order.
    Leaf(Box<[T]>),
    /// Children in order, each with the running element count through it.
    Internal(Box<[Branch<T>]>),
}

/// A child of an internal node.
pub(crate) struct Branch<T> {
    pub(crate) child: NodePointer<T>,
    /// Total elements in this child and every child before it.
    pub(crate) cumulative_count: usize,
}

impl<T> Clone for Branch<T> {
    fn clone(&self) -> Self {
        Self {
            child: self.child.clone(),
            cumulative_count: self.cumulative_count,
        }
    }
}

impl<T> Node<T> {
    /// Wraps elements in a new leaf. The boxed slice drops any slack capacity.
    pub(crate) fn leaf(elements: Vec<T>) -> NodePointer<T> {
        ReferenceCounter::new(Self::Leaf(elements.into_boxed_slice()))
    }

    /// Builds an internal node over `children`, computing cumulative counts.
    pub(crate) fn internal<I>(children: I) -> NodePointer<T>
    where
        I: IntoIterator<Item = NodePointer<T>>,
    {
        let mut running = 0;
        let branches: Box<[Branch<T>]> = children
            .into_iter()
            .map(|child| {
                running += child.count();
                Branch {
                    child,
                    cumulative_count: running,
                }
            })
            .collect();
        ReferenceCounter::new(Self::Internal(branches))
    }

    /// Number of entries (elements or children) held directly by this node.
    #[inline]
    pub(crate) fn len(&self) -> usize {
        match self {
            Self::Leaf(elements) => elements.len(),
            Self::Internal(branches) => branches.len(),
        }
    }

    /// Number of elements in the subtree rooted at this node.
    #[inline]
    pub(crate) fn count(&self) -> usize {
        match self {
            Self::Leaf(elements) => elements.len(),
            Self::Internal(branches) => branches.last().map_or(0, |branch| branch.cumulative_count),
        }
    }

    /// Distance to the leaves; a leaf has height 0.
    pub(crate) fn height(&self) -> usize {
        let mut height = 0;
        let mut node = self;
        while let Self::Internal(branches) = node {
            height += 1;
            node = &*branches[0].child;
        }
        height
    }

    #[inline]
    pub(crate) const fn max_len(&self) -> usize {
        match self {
            Self::Leaf(_) => max_leaf::<T>(),
            Self::Internal(_) => max_internal::<T>(),
        }
    }

    #[inline]
    pub(crate) const fn min_len(&self) -> usize {
        self.max_len() / 2
    }

    #[inline]
    pub(crate) fn is_under_full(&self) -> bool {
        self.len() < self.min_len()
    }

    /// Clones the child pointers of an internal node.
    pub(crate) fn children(&self) -> Vec<NodePointer<T>> {
        match self {
            Self::Leaf(_) => Vec::new(),
            Self::Internal(branches) => branches.iter().map(|branch| branch.child.clone()).collect(),
        }
    }
}

// =============================================================================
// Cumulative Count Routing
// =============================================================================

/// An entry of an internal node that carries a running element count.
pub(crate) trait CountedEntry {
    fn cumulative_count(&self) -> usize;
}

impl<T> CountedEntry for Branch<T> {
    #[inline]
    fn cumulative_count(&self) -> usize {
        self.cumulative_count
    }
}

/// Finds the child holding `index`, returning its position and the index
/// relative to that child.
///
/// An index equal to the node's count routes to the last child, which is
/// where an insertion at the end belongs.
#[inline]
pub(crate) fn locate<E: CountedEntry>(entries: &[E], index: usize) -> (usize, usize) {
    let position = entries
        .partition_point(|entry| entry.cumulative_count() <= index)
        .min(entries.len() - 1);
    let offset = if position == 0 {
        index
    } else {
        index - entries[position - 1].cumulative_count()
    };
    (position, offset)
}

/// Splits an overflowing sequence of entries, giving the left half the larger share.
pub(crate) fn split_evenly<E>(mut entries: Vec<E>) -> (Vec<E>, Vec<E>) {
    let right = entries.split_off(entries.len().div_ceil(2));
    (entries, right)
}

// =============================================================================
// Structural Checker
// =============================================================================

/// Checks every size, count and depth invariant of a non-empty tree.
pub(crate) fn validate<T>(root: &Node<T>, length: usize) -> Result<(), String> {
    let (count, _) = validate_node(root, true, true)?;
    if count == length {
        Ok(())
    } else {
        Err(format!("cached length {length} differs from element count {count}"))
    }
}

fn validate_node<T>(
    node: &Node<T>,
    is_root: bool,
    on_trailing_edge: bool,
) -> Result<(usize, usize), String> {
    let length = node.len();
    if length == 0 {
        return Err("node without entries".to_string());
    }
    if length > node.max_len() {
        return Err(format!("node with {length} entries exceeds {}", node.max_len()));
    }
    if !on_trailing_edge && length < node.min_len() {
        return Err(format!(
            "node off the trailing edge has {length} entries, below {}",
            node.min_len()
        ));
    }

    match node {
        Node::Leaf(elements) => Ok((elements.len(), 0)),
        Node::Internal(branches) => {
            if is_root && length < 2 {
                return Err("internal root with a single child".to_string());
            }
            let mut running = 0;
            let mut child_height = None;
            for (position, branch) in branches.iter().enumerate() {
                let is_last = position + 1 == length;
                let (count, height) =
                    validate_node(&branch.child, false, on_trailing_edge && is_last)?;
                running += count;
                if branch.cumulative_count != running {
                    return Err(format!(
                        "cumulative count {} at child {position} should be {running}",
                        branch.cumulative_count
                    ));
                }
                match child_height {
                    None => child_height = Some(height),
                    Some(expected) if expected != height => {
                        return Err(format!(
                            "leaves at different depths ({expected} and {height})"
                        ));
                    }
                    Some(_) => {}
                }
            }
            Ok((running, child_height.map_or(0, |height| height + 1)))
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
