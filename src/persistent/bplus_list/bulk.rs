//! Level-by-level construction from element streams and whole subtrees.
//!
//! [`BulkBuilder`] keeps one accumulator per tree level: a leaf accumulator
//! for elements and, above it, one list of completed nodes per height. A full
//! accumulator is completed into a node and pushed one level up. Finishing
//! flushes the partial accumulators bottom-up, so the only nodes that can be
//! under-full are the last one on each level, which is exactly the trailing
//! edge.
//!
//! Whole subtrees are pushed into the accumulator of their own height when
//! every lower accumulator is empty, which makes appending a large tree cost
//! time proportional to its boundary instead of its length.

use arrayvec::ArrayVec;

use super::BPlusList;
use super::node::{Node, NodePointer, max_internal, max_leaf};

/// Upper bound on tree height. With at least four children per internal
/// node a tree of `usize::MAX` elements is far shallower than this.
const MAX_HEIGHT: usize = 64;

pub(crate) struct BulkBuilder<T> {
    leaf: Vec<T>,
    /// `levels[height]` holds completed nodes of that height, leaves at 0.
    levels: ArrayVec<Vec<NodePointer<T>>, MAX_HEIGHT>,
    length: usize,
}

impl<T> BulkBuilder<T> {
    pub(crate) fn new() -> Self {
        Self {
            leaf: Vec::new(),
            levels: ArrayVec::new(),
            length: 0,
        }
    }

    /// Appends one element.
    ///
    /// # Panics
    ///
    /// Panics if the element count overflows `usize`.
    pub(crate) fn push(&mut self, element: T) {
        if self.leaf.len() == max_leaf::<T>() {
            let elements = std::mem::replace(&mut self.leaf, Vec::with_capacity(max_leaf::<T>()));
            self.push_node(Node::leaf(elements), 0);
        }
        self.leaf.push(element);
        self.length = super::checked_length(self.length, 1);
    }

    /// Adds a completed node of the given height to its accumulator.
    fn push_node(&mut self, node: NodePointer<T>, height: usize) {
        while self.levels.len() <= height {
            self.levels.push(Vec::new());
        }
        if self.levels[height].len() == max_internal::<T>() {
            let children = std::mem::take(&mut self.levels[height]);
            self.push_node(Node::internal(children), height + 1);
        }
        self.levels[height].push(node);
    }

    fn lower_levels_are_empty(&self, height: usize) -> bool {
        self.leaf.is_empty() && self.levels.iter().take(height).all(Vec::is_empty)
    }

    /// Flushes every accumulator and returns the finished list.
    pub(crate) fn finish(mut self) -> BPlusList<T> {
        if !self.leaf.is_empty() {
            let elements = std::mem::take(&mut self.leaf);
            self.push_node(Node::leaf(elements), 0);
        }

        let mut height = 0;
        let root = loop {
            if height >= self.levels.len() {
                break None;
            }
            let nodes = std::mem::take(&mut self.levels[height]);
            let is_top = height + 1 == self.levels.len();
            match nodes.len() {
                0 => {}
                1 if is_top => break nodes.into_iter().next(),
                _ => self.push_node(Node::internal(nodes), height + 1),
            }
            height += 1;
        };

        if let Some(root) = &root {
            tracing::trace!(length = self.length, height = root.height(), "bulk build finished");
        }
        BPlusList::from_parts(root, self.length)
    }
}

impl<T: Clone> BulkBuilder<T> {
    /// Starts a builder that continues after the last element of `list`.
    ///
    /// The nodes hanging off the left of the list's trailing edge are moved
    /// into the accumulators as they are, and the elements of the last leaf
    /// seed the leaf accumulator.
    pub(crate) fn from_list(list: &BPlusList<T>) -> Self {
        let mut builder = Self::new();
        if let Some(root) = &list.root {
            let mut node = root;
            let mut height = node.height();
            while builder.levels.len() < height {
                builder.levels.push(Vec::new());
            }
            loop {
                match node.as_ref() {
                    Node::Leaf(elements) => {
                        builder.leaf.reserve(max_leaf::<T>());
                        builder.leaf.extend_from_slice(elements);
                        break;
                    }
                    Node::Internal(branches) => {
                        let last = branches.len() - 1;
                        height -= 1;
                        builder.levels[height]
                            .extend(branches[..last].iter().map(|branch| branch.child.clone()));
                        node = &branches[last].child;
                    }
                }
            }
            builder.length = list.length;
        }
        builder
    }

    /// Appends every element of a subtree, reusing whole nodes where the
    /// accumulators line up with them.
    ///
    /// A subtree on the trailing edge of its source may be under-full, so it
    /// is always decomposed into its children.
    pub(crate) fn push_subtree(&mut self, node: &NodePointer<T>, height: usize, on_trailing_edge: bool) {
        if !on_trailing_edge && self.lower_levels_are_empty(height) {
            self.length = super::checked_length(self.length, node.count());
            self.push_node(node.clone(), height);
            return;
        }
        match node.as_ref() {
            Node::Leaf(elements) => {
                for element in elements.iter() {
                    self.push(element.clone());
                }
            }
            Node::Internal(branches) => {
                let last = branches.len() - 1;
                for (position, branch) in branches.iter().enumerate() {
                    self.push_subtree(&branch.child, height - 1, on_trailing_edge && position == last);
                }
            }
        }
    }

    /// Appends the elements `[start, end)` of a subtree.
    pub(crate) fn push_range(
        &mut self,
        node: &NodePointer<T>,
        height: usize,
        start: usize,
        end: usize,
        on_trailing_edge: bool,
    ) {
        if start >= end {
            return;
        }
        if start == 0 && end == node.count() {
            self.push_subtree(node, height, on_trailing_edge);
            return;
        }
        match node.as_ref() {
            Node::Leaf(elements) => {
                for element in &elements[start..end] {
                    self.push(element.clone());
                }
            }
            Node::Internal(branches) => {
                let last = branches.len() - 1;
                let mut base = 0;
                for (position, branch) in branches.iter().enumerate() {
                    let child_end = branch.cumulative_count;
                    if child_end > start && base < end {
                        self.push_range(
                            &branch.child,
                            height - 1,
                            start.max(base) - base,
                            end.min(child_end) - base,
                            on_trailing_edge && position == last,
                        );
                    }
                    if child_end >= end {
                        break;
                    }
                    base = child_end;
                }
            }
        }
    }

    /// Appends the elements `[start, end)` of a whole list.
    pub(crate) fn push_list_range(&mut self, list: &BPlusList<T>, start: usize, end: usize) {
        if let Some(root) = &list.root {
            self.push_range(root, root.height(), start, end, true);
        }
    }
}

impl<T> Extend<T> for BulkBuilder<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iterable: I) {
        for element in iterable {
            self.push(element);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persistent::ReferenceCounter;
    use rstest::rstest;

    fn built(count: u64) -> BPlusList<u64> {
        let mut builder = BulkBuilder::new();
        builder.extend(0..count);
        builder.finish()
    }

    #[rstest]
    #[case(0)]
    #[case(1)]
    #[case(16)]
    #[case(17)]
    #[case(128)]
    #[case(129)]
    #[case(1024)]
    #[case(1025)]
    #[case(5000)]
    fn test_finish_builds_valid_tree(#[case] count: u64) {
        let list = built(count);
        assert_eq!(list.validate_structure(), Ok(()));
        assert_eq!(list.iter().copied().collect::<Vec<_>>(), (0..count).collect::<Vec<_>>());
    }

    #[rstest]
    fn test_exactly_one_full_level_has_no_extra_root() {
        let list = built(16);
        assert_eq!(list.height(), 1);
    }

    #[rstest]
    fn test_from_list_continues_after_existing_elements() {
        let list = built(300);
        let mut builder = BulkBuilder::from_list(&list);
        builder.extend(300..1000);
        let extended = builder.finish();
        assert_eq!(extended.validate_structure(), Ok(()));
        assert_eq!(extended.iter().copied().collect::<Vec<_>>(), (0..1000).collect::<Vec<_>>());
    }

    #[rstest]
    fn test_push_subtree_reuses_aligned_nodes() {
        let source = built(1000);
        let mut builder = BulkBuilder::new();
        builder.push_list_range(&source, 0, 1000);
        let copy = builder.finish();
        assert_eq!(copy.validate_structure(), Ok(()));
        assert_eq!(copy, source);

        let (Some(source_root), Some(copy_root)) = (&source.root, &copy.root) else {
            panic!("expected non-empty lists");
        };
        let (Node::Internal(before), Node::Internal(after)) = (source_root.as_ref(), copy_root.as_ref())
        else {
            panic!("expected internal roots");
        };
        assert!(ReferenceCounter::ptr_eq(&before[0].child, &after[0].child));
    }

    #[rstest]
    #[case(0, 1)]
    #[case(3, 700)]
    #[case(16, 32)]
    #[case(128, 1000)]
    #[case(999, 1000)]
    fn test_push_range_copies_slice(#[case] start: usize, #[case] end: usize) {
        let source = built(1000);
        let mut builder = BulkBuilder::new();
        builder.push_list_range(&source, start, end);
        let slice = builder.finish();
        assert_eq!(slice.validate_structure(), Ok(()));
        assert_eq!(
            slice.iter().copied().collect::<Vec<_>>(),
            (start as u64..end as u64).collect::<Vec<_>>()
        );
    }
}
