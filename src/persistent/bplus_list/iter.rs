//! Leaf-walking iterators.
//!
//! Both iterators keep an explicit stack of `(node, next child)` frames, so
//! advancing to the next leaf costs amortized O(1) and no intermediate
//! buffers are materialized.

use std::iter::FusedIterator;

use smallvec::SmallVec;

use super::node::{Branch, Node, NodePointer, locate};

/// Frames for typical tree depths fit inline.
const INLINE_DEPTH: usize = 8;

/// An internal node being walked and the next child to visit.
///
/// Walking forward, `position` is the next child to descend into. Walking
/// backward, it is one past the next child.
struct Frame<'a, T> {
    branches: &'a [Branch<T>],
    position: usize,
}

/// One end of a borrowed traversal.
struct Edge<'a, T> {
    frames: SmallVec<[Frame<'a, T>; INLINE_DEPTH]>,
    leaf: std::slice::Iter<'a, T>,
}

impl<'a, T> Edge<'a, T> {
    fn empty() -> Self {
        Self {
            frames: SmallVec::new(),
            leaf: std::slice::Iter::default(),
        }
    }

    /// Positions the edge so that the next forward step yields `index`.
    fn front(root: &'a Node<T>, mut index: usize) -> Self {
        let mut frames = SmallVec::new();
        let mut node = root;
        loop {
            match node {
                Node::Leaf(elements) => {
                    return Self {
                        frames,
                        leaf: elements[index..].iter(),
                    };
                }
                Node::Internal(branches) => {
                    let (position, offset) = locate(branches, index);
                    frames.push(Frame {
                        branches: &branches[..],
                        position: position + 1,
                    });
                    node = &*branches[position].child;
                    index = offset;
                }
            }
        }
    }

    /// Positions the edge so that the next backward step yields `index`.
    fn back(root: &'a Node<T>, mut index: usize) -> Self {
        let mut frames = SmallVec::new();
        let mut node = root;
        loop {
            match node {
                Node::Leaf(elements) => {
                    return Self {
                        frames,
                        leaf: elements[..=index].iter(),
                    };
                }
                Node::Internal(branches) => {
                    let (position, offset) = locate(branches, index);
                    frames.push(Frame {
                        branches: &branches[..],
                        position,
                    });
                    node = &*branches[position].child;
                    index = offset;
                }
            }
        }
    }

    /// Moves to the first element of the next leaf. Returns `false` at the end.
    fn next_leaf(&mut self) -> bool {
        while let Some(frame) = self.frames.last_mut() {
            let branches = frame.branches;
            if frame.position < branches.len() {
                let mut node: &'a Node<T> = &*branches[frame.position].child;
                frame.position += 1;
                loop {
                    match node {
                        Node::Leaf(elements) => {
                            self.leaf = elements.iter();
                            return true;
                        }
                        Node::Internal(children) => {
                            self.frames.push(Frame {
                                branches: &children[..],
                                position: 1,
                            });
                            node = &*children[0].child;
                        }
                    }
                }
            }
            self.frames.pop();
        }
        false
    }

    /// Moves to the last element of the previous leaf. Returns `false` at the start.
    fn previous_leaf(&mut self) -> bool {
        while let Some(frame) = self.frames.last_mut() {
            let branches = frame.branches;
            if frame.position > 0 {
                frame.position -= 1;
                let mut node: &'a Node<T> = &*branches[frame.position].child;
                loop {
                    match node {
                        Node::Leaf(elements) => {
                            self.leaf = elements.iter();
                            return true;
                        }
                        Node::Internal(children) => {
                            let last = children.len() - 1;
                            self.frames.push(Frame {
                                branches: &children[..],
                                position: last,
                            });
                            node = &*children[last].child;
                        }
                    }
                }
            }
            self.frames.pop();
        }
        false
    }
}

// =============================================================================
// BPlusListIterator
// =============================================================================

/// An iterator over references to elements of a [`BPlusList`](super::BPlusList).
///
/// The iterator is double-ended; the front and the back walk the tree
/// independently and a shared remaining count keeps them from crossing.
pub struct BPlusListIterator<'a, T> {
    front: Edge<'a, T>,
    back: Edge<'a, T>,
    remaining: usize,
}

impl<'a, T> BPlusListIterator<'a, T> {
    /// Iterates `count` elements starting at `start`. The range must lie
    /// within the tree.
    pub(crate) fn new(root: Option<&'a Node<T>>, start: usize, count: usize) -> Self {
        match root {
            Some(root) if count > 0 => Self {
                front: Edge::front(root, start),
                back: Edge::back(root, start + count - 1),
                remaining: count,
            },
            _ => Self {
                front: Edge::empty(),
                back: Edge::empty(),
                remaining: 0,
            },
        }
    }
}

impl<'a, T> Iterator for BPlusListIterator<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        loop {
            if let Some(element) = self.front.leaf.next() {
                self.remaining -= 1;
                return Some(element);
            }
            if !self.front.next_leaf() {
                return None;
            }
        }
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<T> DoubleEndedIterator for BPlusListIterator<'_, T> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        loop {
            if let Some(element) = self.back.leaf.next_back() {
                self.remaining -= 1;
                return Some(element);
            }
            if !self.back.previous_leaf() {
                return None;
            }
        }
    }
}

impl<T> ExactSizeIterator for BPlusListIterator<'_, T> {
    fn len(&self) -> usize {
        self.remaining
    }
}

impl<T> FusedIterator for BPlusListIterator<'_, T> {}

// =============================================================================
// BPlusListIntoIterator
// =============================================================================

/// A node being walked by the owning iterator and the next entry to visit.
struct OwnedFrame<T> {
    node: NodePointer<T>,
    position: usize,
}

/// An owning iterator over elements of a [`BPlusList`](super::BPlusList).
///
/// Nodes may be shared with other lists, so elements are cloned as they
/// are returned.
pub struct BPlusListIntoIterator<T> {
    frames: Vec<OwnedFrame<T>>,
    remaining: usize,
}

impl<T> BPlusListIntoIterator<T> {
    pub(crate) fn new(root: Option<NodePointer<T>>, length: usize) -> Self {
        let frames = root
            .map(|node| vec![OwnedFrame { node, position: 0 }])
            .unwrap_or_default();
        Self {
            frames,
            remaining: length,
        }
    }
}

impl<T: Clone> Iterator for BPlusListIntoIterator<T> {
    type Item = T;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(frame) = self.frames.last_mut() {
            match frame.node.as_ref() {
                Node::Leaf(elements) => {
                    if let Some(element) = elements.get(frame.position) {
                        frame.position += 1;
                        self.remaining -= 1;
                        return Some(element.clone());
                    }
                }
                Node::Internal(branches) => {
                    if let Some(branch) = branches.get(frame.position) {
                        let child = branch.child.clone();
                        frame.position += 1;
                        self.frames.push(OwnedFrame {
                            node: child,
                            position: 0,
                        });
                        continue;
                    }
                }
            }
            self.frames.pop();
        }
        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (self.remaining, Some(self.remaining))
    }
}

impl<T: Clone> ExactSizeIterator for BPlusListIntoIterator<T> {
    fn len(&self) -> usize {
        self.remaining
    }
}

impl<T: Clone> FusedIterator for BPlusListIntoIterator<T> {}
