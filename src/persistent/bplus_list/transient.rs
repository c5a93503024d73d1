//! Transient (temporarily mutable) list for batched edits.

use std::marker::PhantomData;
use std::rc::Rc;

use super::BPlusList;
use super::node::{CountedEntry, Node, NodePointer, locate, max_internal, max_leaf, split_evenly};
use super::remove;
use crate::error::{BPlusListError, Result, check_range};

// =============================================================================
// Transient Nodes
// =============================================================================

/// A node reachable from a transient.
///
/// `Shared` nodes may belong to published lists and are never mutated. An
/// `Owned` node was created by this transient and is reachable only from it,
/// so it is edited in place. Ownership is always a prefix from the root: the
/// children of a `Shared` node are shared too.
enum TransientNode<T> {
    Shared(NodePointer<T>),
    Owned(OwnedNode<T>),
}

enum OwnedNode<T> {
    /// Allocated with room for a full leaf so that appends do not reallocate.
    Leaf(Vec<T>),
    Internal(Vec<TransientBranch<T>>),
}

struct TransientBranch<T> {
    child: TransientNode<T>,
    cumulative_count: usize,
}

impl<T> CountedEntry for TransientBranch<T> {
    #[inline]
    fn cumulative_count(&self) -> usize {
        self.cumulative_count
    }
}

impl<T> TransientNode<T> {
    fn count(&self) -> usize {
        match self {
            Self::Shared(node) => node.count(),
            Self::Owned(OwnedNode::Leaf(elements)) => elements.len(),
            Self::Owned(OwnedNode::Internal(branches)) => {
                branches.last().map_or(0, |branch| branch.cumulative_count)
            }
        }
    }

    fn is_full_leaf(&self) -> bool {
        match self {
            Self::Shared(node) => matches!(node.as_ref(), Node::Leaf(elements) if elements.len() == max_leaf::<T>()),
            Self::Owned(OwnedNode::Leaf(elements)) => elements.len() == max_leaf::<T>(),
            Self::Owned(OwnedNode::Internal(_)) => false,
        }
    }

    fn owned_leaf(value: T) -> Self {
        let mut elements = Vec::with_capacity(max_leaf::<T>());
        elements.push(value);
        Self::Owned(OwnedNode::Leaf(elements))
    }

    fn owned_internal(children: Vec<Self>) -> Self {
        let mut running = 0;
        let branches = children
            .into_iter()
            .map(|child| {
                running += child.count();
                TransientBranch {
                    child,
                    cumulative_count: running,
                }
            })
            .collect();
        Self::Owned(OwnedNode::Internal(branches))
    }

    fn get(&self, mut index: usize) -> &T {
        let mut node = self;
        loop {
            match node {
                Self::Shared(shared) => return super::indexer::get(shared, index),
                Self::Owned(OwnedNode::Leaf(elements)) => return &elements[index],
                Self::Owned(OwnedNode::Internal(branches)) => {
                    let (position, offset) = locate(branches.as_slice(), index);
                    node = &branches[position].child;
                    index = offset;
                }
            }
        }
    }

    /// Converts owned nodes back into shared ones, walking only the owned
    /// prefix and trimming leaf slack.
    fn freeze(self) -> NodePointer<T> {
        match self {
            Self::Shared(node) => node,
            Self::Owned(OwnedNode::Leaf(elements)) => Node::leaf(elements),
            Self::Owned(OwnedNode::Internal(branches)) => {
                Node::internal(branches.into_iter().map(|branch| branch.child.freeze()))
            }
        }
    }
}

impl<T: Clone> TransientNode<T> {
    /// Returns the owned form of this node, copying it first if it is shared.
    fn make_owned(&mut self) -> &mut OwnedNode<T> {
        if let Self::Shared(node) = self {
            let owned = match node.as_ref() {
                Node::Leaf(elements) => {
                    let mut copy = Vec::with_capacity(max_leaf::<T>().max(elements.len()));
                    copy.extend_from_slice(elements);
                    OwnedNode::Leaf(copy)
                }
                Node::Internal(branches) => OwnedNode::Internal(
                    branches
                        .iter()
                        .map(|branch| TransientBranch {
                            child: Self::Shared(branch.child.clone()),
                            cumulative_count: branch.cumulative_count,
                        })
                        .collect(),
                ),
            };
            *self = Self::Owned(owned);
        }
        match self {
            Self::Owned(owned) => owned,
            Self::Shared(_) => unreachable!("node was made owned above"),
        }
    }

    fn set(&mut self, index: usize, value: T) {
        match self.make_owned() {
            OwnedNode::Leaf(elements) => elements[index] = value,
            OwnedNode::Internal(branches) => {
                let (position, offset) = locate(branches.as_slice(), index);
                branches[position].child.set(offset, value);
            }
        }
    }

    /// Appends along the rightmost spine. A full node stays as it is and the
    /// element starts a new right sibling, which is returned.
    fn push_back(&mut self, value: T) -> Option<Self> {
        if self.is_full_leaf() {
            return Some(Self::owned_leaf(value));
        }
        match self.make_owned() {
            OwnedNode::Leaf(elements) => {
                elements.push(value);
                None
            }
            OwnedNode::Internal(branches) => {
                let last = branches.len() - 1;
                let Some(sibling) = branches[last].child.push_back(value) else {
                    branches[last].cumulative_count += 1;
                    return None;
                };
                if branches.len() < max_internal::<T>() {
                    let cumulative_count = branches[last].cumulative_count + 1;
                    branches.push(TransientBranch {
                        child: sibling,
                        cumulative_count,
                    });
                    None
                } else {
                    Some(Self::owned_internal(vec![sibling]))
                }
            }
        }
    }

    /// Inserts `value` at `index`, splitting evenly on overflow. Returns the
    /// right half of a split.
    fn insert(&mut self, index: usize, value: T) -> Option<Self> {
        match self.make_owned() {
            OwnedNode::Leaf(elements) => {
                elements.insert(index, value);
                if elements.len() <= max_leaf::<T>() {
                    return None;
                }
                let right = elements.split_off(elements.len().div_ceil(2));
                let mut right_leaf = Vec::with_capacity(max_leaf::<T>());
                right_leaf.extend(right);
                Some(Self::Owned(OwnedNode::Leaf(right_leaf)))
            }
            OwnedNode::Internal(branches) => {
                let (position, offset) = locate(branches.as_slice(), index);
                if let Some(right) = branches[position].child.insert(offset, value) {
                    branches.insert(
                        position + 1,
                        TransientBranch {
                            child: right,
                            cumulative_count: 0,
                        },
                    );
                }
                renumber(branches, position);
                if branches.len() <= max_internal::<T>() {
                    return None;
                }
                let (left, mut right) = split_evenly(std::mem::take(branches));
                *branches = left;
                renumber(&mut right, 0);
                Some(Self::Owned(OwnedNode::Internal(right)))
            }
        }
    }
}

/// Recomputes running counts from `from` onward.
fn renumber<T>(branches: &mut [TransientBranch<T>], from: usize) {
    let mut running = if from == 0 {
        0
    } else {
        branches[from - 1].cumulative_count
    };
    for branch in &mut branches[from..] {
        running += branch.child.count();
        branch.cumulative_count = running;
    }
}

// =============================================================================
// TransientBPlusList Definition
// =============================================================================

/// A transient (temporarily mutable) list for efficient batch updates.
///
/// A transient starts out sharing every node with the list it came from.
/// The first edit that reaches a node copies it into the transient; later
/// edits to the same node happen in place without allocating. Converting
/// back with [`persistent()`](Self::persistent) or
/// [`snapshot()`](Self::snapshot) freezes only the nodes the transient owns.
///
/// # Design
///
/// - `PhantomData<Rc<()>>` ensures `!Send` and `!Sync`
/// - Clone is intentionally not implemented
/// - Every mutation bumps a version counter checked by [`TransientCursor`]
///
/// # Examples
///
/// ```rust
/// use bplus_list::persistent::BPlusList;
///
/// let list: BPlusList<i32> = (0..100).collect();
///
/// let mut transient = list.transient();
/// transient.set(0, -1).unwrap();
/// transient.push_back(100);
/// transient.insert(50, 0).unwrap();
///
/// let updated = transient.persistent();
/// assert_eq!(updated.len(), 102);
/// assert_eq!(updated.get(0), Some(&-1));
/// assert_eq!(list.get(0), Some(&0));
/// ```
pub struct TransientBPlusList<T> {
    root: Option<TransientNode<T>>,
    length: usize,
    version: u64,
    /// Marker to ensure `!Send` and `!Sync`.
    _marker: PhantomData<Rc<()>>,
}

static_assertions::assert_not_impl_any!(TransientBPlusList<i32>: Send, Sync);
static_assertions::assert_not_impl_any!(TransientBPlusList<String>: Send, Sync);

#[cfg(feature = "arc")]
mod arc_send_sync_verification {
    use super::TransientBPlusList;
    use std::sync::Arc;

    static_assertions::assert_not_impl_any!(TransientBPlusList<Arc<i32>>: Send, Sync);
}

impl<T> TransientBPlusList<T> {
    /// Creates an empty transient.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            root: None,
            length: 0,
            version: 0,
            _marker: PhantomData,
        }
    }

    pub(crate) fn from_list(list: &BPlusList<T>) -> Self {
        Self {
            root: list.root.clone().map(TransientNode::Shared),
            length: list.length,
            version: 0,
            _marker: PhantomData,
        }
    }

    /// Returns the number of elements.
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.length
    }

    /// Returns `true` if the transient holds no elements.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Returns the element at `index`, or `None` if it is out of bounds.
    ///
    /// # Complexity
    ///
    /// O(log N)
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&T> {
        if index >= self.length {
            return None;
        }
        self.root.as_ref().map(|root| root.get(index))
    }

    /// Removes every element.
    pub fn clear(&mut self) {
        self.root = None;
        self.length = 0;
        self.bump_version();
    }

    /// Returns a cursor that walks the elements and fails once the
    /// transient is modified.
    #[must_use]
    pub const fn cursor(&self) -> TransientCursor {
        TransientCursor {
            position: 0,
            version: self.version,
        }
    }

    /// Freezes the owned nodes and returns the resulting list, consuming the
    /// transient.
    #[must_use]
    pub fn persistent(self) -> BPlusList<T> {
        let root = self.root.map(TransientNode::freeze);
        tracing::trace!(length = self.length, "froze transient");
        BPlusList::from_parts(root, self.length)
    }

    /// Freezes the owned nodes and returns the resulting list, leaving the
    /// transient usable. Later edits copy the frozen nodes again.
    #[must_use]
    pub fn snapshot(&mut self) -> BPlusList<T> {
        let root = self.root.take().map(TransientNode::freeze);
        self.root = root.clone().map(TransientNode::Shared);
        tracing::trace!(length = self.length, "took transient snapshot");
        BPlusList::from_parts(root, self.length)
    }

    const fn bump_version(&mut self) {
        self.version = self.version.wrapping_add(1);
    }
}

impl<T: Clone> TransientBPlusList<T> {
    /// Replaces the element at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`BPlusListError::IndexOutOfRange`] if `index >= len()`.
    pub fn set(&mut self, index: usize, value: T) -> Result<()> {
        match self.root.as_mut() {
            Some(root) if index < self.length => {
                root.set(index, value);
                self.bump_version();
                Ok(())
            }
            _ => Err(BPlusListError::index_out_of_range(index, self.length)),
        }
    }

    /// Appends an element.
    ///
    /// # Panics
    ///
    /// Panics if the length overflows `usize`.
    pub fn push_back(&mut self, value: T) {
        self.length = super::checked_length(self.length, 1);
        self.bump_version();
        match self.root.as_mut() {
            None => self.root = Some(TransientNode::owned_leaf(value)),
            Some(root) => {
                if let Some(sibling) = root.push_back(value)
                    && let Some(previous) = self.root.take()
                {
                    tracing::trace!(length = self.length, "transient root split");
                    self.root = Some(TransientNode::owned_internal(vec![previous, sibling]));
                }
            }
        }
    }

    /// Inserts an element at `index`, shifting later elements right.
    ///
    /// # Errors
    ///
    /// Returns [`BPlusListError::IndexOutOfRange`] if `index > len()`, or
    /// [`BPlusListError::CountOverflow`] if the length would overflow.
    pub fn insert(&mut self, index: usize, value: T) -> Result<()> {
        if index > self.length {
            return Err(BPlusListError::index_out_of_range(index, self.length));
        }
        if self.length == usize::MAX {
            return Err(BPlusListError::CountOverflow);
        }
        if index == self.length {
            self.push_back(value);
            return Ok(());
        }
        self.length += 1;
        self.bump_version();
        if let Some(root) = self.root.as_mut()
            && let Some(right) = root.insert(index, value)
            && let Some(left) = self.root.take()
        {
            tracing::trace!(length = self.length, "transient root split");
            self.root = Some(TransientNode::owned_internal(vec![left, right]));
        }
        Ok(())
    }

    /// Removes the element at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`BPlusListError::IndexOutOfRange`] if `index >= len()`.
    pub fn remove(&mut self, index: usize) -> Result<()> {
        if index >= self.length {
            return Err(BPlusListError::index_out_of_range(index, self.length));
        }
        self.remove_range(index, 1)
    }

    /// Removes `count` elements starting at `index`.
    ///
    /// The owned nodes are frozen first and the range is removed with the
    /// same rebalancing as [`BPlusList::remove_range`].
    ///
    /// # Errors
    ///
    /// Returns [`BPlusListError::RangeOutOfRange`] if the range does not lie
    /// within the transient.
    pub fn remove_range(&mut self, index: usize, count: usize) -> Result<()> {
        check_range(index, count, self.length)?;
        if count == 0 {
            return Ok(());
        }
        let root = self.root.take().map(TransientNode::freeze);
        self.root = root
            .and_then(|root| remove::remove_range(&root, index, index + count))
            .map(TransientNode::Shared);
        self.length -= count;
        self.bump_version();
        Ok(())
    }
}

impl<T> Default for TransientBPlusList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> Extend<T> for TransientBPlusList<T> {
    fn extend<I: IntoIterator<Item = T>>(&mut self, iterable: I) {
        for element in iterable {
            self.push_back(element);
        }
    }
}

impl<T: Clone> FromIterator<T> for TransientBPlusList<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iterable: I) -> Self {
        let mut transient = Self::new();
        transient.extend(iterable);
        transient
    }
}

// =============================================================================
// TransientCursor
// =============================================================================

/// A detached position in a [`TransientBPlusList`].
///
/// The cursor records the transient's version when it is created and
/// refuses to advance after any later mutation.
///
/// # Examples
///
/// ```rust
/// use bplus_list::error::BPlusListError;
/// use bplus_list::persistent::TransientBPlusList;
///
/// let mut transient: TransientBPlusList<i32> = (0..3).collect();
/// let mut cursor = transient.cursor();
/// assert_eq!(cursor.advance(&transient), Ok(Some(&0)));
///
/// transient.push_back(3);
/// assert!(matches!(
///     cursor.advance(&transient),
///     Err(BPlusListError::ConcurrentModification { .. })
/// ));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransientCursor {
    position: usize,
    version: u64,
}

impl TransientCursor {
    /// Returns the next element, or `None` past the end.
    ///
    /// # Errors
    ///
    /// Returns [`BPlusListError::ConcurrentModification`] if `transient` has
    /// been modified since the cursor was created.
    pub fn advance<'a, T>(&mut self, transient: &'a TransientBPlusList<T>) -> Result<Option<&'a T>> {
        if self.version != transient.version {
            return Err(BPlusListError::ConcurrentModification {
                expected: self.version,
                found: transient.version,
            });
        }
        let element = transient.get(self.position);
        if element.is_some() {
            self.position += 1;
        }
        Ok(element)
    }

    /// Returns the index of the next element.
    #[must_use]
    pub const fn position(&self) -> usize {
        self.position
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn contents(transient: &TransientBPlusList<u64>) -> Vec<u64> {
        (0..transient.len())
            .filter_map(|index| transient.get(index).copied())
            .collect()
    }

    #[rstest]
    fn test_new_is_empty() {
        let transient: TransientBPlusList<u64> = TransientBPlusList::new();
        assert!(transient.is_empty());
        assert_eq!(transient.get(0), None);
    }

    #[rstest]
    fn test_push_back_many_stays_valid() {
        let mut transient = TransientBPlusList::new();
        transient.extend(0..5000_u64);
        assert_eq!(transient.len(), 5000);
        let list = transient.persistent();
        assert_eq!(list.validate_structure(), Ok(()));
        assert_eq!(list.iter().copied().collect::<Vec<_>>(), (0..5000).collect::<Vec<_>>());
    }

    #[rstest]
    fn test_push_back_onto_shared_list() {
        let list: BPlusList<u64> = (0..300).collect();
        let mut transient = list.transient();
        transient.extend(300..700);
        let extended = transient.persistent();
        assert_eq!(extended.validate_structure(), Ok(()));
        assert_eq!(extended.iter().copied().collect::<Vec<_>>(), (0..700).collect::<Vec<_>>());
        assert_eq!(list.len(), 300);
    }

    #[rstest]
    fn test_insert_matches_vec() {
        let mut transient: TransientBPlusList<u64> = (0..10).collect();
        let mut expected: Vec<u64> = (0..10).collect();
        for value in 0..500_u64 {
            let index = usize::try_from(value * 7 % (expected.len() as u64 + 1)).unwrap_or(0);
            transient.insert(index, 1000 + value).unwrap();
            expected.insert(index, 1000 + value);
        }
        assert_eq!(contents(&transient), expected);
        assert_eq!(transient.persistent().validate_structure(), Ok(()));
    }

    #[rstest]
    fn test_set_does_not_touch_source() {
        let list: BPlusList<u64> = (0..100).collect();
        let mut transient = list.transient();
        transient.set(42, 4200).unwrap();
        assert_eq!(transient.get(42), Some(&4200));
        assert_eq!(list.get(42), Some(&42));
    }

    #[rstest]
    fn test_set_out_of_range() {
        let mut transient: TransientBPlusList<u64> = (0..3).collect();
        assert_eq!(
            transient.set(3, 0),
            Err(BPlusListError::IndexOutOfRange { index: 3, length: 3 })
        );
    }

    #[rstest]
    fn test_insert_out_of_range() {
        let mut transient: TransientBPlusList<u64> = (0..3).collect();
        assert_eq!(
            transient.insert(4, 0),
            Err(BPlusListError::IndexOutOfRange { index: 4, length: 3 })
        );
    }

    #[rstest]
    fn test_remove_range_then_push_back() {
        let mut transient: TransientBPlusList<u64> = (0..1000).collect();
        transient.remove_range(100, 800).unwrap();
        transient.push_back(1000);
        transient.remove(0).unwrap();
        let mut expected: Vec<u64> = (1..100).chain(900..1001).collect();
        assert_eq!(contents(&transient), expected);
        transient.remove_range(0, transient.len()).unwrap();
        expected.clear();
        assert_eq!(contents(&transient), expected);
        assert!(transient.persistent().ptr_eq(&BPlusList::new()));
    }

    #[rstest]
    fn test_snapshot_is_isolated_from_later_edits() {
        let mut transient: TransientBPlusList<u64> = (0..100).collect();
        let snapshot = transient.snapshot();
        transient.set(0, 999).unwrap();
        transient.push_back(100);
        assert_eq!(snapshot.get(0), Some(&0));
        assert_eq!(snapshot.len(), 100);
        assert_eq!(transient.get(0), Some(&999));
        assert_eq!(transient.len(), 101);
    }

    #[rstest]
    fn test_round_trip_is_identity() {
        let list: BPlusList<u64> = (0..777).collect();
        let round_tripped = list.transient().persistent();
        assert!(round_tripped.ptr_eq(&list));
    }

    #[rstest]
    fn test_clear() {
        let mut transient: TransientBPlusList<u64> = (0..50).collect();
        transient.clear();
        assert!(transient.is_empty());
        transient.push_back(7);
        assert_eq!(contents(&transient), vec![7]);
    }

    #[rstest]
    fn test_cursor_walks_all_elements() {
        let transient: TransientBPlusList<u64> = (0..40).collect();
        let mut cursor = transient.cursor();
        let mut seen = Vec::new();
        while let Ok(Some(&value)) = cursor.advance(&transient) {
            seen.push(value);
        }
        assert_eq!(seen, (0..40).collect::<Vec<_>>());
        assert_eq!(cursor.position(), 40);
    }

    #[rstest]
    #[case::set(|transient: &mut TransientBPlusList<u64>| transient.set(0, 1).unwrap())]
    #[case::push_back(|transient: &mut TransientBPlusList<u64>| transient.push_back(1))]
    #[case::insert(|transient: &mut TransientBPlusList<u64>| transient.insert(1, 1).unwrap())]
    #[case::remove(|transient: &mut TransientBPlusList<u64>| transient.remove(0).unwrap())]
    #[case::clear(|transient: &mut TransientBPlusList<u64>| transient.clear())]
    fn test_cursor_detects_modification(#[case] mutate: fn(&mut TransientBPlusList<u64>)) {
        let mut transient: TransientBPlusList<u64> = (0..10).collect();
        let mut cursor = transient.cursor();
        assert_eq!(cursor.advance(&transient), Ok(Some(&0)));
        mutate(&mut transient);
        assert!(matches!(
            cursor.advance(&transient),
            Err(BPlusListError::ConcurrentModification { .. })
        ));
    }

    #[rstest]
    fn test_snapshot_does_not_invalidate_cursor() {
        let mut transient: TransientBPlusList<u64> = (0..10).collect();
        let cursor = transient.cursor();
        let _ = transient.snapshot();
        let mut cursor = cursor;
        assert_eq!(cursor.advance(&transient), Ok(Some(&0)));
    }
}
