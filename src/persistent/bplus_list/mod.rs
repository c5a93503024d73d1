//! Persistent (immutable) indexable sequence based on a B+Tree.
//!
//! This module provides [`BPlusList`], an immutable list that supports
//! indexed access and edits anywhere in the sequence while sharing almost
//! all of its nodes with the version it was derived from.
//!
//! # Overview
//!
//! `BPlusList` stores elements in wide leaves at the bottom of a balanced
//! tree. Internal nodes keep, for each child, the running element count
//! through that child, which routes an index to its leaf with one binary
//! search per level. It provides:
//!
//! - O(log N) indexed `get` and `update`
//! - O(log N) `insert` and `remove` at any position
//! - amortized O(1) node work for `push_back` runs
//! - O(log N) `concat` of two lists
//! - O(1) `len` and `is_empty`
//!
//! Every edit copies only the nodes on the path it touches.
//!
//! # Internal Structure
//!
//! - Leaves hold up to [`NodeCapacity::max_leaf`] elements and internal
//!   nodes up to [`NodeCapacity::max_internal`] children. Both depend on the
//!   size of the element type.
//! - Every node off the trailing edge (the path from the root through each
//!   last child) is at least half full. The trailing edge may be under-full
//!   so that appends never rebalance.
//! - All leaves are at the same depth, and an internal root has at least
//!   two children.
//! - The empty list has no root at all.
//!
//! # Examples
//!
//! ```rust
//! use bplus_list::persistent::BPlusList;
//!
//! let list: BPlusList<i32> = (0..1000).collect();
//! let edited = list.insert(500, -1).unwrap().remove(0).unwrap();
//!
//! assert_eq!(list.get(500), Some(&500));     // Original unchanged
//! assert_eq!(edited.get(499), Some(&-1));    // New version
//! assert_eq!(edited.len(), 1000);
//! ```

mod bulk;
mod concat;
mod indexer;
mod insert;
mod iter;
mod node;
mod remove;
mod transient;

pub use iter::{BPlusListIntoIterator, BPlusListIterator};
pub use node::NodeCapacity;
pub use transient::{TransientBPlusList, TransientCursor};

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Index;

use super::ReferenceCounter;
use crate::error::{BPlusListError, Result, check_range};
use bulk::BulkBuilder;
use insert::{Appended, Insertion};
use node::{Node, NodePointer};

#[cold]
#[inline(never)]
fn capacity_overflow() -> ! {
    panic!("capacity overflow")
}

/// Adds to a length, panicking like `Vec` does when it overflows.
pub(crate) fn checked_length(length: usize, additional: usize) -> usize {
    length
        .checked_add(additional)
        .unwrap_or_else(|| capacity_overflow())
}

// =============================================================================
// BPlusList Definition
// =============================================================================

/// A persistent (immutable) list based on a B+Tree.
///
/// # Time Complexity
///
/// | Operation        | Complexity                      |
/// |------------------|---------------------------------|
/// | `new`            | O(1)                            |
/// | `get`            | O(log N)                        |
/// | `update`         | O(log N)                        |
/// | `push_back`      | O(log N)                        |
/// | `insert`         | O(log N)                        |
/// | `remove_range`   | O(log N)                        |
/// | `concat`         | O(log N)                        |
/// | `push_back_many` | O(log N + M)                    |
/// | `len`            | O(1)                            |
/// | `iter`           | O(log N) to create, O(N) to iterate |
///
/// # Examples
///
/// ```rust
/// use bplus_list::persistent::BPlusList;
///
/// let list = BPlusList::new().push_back(1).push_back(2).push_back(3);
/// assert_eq!(list.len(), 3);
/// assert_eq!(list.get(1), Some(&2));
///
/// // Structural sharing: the original list is preserved
/// let extended = list.push_back(4);
/// assert_eq!(list.len(), 3);
/// assert_eq!(extended.len(), 4);
/// ```
pub struct BPlusList<T> {
    /// Root node, absent for the empty list
    root: Option<NodePointer<T>>,
    /// Total number of elements
    length: usize,
}

impl<T> BPlusList<T> {
    /// Creates a new empty list.
    ///
    /// Empty lists do not allocate, and every empty list is the same list
    /// according to [`ptr_eq`](Self::ptr_eq).
    ///
    /// # Examples
    ///
    /// ```rust
    /// use bplus_list::persistent::BPlusList;
    ///
    /// let list: BPlusList<i32> = BPlusList::new();
    /// assert!(list.is_empty());
    /// assert!(list.ptr_eq(&BPlusList::default()));
    /// ```
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self {
            root: None,
            length: 0,
        }
    }

    pub(crate) fn from_parts(root: Option<NodePointer<T>>, length: usize) -> Self {
        Self { root, length }
    }

    /// Returns the number of elements in the list.
    ///
    /// # Complexity
    ///
    /// O(1)
    #[inline]
    #[must_use]
    pub const fn len(&self) -> usize {
        self.length
    }

    /// Returns `true` if the list contains no elements.
    #[inline]
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// Returns the node capacities used for lists of `T`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use bplus_list::persistent::BPlusList;
    ///
    /// assert_eq!(BPlusList::<u8>::capacity().max_leaf, 128);
    /// assert_eq!(BPlusList::<String>::capacity().max_leaf, 8);
    /// ```
    #[must_use]
    pub const fn capacity() -> NodeCapacity {
        NodeCapacity::of::<T>()
    }

    /// Returns the number of levels in the tree: 0 when empty, 1 when the
    /// root is a leaf.
    #[must_use]
    pub fn height(&self) -> usize {
        self.root.as_ref().map_or(0, |root| root.height() + 1)
    }

    /// Returns `true` if both lists share the same root node.
    ///
    /// Two empty lists are always identical. This is an identity check, not
    /// an equality check: equal lists built separately are not identical.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use bplus_list::persistent::BPlusList;
    ///
    /// let list: BPlusList<i32> = (0..10).collect();
    /// assert!(list.ptr_eq(&list.clone()));
    /// assert!(!list.ptr_eq(&(0..10).collect()));
    /// assert!(list.remove_range(0, 10).unwrap().ptr_eq(&BPlusList::new()));
    /// ```
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        match (&self.root, &other.root) {
            (None, None) => true,
            (Some(left), Some(right)) => ReferenceCounter::ptr_eq(left, right),
            _ => false,
        }
    }

    /// Returns a reference to the element at `index`, or `None` if it is out
    /// of bounds.
    ///
    /// # Complexity
    ///
    /// O(log N)
    ///
    /// # Examples
    ///
    /// ```rust
    /// use bplus_list::persistent::BPlusList;
    ///
    /// let list: BPlusList<i32> = (0..100).collect();
    /// assert_eq!(list.get(42), Some(&42));
    /// assert_eq!(list.get(100), None);
    /// ```
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&T> {
        if index >= self.length {
            return None;
        }
        self.root.as_deref().map(|root| indexer::get(root, index))
    }

    /// Returns the first element.
    #[must_use]
    pub fn first(&self) -> Option<&T> {
        self.get(0)
    }

    /// Returns the last element.
    #[must_use]
    pub fn last(&self) -> Option<&T> {
        self.length.checked_sub(1).and_then(|index| self.get(index))
    }

    /// Returns an iterator over the elements, front to back.
    ///
    /// The iterator is double-ended and knows its exact length.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use bplus_list::persistent::BPlusList;
    ///
    /// let list: BPlusList<i32> = (1..=3).collect();
    /// let doubled: Vec<i32> = list.iter().map(|x| x * 2).collect();
    /// assert_eq!(doubled, vec![2, 4, 6]);
    /// assert_eq!(list.iter().rev().next(), Some(&3));
    /// ```
    pub fn iter(&self) -> BPlusListIterator<'_, T> {
        BPlusListIterator::new(self.root.as_deref(), 0, self.length)
    }

    /// Returns an iterator over `count` elements starting at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`BPlusListError::RangeOutOfRange`] if the range does not lie
    /// within the list.
    pub fn iter_range(&self, index: usize, count: usize) -> Result<BPlusListIterator<'_, T>> {
        check_range(index, count, self.length)?;
        Ok(BPlusListIterator::new(self.root.as_deref(), index, count))
    }

    fn iter_from(&self, index: usize) -> BPlusListIterator<'_, T> {
        BPlusListIterator::new(self.root.as_deref(), index, self.length - index)
    }

    /// Returns the first element satisfying `predicate`.
    pub fn find<P>(&self, mut predicate: P) -> Option<&T>
    where
        P: FnMut(&T) -> bool,
    {
        self.iter().find(|element| predicate(element))
    }

    /// Returns the index of the first element satisfying `predicate`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use bplus_list::persistent::BPlusList;
    ///
    /// let list: BPlusList<i32> = (0..100).collect();
    /// assert_eq!(list.find_index(|x| x * x > 50), Some(8));
    /// assert_eq!(list.find_index(|x| *x < 0), None);
    /// ```
    pub fn find_index<P>(&self, predicate: P) -> Option<usize>
    where
        P: FnMut(&T) -> bool,
    {
        self.iter().position(predicate)
    }

    /// Returns the index of the last element satisfying `predicate`.
    pub fn find_last_index<P>(&self, predicate: P) -> Option<usize>
    where
        P: FnMut(&T) -> bool,
    {
        self.iter().rposition(predicate)
    }

    fn find_index_from<P>(&self, index: usize, predicate: P) -> Option<usize>
    where
        P: FnMut(&T) -> bool,
    {
        self.iter_from(index)
            .position(predicate)
            .map(|position| position + index)
    }

    /// Applies `function` to every element, producing a new list of the
    /// results.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use bplus_list::persistent::BPlusList;
    ///
    /// let list: BPlusList<i32> = (1..=3).collect();
    /// let names = list.map(|x| format!("#{x}"));
    /// assert_eq!(names.get(2).map(String::as_str), Some("#3"));
    /// ```
    #[must_use]
    pub fn map<U, F>(&self, function: F) -> BPlusList<U>
    where
        F: FnMut(&T) -> U,
    {
        let mut builder = BulkBuilder::new();
        builder.extend(self.iter().map(function));
        builder.finish()
    }

    /// Returns a transient list that starts out sharing every node with this
    /// list.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use bplus_list::persistent::BPlusList;
    ///
    /// let list: BPlusList<i32> = (0..10).collect();
    /// let mut transient = list.transient();
    /// for index in 0..10 {
    ///     transient.set(index, index as i32 * 10).unwrap();
    /// }
    /// let scaled = transient.persistent();
    /// assert_eq!(scaled.get(9), Some(&90));
    /// assert_eq!(list.get(9), Some(&9));
    /// ```
    #[must_use]
    pub fn transient(&self) -> TransientBPlusList<T> {
        TransientBPlusList::from_list(self)
    }

    /// Checks every structural invariant of the tree.
    #[doc(hidden)]
    pub fn validate_structure(&self) -> std::result::Result<(), String> {
        match &self.root {
            Some(root) => node::validate(root, self.length),
            None if self.length == 0 => Ok(()),
            None => Err(format!("empty tree with cached length {}", self.length)),
        }
    }
}

impl<T: PartialEq> BPlusList<T> {
    /// Returns the index of the first element equal to `value`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use bplus_list::persistent::BPlusList;
    ///
    /// let list: BPlusList<i32> = [1, 2, 3, 2].into_iter().collect();
    /// assert_eq!(list.index_of(&2), Some(1));
    /// assert_eq!(list.last_index_of(&2), Some(3));
    /// assert_eq!(list.index_of(&5), None);
    /// ```
    #[must_use]
    pub fn index_of(&self, value: &T) -> Option<usize> {
        self.iter().position(|element| element == value)
    }

    /// Returns the index of the last element equal to `value`.
    #[must_use]
    pub fn last_index_of(&self, value: &T) -> Option<usize> {
        self.iter().rposition(|element| element == value)
    }

    /// Returns `true` if the list contains an element equal to `value`.
    #[must_use]
    pub fn contains(&self, value: &T) -> bool {
        self.index_of(value).is_some()
    }
}

// =============================================================================
// Editing
// =============================================================================

impl<T: Clone> BPlusList<T> {
    /// Creates a list containing a single element.
    #[must_use]
    pub fn singleton(element: T) -> Self {
        Self::from_parts(Some(Node::leaf(vec![element])), 1)
    }

    /// Creates a list from a slice.
    #[must_use]
    pub fn from_slice(slice: &[T]) -> Self {
        slice.iter().cloned().collect()
    }

    /// Appends an element to the back of the list.
    ///
    /// Appending walks the rightmost spine only. A full node is kept as it
    /// is and the element starts a new sibling, so the nodes left behind by
    /// a run of appends are full and shared with earlier versions.
    ///
    /// # Complexity
    ///
    /// O(log N)
    ///
    /// # Panics
    ///
    /// Panics if the length overflows `usize`. Use
    /// [`try_push_back`](Self::try_push_back) to handle that case.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use bplus_list::persistent::BPlusList;
    ///
    /// let list = BPlusList::new().push_back("a").push_back("b");
    /// assert_eq!(list.last(), Some(&"b"));
    /// ```
    #[must_use]
    pub fn push_back(&self, element: T) -> Self {
        self.try_push_back(element)
            .unwrap_or_else(|_| capacity_overflow())
    }

    /// Appends an element to the back of the list.
    ///
    /// # Errors
    ///
    /// Returns [`BPlusListError::CountOverflow`] if the length would
    /// overflow `usize`.
    pub fn try_push_back(&self, element: T) -> Result<Self> {
        let length = self
            .length
            .checked_add(1)
            .ok_or(BPlusListError::CountOverflow)?;
        let root = match &self.root {
            None => Node::leaf(vec![element]),
            Some(root) => match insert::push_back(root, element) {
                Appended::Updated(root) => root,
                Appended::Overflowed(sibling) => {
                    tracing::trace!(length, height = root.height() + 2, "root split on append");
                    Node::internal([root.clone(), sibling])
                }
            },
        };
        Ok(Self::from_parts(Some(root), length))
    }

    /// Inserts an element at `index`, shifting later elements right.
    ///
    /// # Errors
    ///
    /// Returns [`BPlusListError::IndexOutOfRange`] if `index > len()`, or
    /// [`BPlusListError::CountOverflow`] if the length would overflow.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use bplus_list::persistent::BPlusList;
    ///
    /// let list: BPlusList<i32> = [1, 3].into_iter().collect();
    /// let inserted = list.insert(1, 2).unwrap();
    /// assert_eq!(inserted.iter().copied().collect::<Vec<_>>(), vec![1, 2, 3]);
    /// assert!(list.insert(3, 0).is_err());
    /// ```
    pub fn insert(&self, index: usize, element: T) -> Result<Self> {
        if index > self.length {
            return Err(BPlusListError::index_out_of_range(index, self.length));
        }
        let root = match &self.root {
            Some(root) if index < self.length => root,
            _ => return self.try_push_back(element),
        };
        let length = self
            .length
            .checked_add(1)
            .ok_or(BPlusListError::CountOverflow)?;
        let root = match insert::insert(root, index, element) {
            Insertion::Updated(root) => root,
            Insertion::Split(left, right) => {
                tracing::trace!(length, height = left.height() + 2, "root split on insert");
                Node::internal([left, right])
            }
        };
        Ok(Self::from_parts(Some(root), length))
    }

    /// Replaces the element at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`BPlusListError::IndexOutOfRange`] if `index >= len()`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use bplus_list::persistent::BPlusList;
    ///
    /// let list: BPlusList<i32> = (0..5).collect();
    /// let updated = list.update(2, 100).unwrap();
    /// assert_eq!(updated.get(2), Some(&100));
    /// assert_eq!(list.get(2), Some(&2));
    /// ```
    pub fn update(&self, index: usize, element: T) -> Result<Self> {
        match &self.root {
            Some(root) if index < self.length => Ok(Self::from_parts(
                Some(indexer::update(root, index, element)),
                self.length,
            )),
            _ => Err(BPlusListError::index_out_of_range(index, self.length)),
        }
    }

    /// Removes the element at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`BPlusListError::IndexOutOfRange`] if `index >= len()`.
    pub fn remove(&self, index: usize) -> Result<Self> {
        if index >= self.length {
            return Err(BPlusListError::index_out_of_range(index, self.length));
        }
        Ok(self.without_range(index, index + 1))
    }

    /// Removes `count` elements starting at `index`.
    ///
    /// Removing every element returns the empty list.
    ///
    /// # Errors
    ///
    /// Returns [`BPlusListError::RangeOutOfRange`] if the range does not lie
    /// within the list.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use bplus_list::persistent::BPlusList;
    ///
    /// let list: BPlusList<i32> = (0..100).collect();
    /// let removed = list.remove_range(10, 80).unwrap();
    /// assert_eq!(removed.len(), 20);
    /// assert_eq!(removed.get(10), Some(&90));
    /// ```
    pub fn remove_range(&self, index: usize, count: usize) -> Result<Self> {
        check_range(index, count, self.length)?;
        Ok(self.without_range(index, index + count))
    }

    /// Removes `[start, end)`, which must lie within the list.
    fn without_range(&self, start: usize, end: usize) -> Self {
        if start == end {
            return self.clone();
        }
        if end - start == self.length {
            return Self::new();
        }
        let root = self
            .root
            .as_ref()
            .and_then(|root| remove::remove_range(root, start, end));
        Self::from_parts(root, self.length - (end - start))
    }

    /// Removes every element satisfying `predicate`.
    ///
    /// Each maximal run of matching elements is removed with a single range
    /// removal.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use bplus_list::persistent::BPlusList;
    ///
    /// let list: BPlusList<i32> = (0..20).collect();
    /// let odd = list.remove_all(|x| x % 2 == 0);
    /// assert_eq!(odd.len(), 10);
    /// assert_eq!(odd.first(), Some(&1));
    /// ```
    #[must_use]
    pub fn remove_all<P>(&self, mut predicate: P) -> Self
    where
        P: FnMut(&T) -> bool,
    {
        let mut result = self.clone();
        let mut position = 0;
        while let Some(start) = result.find_index_from(position, &mut predicate) {
            let end = result
                .find_index_from(start, |element| !predicate(element))
                .unwrap_or(result.length);
            result = result.without_range(start, end);
            position = start;
        }
        result
    }

    /// Appends every item to the back of the list.
    ///
    /// The nodes off the trailing edge are reused as they are and the new
    /// items are assembled into complete nodes level by level.
    ///
    /// # Panics
    ///
    /// Panics if the length overflows `usize`.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use bplus_list::persistent::BPlusList;
    ///
    /// let list: BPlusList<i32> = (0..3).collect();
    /// let extended = list.push_back_many(3..6);
    /// assert_eq!(extended.iter().copied().collect::<Vec<_>>(), vec![0, 1, 2, 3, 4, 5]);
    /// ```
    #[must_use]
    pub fn push_back_many<I>(&self, items: I) -> Self
    where
        I: IntoIterator<Item = T>,
    {
        let mut items = items.into_iter().peekable();
        if items.peek().is_none() {
            return self.clone();
        }
        let mut builder = BulkBuilder::from_list(self);
        builder.extend(items);
        builder.finish()
    }

    /// Inserts every item at `index`, shifting later elements right.
    ///
    /// # Errors
    ///
    /// Returns [`BPlusListError::IndexOutOfRange`] if `index > len()`.
    ///
    /// # Panics
    ///
    /// Panics if the length overflows `usize`.
    pub fn insert_range<I>(&self, index: usize, items: I) -> Result<Self>
    where
        I: IntoIterator<Item = T>,
    {
        if index > self.length {
            return Err(BPlusListError::index_out_of_range(index, self.length));
        }
        if index == self.length {
            return Ok(self.push_back_many(items));
        }
        let mut builder = BulkBuilder::new();
        builder.push_list_range(self, 0, index);
        builder.extend(items);
        builder.push_list_range(self, index, self.length);
        Ok(builder.finish())
    }

    /// Returns a new list holding `count` elements starting at `index`.
    ///
    /// Whole nodes inside the range are shared with this list.
    ///
    /// # Errors
    ///
    /// Returns [`BPlusListError::RangeOutOfRange`] if the range does not lie
    /// within the list.
    pub fn get_range(&self, index: usize, count: usize) -> Result<Self> {
        check_range(index, count, self.length)?;
        if count == self.length {
            return Ok(self.clone());
        }
        let mut builder = BulkBuilder::new();
        builder.push_list_range(self, index, index + count);
        Ok(builder.finish())
    }

    /// Concatenates two lists.
    ///
    /// The lists are joined along their boundary spines, so only the nodes
    /// next to the seam are rebuilt.
    ///
    /// # Complexity
    ///
    /// O(log N + log M)
    ///
    /// # Errors
    ///
    /// Returns [`BPlusListError::CountOverflow`] if the combined length
    /// overflows `usize`, which nodes shared between lists make reachable.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use bplus_list::persistent::BPlusList;
    ///
    /// let left: BPlusList<i32> = (0..500).collect();
    /// let right: BPlusList<i32> = (500..1000).collect();
    /// let joined = left.concat(&right).unwrap();
    /// assert_eq!(joined.len(), 1000);
    /// assert!(joined.iter().copied().eq(0..1000));
    /// ```
    pub fn concat(&self, other: &Self) -> Result<Self> {
        let length = self
            .length
            .checked_add(other.length)
            .ok_or(BPlusListError::CountOverflow)?;
        match (&self.root, &other.root) {
            (None, _) => Ok(other.clone()),
            (_, None) => Ok(self.clone()),
            (Some(left), Some(right)) => Ok(Self::from_parts(
                Some(concat::concat(left, right)),
                length,
            )),
        }
    }

    /// Concatenates a sequence of lists, left to right.
    ///
    /// # Errors
    ///
    /// Returns [`BPlusListError::CountOverflow`] if the combined length
    /// overflows `usize`.
    pub fn concat_all<'a, I>(lists: I) -> Result<Self>
    where
        I: IntoIterator<Item = &'a Self>,
        T: 'a,
    {
        lists
            .into_iter()
            .try_fold(Self::new(), |accumulated, list| accumulated.concat(list))
    }

    /// Returns the list in reverse order.
    #[must_use]
    pub fn reverse(&self) -> Self {
        self.iter().rev().cloned().collect()
    }

    /// Reverses `count` elements starting at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`BPlusListError::RangeOutOfRange`] if the range does not lie
    /// within the list.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use bplus_list::persistent::BPlusList;
    ///
    /// let list: BPlusList<i32> = (0..6).collect();
    /// let reversed = list.reverse_range(1, 3).unwrap();
    /// assert_eq!(reversed.iter().copied().collect::<Vec<_>>(), vec![0, 3, 2, 1, 4, 5]);
    /// ```
    pub fn reverse_range(&self, index: usize, count: usize) -> Result<Self> {
        check_range(index, count, self.length)?;
        if count < 2 {
            return Ok(self.clone());
        }
        let mut builder = BulkBuilder::new();
        builder.push_list_range(self, 0, index);
        builder.extend(self.iter_from(index).take(count).rev().cloned());
        builder.push_list_range(self, index + count, self.length);
        Ok(builder.finish())
    }

    /// Returns the list sorted with a comparator. The sort is stable.
    #[must_use]
    pub fn sort_by<F>(&self, compare: F) -> Self
    where
        F: FnMut(&T, &T) -> Ordering,
    {
        let mut elements: Vec<T> = self.iter().cloned().collect();
        elements.sort_by(compare);
        elements.into_iter().collect()
    }

    /// Returns the list sorted by a key extraction function. The sort is stable.
    #[must_use]
    pub fn sort_by_key<K, F>(&self, key: F) -> Self
    where
        F: FnMut(&T) -> K,
        K: Ord,
    {
        let mut elements: Vec<T> = self.iter().cloned().collect();
        elements.sort_by_key(key);
        elements.into_iter().collect()
    }
}

impl<T: Clone + Ord> BPlusList<T> {
    /// Returns the list sorted in ascending order. The sort is stable.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use bplus_list::persistent::BPlusList;
    ///
    /// let list: BPlusList<i32> = [3, 1, 2].into_iter().collect();
    /// assert_eq!(list.sort().iter().copied().collect::<Vec<_>>(), vec![1, 2, 3]);
    /// ```
    #[must_use]
    pub fn sort(&self) -> Self {
        self.sort_by(Ord::cmp)
    }
}

impl<T: Clone + PartialEq> BPlusList<T> {
    /// Removes the first element equal to `value`, returning the list
    /// unchanged when there is none.
    #[must_use]
    pub fn remove_item(&self, value: &T) -> Self {
        match self.index_of(value) {
            Some(index) => self.without_range(index, index + 1),
            None => self.clone(),
        }
    }

    /// Removes the first occurrence of each item.
    ///
    /// Stops looking as soon as the list becomes empty.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use bplus_list::persistent::BPlusList;
    ///
    /// let list: BPlusList<i32> = [1, 2, 1, 3].into_iter().collect();
    /// let removed = list.remove_items(&[1, 3, 4]);
    /// assert_eq!(removed.iter().copied().collect::<Vec<_>>(), vec![2, 1]);
    /// ```
    #[must_use]
    pub fn remove_items<'a, I>(&self, items: I) -> Self
    where
        I: IntoIterator<Item = &'a T>,
        T: 'a,
    {
        let mut result = self.clone();
        for item in items {
            if result.is_empty() {
                break;
            }
            if let Some(index) = result.index_of(item) {
                result = result.without_range(index, index + 1);
            }
        }
        result
    }

    /// Replaces the first element equal to `old` with `new`.
    ///
    /// # Errors
    ///
    /// Returns [`BPlusListError::ElementNotFound`] if no element equals `old`.
    pub fn replace(&self, old: &T, new: T) -> Result<Self> {
        let index = self.index_of(old).ok_or(BPlusListError::ElementNotFound)?;
        self.update(index, new)
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

impl<T> Clone for BPlusList<T> {
    fn clone(&self) -> Self {
        Self {
            root: self.root.clone(),
            length: self.length,
        }
    }
}

impl<T> Default for BPlusList<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> FromIterator<T> for BPlusList<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iterable: I) -> Self {
        let mut builder = BulkBuilder::new();
        builder.extend(iterable);
        builder.finish()
    }
}

impl<T: Clone> IntoIterator for BPlusList<T> {
    type Item = T;
    type IntoIter = BPlusListIntoIterator<T>;

    fn into_iter(self) -> Self::IntoIter {
        BPlusListIntoIterator::new(self.root, self.length)
    }
}

impl<'a, T> IntoIterator for &'a BPlusList<T> {
    type Item = &'a T;
    type IntoIter = BPlusListIterator<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T> Index<usize> for BPlusList<T> {
    type Output = T;

    fn index(&self, index: usize) -> &Self::Output {
        match self.get(index) {
            Some(element) => element,
            None => panic!(
                "index out of bounds: the len is {} but the index is {index}",
                self.length
            ),
        }
    }
}

impl<T: PartialEq> PartialEq for BPlusList<T> {
    fn eq(&self, other: &Self) -> bool {
        self.length == other.length && (self.ptr_eq(other) || self.iter().eq(other.iter()))
    }
}

impl<T: Eq> Eq for BPlusList<T> {}

impl<T: Hash> Hash for BPlusList<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.length.hash(state);
        for element in self {
            element.hash(state);
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for BPlusList<T> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.debug_list().entries(self.iter()).finish()
    }
}

impl<T: fmt::Display> fmt::Display for BPlusList<T> {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "[")?;
        let mut first = true;
        for element in self {
            if first {
                first = false;
            } else {
                write!(formatter, ", ")?;
            }
            write!(formatter, "{element}")?;
        }
        write!(formatter, "]")
    }
}

// =============================================================================
// Serde Support
// =============================================================================

#[cfg(feature = "serde")]
impl<T: serde::Serialize> serde::Serialize for BPlusList<T> {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeSeq;
        let mut seq = serializer.serialize_seq(Some(self.len()))?;
        for element in self {
            seq.serialize_element(element)?;
        }
        seq.end()
    }
}

#[cfg(feature = "serde")]
struct BPlusListVisitor<T> {
    marker: std::marker::PhantomData<T>,
}

#[cfg(feature = "serde")]
impl<T> BPlusListVisitor<T> {
    const fn new() -> Self {
        Self {
            marker: std::marker::PhantomData,
        }
    }
}

#[cfg(feature = "serde")]
impl<'de, T> serde::de::Visitor<'de> for BPlusListVisitor<T>
where
    T: serde::Deserialize<'de>,
{
    type Value = BPlusList<T>;

    fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
        formatter.write_str("a sequence")
    }

    fn visit_seq<A>(self, mut seq: A) -> std::result::Result<Self::Value, A::Error>
    where
        A: serde::de::SeqAccess<'de>,
    {
        let mut builder = BulkBuilder::new();
        while let Some(element) = seq.next_element()? {
            builder.push(element);
        }
        Ok(builder.finish())
    }
}

#[cfg(feature = "serde")]
impl<'de, T> serde::Deserialize<'de> for BPlusList<T>
where
    T: serde::Deserialize<'de>,
{
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        deserializer.deserialize_seq(BPlusListVisitor::new())
    }
}

// =============================================================================
// Tests
// =============================================================================



#[cfg(all(test, feature = "serde"))]
mod serde_tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    fn test_serialize_empty() {
        let list: BPlusList<i32> = BPlusList::new();
        assert_eq!(serde_json::to_string(&list).unwrap(), "[]");
    }

    #[rstest]
    fn test_serialize_multiple_elements() {
        let list: BPlusList<i32> = (1..=3).collect();
        assert_eq!(serde_json::to_string(&list).unwrap(), "[1,2,3]");
    }

    #[rstest]
    fn test_deserialize_builds_valid_tree() {
        let json = serde_json::to_string(&(0..1000).collect::<Vec<i32>>()).unwrap();
        let list: BPlusList<i32> = serde_json::from_str(&json).unwrap();
        assert_eq!(list.len(), 1000);
        assert_eq!(list.validate_structure(), Ok(()));
    }
}
