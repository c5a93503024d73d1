//! # bplus-list
//!
//! A persistent indexable sequence backed by a B+Tree.
//!
//! ## Overview
//!
//! [`persistent::BPlusList`] is an immutable list whose edits return new
//! versions that share structure with the old ones. It includes:
//!
//! - **Indexed access**: `get`, `update`, `insert` and `remove` anywhere in
//!   O(log N)
//! - **Bulk construction**: `FromIterator`, `push_back_many`, `get_range`
//!   building complete nodes level by level
//! - **Concatenation**: joining two lists along their boundary in O(log N)
//! - **Transients**: [`persistent::TransientBPlusList`] for batches of
//!   in-place edits, frozen back into a persistent list in O(1)
//!
//! ## Feature Flags
//!
//! - `arc`: Use `Arc` instead of `Rc` for nodes, making lists `Send + Sync`
//! - `serde`: `Serialize` and `Deserialize` as a plain sequence
//!
//! ## Example
//!
//! ```rust
//! use bplus_list::prelude::*;
//!
//! let list: BPlusList<i32> = (0..10).collect();
//! let edited = list.insert(5, 100).unwrap();
//! assert_eq!(edited.get(5), Some(&100));
//! assert_eq!(list.len(), 10);
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
// Note: Disabling redundant_closure_for_method_calls due to clippy 0.1.92 panic bug
#![allow(clippy::redundant_closure_for_method_calls)]

/// Prelude module for convenient imports.
///
/// Re-exports commonly used types.
///
/// # Usage
///
/// ```rust
/// use bplus_list::prelude::*;
/// ```
pub mod prelude {
    pub use crate::error::{BPlusListError, Result};
    pub use crate::persistent::*;
}

pub mod error;
pub mod persistent;
