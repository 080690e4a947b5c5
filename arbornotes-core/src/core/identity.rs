//! Node identity allocation.

use serde::{Deserialize, Serialize};

/// Issues node ids in strictly increasing order.
///
/// The counter lives with the [`NodeStore`](super::store::NodeStore) and is
/// persisted as document metadata. It never moves backwards, so ids of
/// deleted nodes are never handed out again.
///
/// ```rust
/// use arbornotes_core::IdAllocator;
///
/// let mut ids = IdAllocator::starting_after(41);
/// assert_eq!(ids.allocate(), 42);
/// assert_eq!(ids.allocate(), 43);
/// assert_eq!(serde_json::to_string(&ids).unwrap(), r#"{"nextId":44}"#);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdAllocator {
    next_id: i64,
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self { next_id: 1 }
    }
}

impl IdAllocator {
    /// Allocator for an empty document; the first id is `1`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocator for a loaded document whose highest id is `max_existing`.
    pub fn starting_after(max_existing: i64) -> Self {
        Self {
            next_id: max_existing.max(0) + 1,
        }
    }

    /// Allocator for a loaded document: continues from the counter saved with
    /// it, but never below `max_existing + 1`.
    pub fn resume(saved: Option<&IdAllocator>, max_existing: i64) -> Self {
        let mut ids = Self::starting_after(max_existing);
        if let Some(saved) = saved {
            ids.next_id = ids.next_id.max(saved.next_id);
        }
        ids
    }

    /// Returns a fresh id and advances the counter.
    pub fn allocate(&mut self) -> i64 {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    /// The id the next call to [`allocate`](Self::allocate) will return.
    pub fn peek(&self) -> i64 {
        self.next_id
    }

    /// Moves the counter past `id` if it is not already. Used while loading
    /// records so that later allocations cannot collide with them.
    pub(crate) fn observe(&mut self, id: i64) {
        if id >= self.next_id {
            self.next_id = id + 1;
        }
    }
}
