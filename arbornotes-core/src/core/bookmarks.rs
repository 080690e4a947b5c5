//! Bookmarked node ids.

use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

/// Ordered set of bookmarked node ids.
///
/// Display order is insertion order. Serializes as a plain JSON array.
///
/// ```rust
/// use arbornotes_core::BookmarkIndex;
///
/// let mut bookmarks = BookmarkIndex::new();
/// assert!(bookmarks.add(4));
/// assert!(bookmarks.add(2));
/// assert!(!bookmarks.add(4));
/// assert_eq!(serde_json::to_string(&bookmarks).unwrap(), "[4,2]");
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(from = "Vec<i64>", into = "Vec<i64>")]
pub struct BookmarkIndex {
    ids: IndexSet<i64>,
}

impl From<Vec<i64>> for BookmarkIndex {
    fn from(ids: Vec<i64>) -> Self {
        Self {
            ids: ids.into_iter().collect(),
        }
    }
}

impl From<BookmarkIndex> for Vec<i64> {
    fn from(index: BookmarkIndex) -> Self {
        index.ids.into_iter().collect()
    }
}

// Order matters for bookmarks; `IndexSet` equality alone ignores it.
impl PartialEq for BookmarkIndex {
    fn eq(&self, other: &Self) -> bool {
        self.ids.iter().eq(other.ids.iter())
    }
}

impl BookmarkIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `id`. Returns false if it was already bookmarked.
    pub fn add(&mut self, id: i64) -> bool {
        self.ids.insert(id)
    }

    /// Removes `id`, keeping the order of the rest. Returns false if it was
    /// not bookmarked.
    pub fn remove(&mut self, id: i64) -> bool {
        self.ids.shift_remove(&id)
    }

    pub fn contains(&self, id: i64) -> bool {
        self.ids.contains(&id)
    }

    /// Bookmarked ids in display order.
    pub fn iter(&self) -> impl Iterator<Item = i64> + '_ {
        self.ids.iter().copied()
    }

    pub fn ordered_ids(&self) -> Vec<i64> {
        self.iter().collect()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Replaces the bookmarks with `ids`, as edited by the user: entries may
    /// be reordered or dropped. Duplicates keep their first position.
    /// Returns whether anything changed.
    pub fn set_order(&mut self, ids: &[i64]) -> bool {
        let updated = Self::from(ids.to_vec());
        if updated == *self {
            return false;
        }
        *self = updated;
        true
    }
}
