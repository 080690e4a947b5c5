//! Change notifications emitted by workspace mutations.

use serde::{Deserialize, Serialize};

/// A single structural change, queued for the persistence collaborator.
///
/// Per-node `pending_change` markers say *what* needs saving; operations say
/// *that* something happened, including deletions, which leave no node behind
/// to carry a marker. Every variant carries a stable `operation_id` and a
/// wall-clock `timestamp`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all_fields = "camelCase")]
pub enum Operation {
    /// A new node was inserted.
    NodeCreated {
        operation_id: String,
        timestamp: i64,
        node_id: i64,
        parent_id: Option<i64>,
    },
    /// A node was duplicated next to its source.
    NodeDuplicated {
        operation_id: String,
        timestamp: i64,
        source_id: i64,
        node_id: i64,
    },
    /// Name, content kind or flags of a node changed.
    PropertiesEdited {
        operation_id: String,
        timestamp: i64,
        node_id: i64,
    },
    /// Nodes changed place: moved, swapped or sorted.
    HierarchyEdited {
        operation_id: String,
        timestamp: i64,
        node_ids: Vec<i64>,
    },
    /// A subtree was removed. `node_ids` lists the root first.
    NodesDeleted {
        operation_id: String,
        timestamp: i64,
        node_ids: Vec<i64>,
    },
    /// A node was added to or removed from the bookmarks.
    BookmarkChanged {
        operation_id: String,
        timestamp: i64,
        node_id: i64,
        bookmarked: bool,
    },
}

impl Operation {
    /// Returns the stable identifier for this operation.
    #[must_use]
    pub fn operation_id(&self) -> &str {
        match self {
            Self::NodeCreated { operation_id, .. }
            | Self::NodeDuplicated { operation_id, .. }
            | Self::PropertiesEdited { operation_id, .. }
            | Self::HierarchyEdited { operation_id, .. }
            | Self::NodesDeleted { operation_id, .. }
            | Self::BookmarkChanged { operation_id, .. } => operation_id,
        }
    }

    /// Returns the wall-clock Unix timestamp (seconds) when this operation was created.
    #[must_use]
    pub fn timestamp(&self) -> i64 {
        match self {
            Self::NodeCreated { timestamp, .. }
            | Self::NodeDuplicated { timestamp, .. }
            | Self::PropertiesEdited { timestamp, .. }
            | Self::HierarchyEdited { timestamp, .. }
            | Self::NodesDeleted { timestamp, .. }
            | Self::BookmarkChanged { timestamp, .. } => *timestamp,
        }
    }

    /// Short name of the variant, as used in log lines.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::NodeCreated { .. } => "NodeCreated",
            Self::NodeDuplicated { .. } => "NodeDuplicated",
            Self::PropertiesEdited { .. } => "PropertiesEdited",
            Self::HierarchyEdited { .. } => "HierarchyEdited",
            Self::NodesDeleted { .. } => "NodesDeleted",
            Self::BookmarkChanged { .. } => "BookmarkChanged",
        }
    }
}
