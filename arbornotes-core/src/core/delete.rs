//! Result and preview types for node removal.
//!
//! Deleting a node always removes its whole subtree. Before asking the user
//! for confirmation, callers can build a prompt from a [`DeletePreview`];
//! after the delete, the [`DeleteResult`] tells them what disappeared and
//! which node to select next.
//!
//! ## Serialization
//!
//! Both types serialize their fields in camelCase (`deletedCount`,
//! `nextSelection`), consistent with the other public record types.
//!
//! ```rust
//! use arbornotes_core::DeleteResult;
//!
//! let result = DeleteResult {
//!     deleted_count: 2,
//!     deleted_ids: vec![5, 6],
//!     next_selection: Some(4),
//!     removed: None,
//! };
//! let json = serde_json::to_string(&result).unwrap();
//! assert!(json.contains("deletedCount"));
//! assert!(json.contains("nextSelection"));
//! assert!(!json.contains("removed"));
//! ```

use serde::{Deserialize, Serialize};

use crate::Subtree;

/// Maximum number of outline lines in a [`DeletePreview`] before truncation.
pub const PREVIEW_MAX_LINES: usize = 16;

/// Marker line appended when the outline was truncated.
pub const PREVIEW_ELLIPSIS: &str = "...";

/// Spaces of indentation per tree level in the outline.
const PREVIEW_INDENT: usize = 3;

/// What a delete of a node would remove.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletePreview {
    /// Name of the node that would be deleted.
    pub name: String,

    /// True when descendants would be deleted too.
    pub has_children: bool,

    /// The subtree, one line per node, indented by depth. At most
    /// [`PREVIEW_MAX_LINES`] nodes followed by [`PREVIEW_ELLIPSIS`].
    pub outline: Vec<String>,
}

impl DeletePreview {
    /// Builds the outline from `(depth, name)` pairs in display order.
    pub(crate) fn from_outline(name: String, entries: impl IntoIterator<Item = (usize, String)>) -> Self {
        let mut outline = Vec::new();
        let mut has_children = false;
        for (depth, entry_name) in entries {
            if depth > 0 {
                has_children = true;
            }
            if outline.len() == PREVIEW_MAX_LINES {
                outline.push(PREVIEW_ELLIPSIS.to_string());
                break;
            }
            outline.push(format!("{}{}", " ".repeat(depth * PREVIEW_INDENT), entry_name));
        }
        Self {
            name,
            has_children,
            outline,
        }
    }
}

/// The outcome of a delete on a [`Workspace`](super::workspace::Workspace).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteResult {
    /// The total number of nodes that were removed.
    pub deleted_count: usize,

    /// Ids of every removed node, the deleted node first.
    pub deleted_ids: Vec<i64>,

    /// Previous sibling, else next sibling, else parent, else `None`.
    pub next_selection: Option<i64>,

    /// The detached subtree, every node marked
    /// [`PendingChange::Delete`](crate::PendingChange::Delete).
    #[serde(skip)]
    pub removed: Option<Subtree>,
}
