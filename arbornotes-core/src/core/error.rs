//! Error types for the Arbornotes core library.

use thiserror::Error;

/// All errors that can occur within the Arbornotes core library.
#[derive(Debug, Error)]
pub enum ArbornotesError {
    /// A node ID was referenced that does not exist in the store.
    #[error("Node not found: {0}")]
    NodeNotFound(i64),

    /// A topology reference was malformed, e.g. an `after` sibling that is
    /// not a child of the requested parent.
    #[error("Structural error: {0}")]
    Structural(String),

    /// A move would make a node its own ancestor.
    #[error("Invalid move: {0}")]
    Cycle(String),

    /// A content-changing operation was attempted on a read-only node.
    #[error("Node {0} is read only")]
    ReadOnly(i64),

    /// The store failed an internal consistency check.
    #[error("Invariant violated: {0}")]
    Invariant(String),

    /// An I/O operation on the filesystem failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Settings or records could not be (de)serialized as JSON.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience alias that pins the error type to [`ArbornotesError`].
pub type Result<T> = std::result::Result<T, ArbornotesError>;

impl ArbornotesError {
    /// Returns a short, human-readable message suitable for display to the end user.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::NodeNotFound(_) => "Node no longer exists".to_string(),
            Self::Structural(msg) => msg.clone(),
            Self::Cycle(msg) => msg.clone(),
            Self::ReadOnly(_) => "The selected node is read only".to_string(),
            Self::Invariant(msg) => format!("Internal error: {msg}"),
            Self::Io(e) => format!("File error: {e}"),
            Self::Json(e) => format!("Data format error: {e}"),
        }
    }
}
