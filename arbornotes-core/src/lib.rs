//! Core library for Arbornotes, a hierarchical note tree.
//!
//! The primary entry point is [`Workspace`], which represents an open document
//! held in memory. All tree mutations go through `Workspace` methods; saving
//! is left to a persistence collaborator that drains the workspace's
//! [`Operation`]s and clears each node's [`PendingChange`] marker.
//!
//! Types are re-exported from their respective sub-modules for convenience;
//! consumers should import from the crate root rather than the `core` module.

pub mod core;

// Re-export commonly used types.
#[doc(inline)]
pub use core::{
    bookmarks::BookmarkIndex,
    content::{ContentModel, InMemoryContent},
    delete::{DeletePreview, DeleteResult, PREVIEW_ELLIPSIS, PREVIEW_MAX_LINES},
    error::{ArbornotesError, Result},
    history::VisitedHistory,
    identity::IdAllocator,
    natural::natural_compare,
    node::{
        ContentHandle, ContentKind, ContentTransition, Node, NodeProperties, NodeRecord,
        PendingChange,
    },
    operation::Operation,
    operation_log::OperationLog,
    settings::{load_settings, save_settings, settings_file_path, TreeSettings},
    store::{NodeStore, SequencePolicy, Subtree},
    workspace::{AddPosition, Workspace},
};
