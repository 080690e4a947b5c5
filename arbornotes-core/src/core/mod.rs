//! Internal domain modules for the Arbornotes core library.
//!
//! All public types from these modules are re-exported at the crate root
//! with `#[doc(inline)]`; import from there in preference to this module.

pub mod bookmarks;
pub mod content;
pub mod delete;
pub mod error;
pub mod history;
pub mod identity;
pub mod natural;
pub mod node;
pub mod operation;
pub mod operation_log;
pub mod settings;
pub mod store;
pub mod workspace;

#[doc(inline)]
pub use bookmarks::BookmarkIndex;
#[doc(inline)]
pub use content::{ContentModel, InMemoryContent};
#[doc(inline)]
pub use delete::{DeletePreview, DeleteResult};
#[doc(inline)]
pub use error::{ArbornotesError, Result};
#[doc(inline)]
pub use history::VisitedHistory;
#[doc(inline)]
pub use identity::IdAllocator;
#[doc(inline)]
pub use natural::natural_compare;
#[doc(inline)]
pub use node::{
    ContentHandle, ContentKind, ContentTransition, Node, NodeProperties, NodeRecord, PendingChange,
};
#[doc(inline)]
pub use operation::Operation;
#[doc(inline)]
pub use operation_log::OperationLog;
#[doc(inline)]
pub use settings::{load_settings, save_settings, settings_file_path, TreeSettings};
#[doc(inline)]
pub use store::{NodeStore, SequencePolicy, Subtree};
#[doc(inline)]
pub use workspace::{AddPosition, Workspace};
