//! Node payload types: the data carried by one entry of the tree.
//!
//! Topology (parent, children) is not stored here; it belongs to
//! [`NodeStore`](super::store::NodeStore). A [`Node`] only knows its own
//! identity, properties, sibling `sequence` and persistence marker.

use serde::{Deserialize, Serialize};

use crate::TreeSettings;

/// Opaque reference to a body payload owned by the content collaborator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentHandle(pub u64);

/// Which content model owns a node's body.
///
/// `RichText` is the structured model (formatting, embedded objects).
/// `PlainText` and `Code` share the unstructured model.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(tag = "kind", content = "syntax")]
pub enum ContentKind {
    #[default]
    RichText,
    PlainText,
    Code(String),
}

/// The effect of changing a node from one [`ContentKind`] to another.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentTransition {
    Unchanged,
    /// Rich text to plain/code. Formatting is lost and the recorded content
    /// states of the node must be purged.
    LeaveStructured,
    EnterStructured,
    PlainToCode,
    CodeToPlain,
    CodeToCode,
}

impl ContentKind {
    /// True for the structured (rich text) model.
    #[must_use]
    pub fn is_structured(&self) -> bool {
        matches!(self, Self::RichText)
    }

    /// Classifies the move from `self` to `new`.
    #[must_use]
    pub fn transition_to(&self, new: &ContentKind) -> ContentTransition {
        match (self, new) {
            (a, b) if a == b => ContentTransition::Unchanged,
            (Self::RichText, _) => ContentTransition::LeaveStructured,
            (_, Self::RichText) => ContentTransition::EnterStructured,
            (Self::PlainText, Self::Code(_)) => ContentTransition::PlainToCode,
            (Self::Code(_), Self::PlainText) => ContentTransition::CodeToPlain,
            _ => ContentTransition::CodeToCode,
        }
    }
}

impl ContentTransition {
    /// Whether the caller must confirm before the transition is applied.
    #[must_use]
    pub fn needs_confirmation(self) -> bool {
        matches!(self, Self::LeaveStructured)
    }
}

/// The kind of save a node is waiting for.
///
/// Markers are sticky until the persistence collaborator clears them. When a
/// node is marked twice the higher-ranked marker wins (see [`Self::merge`]).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PendingChange {
    #[default]
    None,
    New,
    EditProperties,
    EditHierarchy,
    /// Stamped on nodes of a removed subtree handed back by a delete.
    Delete,
    BookmarkChange,
}

impl PendingChange {
    fn rank(self) -> u8 {
        match self {
            Self::None => 0,
            Self::BookmarkChange => 1,
            Self::EditProperties => 2,
            Self::EditHierarchy => 3,
            Self::New => 4,
            Self::Delete => 5,
        }
    }

    /// Combines an existing marker with an incoming one.
    ///
    /// ```rust
    /// use arbornotes_core::PendingChange;
    ///
    /// assert_eq!(PendingChange::New.merge(PendingChange::EditProperties), PendingChange::New);
    /// assert_eq!(
    ///     PendingChange::EditProperties.merge(PendingChange::EditHierarchy),
    ///     PendingChange::EditHierarchy
    /// );
    /// ```
    #[must_use]
    pub fn merge(self, incoming: PendingChange) -> PendingChange {
        if incoming.rank() > self.rank() {
            incoming
        } else {
            self
        }
    }
}

/// The user-editable properties of a node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeProperties {
    pub name: String,
    pub content_kind: ContentKind,
    pub is_read_only: bool,
    pub is_bold: bool,
    pub custom_icon_id: u32,
}

impl NodeProperties {
    /// Properties for a fresh rich-text node called `name`.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content_kind: ContentKind::RichText,
            is_read_only: false,
            is_bold: false,
            custom_icon_id: 0,
        }
    }

    /// Defaults for a new node, taken from the workspace settings.
    pub fn from_settings(settings: &TreeSettings) -> Self {
        Self {
            content_kind: settings.default_content_kind.clone(),
            ..Self::named(settings.default_node_name.clone())
        }
    }
}

/// One entry of the tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Node {
    pub id: i64,
    pub name: String,
    pub content_kind: ContentKind,
    pub is_read_only: bool,
    pub is_bold: bool,
    pub custom_icon_id: u32,
    pub sequence: u32,
    pub created_at: i64,
    pub last_saved_at: i64,
    pub pending_change: PendingChange,
    pub content_handle: ContentHandle,
}

impl Node {
    /// Current editable properties.
    pub fn properties(&self) -> NodeProperties {
        NodeProperties {
            name: self.name.clone(),
            content_kind: self.content_kind.clone(),
            is_read_only: self.is_read_only,
            is_bold: self.is_bold,
            custom_icon_id: self.custom_icon_id,
        }
    }

    pub(crate) fn apply_properties(&mut self, props: NodeProperties) {
        self.name = props.name;
        self.content_kind = props.content_kind;
        self.is_read_only = props.is_read_only;
        self.is_bold = props.is_bold;
        self.custom_icon_id = props.custom_icon_id;
    }

    /// Raises the pending marker, never lowering an existing higher-ranked one.
    pub fn mark(&mut self, change: PendingChange) {
        self.pending_change = self.pending_change.merge(change);
    }
}

/// A node as handed to or received from the persistence collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeRecord {
    pub node: Node,
    pub parent_id: Option<i64>,
}
