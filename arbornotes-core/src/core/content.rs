//! The seam to the content model that owns node bodies.
//!
//! The tree engine never looks inside a body. It asks a [`ContentModel`] for
//! fresh or cloned payloads and tells it when a node's recorded content
//! states must be dropped.

use std::collections::HashMap;

use crate::{ArbornotesError, ContentHandle, ContentKind, Result};

/// Operations the tree engine needs from the content collaborator.
pub trait ContentModel {
    /// Allocates an empty body for a node of `kind`.
    fn new_content(&mut self, kind: &ContentKind) -> ContentHandle;

    /// Copies a body verbatim. Only valid within the same content kind.
    ///
    /// # Errors
    ///
    /// Implementations return an error for unknown handles.
    fn clone_content(&mut self, handle: ContentHandle) -> Result<ContentHandle>;

    fn content_is_empty(&self, handle: ContentHandle) -> bool;

    /// The last recorded content state of `node_id`, used to seed a rich-text
    /// duplicate. `None` when nothing was recorded.
    fn previous_state(&mut self, node_id: i64) -> Option<ContentHandle>;

    /// Drops every recorded content state of `node_id`. Irreversible.
    fn purge_states(&mut self, node_id: i64);
}

#[derive(Debug, Clone)]
struct Body {
    kind: ContentKind,
    text: String,
}

/// A [`ContentModel`] that keeps bodies as plain strings in memory.
///
/// Suitable for embedders without a rich-text buffer and for tests.
#[derive(Debug, Default)]
pub struct InMemoryContent {
    bodies: HashMap<ContentHandle, Body>,
    states: HashMap<i64, Vec<ContentHandle>>,
    next_handle: u64,
}

impl InMemoryContent {
    pub fn new() -> Self {
        Self::default()
    }

    fn allocate(&mut self, body: Body) -> ContentHandle {
        self.next_handle += 1;
        let handle = ContentHandle(self.next_handle);
        self.bodies.insert(handle, body);
        handle
    }

    pub fn text(&self, handle: ContentHandle) -> Option<&str> {
        self.bodies.get(&handle).map(|b| b.text.as_str())
    }

    pub fn kind(&self, handle: ContentHandle) -> Option<&ContentKind> {
        self.bodies.get(&handle).map(|b| &b.kind)
    }

    /// Replaces the text of a body.
    ///
    /// # Errors
    ///
    /// Returns [`ArbornotesError::Structural`] if `handle` is unknown.
    pub fn set_text(&mut self, handle: ContentHandle, text: impl Into<String>) -> Result<()> {
        let body = self
            .bodies
            .get_mut(&handle)
            .ok_or_else(|| unknown_handle(handle))?;
        body.text = text.into();
        Ok(())
    }

    /// Snapshots the current body of `handle` as a recorded state of `node_id`.
    ///
    /// # Errors
    ///
    /// Returns [`ArbornotesError::Structural`] if `handle` is unknown.
    pub fn record_state(&mut self, node_id: i64, handle: ContentHandle) -> Result<()> {
        let snapshot = self.clone_content(handle)?;
        self.states.entry(node_id).or_default().push(snapshot);
        Ok(())
    }

    /// Number of recorded states for `node_id`.
    pub fn state_count(&self, node_id: i64) -> usize {
        self.states.get(&node_id).map_or(0, Vec::len)
    }
}

fn unknown_handle(handle: ContentHandle) -> ArbornotesError {
    ArbornotesError::Structural(format!("Unknown content handle {}", handle.0))
}

impl ContentModel for InMemoryContent {
    fn new_content(&mut self, kind: &ContentKind) -> ContentHandle {
        self.allocate(Body {
            kind: kind.clone(),
            text: String::new(),
        })
    }

    fn clone_content(&mut self, handle: ContentHandle) -> Result<ContentHandle> {
        let body = self
            .bodies
            .get(&handle)
            .cloned()
            .ok_or_else(|| unknown_handle(handle))?;
        Ok(self.allocate(body))
    }

    fn content_is_empty(&self, handle: ContentHandle) -> bool {
        self.bodies.get(&handle).map_or(true, |b| b.text.is_empty())
    }

    fn previous_state(&mut self, node_id: i64) -> Option<ContentHandle> {
        let last = *self.states.get(&node_id)?.last()?;
        self.clone_content(last).ok()
    }

    fn purge_states(&mut self, node_id: i64) {
        if let Some(states) = self.states.remove(&node_id) {
            for handle in states {
                self.bodies.remove(&handle);
            }
        }
    }
}
