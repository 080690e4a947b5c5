//! High-level tree operations over an open Arbornotes document.

use std::cmp::Ordering;

use chrono::NaiveDate;

use crate::core::operation_log::new_operation_id;
use crate::{
    natural_compare, ArbornotesError, BookmarkIndex, ContentModel, ContentTransition,
    DeletePreview, DeleteResult, IdAllocator, InMemoryContent, Node, NodeProperties, NodeRecord,
    NodeStore, Operation, OperationLog, PendingChange, Result, TreeSettings, VisitedHistory,
};

/// Controls where a new node is inserted relative to an anchor node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AddPosition {
    /// Append as the last child of the anchor.
    AsChild,
    /// Insert immediately after the anchor within the same parent.
    AsSibling,
}

/// An open Arbornotes document: the node tree plus its navigation state.
///
/// `Workspace` is the primary interface for all tree mutations. It combines
/// a [`NodeStore`], the [`ContentModel`] that owns node bodies, the
/// [`VisitedHistory`], the [`BookmarkIndex`] and an [`OperationLog`] of
/// changes waiting to be persisted.
///
/// Every operation runs to completion before returning. Embedders that touch
/// a workspace from several threads must put the whole value behind one lock.
pub struct Workspace<C: ContentModel = InMemoryContent> {
    store: NodeStore,
    content: C,
    history: VisitedHistory,
    bookmarks: BookmarkIndex,
    operation_log: OperationLog,
    settings: TreeSettings,
}

/// Puts the history suppression flag back when dropped, also on unwind.
struct SuppressedHistory<'a, C: ContentModel> {
    workspace: &'a mut Workspace<C>,
    previous: bool,
}

impl<C: ContentModel> Drop for SuppressedHistory<'_, C> {
    fn drop(&mut self) {
        self.workspace.history.set_suppressed(self.previous);
    }
}

fn now() -> i64 {
    chrono::Utc::now().timestamp()
}

impl<C: ContentModel> Workspace<C> {
    /// Creates an empty document.
    pub fn new(content: C, settings: TreeSettings) -> Self {
        Self {
            store: NodeStore::new(settings.sequence_policy()),
            content,
            history: VisitedHistory::new(),
            bookmarks: BookmarkIndex::new(),
            operation_log: OperationLog::new(),
            settings,
        }
    }

    /// Opens a document from persisted node records and bookmarks.
    ///
    /// `id_allocator` is the counter saved with the document (see
    /// [`NodeStore::id_allocator`]). Without it, ids resume after the highest
    /// loaded id, so ids of nodes deleted before the save could come back.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`NodeStore::from_records`] for inconsistent
    /// records.
    pub fn load(
        records: Vec<NodeRecord>,
        bookmarks: BookmarkIndex,
        id_allocator: Option<IdAllocator>,
        content: C,
        settings: TreeSettings,
    ) -> Result<Self> {
        let store =
            NodeStore::from_records(records, id_allocator, settings.sequence_policy())?;
        Ok(Self {
            store,
            content,
            history: VisitedHistory::new(),
            bookmarks,
            operation_log: OperationLog::new(),
            settings,
        })
    }

    pub fn store(&self) -> &NodeStore {
        &self.store
    }

    pub fn content(&self) -> &C {
        &self.content
    }

    pub fn content_mut(&mut self) -> &mut C {
        &mut self.content
    }

    pub fn history(&self) -> &VisitedHistory {
        &self.history
    }

    pub fn bookmarks(&self) -> &BookmarkIndex {
        &self.bookmarks
    }

    pub fn settings(&self) -> &TreeSettings {
        &self.settings
    }

    /// Fetches a single node by ID.
    ///
    /// # Errors
    ///
    /// Returns [`ArbornotesError::NodeNotFound`] if the node does not exist.
    pub fn get_node(&self, node_id: i64) -> Result<&Node> {
        self.store.node(node_id)
    }

    /// Returns the direct children of `parent` (root level for `None`), in
    /// display order.
    ///
    /// # Errors
    ///
    /// Returns [`ArbornotesError::NodeNotFound`] if `parent` does not exist.
    pub fn get_children(&self, parent: Option<i64>) -> Result<Vec<&Node>> {
        self.store
            .children_of(parent)?
            .iter()
            .map(|id| self.store.node(*id))
            .collect()
    }

    fn verify_in_debug(&self) {
        debug_assert!(
            self.store.verify().is_ok(),
            "tree invariant broken: {:?}",
            self.store.verify()
        );
    }

    fn log_hierarchy(&mut self, node_ids: Vec<i64>) {
        self.operation_log.log(Operation::HierarchyEdited {
            operation_id: new_operation_id(),
            timestamp: now(),
            node_ids,
        });
    }

    /// Fails before any change if `parent` has no sequence number left for
    /// one more child.
    fn ensure_room(&self, parent: Option<i64>) -> Result<()> {
        let len = self.store.children_of(parent)?.len();
        self.store.sequence_policy().sequence_at(len).map(|_| ())
    }

    fn mark(&mut self, node_id: i64, change: PendingChange) -> Result<()> {
        self.store.node_mut(node_id)?.mark(change);
        Ok(())
    }

    /// Creates a new node relative to `anchor`.
    ///
    /// With an anchor the node becomes its last child ([`AddPosition::AsChild`])
    /// or its next sibling ([`AddPosition::AsSibling`]); without one it is
    /// appended at root level. The node is marked [`PendingChange::New`] and
    /// its level renumbered.
    ///
    /// Returns the ID of the newly created node.
    ///
    /// # Errors
    ///
    /// Returns [`ArbornotesError::NodeNotFound`] if `anchor` does not exist,
    /// and [`ArbornotesError::Invariant`] if the target level has no sequence
    /// number left.
    pub fn create_node(
        &mut self,
        anchor: Option<i64>,
        position: AddPosition,
        properties: NodeProperties,
    ) -> Result<i64> {
        let (parent, after) = match (anchor, position) {
            (None, _) => (None, None),
            (Some(a), AddPosition::AsChild) => {
                self.store.node(a)?;
                (Some(a), None)
            }
            (Some(a), AddPosition::AsSibling) => {
                self.store.node(a)?;
                (self.store.parent_of(a), Some(a))
            }
        };
        self.ensure_room(parent)?;

        let timestamp = now();
        let content_handle = self.content.new_content(&properties.content_kind);
        self.settings.default_content_kind = properties.content_kind.clone();
        let id = self.store.allocate_id();
        let node = Node {
            id,
            name: properties.name,
            content_kind: properties.content_kind,
            is_read_only: properties.is_read_only,
            is_bold: properties.is_bold,
            custom_icon_id: properties.custom_icon_id,
            sequence: 0,
            created_at: timestamp,
            last_saved_at: timestamp,
            pending_change: PendingChange::New,
            content_handle,
        };

        self.store.insert(node, parent, after, false)?;
        self.store.renumber_sequences(parent, false)?;
        log::debug!("Created node {id} under {parent:?}");

        self.operation_log.log(Operation::NodeCreated {
            operation_id: new_operation_id(),
            timestamp,
            node_id: id,
            parent_id: parent,
        });
        self.verify_in_debug();
        Ok(id)
    }

    /// Copies the node at `source_id` (not its children) to a new sibling
    /// directly after it.
    ///
    /// Unstructured bodies are cloned verbatim. A rich-text duplicate starts
    /// empty, seeded from the content model's last recorded state of the
    /// source when there is one.
    ///
    /// Returns the ID of the duplicate.
    ///
    /// # Errors
    ///
    /// Returns [`ArbornotesError::NodeNotFound`] if `source_id` does not exist,
    /// or the content model's error if the body cannot be cloned.
    pub fn duplicate_node(&mut self, source_id: i64) -> Result<i64> {
        let source = self.store.node(source_id)?.clone();
        let parent = self.store.parent_of(source_id);
        self.ensure_room(parent)?;

        let content_handle = if source.content_kind.is_structured() {
            match self.content.previous_state(source_id) {
                Some(handle) => handle,
                None => self.content.new_content(&source.content_kind),
            }
        } else {
            self.content.clone_content(source.content_handle)?
        };

        let timestamp = now();
        let id = self.store.allocate_id();
        let node = Node {
            id,
            sequence: 0,
            created_at: timestamp,
            last_saved_at: timestamp,
            pending_change: PendingChange::New,
            content_handle,
            ..source
        };

        self.store.insert(node, parent, Some(source_id), false)?;
        self.store.renumber_sequences(parent, false)?;
        log::debug!("Duplicated node {source_id} as {id}");

        self.operation_log.log(Operation::NodeDuplicated {
            operation_id: new_operation_id(),
            timestamp,
            source_id,
            node_id: id,
        });
        self.verify_in_debug();
        Ok(id)
    }

    /// Replaces the editable properties of `node_id`.
    ///
    /// Leaving rich text discards formatting: it is only applied when
    /// `confirmed` is true, and purges the node's recorded content states.
    /// Returns `Ok(false)` when nothing was changed (identical properties, or
    /// an unconfirmed lossy change).
    ///
    /// # Errors
    ///
    /// Returns [`ArbornotesError::NodeNotFound`] if the node does not exist,
    /// and [`ArbornotesError::ReadOnly`] when the content kind of a read-only
    /// node would change.
    pub fn edit_properties(
        &mut self,
        node_id: i64,
        properties: NodeProperties,
        confirmed: bool,
    ) -> Result<bool> {
        let node = self.store.node(node_id)?;
        if node.properties() == properties {
            return Ok(false);
        }
        let transition = node.content_kind.transition_to(&properties.content_kind);
        if transition != ContentTransition::Unchanged && node.is_read_only {
            return Err(ArbornotesError::ReadOnly(node_id));
        }
        if transition.needs_confirmation() && !confirmed {
            return Ok(false);
        }
        if transition == ContentTransition::LeaveStructured {
            self.content.purge_states(node_id);
        }

        self.settings.default_content_kind = properties.content_kind.clone();
        let node = self.store.node_mut(node_id)?;
        node.apply_properties(properties);
        node.mark(PendingChange::EditProperties);
        log::debug!("Edited properties of node {node_id} ({transition:?})");

        self.operation_log.log(Operation::PropertiesEdited {
            operation_id: new_operation_id(),
            timestamp: now(),
            node_id,
        });
        Ok(true)
    }

    /// Flips the read-only flag of `node_id` and returns the new value.
    ///
    /// # Errors
    ///
    /// Returns [`ArbornotesError::NodeNotFound`] if the node does not exist.
    pub fn toggle_read_only(&mut self, node_id: i64) -> Result<bool> {
        let node = self.store.node_mut(node_id)?;
        node.is_read_only = !node.is_read_only;
        node.mark(PendingChange::EditProperties);
        let read_only = node.is_read_only;

        self.operation_log.log(Operation::PropertiesEdited {
            operation_id: new_operation_id(),
            timestamp: now(),
            node_id,
        });
        Ok(read_only)
    }

    /// Moves `node_id` with its whole subtree under `new_parent` (root level
    /// for `None`).
    ///
    /// Placement follows [`NodeStore::insert`]. Every id in the subtree is
    /// kept; the moved node is marked [`PendingChange::EditHierarchy`] and
    /// all levels are renumbered. All checks happen before anything changes.
    ///
    /// # Errors
    ///
    /// Returns [`ArbornotesError::Cycle`] if `new_parent` is the node itself
    /// or one of its descendants, [`ArbornotesError::Structural`] if `after`
    /// is not another child of `new_parent`, and
    /// [`ArbornotesError::NodeNotFound`] for unknown ids.
    pub fn move_node(
        &mut self,
        node_id: i64,
        new_parent: Option<i64>,
        after: Option<i64>,
        as_first: bool,
    ) -> Result<()> {
        self.store.node(node_id)?;
        if let Some(target) = new_parent {
            self.store.node(target)?;
            if target == node_id {
                return Err(ArbornotesError::Cycle(
                    "The new parent can't be the very node to move".to_string(),
                ));
            }
            if self.store.is_self_or_ancestor(node_id, target) {
                return Err(ArbornotesError::Cycle(
                    "The new parent can't be one of its children".to_string(),
                ));
            }
        }
        if let Some(after_id) = after {
            if after_id == node_id || !self.store.children_of(new_parent)?.contains(&after_id) {
                return Err(ArbornotesError::Structural(format!(
                    "Node {after_id} is not a sibling to place node {node_id} after"
                )));
            }
        }

        if self.store.parent_of(node_id) != new_parent {
            self.ensure_room(new_parent)?;
        }

        let mut subtree = self.store.remove_subtree(node_id)?;
        subtree.node.mark(PendingChange::EditHierarchy);
        self.store.insert_subtree(subtree, new_parent, after, as_first)?;
        self.store.renumber_sequences(None, true)?;
        log::debug!("Moved node {node_id} under {new_parent:?}");

        self.log_hierarchy(vec![node_id]);
        self.verify_in_debug();
        Ok(())
    }

    /// Moves `node_id` under its previous sibling, as the last child.
    ///
    /// Returns `Ok(false)` without a previous sibling.
    ///
    /// # Errors
    ///
    /// Returns [`ArbornotesError::NodeNotFound`] if the node does not exist.
    pub fn indent(&mut self, node_id: i64) -> Result<bool> {
        match self.store.previous_sibling(node_id)? {
            Some(prev) => self.move_node(node_id, Some(prev), None, false).map(|_| true),
            None => Ok(false),
        }
    }

    /// Moves `node_id` one level up, directly after its former parent.
    ///
    /// Returns `Ok(false)` for root-level nodes.
    ///
    /// # Errors
    ///
    /// Returns [`ArbornotesError::NodeNotFound`] if the node does not exist.
    pub fn outdent(&mut self, node_id: i64) -> Result<bool> {
        self.store.node(node_id)?;
        let Some(parent) = self.store.parent_of(node_id) else {
            return Ok(false);
        };
        let grandparent = self.store.parent_of(parent);
        self.move_node(node_id, grandparent, Some(parent), false)?;
        Ok(true)
    }

    /// Makes `node_id` the last child of `new_parent`.
    ///
    /// Returns `Ok(false)` if `new_parent` already is its parent.
    ///
    /// # Errors
    ///
    /// As [`move_node`](Self::move_node).
    pub fn reparent(&mut self, node_id: i64, new_parent: i64) -> Result<bool> {
        self.store.node(node_id)?;
        if new_parent != node_id && self.store.parent_of(node_id) == Some(new_parent) {
            log::info!("Node {new_parent} is already the parent of {node_id}");
            return Ok(false);
        }
        self.move_node(node_id, Some(new_parent), None, false)?;
        Ok(true)
    }

    fn swap_with(&mut self, node_id: i64, other: Option<i64>) -> Result<Option<i64>> {
        let Some(other) = other else {
            return Ok(None);
        };
        self.store.swap_siblings(node_id, other)?;
        self.mark(node_id, PendingChange::EditHierarchy)?;
        self.mark(other, PendingChange::EditHierarchy)?;
        log::debug!("Swapped node {node_id} with {other}");

        self.log_hierarchy(vec![node_id, other]);
        self.verify_in_debug();
        Ok(Some(other))
    }

    /// Exchanges the data of `node_id` with its previous sibling.
    ///
    /// Ids stay in place: the data that was shown as `node_id` is afterwards
    /// found under the returned id. `Ok(None)` for a first child.
    ///
    /// # Errors
    ///
    /// Returns [`ArbornotesError::NodeNotFound`] if the node does not exist.
    pub fn swap_up(&mut self, node_id: i64) -> Result<Option<i64>> {
        let prev = self.store.previous_sibling(node_id)?;
        self.swap_with(node_id, prev)
    }

    /// Exchanges the data of `node_id` with its next sibling. See
    /// [`swap_up`](Self::swap_up).
    ///
    /// # Errors
    ///
    /// Returns [`ArbornotesError::NodeNotFound`] if the node does not exist.
    pub fn swap_down(&mut self, node_id: i64) -> Result<Option<i64>> {
        let next = self.store.next_sibling(node_id)?;
        self.swap_with(node_id, next)
    }

    /// Describes what deleting `node_id` would remove, for confirmation prompts.
    ///
    /// # Errors
    ///
    /// Returns [`ArbornotesError::NodeNotFound`] if the node does not exist.
    pub fn delete_preview(&self, node_id: i64) -> Result<DeletePreview> {
        let name = self.store.node(node_id)?.name.clone();
        let mut entries = Vec::new();
        let mut stack = vec![(node_id, 0usize)];
        while let Some((id, depth)) = stack.pop() {
            entries.push((depth, self.store.node(id)?.name.clone()));
            stack.extend(self.store.children_of(Some(id))?.iter().rev().map(|c| (*c, depth + 1)));
        }
        Ok(DeletePreview::from_outline(name, entries))
    }

    /// Deletes `node_id` and all of its descendants.
    ///
    /// Nothing happens unless `confirmed` is true (`Ok(None)`). The removed
    /// ids are reported through an [`Operation::NodesDeleted`]; history and
    /// bookmark entries pointing at them are left to be skipped lazily.
    ///
    /// # Errors
    ///
    /// Returns [`ArbornotesError::NodeNotFound`] if the node does not exist
    /// and [`ArbornotesError::ReadOnly`] if it is read only.
    pub fn delete_node(&mut self, node_id: i64, confirmed: bool) -> Result<Option<DeleteResult>> {
        if self.store.node(node_id)?.is_read_only {
            return Err(ArbornotesError::ReadOnly(node_id));
        }
        if !confirmed {
            return Ok(None);
        }

        let next_selection = match self.store.previous_sibling(node_id)? {
            Some(prev) => Some(prev),
            None => self
                .store
                .next_sibling(node_id)?
                .or_else(|| self.store.parent_of(node_id)),
        };

        let mut removed = self.store.remove_subtree(node_id)?;
        removed.for_each_node_mut(&mut |node: &mut Node| node.mark(PendingChange::Delete));
        let deleted_ids = removed.ids();
        log::debug!("Deleted node {node_id} ({} nodes)", deleted_ids.len());

        self.operation_log.log(Operation::NodesDeleted {
            operation_id: new_operation_id(),
            timestamp: now(),
            node_ids: deleted_ids.clone(),
        });
        self.verify_in_debug();
        Ok(Some(DeleteResult {
            deleted_count: deleted_ids.len(),
            deleted_ids,
            next_selection,
            removed: Some(removed),
        }))
    }

    fn needs_swap(&self, left: i64, right: i64, ascending: bool) -> Result<bool> {
        let ord = natural_compare(&self.store.node(left)?.name, &self.store.node(right)?.name);
        Ok(if ascending {
            ord == Ordering::Greater
        } else {
            ord == Ordering::Less
        })
    }

    /// Bubble-sorts the children of `parent` to a fixpoint through data
    /// swaps, then every level below when `recursive`. Returns the ids whose
    /// data changed.
    fn sort_levels(&mut self, parent: Option<i64>, ascending: bool, recursive: bool) -> Result<Vec<i64>> {
        let mut touched = Vec::new();
        let mut levels = vec![parent];
        while let Some(level) = levels.pop() {
            let ids = self.store.children_of(level)?.to_vec();
            loop {
                let mut swapped = false;
                for pair in ids.windows(2) {
                    if self.needs_swap(pair[0], pair[1], ascending)? {
                        self.store.swap_siblings(pair[0], pair[1])?;
                        self.mark(pair[0], PendingChange::EditHierarchy)?;
                        self.mark(pair[1], PendingChange::EditHierarchy)?;
                        touched.extend_from_slice(pair);
                        swapped = true;
                    }
                }
                if !swapped {
                    break;
                }
            }
            if recursive {
                levels.extend(ids.iter().map(|id| Some(*id)));
            }
        }
        touched.sort_unstable();
        touched.dedup();
        Ok(touched)
    }

    fn finish_sort(&mut self, renumber_from: Option<i64>, touched: Vec<i64>) -> Result<bool> {
        if touched.is_empty() {
            return Ok(false);
        }
        self.store.renumber_sequences(renumber_from, true)?;
        log::info!("Sort reordered {} nodes", touched.len());
        self.log_hierarchy(touched);
        self.verify_in_debug();
        Ok(true)
    }

    /// Sorts the children of `parent` (root level for `None`) and every level
    /// below by natural name order. Nodes with equal names keep their order.
    ///
    /// Returns whether anything moved.
    ///
    /// # Errors
    ///
    /// Returns [`ArbornotesError::NodeNotFound`] if `parent` does not exist.
    pub fn sort_level(&mut self, parent: Option<i64>, ascending: bool) -> Result<bool> {
        let touched = self.sort_levels(parent, ascending, true)?;
        self.finish_sort(parent, touched)
    }

    /// Sorts the whole tree. See [`sort_level`](Self::sort_level).
    ///
    /// # Errors
    ///
    /// Only fails on a corrupted store.
    pub fn sort_tree(&mut self, ascending: bool) -> Result<bool> {
        self.sort_level(None, ascending)
    }

    /// Sorts only the level containing `node_id`; deeper levels are untouched.
    ///
    /// # Errors
    ///
    /// Returns [`ArbornotesError::NodeNotFound`] if the node does not exist.
    pub fn sort_siblings(&mut self, node_id: i64, ascending: bool) -> Result<bool> {
        self.store.node(node_id)?;
        let parent = self.store.parent_of(node_id);
        let touched = self.sort_levels(parent, ascending, false)?;
        self.finish_sort(parent, touched)
    }

    /// Records that the user selected `node_id`.
    ///
    /// Returns whether the visit was added to the history.
    ///
    /// # Errors
    ///
    /// Returns [`ArbornotesError::NodeNotFound`] if the node does not exist.
    pub fn select(&mut self, node_id: i64) -> Result<bool> {
        self.store.node(node_id)?;
        Ok(self.history.record_visit(node_id))
    }

    /// Runs `f` with visit recording suspended, restoring the previous state
    /// afterwards.
    pub fn with_history_suppressed<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        let previous = self.history.set_suppressed(true);
        let mut guard = SuppressedHistory {
            workspace: self,
            previous,
        };
        f(&mut *guard.workspace)
    }

    /// Returns the previously visited node that still exists.
    pub fn go_back(&mut self) -> Option<i64> {
        let store = &self.store;
        self.history
            .with_suppressed(|history| history.go_back(|id| store.contains(id)))
    }

    /// Returns the next visited node that still exists.
    pub fn go_forward(&mut self) -> Option<i64> {
        let store = &self.store;
        self.history
            .with_suppressed(|history| history.go_forward(|id| store.contains(id)))
    }

    /// Selects the child of `parent` named exactly `name`, creating a plain
    /// rich-text node there first if none exists. Returns its id.
    ///
    /// # Errors
    ///
    /// Returns [`ArbornotesError::NodeNotFound`] if `parent` does not exist.
    pub fn ensure_child(&mut self, parent: Option<i64>, name: &str) -> Result<i64> {
        let existing = self
            .store
            .children_of(parent)?
            .iter()
            .copied()
            .find(|id| self.store.get(*id).is_some_and(|n| n.name == name));
        let id = match existing {
            Some(id) => id,
            None => self.create_node(parent, AddPosition::AsChild, NodeProperties::named(name))?,
        };
        self.select(id)?;
        Ok(id)
    }

    /// Ensures the `year / month / day` path for `date` at root level
    /// (e.g. `2026` / `October` / `19 Mon`) and returns the day node.
    ///
    /// Only the day is recorded in the visited history.
    ///
    /// # Errors
    ///
    /// Only fails on a corrupted store.
    pub fn create_date_path(&mut self, date: NaiveDate) -> Result<i64> {
        let year_name = date.format("%Y").to_string();
        let month_name = date.format("%B").to_string();
        let day_name = date.format("%d %a").to_string();

        let month = self.with_history_suppressed(|ws| {
            let year = ws.ensure_child(None, &year_name)?;
            ws.ensure_child(Some(year), &month_name)
        })?;
        self.ensure_child(Some(month), &day_name)
    }

    /// Bookmarks `node_id`. Returns false if it already was.
    ///
    /// # Errors
    ///
    /// Returns [`ArbornotesError::NodeNotFound`] if the node does not exist.
    pub fn add_bookmark(&mut self, node_id: i64) -> Result<bool> {
        self.store.node(node_id)?;
        if !self.bookmarks.add(node_id) {
            return Ok(false);
        }
        self.bookmark_changed(node_id, true);
        Ok(true)
    }

    /// Removes the bookmark on `node_id`, which need not exist anymore.
    /// Returns false if it was not bookmarked.
    pub fn remove_bookmark(&mut self, node_id: i64) -> bool {
        if !self.bookmarks.remove(node_id) {
            return false;
        }
        self.bookmark_changed(node_id, false);
        true
    }

    /// Replaces the bookmark list with a user-edited one (reordered and/or
    /// with entries dropped). Returns whether anything changed.
    pub fn set_bookmark_order(&mut self, ids: &[i64]) -> bool {
        let dropped: Vec<i64> = self
            .bookmarks
            .iter()
            .filter(|id| !ids.contains(id))
            .collect();
        if !self.bookmarks.set_order(ids) {
            return false;
        }
        for id in dropped {
            self.bookmark_changed(id, false);
        }
        true
    }

    fn bookmark_changed(&mut self, node_id: i64, bookmarked: bool) {
        if let Some(node) = self.store.get_mut(node_id) {
            node.mark(PendingChange::BookmarkChange);
        }
        self.operation_log.log(Operation::BookmarkChanged {
            operation_id: new_operation_id(),
            timestamp: now(),
            node_id,
            bookmarked,
        });
    }

    /// Bookmarked ids in display order, skipping nodes that no longer exist.
    pub fn bookmarked_nodes(&self) -> Vec<i64> {
        self.bookmarks
            .iter()
            .filter(|id| self.store.contains(*id))
            .collect()
    }

    /// True while changes are waiting for the persistence collaborator.
    pub fn is_save_needed(&self) -> bool {
        !self.operation_log.is_empty()
            || self
                .store
                .walk()
                .into_iter()
                .any(|id| self.store.get(id).is_some_and(|n| n.pending_change != PendingChange::None))
    }

    /// Ids of nodes carrying a pending marker, in display order.
    pub fn pending_nodes(&self) -> Vec<i64> {
        self.store
            .walk()
            .into_iter()
            .filter(|id| self.store.get(*id).is_some_and(|n| n.pending_change != PendingChange::None))
            .collect()
    }

    /// Operations logged since the last call, oldest first.
    pub fn take_operations(&mut self) -> Vec<Operation> {
        self.operation_log.drain()
    }

    /// Called by the persistence collaborator once `node_id` is flushed.
    ///
    /// # Errors
    ///
    /// Returns [`ArbornotesError::NodeNotFound`] if the node does not exist.
    pub fn clear_pending(&mut self, node_id: i64, saved_at: i64) -> Result<()> {
        let node = self.store.node_mut(node_id)?;
        node.pending_change = PendingChange::None;
        node.last_saved_at = saved_at;
        Ok(())
    }
}

impl Workspace<InMemoryContent> {
    /// Empty document with in-memory bodies and default settings.
    pub fn in_memory() -> Self {
        Self::new(InMemoryContent::new(), TreeSettings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ContentKind;

    fn names(ws: &Workspace, parent: Option<i64>) -> Vec<String> {
        ws.get_children(parent)
            .unwrap()
            .iter()
            .map(|n| n.name.clone())
            .collect()
    }

    fn sequences(ws: &Workspace, parent: Option<i64>) -> Vec<u32> {
        ws.get_children(parent).unwrap().iter().map(|n| n.sequence).collect()
    }

    fn add(ws: &mut Workspace, parent: Option<i64>, name: &str) -> i64 {
        ws.create_node(parent, AddPosition::AsChild, NodeProperties::named(name))
            .unwrap()
    }

    /// Helper: a workspace with one root node and `names` as its children,
    /// appended in order.
    fn setup_with_children(children: &[&str]) -> (Workspace, i64, Vec<i64>) {
        let mut ws = Workspace::in_memory();
        let root = add(&mut ws, None, "Root");
        let ids = children.iter().map(|n| add(&mut ws, Some(root), n)).collect();
        (ws, root, ids)
    }

    // ── create / duplicate ───────────────────────────────────────

    #[test]
    fn test_create_children_in_order() {
        let (ws, root, ids) = setup_with_children(&["A", "B"]);
        assert_eq!(root, 1);
        assert_eq!(ids, vec![2, 3]);
        assert_eq!(ws.store().children_of(Some(1)).unwrap(), &[2, 3]);
        let (a, b) = (ws.get_node(2).unwrap(), ws.get_node(3).unwrap());
        assert!(a.sequence < b.sequence);
        assert_eq!(a.pending_change, PendingChange::New);
        assert_eq!(a.created_at, a.last_saved_at);
    }

    #[test]
    fn test_create_as_sibling_inserts_after_anchor() {
        let (mut ws, root, ids) = setup_with_children(&["A", "C"]);
        ws.create_node(Some(ids[0]), AddPosition::AsSibling, NodeProperties::named("B"))
            .unwrap();
        assert_eq!(names(&ws, Some(root)), vec!["A", "B", "C"]);
        assert_eq!(sequences(&ws, Some(root)), vec![1, 2, 3]);
    }

    #[test]
    fn test_create_without_anchor_appends_at_root() {
        let mut ws = Workspace::in_memory();
        add(&mut ws, None, "one");
        ws.create_node(None, AddPosition::AsSibling, NodeProperties::named("two"))
            .unwrap();
        assert_eq!(names(&ws, None), vec!["one", "two"]);
    }

    #[test]
    fn test_create_under_missing_anchor_fails() {
        let mut ws = Workspace::in_memory();
        let err = ws
            .create_node(Some(42), AddPosition::AsChild, NodeProperties::named("x"))
            .unwrap_err();
        assert!(matches!(err, ArbornotesError::NodeNotFound(42)));
    }

    #[test]
    fn test_ids_never_reused_after_delete() {
        let (mut ws, _root, ids) = setup_with_children(&["A", "B"]);
        ws.delete_node(ids[1], true).unwrap();
        let next = add(&mut ws, None, "C");
        assert_eq!(next, 4);
    }

    #[test]
    fn test_create_remembers_content_kind() {
        let mut ws = Workspace::in_memory();
        let props = NodeProperties {
            content_kind: ContentKind::Code("rust".to_string()),
            ..NodeProperties::named("src")
        };
        ws.create_node(None, AddPosition::AsChild, props).unwrap();
        let next = NodeProperties::from_settings(ws.settings());
        assert_eq!(next.content_kind, ContentKind::Code("rust".to_string()));
    }

    #[test]
    fn test_duplicate_plain_text_copies_body() {
        let mut ws = Workspace::in_memory();
        let props = NodeProperties {
            content_kind: ContentKind::PlainText,
            is_bold: true,
            ..NodeProperties::named("notes")
        };
        let src = ws.create_node(None, AddPosition::AsChild, props).unwrap();
        let handle = ws.get_node(src).unwrap().content_handle;
        ws.content_mut().set_text(handle, "body").unwrap();
        let after = add(&mut ws, None, "after");

        let dup = ws.duplicate_node(src).unwrap();
        let node = ws.get_node(dup).unwrap();
        assert_eq!(node.name, "notes");
        assert!(node.is_bold);
        assert_eq!(node.pending_change, PendingChange::New);
        assert_ne!(node.content_handle, handle);
        assert_eq!(ws.content().text(node.content_handle), Some("body"));
        assert_eq!(ws.store().children_of(None).unwrap(), &[src, dup, after]);
    }

    #[test]
    fn test_duplicate_rich_text_starts_empty() {
        let mut ws = Workspace::in_memory();
        let src = add(&mut ws, None, "rich");
        let handle = ws.get_node(src).unwrap().content_handle;
        ws.content_mut().set_text(handle, "formatted").unwrap();

        let dup = ws.duplicate_node(src).unwrap();
        let dup_handle = ws.get_node(dup).unwrap().content_handle;
        assert!(ws.content().content_is_empty(dup_handle));
    }

    #[test]
    fn test_duplicate_rich_text_seeds_from_recorded_state() {
        let mut ws = Workspace::in_memory();
        let src = add(&mut ws, None, "rich");
        let handle = ws.get_node(src).unwrap().content_handle;
        ws.content_mut().set_text(handle, "saved state").unwrap();
        ws.content_mut().record_state(src, handle).unwrap();

        let dup = ws.duplicate_node(src).unwrap();
        let dup_handle = ws.get_node(dup).unwrap().content_handle;
        assert_eq!(ws.content().text(dup_handle), Some("saved state"));
    }

    #[test]
    fn test_duplicate_does_not_copy_children() {
        let (mut ws, root, _ids) = setup_with_children(&["A"]);
        let dup = ws.duplicate_node(root).unwrap();
        assert!(ws.store().children_of(Some(dup)).unwrap().is_empty());
    }

    // ── edit properties ──────────────────────────────────────────

    #[test]
    fn test_edit_properties_marks_node() {
        let mut ws = Workspace::in_memory();
        let id = add(&mut ws, None, "old");
        ws.clear_pending(id, 5).unwrap();
        let changed = ws
            .edit_properties(id, NodeProperties::named("new"), false)
            .unwrap();
        assert!(changed);
        let node = ws.get_node(id).unwrap();
        assert_eq!(node.name, "new");
        assert_eq!(node.pending_change, PendingChange::EditProperties);
    }

    #[test]
    fn test_edit_properties_keeps_new_marker() {
        let mut ws = Workspace::in_memory();
        let id = add(&mut ws, None, "old");
        ws.edit_properties(id, NodeProperties::named("new"), false).unwrap();
        assert_eq!(ws.get_node(id).unwrap().pending_change, PendingChange::New);
    }

    #[test]
    fn test_leaving_rich_text_needs_confirmation_and_purges() {
        let mut ws = Workspace::in_memory();
        let id = add(&mut ws, None, "doc");
        let handle = ws.get_node(id).unwrap().content_handle;
        ws.content_mut().record_state(id, handle).unwrap();
        let plain = NodeProperties {
            content_kind: ContentKind::PlainText,
            ..NodeProperties::named("doc")
        };

        assert!(!ws.edit_properties(id, plain.clone(), false).unwrap());
        assert_eq!(ws.get_node(id).unwrap().content_kind, ContentKind::RichText);
        assert_eq!(ws.content().state_count(id), 1);

        assert!(ws.edit_properties(id, plain, true).unwrap());
        assert_eq!(ws.get_node(id).unwrap().content_kind, ContentKind::PlainText);
        assert_eq!(ws.content().state_count(id), 0);
    }

    #[test]
    fn test_entering_rich_text_does_not_purge() {
        let mut ws = Workspace::in_memory();
        let props = NodeProperties {
            content_kind: ContentKind::PlainText,
            ..NodeProperties::named("doc")
        };
        let id = ws.create_node(None, AddPosition::AsChild, props).unwrap();
        let handle = ws.get_node(id).unwrap().content_handle;
        ws.content_mut().record_state(id, handle).unwrap();

        assert!(ws.edit_properties(id, NodeProperties::named("doc"), false).unwrap());
        assert_eq!(ws.content().state_count(id), 1);
    }

    #[test]
    fn test_read_only_allows_rename_but_not_kind_change() {
        let mut ws = Workspace::in_memory();
        let id = add(&mut ws, None, "locked");
        assert!(ws.toggle_read_only(id).unwrap());

        let rename = NodeProperties {
            is_read_only: true,
            ..NodeProperties::named("renamed")
        };
        assert!(ws.edit_properties(id, rename, false).unwrap());

        let to_code = NodeProperties {
            is_read_only: true,
            content_kind: ContentKind::Code("c".to_string()),
            ..NodeProperties::named("renamed")
        };
        let err = ws.edit_properties(id, to_code, true).unwrap_err();
        assert!(matches!(err, ArbornotesError::ReadOnly(_)));
    }

    #[test]
    fn test_edit_identical_properties_is_noop() {
        let mut ws = Workspace::in_memory();
        let id = add(&mut ws, None, "same");
        ws.take_operations();
        assert!(!ws.edit_properties(id, NodeProperties::named("same"), false).unwrap());
        assert!(ws.take_operations().is_empty());
    }

    // ── move ─────────────────────────────────────────────────────

    #[test]
    fn test_move_keeps_ids_and_shape() {
        let (mut ws, root, ids) = setup_with_children(&["A", "B"]);
        let a1 = add(&mut ws, Some(ids[0]), "a1");
        let a2 = add(&mut ws, Some(ids[0]), "a2");
        let a1x = add(&mut ws, Some(a1), "a1x");

        ws.move_node(ids[0], Some(ids[1]), None, false).unwrap();

        assert_eq!(ws.store().children_of(Some(root)).unwrap(), &[ids[1]]);
        assert_eq!(ws.store().children_of(Some(ids[1])).unwrap(), &[ids[0]]);
        assert_eq!(ws.store().children_of(Some(ids[0])).unwrap(), &[a1, a2]);
        assert_eq!(ws.store().children_of(Some(a1)).unwrap(), &[a1x]);
        assert_eq!(ws.get_node(a1x).unwrap().name, "a1x");
        ws.store().verify().unwrap();
    }

    #[test]
    fn test_move_marks_edit_hierarchy() {
        let (mut ws, _root, ids) = setup_with_children(&["A", "B"]);
        for id in &ids {
            ws.clear_pending(*id, 0).unwrap();
        }
        ws.move_node(ids[1], None, None, true).unwrap();
        assert_eq!(ws.get_node(ids[1]).unwrap().pending_change, PendingChange::EditHierarchy);
        assert_eq!(ws.store().children_of(None).unwrap()[0], ids[1]);
    }

    #[test]
    fn test_move_into_self_or_descendant_fails() {
        let (mut ws, root, ids) = setup_with_children(&["A"]);
        let deep = add(&mut ws, Some(ids[0]), "deep");
        let deeper = add(&mut ws, Some(deep), "deeper");

        for target in [root, ids[0], deep, deeper] {
            let err = ws.move_node(root, Some(target), None, false).unwrap_err();
            assert!(matches!(err, ArbornotesError::Cycle(_)), "target {target}: {err}");
        }
        // Nothing moved.
        assert_eq!(ws.store().children_of(None).unwrap(), &[root]);
        assert_eq!(ws.store().children_of(Some(deep)).unwrap(), &[deeper]);
    }

    #[test]
    fn test_move_after_non_sibling_fails_without_change() {
        let (mut ws, root, ids) = setup_with_children(&["A", "B"]);
        let err = ws.move_node(ids[0], None, Some(ids[1]), false).unwrap_err();
        assert!(matches!(err, ArbornotesError::Structural(_)));
        assert_eq!(ws.store().children_of(Some(root)).unwrap(), &[ids[0], ids[1]]);
    }

    #[test]
    fn test_move_after_sibling() {
        let (mut ws, root, ids) = setup_with_children(&["A", "B", "C"]);
        ws.move_node(ids[0], Some(root), Some(ids[2]), false).unwrap();
        assert_eq!(names(&ws, Some(root)), vec!["B", "C", "A"]);
        assert_eq!(sequences(&ws, Some(root)), vec![1, 2, 3]);
    }

    #[test]
    fn test_indent_and_outdent() {
        let (mut ws, root, ids) = setup_with_children(&["A", "B", "C"]);
        assert!(!ws.indent(ids[0]).unwrap());

        assert!(ws.indent(ids[1]).unwrap());
        assert_eq!(ws.store().children_of(Some(ids[0])).unwrap(), &[ids[1]]);
        assert_eq!(names(&ws, Some(root)), vec!["A", "C"]);

        assert!(ws.outdent(ids[1]).unwrap());
        assert_eq!(names(&ws, Some(root)), vec!["A", "B", "C"]);

        assert!(ws.outdent(root).is_ok_and(|moved| !moved));
    }

    #[test]
    fn test_reparent() {
        let (mut ws, root, ids) = setup_with_children(&["A", "B"]);
        assert!(!ws.reparent(ids[0], root).unwrap());
        assert!(ws.reparent(ids[0], ids[1]).unwrap());
        assert_eq!(ws.store().parent_of(ids[0]), Some(ids[1]));
        let err = ws.reparent(ids[1], ids[1]).unwrap_err();
        assert!(matches!(err, ArbornotesError::Cycle(_)));
    }

    // ── swap ─────────────────────────────────────────────────────

    #[test]
    fn test_swap_up_exchanges_data_not_ids() {
        let (mut ws, root, ids) = setup_with_children(&["A", "B"]);
        assert_eq!(ws.swap_up(ids[1]).unwrap(), Some(ids[0]));
        assert_eq!(ws.store().children_of(Some(root)).unwrap(), &[2, 3]);
        assert_eq!(names(&ws, Some(root)), vec!["B", "A"]);
        assert_eq!(ws.get_node(2).unwrap().pending_change, PendingChange::New);
        assert!(sequences(&ws, Some(root)).windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_swap_marks_both_nodes() {
        let (mut ws, _root, ids) = setup_with_children(&["A", "B"]);
        for id in &ids {
            ws.clear_pending(*id, 0).unwrap();
        }
        ws.swap_down(ids[0]).unwrap();
        for id in &ids {
            assert_eq!(ws.get_node(*id).unwrap().pending_change, PendingChange::EditHierarchy);
        }
    }

    #[test]
    fn test_swap_at_edges_is_noop() {
        let (mut ws, root, ids) = setup_with_children(&["A", "B"]);
        assert_eq!(ws.swap_up(ids[0]).unwrap(), None);
        assert_eq!(ws.swap_down(ids[1]).unwrap(), None);
        assert_eq!(names(&ws, Some(root)), vec!["A", "B"]);
    }

    // ── delete ───────────────────────────────────────────────────

    #[test]
    fn test_delete_next_selection_rules() {
        let (mut ws, root, ids) = setup_with_children(&["A", "B", "C"]);
        // Middle node: previous sibling wins.
        let result = ws.delete_node(ids[1], true).unwrap().unwrap();
        assert_eq!(result.next_selection, Some(ids[0]));
        // First node with a following sibling.
        let result = ws.delete_node(ids[0], true).unwrap().unwrap();
        assert_eq!(result.next_selection, Some(ids[2]));
        // Only child: parent.
        let result = ws.delete_node(ids[2], true).unwrap().unwrap();
        assert_eq!(result.next_selection, Some(root));
        // Lone root: nothing.
        let result = ws.delete_node(root, true).unwrap().unwrap();
        assert_eq!(result.next_selection, None);
        assert!(ws.store().is_empty());
    }

    #[test]
    fn test_delete_last_child_selects_previous() {
        let (mut ws, _root, ids) = setup_with_children(&["A", "B"]);
        let result = ws.delete_node(ids[1], true).unwrap().unwrap();
        assert_eq!(result.next_selection, Some(ids[0]));
    }

    #[test]
    fn test_delete_removes_subtree_and_logs() {
        let (mut ws, root, ids) = setup_with_children(&["A"]);
        let child = add(&mut ws, Some(ids[0]), "child");
        ws.take_operations();

        let result = ws.delete_node(root, true).unwrap().unwrap();
        assert_eq!(result.deleted_count, 3);
        assert_eq!(result.deleted_ids, vec![root, ids[0], child]);
        let removed = result.removed.unwrap();
        assert_eq!(removed.node.pending_change, PendingChange::Delete);
        assert_eq!(removed.children[0].children[0].node.pending_change, PendingChange::Delete);

        let ops = ws.take_operations();
        assert_eq!(ops.len(), 1);
        assert!(matches!(&ops[0], Operation::NodesDeleted { node_ids, .. } if node_ids.len() == 3));
    }

    #[test]
    fn test_delete_requires_confirmation() {
        let (mut ws, root, _ids) = setup_with_children(&["A"]);
        assert!(ws.delete_node(root, false).unwrap().is_none());
        assert!(ws.store().contains(root));
    }

    #[test]
    fn test_delete_read_only_fails() {
        let (mut ws, _root, ids) = setup_with_children(&["A"]);
        ws.toggle_read_only(ids[0]).unwrap();
        let err = ws.delete_node(ids[0], true).unwrap_err();
        assert!(matches!(err, ArbornotesError::ReadOnly(_)));
    }

    #[test]
    fn test_delete_preview_outline() {
        let (mut ws, root, ids) = setup_with_children(&["A", "B"]);
        add(&mut ws, Some(ids[0]), "a1");
        let preview = ws.delete_preview(root).unwrap();
        assert_eq!(preview.name, "Root");
        assert!(preview.has_children);
        assert_eq!(preview.outline, vec!["Root", "   A", "      a1", "   B"]);
    }

    // ── sort ─────────────────────────────────────────────────────

    #[test]
    fn test_sort_tree_natural_order_recursive() {
        let (mut ws, root, ids) = setup_with_children(&["item10", "Item2", "item1"]);
        add(&mut ws, Some(ids[0]), "z");
        add(&mut ws, Some(ids[0]), "y");

        assert!(ws.sort_tree(true).unwrap());
        assert_eq!(names(&ws, Some(root)), vec!["item1", "Item2", "item10"]);
        // The children of "item10" travelled with it and were sorted too.
        let item10 = ws.store().children_of(Some(root)).unwrap()[2];
        assert_eq!(names(&ws, Some(item10)), vec!["y", "z"]);
        ws.store().verify().unwrap();
    }

    #[test]
    fn test_sort_is_idempotent() {
        let (mut ws, _root, _ids) = setup_with_children(&["c", "a", "b"]);
        assert!(ws.sort_tree(true).unwrap());
        assert!(!ws.sort_tree(true).unwrap());
    }

    #[test]
    fn test_sort_descending_inverts_ascending() {
        let (mut ws, root, _ids) = setup_with_children(&["b", "c", "a"]);
        ws.sort_level(Some(root), true).unwrap();
        let ascending = names(&ws, Some(root));
        ws.sort_level(Some(root), false).unwrap();
        let mut descending = names(&ws, Some(root));
        descending.reverse();
        assert_eq!(ascending, descending);
    }

    #[test]
    fn test_sort_is_stable_for_equal_names() {
        let (mut ws, root, _ids) = setup_with_children(&["same", "SAME", "a"]);
        ws.sort_level(Some(root), true).unwrap();
        assert_eq!(names(&ws, Some(root)), vec!["a", "same", "SAME"]);

        let (mut ws, root, _ids) = setup_with_children(&["dup", "Dup"]);
        assert!(!ws.sort_level(Some(root), true).unwrap());
        assert!(!ws.sort_level(Some(root), false).unwrap());
        assert_eq!(names(&ws, Some(root)), vec!["dup", "Dup"]);
    }

    #[test]
    fn test_sort_siblings_leaves_deeper_levels() {
        let (mut ws, root, ids) = setup_with_children(&["b", "a"]);
        add(&mut ws, Some(ids[0]), "z");
        add(&mut ws, Some(ids[0]), "y");

        assert!(ws.sort_siblings(ids[0], true).unwrap());
        assert_eq!(names(&ws, Some(root)), vec!["a", "b"]);
        let b = ws.store().children_of(Some(root)).unwrap()[1];
        assert_eq!(names(&ws, Some(b)), vec!["z", "y"]);
    }

    // ── history ──────────────────────────────────────────────────

    #[test]
    fn test_back_and_forward() {
        let (mut ws, _root, ids) = setup_with_children(&["A", "B"]);
        ws.select(ids[0]).unwrap();
        ws.select(ids[1]).unwrap();
        assert_eq!(ws.go_back(), Some(ids[0]));
        assert_eq!(ws.go_forward(), Some(ids[1]));
        assert!(!ws.history().is_suppressed());
    }

    #[test]
    fn test_back_skips_deleted_nodes() {
        let (mut ws, root, ids) = setup_with_children(&["A", "B"]);
        ws.select(root).unwrap();
        ws.select(ids[0]).unwrap();
        ws.select(ids[1]).unwrap();
        ws.delete_node(ids[0], true).unwrap();
        assert_eq!(ws.go_back(), Some(root));

        let (mut ws, _root, ids) = setup_with_children(&["A", "B"]);
        ws.select(ids[0]).unwrap();
        ws.select(ids[1]).unwrap();
        ws.delete_node(ids[0], true).unwrap();
        assert_eq!(ws.go_back(), None);
    }

    #[test]
    fn test_select_missing_node_fails() {
        let mut ws = Workspace::in_memory();
        assert!(matches!(ws.select(3), Err(ArbornotesError::NodeNotFound(3))));
    }

    #[test]
    fn test_suppressed_selection_is_not_recorded() {
        let (mut ws, _root, ids) = setup_with_children(&["A", "B"]);
        ws.select(ids[0]).unwrap();
        let recorded = ws.with_history_suppressed(|ws| ws.select(ids[1]).unwrap());
        assert!(!recorded);
        assert_eq!(ws.history().entries(), &[ids[0]]);
    }

    #[test]
    fn test_history_suppression_survives_panic() {
        let (mut ws, _root, ids) = setup_with_children(&["A"]);
        let outcome = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            ws.with_history_suppressed(|_| -> bool { panic!("callback failed") })
        }));
        assert!(outcome.is_err());
        assert!(!ws.history().is_suppressed());
        assert!(ws.select(ids[0]).unwrap());
    }

    #[test]
    fn test_date_path() {
        let mut ws = Workspace::in_memory();
        let date = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        let day = ws.create_date_path(date).unwrap();

        assert_eq!(names(&ws, None), vec!["2026"]);
        let year = ws.store().children_of(None).unwrap()[0];
        assert_eq!(names(&ws, Some(year)), vec!["October"]);
        assert_eq!(ws.get_node(day).unwrap().name, "19 Mon");
        assert_eq!(ws.history().entries(), &[day]);

        // A second day in the same month reuses year and month.
        let next = ws
            .create_date_path(NaiveDate::from_ymd_opt(2026, 10, 20).unwrap())
            .unwrap();
        assert_eq!(names(&ws, None), vec!["2026"]);
        assert_eq!(ws.store().parent_of(next), ws.store().parent_of(day));
        assert_eq!(ws.get_node(next).unwrap().name, "20 Tue");
    }

    #[test]
    fn test_ensure_child_reuses_existing() {
        let (mut ws, root, ids) = setup_with_children(&["A"]);
        assert_eq!(ws.ensure_child(Some(root), "A").unwrap(), ids[0]);
        let created = ws.ensure_child(Some(root), "a").unwrap();
        assert_ne!(created, ids[0]);
    }

    // ── bookmarks & persistence ──────────────────────────────────

    #[test]
    fn test_bookmarks() {
        let (mut ws, _root, ids) = setup_with_children(&["A", "B"]);
        ws.clear_pending(ids[0], 0).unwrap();
        assert!(ws.add_bookmark(ids[0]).unwrap());
        assert!(!ws.add_bookmark(ids[0]).unwrap());
        assert_eq!(ws.get_node(ids[0]).unwrap().pending_change, PendingChange::BookmarkChange);
        assert!(!ws.remove_bookmark(99));
        assert!(matches!(ws.add_bookmark(99), Err(ArbornotesError::NodeNotFound(99))));

        ws.add_bookmark(ids[1]).unwrap();
        ws.delete_node(ids[1], true).unwrap();
        assert_eq!(ws.bookmarks().ordered_ids(), vec![ids[0], ids[1]]);
        assert_eq!(ws.bookmarked_nodes(), vec![ids[0]]);
        assert!(ws.remove_bookmark(ids[1]));
    }

    #[test]
    fn test_set_bookmark_order_logs_dropped() {
        let (mut ws, _root, ids) = setup_with_children(&["A", "B", "C"]);
        for id in &ids {
            ws.add_bookmark(*id).unwrap();
        }
        ws.take_operations();
        assert!(ws.set_bookmark_order(&[ids[2], ids[0]]));
        assert_eq!(ws.bookmarks().ordered_ids(), vec![ids[2], ids[0]]);
        let ops = ws.take_operations();
        assert_eq!(ops.len(), 1);
        assert!(matches!(ops[0], Operation::BookmarkChanged { bookmarked: false, .. }));
    }

    #[test]
    fn test_save_tracking() {
        let mut ws = Workspace::in_memory();
        assert!(!ws.is_save_needed());
        let id = add(&mut ws, None, "x");
        assert!(ws.is_save_needed());
        assert_eq!(ws.pending_nodes(), vec![id]);

        let ops = ws.take_operations();
        assert_eq!(ops.len(), 1);
        assert!(ws.is_save_needed());
        ws.clear_pending(id, 123).unwrap();
        assert!(!ws.is_save_needed());
        assert_eq!(ws.get_node(id).unwrap().last_saved_at, 123);
    }

    #[test]
    fn test_load_round_trip() {
        let (mut ws, root, ids) = setup_with_children(&["A", "B"]);
        ws.add_bookmark(ids[1]).unwrap();
        let records = ws.store().records();
        let bookmarks = ws.bookmarks().clone();

        let mut loaded = Workspace::load(
            records,
            bookmarks,
            None,
            InMemoryContent::new(),
            TreeSettings::default(),
        )
        .unwrap();
        assert_eq!(names(&loaded, Some(root)), vec!["A", "B"]);
        assert_eq!(loaded.bookmarked_nodes(), vec![ids[1]]);
        assert_eq!(add(&mut loaded, None, "next"), 4);
        assert!(loaded.take_operations().len() == 1);
    }

    #[test]
    fn test_deleted_ids_stay_retired_after_reload() {
        let mut ws = Workspace::in_memory();
        let a = add(&mut ws, None, "a");
        let b = add(&mut ws, None, "b");
        ws.delete_node(b, true).unwrap();

        let records = ws.store().records();
        let saved = serde_json::to_string(ws.store().id_allocator()).unwrap();
        let id_allocator: IdAllocator = serde_json::from_str(&saved).unwrap();

        let mut loaded = Workspace::load(
            records,
            BookmarkIndex::new(),
            Some(id_allocator),
            InMemoryContent::new(),
            TreeSettings::default(),
        )
        .unwrap();
        let c = add(&mut loaded, None, "c");
        assert_eq!(a, 1);
        assert_ne!(c, b);
        assert_eq!(c, 3);
    }

    #[test]
    fn test_full_level_rejects_new_nodes() {
        let settings = TreeSettings {
            sequence_base: u32::MAX - 1,
            ..TreeSettings::default()
        };
        let mut ws = Workspace::new(InMemoryContent::new(), settings);
        let first = add(&mut ws, None, "a");
        add(&mut ws, None, "b");
        assert_eq!(sequences(&ws, None), vec![u32::MAX - 1, u32::MAX]);

        let err = ws
            .create_node(None, AddPosition::AsChild, NodeProperties::named("c"))
            .unwrap_err();
        assert!(matches!(err, ArbornotesError::Invariant(_)));
        assert!(matches!(ws.duplicate_node(first), Err(ArbornotesError::Invariant(_))));

        let child = add(&mut ws, Some(first), "child");
        let err = ws.move_node(child, None, None, false).unwrap_err();
        assert!(matches!(err, ArbornotesError::Invariant(_)));
        assert_eq!(ws.store().parent_of(child), Some(first));
        assert_eq!(ws.store().len(), 3);
        ws.store().verify().unwrap();
    }

    #[test]
    fn test_sequence_policy_from_settings() {
        let settings = TreeSettings {
            sequence_base: 100,
            sequence_step: 10,
            ..TreeSettings::default()
        };
        let mut ws = Workspace::new(InMemoryContent::new(), settings);
        add(&mut ws, None, "a");
        add(&mut ws, None, "b");
        assert_eq!(sequences(&ws, None), vec![100, 110]);
    }
}
