//! The in-memory node forest.
//!
//! [`NodeStore`] owns every [`Node`] together with the parent/child topology
//! and the [`IdAllocator`]. It performs raw structural edits only; policy
//! (pending markers, renumbering after each edit, history) lives in
//! [`Workspace`](super::workspace::Workspace).

use std::collections::{HashMap, HashSet};

use crate::{ArbornotesError, IdAllocator, Node, NodeRecord, PendingChange, Result};

/// Starting value and increment used when sibling sequences are renumbered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SequencePolicy {
    pub base: u32,
    pub step: u32,
}

impl Default for SequencePolicy {
    fn default() -> Self {
        Self { base: 1, step: 1 }
    }
}

impl SequencePolicy {
    /// Sequence number of the sibling at `index`.
    ///
    /// # Errors
    ///
    /// Returns [`ArbornotesError::Invariant`] if the number does not fit in
    /// a `u32`.
    pub fn sequence_at(&self, index: usize) -> Result<u32> {
        u32::try_from(index)
            .ok()
            .and_then(|i| self.step.checked_mul(i))
            .and_then(|offset| self.base.checked_add(offset))
            .ok_or_else(|| {
                ArbornotesError::Invariant(format!(
                    "No sequence number left for position {index} (base {}, step {})",
                    self.base, self.step
                ))
            })
    }
}

/// A node detached from the store together with all of its descendants,
/// children kept in display order.
#[derive(Debug, Clone, PartialEq)]
pub struct Subtree {
    pub node: Node,
    pub children: Vec<Subtree>,
}

impl Subtree {
    /// Ids of every node in the subtree, parents before children.
    pub fn ids(&self) -> Vec<i64> {
        let mut ids = Vec::new();
        let mut stack = vec![self];
        while let Some(tree) = stack.pop() {
            ids.push(tree.node.id);
            stack.extend(tree.children.iter().rev());
        }
        ids
    }

    /// Number of nodes in the subtree, root included.
    pub fn len(&self) -> usize {
        1 + self.children.iter().map(Subtree::len).sum::<usize>()
    }

    /// Always false; a subtree has at least its root.
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Applies `f` to every node, parents before children.
    pub fn for_each_node_mut(&mut self, f: &mut impl FnMut(&mut Node)) {
        f(&mut self.node);
        for child in &mut self.children {
            child.for_each_node_mut(f);
        }
    }
}

#[derive(Debug, Clone)]
struct Entry {
    node: Node,
    parent: Option<i64>,
    children: Vec<i64>,
}

/// Maps node ids to nodes and keeps the forest topology.
///
/// Lookups are O(1). Root-level nodes are kept in their own ordered list;
/// every other node is listed in exactly one parent's child list.
#[derive(Debug, Clone, Default)]
pub struct NodeStore {
    entries: HashMap<i64, Entry>,
    roots: Vec<i64>,
    ids: IdAllocator,
    sequence_policy: SequencePolicy,
}

impl NodeStore {
    /// Creates an empty store whose first allocated id is `1`.
    pub fn new(sequence_policy: SequencePolicy) -> Self {
        Self {
            sequence_policy,
            ..Self::default()
        }
    }

    /// Rebuilds a store from persisted records.
    ///
    /// Siblings are ordered by `sequence`. The id allocator resumes from
    /// `id_allocator` as saved with the document, and never below the highest
    /// id seen plus one.
    ///
    /// # Errors
    ///
    /// Returns [`ArbornotesError::Structural`] for duplicate ids or a
    /// `parent_id` that names no record, [`ArbornotesError::Cycle`] if parent
    /// links loop, and [`ArbornotesError::Invariant`] if two siblings share a
    /// sequence number.
    pub fn from_records(
        records: Vec<NodeRecord>,
        id_allocator: Option<IdAllocator>,
        sequence_policy: SequencePolicy,
    ) -> Result<Self> {
        let mut store = Self::new(sequence_policy);
        let max_id = records.iter().map(|r| r.node.id).max().unwrap_or(0);
        store.ids = IdAllocator::resume(id_allocator.as_ref(), max_id);

        for record in records {
            let id = record.node.id;
            if store.entries.contains_key(&id) {
                return Err(ArbornotesError::Structural(format!("Duplicate node id {id}")));
            }
            store.entries.insert(
                id,
                Entry {
                    node: record.node,
                    parent: record.parent_id,
                    children: Vec::new(),
                },
            );
        }

        let links: Vec<(i64, Option<i64>)> =
            store.entries.iter().map(|(id, e)| (*id, e.parent)).collect();
        for (id, parent) in links {
            match parent {
                None => store.roots.push(id),
                Some(pid) => match store.entries.get_mut(&pid) {
                    Some(parent_entry) => parent_entry.children.push(id),
                    None => {
                        return Err(ArbornotesError::Structural(format!(
                            "Node {id} references unknown parent {pid}"
                        )))
                    }
                },
            }
        }

        // Anything unreachable from the roots sits on a parent loop.
        let reachable = store.walk().len();
        if reachable != store.entries.len() {
            return Err(ArbornotesError::Cycle(format!(
                "{} nodes are their own ancestors",
                store.entries.len() - reachable
            )));
        }

        let mut roots = std::mem::take(&mut store.roots);
        store.sort_by_sequence(&mut roots)?;
        store.roots = roots;
        let parents: Vec<i64> = store.entries.keys().copied().collect();
        for pid in parents {
            let mut children = store
                .entries
                .get_mut(&pid)
                .map(|e| std::mem::take(&mut e.children))
                .unwrap_or_default();
            store.sort_by_sequence(&mut children)?;
            if let Some(e) = store.entries.get_mut(&pid) {
                e.children = children;
            }
        }

        log::info!("Loaded {} nodes, next id {}", store.len(), store.ids.peek());
        Ok(store)
    }

    fn sort_by_sequence(&self, ids: &mut [i64]) -> Result<()> {
        ids.sort_by_key(|id| (self.entries[id].node.sequence, *id));
        for pair in ids.windows(2) {
            let (a, b) = (&self.entries[&pair[0]].node, &self.entries[&pair[1]].node);
            if a.sequence == b.sequence {
                return Err(ArbornotesError::Invariant(format!(
                    "Siblings {} and {} share sequence {}",
                    a.id, b.id, a.sequence
                )));
            }
        }
        Ok(())
    }

    /// Every node with its parent id, in depth-first display order.
    pub fn records(&self) -> Vec<NodeRecord> {
        self.walk()
            .into_iter()
            .map(|id| {
                let entry = &self.entries[&id];
                NodeRecord {
                    node: entry.node.clone(),
                    parent_id: entry.parent,
                }
            })
            .collect()
    }

    /// Number of nodes in the store.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, id: i64) -> bool {
        self.entries.contains_key(&id)
    }

    pub fn get(&self, id: i64) -> Option<&Node> {
        self.entries.get(&id).map(|e| &e.node)
    }

    pub fn get_mut(&mut self, id: i64) -> Option<&mut Node> {
        self.entries.get_mut(&id).map(|e| &mut e.node)
    }

    /// Like [`get`](Self::get) but reports a missing id as an error.
    ///
    /// # Errors
    ///
    /// Returns [`ArbornotesError::NodeNotFound`] if `id` is not in the store.
    pub fn node(&self, id: i64) -> Result<&Node> {
        self.get(id).ok_or(ArbornotesError::NodeNotFound(id))
    }

    /// Mutable variant of [`node`](Self::node).
    ///
    /// # Errors
    ///
    /// Returns [`ArbornotesError::NodeNotFound`] if `id` is not in the store.
    pub fn node_mut(&mut self, id: i64) -> Result<&mut Node> {
        self.get_mut(id).ok_or(ArbornotesError::NodeNotFound(id))
    }

    /// Ordered child ids of `parent`, or the root-level ids for `None`.
    ///
    /// # Errors
    ///
    /// Returns [`ArbornotesError::NodeNotFound`] if `parent` is not in the store.
    pub fn children_of(&self, parent: Option<i64>) -> Result<&[i64]> {
        match parent {
            None => Ok(&self.roots),
            Some(pid) => self
                .entries
                .get(&pid)
                .map(|e| e.children.as_slice())
                .ok_or(ArbornotesError::NodeNotFound(pid)),
        }
    }

    /// Parent of `id`; `None` for root-level nodes and unknown ids.
    pub fn parent_of(&self, id: i64) -> Option<i64> {
        self.entries.get(&id).and_then(|e| e.parent)
    }

    /// Index of `id` within its sibling list.
    ///
    /// # Errors
    ///
    /// Returns [`ArbornotesError::NodeNotFound`] if `id` is not in the store.
    pub fn position_of(&self, id: i64) -> Result<usize> {
        let siblings = self.children_of(self.node_parent(id)?)?;
        siblings.iter().position(|s| *s == id).ok_or_else(|| {
            ArbornotesError::Invariant(format!("Node {id} missing from its parent's children"))
        })
    }

    fn node_parent(&self, id: i64) -> Result<Option<i64>> {
        self.entries
            .get(&id)
            .map(|e| e.parent)
            .ok_or(ArbornotesError::NodeNotFound(id))
    }

    /// The sibling displayed immediately before `id`, if any.
    ///
    /// # Errors
    ///
    /// Returns [`ArbornotesError::NodeNotFound`] if `id` is not in the store.
    pub fn previous_sibling(&self, id: i64) -> Result<Option<i64>> {
        let pos = self.position_of(id)?;
        let siblings = self.children_of(self.node_parent(id)?)?;
        Ok(pos.checked_sub(1).map(|p| siblings[p]))
    }

    /// The sibling displayed immediately after `id`, if any.
    ///
    /// # Errors
    ///
    /// Returns [`ArbornotesError::NodeNotFound`] if `id` is not in the store.
    pub fn next_sibling(&self, id: i64) -> Result<Option<i64>> {
        let pos = self.position_of(id)?;
        let siblings = self.children_of(self.node_parent(id)?)?;
        Ok(siblings.get(pos + 1).copied())
    }

    /// True if `ancestor` is `id` itself or lies on the path from `id` to its root.
    pub fn is_self_or_ancestor(&self, ancestor: i64, id: i64) -> bool {
        let mut current = Some(id);
        while let Some(cur) = current {
            if cur == ancestor {
                return true;
            }
            current = self.parent_of(cur);
        }
        false
    }

    /// Ids of the subtree rooted at `id`, parents before children.
    ///
    /// # Errors
    ///
    /// Returns [`ArbornotesError::NodeNotFound`] if `id` is not in the store.
    pub fn descendants(&self, id: i64) -> Result<Vec<i64>> {
        self.node(id)?;
        Ok(self.walk_from(&[id]))
    }

    /// Every id in depth-first display order.
    pub fn walk(&self) -> Vec<i64> {
        self.walk_from(&self.roots)
    }

    fn walk_from(&self, start: &[i64]) -> Vec<i64> {
        let mut out = Vec::with_capacity(self.entries.len());
        let mut stack: Vec<i64> = start.iter().rev().copied().collect();
        while let Some(id) = stack.pop() {
            out.push(id);
            if let Some(e) = self.entries.get(&id) {
                stack.extend(e.children.iter().rev());
            }
        }
        out
    }

    /// Issues a fresh node id.
    pub fn allocate_id(&mut self) -> i64 {
        self.ids.allocate()
    }

    /// The allocator state, to be persisted with the document metadata.
    pub fn id_allocator(&self) -> &IdAllocator {
        &self.ids
    }

    pub fn sequence_policy(&self) -> SequencePolicy {
        self.sequence_policy
    }

    /// Inserts `node` under `parent` (or at root level).
    ///
    /// Placement: directly after `after` when given, otherwise first when
    /// `as_first`, otherwise last. The node's `sequence` is left untouched;
    /// call [`renumber_sequences`](Self::renumber_sequences) afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`ArbornotesError::Structural`] if the id is already present or
    /// `after` is not a child of `parent`, and
    /// [`ArbornotesError::NodeNotFound`] if `parent` does not exist.
    pub(crate) fn insert(
        &mut self,
        node: Node,
        parent: Option<i64>,
        after: Option<i64>,
        as_first: bool,
    ) -> Result<()> {
        let index = self.insertion_index(parent, after, as_first)?;
        let id = node.id;
        if self.entries.contains_key(&id) {
            return Err(ArbornotesError::Structural(format!("Node {id} already exists")));
        }
        self.ids.observe(id);
        self.entries.insert(
            id,
            Entry {
                node,
                parent,
                children: Vec::new(),
            },
        );
        self.siblings_mut(parent)?.insert(index, id);
        Ok(())
    }

    /// Reattaches a detached subtree, keeping every id and the child order.
    ///
    /// # Errors
    ///
    /// Same as [`insert`](Self::insert); additionally
    /// [`ArbornotesError::Structural`] if any id of the subtree is present.
    pub(crate) fn insert_subtree(
        &mut self,
        subtree: Subtree,
        parent: Option<i64>,
        after: Option<i64>,
        as_first: bool,
    ) -> Result<()> {
        if let Some(clash) = subtree.ids().into_iter().find(|id| self.contains(*id)) {
            return Err(ArbornotesError::Structural(format!("Node {clash} already exists")));
        }
        let index = self.insertion_index(parent, after, as_first)?;
        let root_id = subtree.node.id;
        self.attach(subtree, parent);
        self.siblings_mut(parent)?.insert(index, root_id);
        Ok(())
    }

    fn attach(&mut self, subtree: Subtree, parent: Option<i64>) {
        let Subtree { node, children } = subtree;
        let id = node.id;
        self.ids.observe(id);
        let child_ids = children.iter().map(|c| c.node.id).collect();
        self.entries.insert(
            id,
            Entry {
                node,
                parent,
                children: child_ids,
            },
        );
        for child in children {
            self.attach(child, Some(id));
        }
    }

    fn insertion_index(&self, parent: Option<i64>, after: Option<i64>, as_first: bool) -> Result<usize> {
        let siblings = self.children_of(parent)?;
        match after {
            Some(after_id) => siblings
                .iter()
                .position(|s| *s == after_id)
                .map(|p| p + 1)
                .ok_or_else(|| {
                    ArbornotesError::Structural(format!(
                        "Node {after_id} is not a child of {}",
                        describe_parent(parent)
                    ))
                }),
            None if as_first => Ok(0),
            None => Ok(siblings.len()),
        }
    }

    fn siblings_mut(&mut self, parent: Option<i64>) -> Result<&mut Vec<i64>> {
        match parent {
            None => Ok(&mut self.roots),
            Some(pid) => self
                .entries
                .get_mut(&pid)
                .map(|e| &mut e.children)
                .ok_or(ArbornotesError::NodeNotFound(pid)),
        }
    }

    /// Detaches `id` and all of its descendants from the store.
    ///
    /// # Errors
    ///
    /// Returns [`ArbornotesError::NodeNotFound`] if `id` is not in the store.
    pub fn remove_subtree(&mut self, id: i64) -> Result<Subtree> {
        let parent = self.node_parent(id)?;
        self.siblings_mut(parent)?.retain(|s| *s != id);
        self.detach(id)
    }

    fn detach(&mut self, id: i64) -> Result<Subtree> {
        let entry = self
            .entries
            .remove(&id)
            .ok_or(ArbornotesError::NodeNotFound(id))?;
        let children = entry
            .children
            .iter()
            .map(|c| self.detach(*c))
            .collect::<Result<Vec<_>>>()?;
        Ok(Subtree {
            node: entry.node,
            children,
        })
    }

    /// Exchanges the payload of two adjacent siblings.
    ///
    /// Ids and sequence numbers stay where they are; name, content, flags,
    /// timestamps, pending marker and the child subtrees move. An id that
    /// referred to the upper node afterwards refers to the data that used to
    /// be below it.
    ///
    /// # Errors
    ///
    /// Returns [`ArbornotesError::Structural`] if `a` and `b` are not adjacent
    /// children of the same parent, or [`ArbornotesError::NodeNotFound`].
    pub fn swap_siblings(&mut self, a: i64, b: i64) -> Result<()> {
        let parent = self.node_parent(a)?;
        if self.node_parent(b)? != parent || a == b {
            return Err(ArbornotesError::Structural(format!(
                "Nodes {a} and {b} are not siblings"
            )));
        }
        let (pa, pb) = (self.position_of(a)?, self.position_of(b)?);
        if pa.abs_diff(pb) != 1 {
            return Err(ArbornotesError::Structural(format!(
                "Nodes {a} and {b} are not adjacent"
            )));
        }

        let mut first = self
            .entries
            .remove(&a)
            .ok_or(ArbornotesError::NodeNotFound(a))?;
        if let Some(second) = self.entries.get_mut(&b) {
            std::mem::swap(&mut first.node, &mut second.node);
            std::mem::swap(&mut first.node.id, &mut second.node.id);
            std::mem::swap(&mut first.node.sequence, &mut second.node.sequence);
            std::mem::swap(&mut first.children, &mut second.children);
        }
        let moved_to_a = first.children.clone();
        self.entries.insert(a, first);

        let moved_to_b = self.children_of(Some(b))?.to_vec();
        for child in moved_to_a {
            if let Some(e) = self.entries.get_mut(&child) {
                e.parent = Some(a);
            }
        }
        for child in moved_to_b {
            if let Some(e) = self.entries.get_mut(&child) {
                e.parent = Some(b);
            }
        }
        Ok(())
    }

    /// Reassigns contiguous sequence numbers to the children of `parent`
    /// (root level for `None`) in their current order, and to every level
    /// below it when `recursive`.
    ///
    /// Nodes whose number changes are marked
    /// [`PendingChange::EditHierarchy`]. Returns how many changed.
    ///
    /// # Errors
    ///
    /// Returns [`ArbornotesError::NodeNotFound`] if `parent` does not exist,
    /// and [`ArbornotesError::Invariant`] without touching any node if a
    /// level is too long for the policy.
    pub fn renumber_sequences(&mut self, parent: Option<i64>, recursive: bool) -> Result<usize> {
        let mut levels = vec![self.children_of(parent)?.to_vec()];
        if recursive {
            let mut next = 0;
            while next < levels.len() {
                let nested: Vec<Vec<i64>> = levels[next]
                    .iter()
                    .filter_map(|id| self.entries.get(id))
                    .filter(|e| !e.children.is_empty())
                    .map(|e| e.children.clone())
                    .collect();
                levels.extend(nested);
                next += 1;
            }
        }
        if let Some(widest) = levels.iter().map(Vec::len).max().filter(|w| *w > 0) {
            self.sequence_policy.sequence_at(widest - 1)?;
        }

        let mut changed = 0;
        for level in levels {
            for (i, id) in level.iter().enumerate() {
                let sequence = self.sequence_policy.sequence_at(i)?;
                let Some(entry) = self.entries.get_mut(id) else {
                    continue;
                };
                if entry.node.sequence != sequence {
                    entry.node.sequence = sequence;
                    entry.node.mark(PendingChange::EditHierarchy);
                    changed += 1;
                }
            }
        }
        Ok(changed)
    }

    /// Checks topology and sequence invariants.
    ///
    /// # Errors
    ///
    /// Returns [`ArbornotesError::Invariant`] describing the first violation:
    /// a node listed under the wrong parent or more than once, a node not
    /// reachable from the roots, siblings whose sequences are not strictly
    /// increasing, or an id the allocator could still hand out.
    pub fn verify(&self) -> Result<()> {
        let mut seen = HashSet::with_capacity(self.entries.len());
        let mut levels: Vec<(Option<i64>, &[i64])> = vec![(None, self.roots.as_slice())];
        while let Some((parent, level)) = levels.pop() {
            let mut last_sequence: Option<u32> = None;
            for id in level {
                let entry = self.entries.get(id).ok_or_else(|| {
                    ArbornotesError::Invariant(format!("Dangling child id {id}"))
                })?;
                if entry.parent != parent {
                    return Err(ArbornotesError::Invariant(format!(
                        "Node {id} listed under {} but points at {}",
                        describe_parent(parent),
                        describe_parent(entry.parent)
                    )));
                }
                if !seen.insert(*id) {
                    return Err(ArbornotesError::Invariant(format!("Node {id} listed twice")));
                }
                if entry.node.id != *id {
                    return Err(ArbornotesError::Invariant(format!(
                        "Node stored under {id} carries id {}",
                        entry.node.id
                    )));
                }
                if *id >= self.ids.peek() {
                    return Err(ArbornotesError::Invariant(format!(
                        "Node {id} is not below the next id {}",
                        self.ids.peek()
                    )));
                }
                if let Some(prev) = last_sequence {
                    if entry.node.sequence <= prev {
                        return Err(ArbornotesError::Invariant(format!(
                            "Sequence of node {id} is not increasing under {}",
                            describe_parent(parent)
                        )));
                    }
                }
                last_sequence = Some(entry.node.sequence);
                levels.push((Some(*id), entry.children.as_slice()));
            }
        }
        if seen.len() != self.entries.len() {
            return Err(ArbornotesError::Invariant(format!(
                "{} nodes unreachable from the roots",
                self.entries.len() - seen.len()
            )));
        }
        Ok(())
    }
}

fn describe_parent(parent: Option<i64>) -> String {
    match parent {
        Some(pid) => format!("node {pid}"),
        None => "the root level".to_string(),
    }
}
