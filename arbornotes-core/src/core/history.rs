//! Back/forward navigation over previously selected nodes.

/// Restores the suppression flag when dropped, also on unwind.
struct Suppressed<'a> {
    history: &'a mut VisitedHistory,
    previous: bool,
}

impl Drop for Suppressed<'_> {
    fn drop(&mut self) {
        self.history.suppressed = self.previous;
    }
}

/// Linear browser-style history of visited node ids.
///
/// Entries are never validated on insert. A deleted node stays in the list
/// and is skipped when navigation reaches it.
#[derive(Debug, Clone, Default)]
pub struct VisitedHistory {
    entries: Vec<i64>,
    cursor: usize,
    suppressed: bool,
}

impl VisitedHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a selection of `id`.
    ///
    /// Drops every entry after the cursor and appends `id`. Does nothing while
    /// suppressed or when `id` is already the current entry. Returns whether
    /// the history changed.
    pub fn record_visit(&mut self, id: i64) -> bool {
        if self.suppressed || self.current() == Some(id) {
            return false;
        }
        if !self.entries.is_empty() {
            self.entries.truncate(self.cursor + 1);
        }
        self.entries.push(id);
        self.cursor = self.entries.len() - 1;
        true
    }

    /// Steps back to the closest earlier entry for which `exists` holds.
    ///
    /// Returns `None` and leaves the cursor in place when there is none.
    pub fn go_back(&mut self, exists: impl Fn(i64) -> bool) -> Option<i64> {
        let mut pos = self.cursor;
        while pos > 0 {
            pos -= 1;
            let id = self.entries[pos];
            if exists(id) {
                self.cursor = pos;
                return Some(id);
            }
            log::warn!("Skipping visited node {id}: no longer exists");
        }
        None
    }

    /// Steps forward to the closest later entry for which `exists` holds.
    ///
    /// Returns `None` and leaves the cursor in place when there is none.
    pub fn go_forward(&mut self, exists: impl Fn(i64) -> bool) -> Option<i64> {
        let mut pos = self.cursor;
        while pos + 1 < self.entries.len() {
            pos += 1;
            let id = self.entries[pos];
            if exists(id) {
                self.cursor = pos;
                return Some(id);
            }
            log::warn!("Skipping visited node {id}: no longer exists");
        }
        None
    }

    /// Runs `f` with visit recording switched off, restoring the previous
    /// state afterwards.
    pub fn with_suppressed<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        let previous = self.set_suppressed(true);
        let mut guard = Suppressed {
            history: self,
            previous,
        };
        f(&mut *guard.history)
    }

    /// Sets the suppression flag and returns its previous value.
    pub fn set_suppressed(&mut self, suppressed: bool) -> bool {
        std::mem::replace(&mut self.suppressed, suppressed)
    }

    pub fn is_suppressed(&self) -> bool {
        self.suppressed
    }

    /// The entry under the cursor.
    pub fn current(&self) -> Option<i64> {
        self.entries.get(self.cursor).copied()
    }

    pub fn entries(&self) -> &[i64] {
        &self.entries
    }

    pub fn clear(&mut self) {
        self.entries.clear();
        self.cursor = 0;
    }
}
