//! Queue of change notifications awaiting the persistence collaborator.

use uuid::Uuid;

use crate::Operation;

/// Returns a fresh operation identifier.
pub(crate) fn new_operation_id() -> String {
    Uuid::new_v4().to_string()
}

/// Records workspace mutations until the persistence collaborator drains them.
///
/// Nothing is ever dropped on its own: a deletion notice is the only trace a
/// removed subtree leaves, so the log grows until [`drain`](Self::drain).
#[derive(Debug, Default)]
pub struct OperationLog {
    pending: Vec<Operation>,
}

impl OperationLog {
    /// Creates an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends `op` to the log.
    pub fn log(&mut self, op: Operation) {
        log::debug!("{} {}", op.type_name(), op.operation_id());
        self.pending.push(op);
    }

    /// Operations logged since the last drain, oldest first.
    pub fn pending(&self) -> &[Operation] {
        &self.pending
    }

    /// Removes and returns every logged operation, oldest first.
    pub fn drain(&mut self) -> Vec<Operation> {
        std::mem::take(&mut self.pending)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
