//! Selection sets and bulk batch processing.
//!
//! A bulk action applies one field change across a selection, one mutation
//! per task, each succeeding or failing on its own. There is no multi-task
//! transaction: partial success is expected, reported per item and logged,
//! never collapsed into a single pass/fail. The selection is cleared the
//! moment the batch is dispatched, not when the outcomes are known.

use std::collections::BTreeSet;

use tracing::{debug, warn};

use crate::engine::{FieldChange, MutationEngine, MutationError};
use crate::remote::RemoteStore;
use crate::task::TaskId;

/// Ephemeral set of task ids marked for a bulk action.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SelectionSet {
    ids: BTreeSet<TaskId>,
}

impl SelectionSet {
    pub fn new() -> Self {
        SelectionSet::default()
    }

    pub fn insert(&mut self, id: TaskId) {
        self.ids.insert(id);
    }

    /// Flip membership, as a card checkbox does.
    pub fn toggle(&mut self, id: TaskId) {
        if !self.ids.remove(&id) {
            self.ids.insert(id);
        }
    }

    pub fn contains(&self, id: &TaskId) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    pub fn ids(&self) -> impl Iterator<Item = &TaskId> {
        self.ids.iter()
    }
}

impl FromIterator<TaskId> for SelectionSet {
    fn from_iter<I: IntoIterator<Item = TaskId>>(iter: I) -> Self {
        SelectionSet {
            ids: iter.into_iter().collect(),
        }
    }
}

/// Per-item outcome of one bulk dispatch.
#[derive(Debug, Default)]
pub struct BulkReport {
    pub applied: Vec<TaskId>,
    pub failed: Vec<(TaskId, MutationError)>,
    pub skipped_drafts: Vec<TaskId>,
}

impl BulkReport {
    pub fn total(&self) -> usize {
        self.applied.len() + self.failed.len() + self.skipped_drafts.len()
    }
}

/// Apply one field change across the selection.
///
/// Drafts are skipped before any remote traffic; every other id goes through
/// the optimistic engine independently, so one failure rolls back exactly
/// that task and leaves the rest applied.
pub fn apply_bulk<R: RemoteStore + ?Sized>(
    engine: &mut MutationEngine<'_, R>,
    selection: &mut SelectionSet,
    change: &FieldChange,
) -> BulkReport {
    let ids: Vec<TaskId> = selection.ids().cloned().collect();
    // Cleared at dispatch, regardless of what the outcomes turn out to be.
    selection.clear();

    let mut report = BulkReport::default();
    for id in ids {
        if id.is_draft() {
            debug!(task = %id, "bulk action skipping draft task");
            report.skipped_drafts.push(id);
            continue;
        }
        match engine.apply(&id, change) {
            Ok(()) => report.applied.push(id),
            Err(err) => {
                warn!(task = %id, error = %err, "bulk item failed");
                report.failed.push((id, err));
            }
        }
    }
    report
}
