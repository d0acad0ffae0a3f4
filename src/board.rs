//! Column partitioning.
//!
//! Groups the normalised task set into ordered per-column lists keyed by UI
//! status. A task whose status matches no declared column lands in no column
//! at all; it stays in the full dataset, so the omission is observable
//! rather than silent loss. WIP-limit overflow only raises a flag.

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::ColumnSpec;
use crate::task::Task;
use crate::vocab::UiStatus;

/// One rendered column: its declaration plus the ordered tasks in it.
#[derive(Debug, Clone)]
pub struct ColumnView {
    pub spec: ColumnSpec,
    pub tasks: Vec<Arc<Task>>,
    /// Advisory: the declared WIP limit is exceeded. Never blocks a move.
    pub over_limit: bool,
}

/// The full board as derived from one task set.
#[derive(Debug, Clone, Default)]
pub struct BoardView {
    pub columns: Vec<ColumnView>,
}

impl BoardView {
    pub fn column(&self, status: &UiStatus) -> Option<&ColumnView> {
        self.columns.iter().find(|c| &c.spec.status == status)
    }

    /// Total number of tasks visible on the board (excludes tasks whose
    /// status matches no declared column).
    pub fn visible_count(&self) -> usize {
        self.columns.iter().map(|c| c.tasks.len()).sum()
    }
}

/// Partition a task set across the declared columns.
///
/// Ordering within a column is by `position` ascending; the sort is stable,
/// so position ties keep their input order.
pub fn partition(tasks: &[Arc<Task>], columns: &[ColumnSpec]) -> BoardView {
    let index: HashMap<&UiStatus, usize> = columns
        .iter()
        .enumerate()
        .map(|(i, c)| (&c.status, i))
        .collect();

    let mut buckets: Vec<Vec<Arc<Task>>> = vec![Vec::new(); columns.len()];
    for task in tasks {
        if let Some(&i) = index.get(&task.status) {
            buckets[i].push(Arc::clone(task));
        }
    }

    let views = columns
        .iter()
        .zip(buckets)
        .map(|(spec, mut bucket)| {
            bucket.sort_by_key(|t| t.position);
            let over_limit = spec.wip_limit.is_some_and(|limit| bucket.len() > limit);
            ColumnView {
                spec: spec.clone(),
                tasks: bucket,
                over_limit,
            }
        })
        .collect();

    BoardView { columns: views }
}
