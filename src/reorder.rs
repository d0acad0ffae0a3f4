//! Drag-and-drop move planning.
//!
//! A drag end carries the dragged task plus source and destination
//! coordinates. Planning is pure: it decides between no-op, draft rejection
//! and a resolved move with a translated status, a clamped destination index
//! and a backend column id. Execution belongs to the mutation engine, which
//! stays the only writer.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::board::BoardView;
use crate::remote::{RemoteError, RemoteStore};
use crate::task::{Task, TaskId};
use crate::vocab::{BackendStatus, StatusVocabulary, UiStatus};

/// A drag-end event as reported by the board surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DragEvent {
    pub task: TaskId,
    pub from: UiStatus,
    pub from_index: usize,
    pub to: UiStatus,
    pub to_index: usize,
}

/// A fully-resolved move, ready for the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedMove {
    pub task: TaskId,
    pub from: UiStatus,
    pub to: UiStatus,
    /// Destination index, already clamped to the destination column's length
    /// after removal of the dragged task.
    pub position: usize,
    pub backend_status: BackendStatus,
    /// Backend bucket to carry on the move call. Falls back to the backend
    /// status value itself when no mapping could be resolved.
    pub backend_column: String,
}

/// Outcome of planning a drag.
#[derive(Debug, Clone, PartialEq)]
pub enum MovePlan {
    /// Dropped where it started; nothing to do.
    Noop,
    /// Draft tasks are never moved remotely.
    RejectedDraft { task: TaskId },
    Move(ResolvedMove),
}

/// Mapping from backend status to the store's column/bucket id.
///
/// The authoritative mapping comes from the store's optional endpoint. When
/// it is absent at board-load time, the mapping is inferred by sampling the
/// first task's column marker in each status bucket.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ColumnMap {
    mapping: BTreeMap<BackendStatus, String>,
    inferred: bool,
}

impl ColumnMap {
    /// Fetch the authoritative mapping, falling back to inference.
    pub fn load<R: RemoteStore + ?Sized>(
        remote: &R,
        tasks: &[Arc<Task>],
        vocab: &StatusVocabulary,
    ) -> Result<Self, RemoteError> {
        match remote.column_map()? {
            Some(mapping) => Ok(ColumnMap {
                mapping,
                inferred: false,
            }),
            None => {
                debug!("store publishes no status-to-column mapping, inferring from task markers");
                Ok(Self::infer(tasks, vocab))
            }
        }
    }

    /// Sample the first task carrying a column marker in each backend-status
    /// bucket.
    pub fn infer(tasks: &[Arc<Task>], vocab: &StatusVocabulary) -> Self {
        let mut mapping = BTreeMap::new();
        for task in tasks {
            let backend = vocab.to_backend(&task.status);
            if mapping.contains_key(&backend) {
                continue;
            }
            if let Some(column) = &task.remote_column {
                mapping.insert(backend, column.clone());
            }
        }
        ColumnMap {
            mapping,
            inferred: true,
        }
    }

    pub fn resolve(&self, status: &BackendStatus) -> Option<&str> {
        self.mapping.get(status).map(String::as_str)
    }

    pub fn is_inferred(&self) -> bool {
        self.inferred
    }
}

/// Turn a drag end into a plan.
pub fn plan_move(
    event: &DragEvent,
    board: &BoardView,
    vocab: &StatusVocabulary,
    columns: &ColumnMap,
) -> MovePlan {
    if event.from == event.to && event.from_index == event.to_index {
        return MovePlan::Noop;
    }
    if event.task.is_draft() {
        debug!(task = %event.task, "drag of draft task rejected");
        return MovePlan::RejectedDraft {
            task: event.task.clone(),
        };
    }

    let backend_status = vocab.to_backend(&event.to);
    let backend_column = columns
        .resolve(&backend_status)
        .map(str::to_string)
        .unwrap_or_else(|| backend_status.0.clone());

    // Clamp against the destination as it will look once the dragged task
    // has been lifted out of it.
    let destination_len = board.column(&event.to).map_or(0, |c| c.tasks.len());
    let len_after_removal = if event.from == event.to {
        destination_len.saturating_sub(1)
    } else {
        destination_len
    };
    let position = event.to_index.min(len_after_removal);

    MovePlan::Move(ResolvedMove {
        task: event.task.clone(),
        from: event.from.clone(),
        to: event.to.clone(),
        position,
        backend_status,
        backend_column,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::partition;
    use crate::config::BoardConfig;
    use crate::engine::{MoveOutcome, MutationEngine, TaskStore};
    use crate::testutil::{task_fixture, ScriptedStore, StoreCall};

    fn fixture() -> (BoardConfig, TaskStore) {
        let config = BoardConfig::default_board();
        let store = TaskStore::from_tasks(vec![
            task_fixture("T-1", "backlog", 0),
            task_fixture("T-2", "backlog", 1),
            task_fixture("T-3", "backlog", 2),
            task_fixture("T-4", "backlog", 3),
            task_fixture("T-9", "inProgress", 0),
        ]);
        (config, store)
    }

    fn drag(task: &str, from: &str, from_index: usize, to: &str, to_index: usize) -> DragEvent {
        DragEvent {
            task: task.into(),
            from: from.into(),
            from_index,
            to: to.into(),
            to_index,
        }
    }

    #[test]
    fn same_slot_drag_is_a_noop() {
        let (config, store) = fixture();
        let board = partition(store.tasks(), &config.columns);
        let plan = plan_move(
            &drag("T-1", "backlog", 0, "backlog", 0),
            &board,
            &config.vocabulary,
            &ColumnMap::default(),
        );
        assert_eq!(plan, MovePlan::Noop);
    }

    #[test]
    fn draft_drag_is_rejected_before_any_remote_call() {
        let config = BoardConfig::default_board();
        let mut store = TaskStore::from_tasks(vec![task_fixture("TEMP-1", "backlog", 0)]);
        let board = partition(store.tasks(), &config.columns);
        let plan = plan_move(
            &drag("TEMP-1", "backlog", 0, "inProgress", 0),
            &board,
            &config.vocabulary,
            &ColumnMap::default(),
        );
        assert!(matches!(plan, MovePlan::RejectedDraft { .. }));

        let remote = ScriptedStore::default();
        let outcome = MutationEngine::new(&mut store, &remote, &config.vocabulary)
            .execute_move(&plan)
            .unwrap();
        assert_eq!(outcome, MoveOutcome::RejectedDraft);
        assert!(remote.calls().is_empty());
    }

    #[test]
    fn destination_index_clamps_to_column_length() {
        let (config, store) = fixture();
        let board = partition(store.tasks(), &config.columns);

        // Cross-column: inProgress holds one task, index 99 clamps to 1.
        match plan_move(
            &drag("T-1", "backlog", 0, "inProgress", 99),
            &board,
            &config.vocabulary,
            &ColumnMap::default(),
        ) {
            MovePlan::Move(mv) => assert_eq!(mv.position, 1),
            other => panic!("unexpected plan {other:?}"),
        }

        // Same column: removal frees a slot first, so 4 tasks clamp to 3.
        match plan_move(
            &drag("T-1", "backlog", 0, "backlog", 99),
            &board,
            &config.vocabulary,
            &ColumnMap::default(),
        ) {
            MovePlan::Move(mv) => assert_eq!(mv.position, 3),
            other => panic!("unexpected plan {other:?}"),
        }
    }

    #[test]
    fn column_map_prefers_endpoint_over_inference() {
        let (config, store) = fixture();
        let remote = ScriptedStore::default();
        remote.set_column_map([("in_progress", "col-wip")]);

        let map = ColumnMap::load(&remote, store.tasks(), &config.vocabulary).unwrap();
        assert!(!map.is_inferred());
        assert_eq!(map.resolve(&"in_progress".into()), Some("col-wip"));
    }

    #[test]
    fn column_map_infers_from_first_task_marker_per_bucket() {
        let config = BoardConfig::default_board();
        let mut a = task_fixture("T-1", "backlog", 0);
        a.remote_column = Some("col-backlog".to_string());
        let mut b = task_fixture("T-2", "backlog", 1);
        b.remote_column = Some("col-other".to_string());
        let c = task_fixture("T-3", "inProgress", 0); // no marker
        let store = TaskStore::from_tasks(vec![a, b, c]);

        let remote = ScriptedStore::default(); // publishes no mapping
        let map = ColumnMap::load(&remote, store.tasks(), &config.vocabulary).unwrap();
        assert!(map.is_inferred());
        assert_eq!(map.resolve(&"backlog".into()), Some("col-backlog"));
        assert_eq!(map.resolve(&"in_progress".into()), None);
    }

    #[test]
    fn unresolved_column_falls_back_to_backend_status() {
        let (config, store) = fixture();
        let board = partition(store.tasks(), &config.columns);
        match plan_move(
            &drag("T-1", "backlog", 0, "onHold", 0),
            &board,
            &config.vocabulary,
            &ColumnMap::default(),
        ) {
            MovePlan::Move(mv) => {
                assert_eq!(mv.backend_status, "blocked".into());
                assert_eq!(mv.backend_column, "blocked");
            }
            other => panic!("unexpected plan {other:?}"),
        }
    }

    #[test]
    fn cross_column_drag_issues_one_update_and_one_move() {
        // Four tasks in backlog at positions 0-3; drag the one at index 2 to
        // the head of inProgress.
        let (config, mut store) = fixture();
        let board = partition(store.tasks(), &config.columns);
        let remote = ScriptedStore::default();
        remote.set_column_map([("in_progress", "col-wip")]);
        let map = ColumnMap::load(&remote, store.tasks(), &config.vocabulary).unwrap();

        let plan = plan_move(
            &drag("T-3", "backlog", 2, "inProgress", 0),
            &board,
            &config.vocabulary,
            &map,
        );
        let outcome = MutationEngine::new(&mut store, &remote, &config.vocabulary)
            .execute_move(&plan)
            .unwrap();
        assert_eq!(
            outcome,
            MoveOutcome::Applied {
                ordering_synced: true
            }
        );

        let calls = remote.calls();
        assert_eq!(calls.len(), 2, "exactly one status update and one move");
        match &calls[0] {
            StoreCall::Update { id, patch } => {
                assert_eq!(id, "T-3");
                assert_eq!(patch.status.as_deref(), Some("in_progress"));
            }
            other => panic!("unexpected first call {other:?}"),
        }
        match &calls[1] {
            StoreCall::Move {
                id,
                column,
                position,
            } => {
                assert_eq!(id, "T-3");
                assert_eq!(column, "col-wip");
                assert_eq!(*position, 0);
            }
            other => panic!("unexpected second call {other:?}"),
        }

        // Board converges: T-3 heads inProgress, backlog re-indexes 0-2.
        let board = partition(store.tasks(), &config.columns);
        let wip: Vec<&str> = board
            .column(&"inProgress".into())
            .unwrap()
            .tasks
            .iter()
            .map(|t| t.id.0.as_str())
            .collect();
        assert_eq!(wip, ["T-3", "T-9"]);

        let backlog = board.column(&"backlog".into()).unwrap();
        let ids: Vec<&str> = backlog.tasks.iter().map(|t| t.id.0.as_str()).collect();
        assert_eq!(ids, ["T-1", "T-2", "T-4"]);
        let positions: Vec<u32> = backlog.tasks.iter().map(|t| t.position).collect();
        assert_eq!(positions, [0, 1, 2]);
    }

    #[test]
    fn failed_move_call_keeps_status_but_reports_stale_ordering() {
        let (config, mut store) = fixture();
        let board = partition(store.tasks(), &config.columns);
        let remote = ScriptedStore::default();
        remote.fail_moves();

        let plan = plan_move(
            &drag("T-1", "backlog", 0, "inProgress", 0),
            &board,
            &config.vocabulary,
            &ColumnMap::default(),
        );
        let outcome = MutationEngine::new(&mut store, &remote, &config.vocabulary)
            .execute_move(&plan)
            .unwrap();
        assert_eq!(
            outcome,
            MoveOutcome::Applied {
                ordering_synced: false
            }
        );
        // Status landed, so the optimistic bucketing stays.
        assert_eq!(
            store.get(&"T-1".into()).unwrap().status,
            "inProgress".into()
        );
    }

    #[test]
    fn failed_status_update_rolls_the_whole_move_back() {
        let (config, mut store) = fixture();
        let before: Vec<_> = store.tasks().to_vec();
        let board = partition(store.tasks(), &config.columns);
        let remote = ScriptedStore::default();
        remote.fail_update("T-1");

        let plan = plan_move(
            &drag("T-1", "backlog", 0, "inProgress", 0),
            &board,
            &config.vocabulary,
            &ColumnMap::default(),
        );
        let err = MutationEngine::new(&mut store, &remote, &config.vocabulary)
            .execute_move(&plan)
            .unwrap_err();
        assert!(matches!(err, crate::engine::MutationError::Remote(_)));
        assert_eq!(store.tasks(), before.as_slice());
        assert_eq!(remote.calls().len(), 1, "move call must not follow a failed update");
    }
}
