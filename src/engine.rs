//! The shared task cache and its single writer.
//!
//! `TaskStore` owns the normalised task collection every other component
//! reads. All mutation goes through `MutationEngine`: it applies the change
//! locally first so the board reflects it with zero latency, then issues the
//! remote call, and restores the pre-mutation snapshot verbatim if the call
//! fails. Tasks are held as `Arc<Task>`, so a snapshot is a clone of
//! references and a mutation replaces one record wholesale.
//!
//! Concurrent mutations on different tasks are independent. Mutations on the
//! same task are not serialised here; the last remote response wins. Whether
//! that is acceptable long-term is an open product question, so this module
//! deliberately adds no resolution policy.

use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;
use tracing::{debug, warn};

use crate::projection::project_task;
use crate::remote::{RawTask, RemoteError, RemoteStore, TaskPatch};
use crate::reorder::{MovePlan, ResolvedMove};
use crate::task::{Task, TaskId, TeamMember};
use crate::vocab::{StatusVocabulary, UiStatus};

/// Errors from the mutation funnel.
#[derive(Debug, Error)]
pub enum MutationError {
    #[error(transparent)]
    Remote(#[from] RemoteError),
    #[error("task {id} is a client-side draft; persist it before mutating remotely")]
    DraftTask { id: TaskId },
    #[error("task {id} is not in the local cache")]
    UnknownTask { id: TaskId },
}

/// Ticket pairing a refetch with the store generation it started against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefetchTicket(u64);

/// The cached, normalised task collection. Single source of truth for the
/// board; readers borrow it immutably and only `MutationEngine` writes.
#[derive(Debug, Default)]
pub struct TaskStore {
    tasks: Vec<Arc<Task>>,
    generation: u64,
    stale: bool,
}

impl TaskStore {
    pub fn new() -> Self {
        TaskStore::default()
    }

    pub fn from_tasks(tasks: Vec<Task>) -> Self {
        TaskStore {
            tasks: tasks.into_iter().map(Arc::new).collect(),
            generation: 0,
            stale: false,
        }
    }

    /// Replace the whole collection from a fresh fetch.
    pub fn replace_all(&mut self, tasks: Vec<Task>) {
        self.tasks = tasks.into_iter().map(Arc::new).collect();
        self.stale = false;
    }

    pub fn tasks(&self) -> &[Arc<Task>] {
        &self.tasks
    }

    pub fn get(&self, id: &TaskId) -> Option<&Arc<Task>> {
        self.tasks.iter().find(|t| &t.id == id)
    }

    /// The cache no longer reflects server-derived fields and should be
    /// refetched at the next convenient point.
    pub fn is_stale(&self) -> bool {
        self.stale
    }

    /// Start a background refetch against the current generation.
    pub fn begin_refetch(&self) -> RefetchTicket {
        RefetchTicket(self.generation)
    }

    /// Land a refetch result. Returns false (and changes nothing) when a
    /// mutation has run since the ticket was issued: a stale response must
    /// not race over an optimistic value.
    pub fn complete_refetch(&mut self, ticket: RefetchTicket, tasks: Vec<Task>) -> bool {
        if ticket.0 != self.generation {
            debug!("discarding refetch result from a cancelled generation");
            return false;
        }
        self.replace_all(tasks);
        true
    }

    fn cancel_refetches(&mut self) {
        self.generation += 1;
    }

    fn mark_stale(&mut self) {
        self.stale = true;
    }

    fn snapshot(&self) -> Vec<Arc<Task>> {
        self.tasks.clone()
    }

    fn restore(&mut self, snapshot: Vec<Arc<Task>>) {
        self.tasks = snapshot;
    }

    /// Replace the record with the same id, or append a new one.
    fn publish(&mut self, task: Task) {
        let task = Arc::new(task);
        match self.tasks.iter_mut().find(|t| t.id == task.id) {
            Some(slot) => *slot = task,
            None => self.tasks.push(task),
        }
    }

    fn remove(&mut self, id: &TaskId) {
        self.tasks.retain(|t| &t.id != id);
    }
}

/// One field-level change, as issued by detail modals, drag moves and bulk
/// actions alike.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldChange {
    Status(UiStatus),
    Priority(String),
    Assignee(TeamMember),
    Sprint(Option<String>),
    Labels(Vec<String>),
    Watchers(Vec<String>),
    Progress(u8),
    Title(String),
}

impl FieldChange {
    /// The task with this change applied; everything else is untouched.
    fn apply_to(&self, task: &Task) -> Task {
        let mut next = task.clone();
        match self {
            FieldChange::Status(status) => next.status = status.clone(),
            FieldChange::Priority(level) => next.priority = level.clone(),
            FieldChange::Assignee(member) => next.assignee = member.clone(),
            FieldChange::Sprint(sprint) => next.sprint = sprint.clone(),
            FieldChange::Labels(labels) => next.labels = labels.clone(),
            FieldChange::Watchers(watchers) => next.watchers = watchers.clone(),
            FieldChange::Progress(progress) => next.progress = (*progress).min(100),
            FieldChange::Title(title) => next.title = title.clone(),
        }
        next
    }

    /// The outbound partial payload. Status is translated here, so the
    /// persisted status is always a function of the UI status and the two
    /// can never be set independently.
    fn to_patch(&self, vocab: &StatusVocabulary) -> TaskPatch {
        let mut patch = TaskPatch::default();
        match self {
            FieldChange::Status(status) => patch.status = Some(vocab.to_backend(status).0),
            FieldChange::Priority(level) => patch.priority = Some(level.clone()),
            FieldChange::Assignee(member) => patch.assignee_id = Some(member.id.clone()),
            FieldChange::Sprint(sprint) => patch.sprint_id = Some(sprint.clone()),
            FieldChange::Labels(labels) => patch.label_ids = Some(labels.clone()),
            FieldChange::Watchers(watchers) => patch.watcher_ids = Some(watchers.clone()),
            FieldChange::Progress(progress) => patch.progress = Some(i64::from(*progress)),
            FieldChange::Title(title) => patch.title = Some(title.clone()),
        }
        patch
    }
}

/// Outcome of driving a move plan to completion.
#[derive(Debug, Clone, PartialEq)]
pub enum MoveOutcome {
    /// Source and destination were identical; nothing was issued.
    Noop,
    /// The dragged task was a draft; nothing was issued.
    RejectedDraft,
    /// Status landed remotely. `ordering_synced` is false when the follow-up
    /// move call failed; the task is bucketed correctly but the server-side
    /// ordering is stale until the next full reload.
    Applied { ordering_synced: bool },
}

/// The only writer over a `TaskStore`.
pub struct MutationEngine<'a, R: RemoteStore + ?Sized> {
    store: &'a mut TaskStore,
    remote: &'a R,
    vocab: &'a StatusVocabulary,
}

impl<'a, R: RemoteStore + ?Sized> MutationEngine<'a, R> {
    pub fn new(store: &'a mut TaskStore, remote: &'a R, vocab: &'a StatusVocabulary) -> Self {
        MutationEngine {
            store,
            remote,
            vocab,
        }
    }

    pub fn store(&self) -> &TaskStore {
        &*self.store
    }

    /// Apply one field change optimistically.
    ///
    /// Rollback is all-or-nothing: on remote failure the visible state after
    /// settlement equals the pre-mutation state exactly.
    pub fn apply(&mut self, id: &TaskId, change: &FieldChange) -> Result<(), MutationError> {
        if id.is_draft() {
            debug!(task = %id, "skipping remote mutation for draft task");
            return Err(MutationError::DraftTask { id: id.clone() });
        }
        let current = self
            .store
            .get(id)
            .cloned()
            .ok_or_else(|| MutationError::UnknownTask { id: id.clone() })?;

        self.store.cancel_refetches();
        let snapshot = self.store.snapshot();
        self.store.publish(change.apply_to(&current));

        match self.remote.update_task(&id.0, &change.to_patch(self.vocab)) {
            Ok(_) => {
                self.store.mark_stale();
                Ok(())
            }
            Err(err) => {
                self.store.restore(snapshot);
                Err(err.into())
            }
        }
    }

    /// Drive a resolved move plan: optimistic re-bucketing and renumbering,
    /// then the status update and the move call.
    ///
    /// The two remote calls are independent by contract. A failed status
    /// update rolls everything back; a failed move call after a successful
    /// status update is logged and accepted, since the next full reload
    /// corrects the ordering and a retry could duplicate side effects.
    pub fn execute_move(&mut self, plan: &MovePlan) -> Result<MoveOutcome, MutationError> {
        let mv = match plan {
            MovePlan::Noop => return Ok(MoveOutcome::Noop),
            MovePlan::RejectedDraft { task } => {
                debug!(task = %task, "ignoring drag of a draft task");
                return Ok(MoveOutcome::RejectedDraft);
            }
            MovePlan::Move(mv) => mv,
        };

        let moved = self
            .store
            .get(&mv.task)
            .cloned()
            .ok_or_else(|| MutationError::UnknownTask {
                id: mv.task.clone(),
            })?;

        self.store.cancel_refetches();
        let snapshot = self.store.snapshot();
        self.apply_move_locally(&moved, mv);

        let patch = FieldChange::Status(mv.to.clone()).to_patch(self.vocab);
        if let Err(err) = self.remote.update_task(&mv.task.0, &patch) {
            self.store.restore(snapshot);
            return Err(err.into());
        }

        let ordering_synced =
            match self
                .remote
                .move_task(&mv.task.0, &mv.backend_column, mv.position)
            {
                Ok(()) => true,
                Err(err) => {
                    warn!(
                        task = %mv.task,
                        column = %mv.backend_column,
                        position = mv.position,
                        error = %err,
                        "move call failed after status update; ordering stale until reload"
                    );
                    false
                }
            };

        self.store.mark_stale();
        Ok(MoveOutcome::Applied { ordering_synced })
    }

    /// Persist a client-side draft. The draft becomes visible immediately
    /// under its `TEMP-` id and is replaced wholesale by the server record
    /// once the store acknowledges it.
    pub fn create(&mut self, draft: RawTask) -> Result<TaskId, MutationError> {
        let now = Utc::now();
        let local = project_task(&draft, self.vocab, now, self.store.tasks().len());
        let draft_id = local.id.clone();

        self.store.cancel_refetches();
        self.store.publish(local);

        match self.remote.create_task(&draft) {
            Ok(created) => {
                let persisted = project_task(&created, self.vocab, now, 0);
                let id = persisted.id.clone();
                self.store.remove(&draft_id);
                self.store.publish(persisted);
                self.store.mark_stale();
                Ok(id)
            }
            Err(err) => {
                self.store.remove(&draft_id);
                Err(err.into())
            }
        }
    }

    /// Delete a task remotely and drop it from every column. Draft tasks are
    /// dropped locally without any remote call.
    pub fn delete(&mut self, id: &TaskId) -> Result<(), MutationError> {
        if id.is_draft() {
            self.store.cancel_refetches();
            self.store.remove(id);
            return Ok(());
        }

        self.store.cancel_refetches();
        let snapshot = self.store.snapshot();
        self.store.remove(id);
        match self.remote.delete_task(&id.0) {
            Ok(()) => {
                self.store.mark_stale();
                Ok(())
            }
            Err(err) => {
                self.store.restore(snapshot);
                Err(err.into())
            }
        }
    }

    /// Renumber both affected columns around the moved task.
    fn apply_move_locally(&mut self, moved: &Arc<Task>, mv: &ResolvedMove) {
        let mut destination: Vec<Arc<Task>> = self
            .store
            .tasks()
            .iter()
            .filter(|t| t.status == mv.to && t.id != mv.task)
            .cloned()
            .collect();
        destination.sort_by_key(|t| t.position);

        let mut relocated = (**moved).clone();
        relocated.status = mv.to.clone();
        let at = mv.position.min(destination.len());
        destination.insert(at, Arc::new(relocated));

        for (ord, task) in destination.into_iter().enumerate() {
            if task.position != ord as u32 || task.id == mv.task {
                let mut renumbered = (*task).clone();
                renumbered.position = ord as u32;
                self.store.publish(renumbered);
            }
        }

        if mv.from != mv.to {
            let mut source: Vec<Arc<Task>> = self
                .store
                .tasks()
                .iter()
                .filter(|t| t.status == mv.from)
                .cloned()
                .collect();
            source.sort_by_key(|t| t.position);
            for (ord, task) in source.into_iter().enumerate() {
                if task.position != ord as u32 {
                    let mut renumbered = (*task).clone();
                    renumbered.position = ord as u32;
                    self.store.publish(renumbered);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{task_fixture, ScriptedStore, StoreCall};

    fn vocab() -> StatusVocabulary {
        StatusVocabulary::default_board()
    }

    fn seeded_store() -> TaskStore {
        TaskStore::from_tasks(vec![
            task_fixture("T-1", "backlog", 0),
            task_fixture("T-2", "backlog", 1),
            task_fixture("T-3", "inProgress", 0),
        ])
    }

    #[test]
    fn apply_publishes_immediately_and_marks_stale() {
        let mut store = seeded_store();
        let remote = ScriptedStore::default();
        let vocab = vocab();
        let mut engine = MutationEngine::new(&mut store, &remote, &vocab);

        engine
            .apply(&"T-1".into(), &FieldChange::Priority("highest".into()))
            .unwrap();

        assert_eq!(store.get(&"T-1".into()).unwrap().priority, "highest");
        assert!(store.is_stale());
        assert_eq!(remote.calls().len(), 1);
    }

    #[test]
    fn failed_mutation_rolls_back_verbatim() {
        let mut store = seeded_store();
        let before: Vec<Task> = store.tasks().iter().map(|t| (**t).clone()).collect();
        let remote = ScriptedStore::default();
        remote.fail_update("T-2");
        let vocab = vocab();
        let mut engine = MutationEngine::new(&mut store, &remote, &vocab);

        let err = engine
            .apply(&"T-2".into(), &FieldChange::Progress(80))
            .unwrap_err();
        assert!(matches!(err, MutationError::Remote(_)));

        let after: Vec<Task> = store.tasks().iter().map(|t| (**t).clone()).collect();
        assert_eq!(after, before, "rollback must restore pre-mutation state exactly");
        assert!(!store.is_stale());
    }

    #[test]
    fn draft_mutation_issues_zero_remote_calls() {
        let mut store = TaskStore::from_tasks(vec![task_fixture("TEMP-1", "backlog", 0)]);
        let remote = ScriptedStore::default();
        let vocab = vocab();
        let mut engine = MutationEngine::new(&mut store, &remote, &vocab);

        let err = engine
            .apply(&"TEMP-1".into(), &FieldChange::Title("renamed".into()))
            .unwrap_err();
        assert!(matches!(err, MutationError::DraftTask { .. }));
        assert!(remote.calls().is_empty());
    }

    #[test]
    fn status_patch_carries_translated_backend_value() {
        let mut store = seeded_store();
        let remote = ScriptedStore::default();
        let vocab = vocab();
        let mut engine = MutationEngine::new(&mut store, &remote, &vocab);

        engine
            .apply(&"T-1".into(), &FieldChange::Status("onHold".into()))
            .unwrap();

        match &remote.calls()[0] {
            StoreCall::Update { id, patch } => {
                assert_eq!(id, "T-1");
                assert_eq!(patch.status.as_deref(), Some("blocked"));
            }
            other => panic!("unexpected call {other:?}"),
        }
    }

    #[test]
    fn mutation_cancels_in_flight_refetch() {
        let mut store = seeded_store();
        let ticket = store.begin_refetch();
        let remote = ScriptedStore::default();
        let vocab = vocab();

        MutationEngine::new(&mut store, &remote, &vocab)
            .apply(&"T-1".into(), &FieldChange::Progress(50))
            .unwrap();

        // The refetch started before the mutation; its (stale) payload must
        // not overwrite the optimistic value.
        let landed = store.complete_refetch(ticket, vec![task_fixture("T-1", "backlog", 0)]);
        assert!(!landed);
        assert_eq!(store.get(&"T-1".into()).unwrap().progress, 50);

        let fresh = store.begin_refetch();
        assert!(store.complete_refetch(fresh, vec![task_fixture("T-9", "backlog", 0)]));
        assert!(store.get(&"T-9".into()).is_some());
    }

    #[test]
    fn create_swaps_draft_for_server_record() {
        let mut store = TaskStore::new();
        let remote = ScriptedStore::default();
        let vocab = vocab();
        let mut engine = MutationEngine::new(&mut store, &remote, &vocab);

        let draft = RawTask {
            id: Some("TEMP-1".to_string()),
            title: Some("new listing shoot".to_string()),
            status: Some("backlog".to_string()),
            ..RawTask::default()
        };
        let id = engine.create(draft).unwrap();

        assert!(!id.is_draft());
        assert!(store.get(&"TEMP-1".into()).is_none());
        assert_eq!(store.get(&id).unwrap().title, "new listing shoot");
    }

    #[test]
    fn failed_create_removes_the_draft() {
        let mut store = TaskStore::new();
        let remote = ScriptedStore::default();
        remote.fail_creates();
        let vocab = vocab();
        let mut engine = MutationEngine::new(&mut store, &remote, &vocab);

        let draft = RawTask {
            id: Some("TEMP-1".to_string()),
            ..RawTask::default()
        };
        assert!(engine.create(draft).is_err());
        assert!(store.tasks().is_empty());
    }

    #[test]
    fn delete_of_draft_is_local_only() {
        let mut store = TaskStore::from_tasks(vec![task_fixture("TEMP-4", "backlog", 0)]);
        let remote = ScriptedStore::default();
        let vocab = vocab();
        MutationEngine::new(&mut store, &remote, &vocab)
            .delete(&"TEMP-4".into())
            .unwrap();
        assert!(store.tasks().is_empty());
        assert!(remote.calls().is_empty());
    }
}
