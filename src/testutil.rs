//! Shared test doubles: a scriptable in-memory remote store that records
//! every call and can be told to fail specific operations, plus a task
//! fixture builder.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, BTreeSet};

use chrono::Utc;

use crate::projection::project_task;
use crate::remote::{RawTask, RemoteError, RemoteStore, TaskPatch};
use crate::task::Task;
use crate::vocab::{BackendStatus, StatusVocabulary, UiStatus};

/// One recorded remote call.
#[derive(Debug, Clone)]
pub enum StoreCall {
    Update { id: String, patch: TaskPatch },
    Move { id: String, column: String, position: usize },
    Create { id: Option<String> },
    Delete { id: String },
}

/// In-memory `RemoteStore` for tests. Interior mutability because the trait
/// takes `&self`; the engine is single-threaded.
#[derive(Debug, Default)]
pub struct ScriptedStore {
    calls: RefCell<Vec<StoreCall>>,
    fail_updates: RefCell<BTreeSet<String>>,
    fail_moves: Cell<bool>,
    fail_creates: Cell<bool>,
    column_map: RefCell<Option<BTreeMap<BackendStatus, String>>>,
    issued: Cell<u64>,
}

impl ScriptedStore {
    pub fn calls(&self) -> Vec<StoreCall> {
        self.calls.borrow().clone()
    }

    /// Make `update_task` fail for one task id.
    pub fn fail_update(&self, id: &str) {
        self.fail_updates.borrow_mut().insert(id.to_string());
    }

    pub fn fail_moves(&self) {
        self.fail_moves.set(true);
    }

    pub fn fail_creates(&self) {
        self.fail_creates.set(true);
    }

    pub fn set_column_map<'a>(&self, entries: impl IntoIterator<Item = (&'a str, &'a str)>) {
        let map = entries
            .into_iter()
            .map(|(status, column)| (BackendStatus::from(status), column.to_string()))
            .collect();
        *self.column_map.borrow_mut() = Some(map);
    }
}

impl RemoteStore for ScriptedStore {
    fn fetch_tasks(&self) -> Result<Vec<RawTask>, RemoteError> {
        Ok(Vec::new())
    }

    fn update_task(&self, id: &str, patch: &TaskPatch) -> Result<RawTask, RemoteError> {
        self.calls.borrow_mut().push(StoreCall::Update {
            id: id.to_string(),
            patch: patch.clone(),
        });
        if self.fail_updates.borrow().contains(id) {
            return Err(RemoteError::Rejected {
                reason: format!("scripted failure for {id}"),
            });
        }
        Ok(RawTask {
            id: Some(id.to_string()),
            ..RawTask::default()
        })
    }

    fn move_task(&self, id: &str, column_id: &str, position: usize) -> Result<(), RemoteError> {
        self.calls.borrow_mut().push(StoreCall::Move {
            id: id.to_string(),
            column: column_id.to_string(),
            position,
        });
        if self.fail_moves.get() {
            return Err(RemoteError::Rejected {
                reason: "scripted move failure".to_string(),
            });
        }
        Ok(())
    }

    fn create_task(&self, draft: &RawTask) -> Result<RawTask, RemoteError> {
        self.calls.borrow_mut().push(StoreCall::Create {
            id: draft.id.clone(),
        });
        if self.fail_creates.get() {
            return Err(RemoteError::Rejected {
                reason: "scripted create failure".to_string(),
            });
        }
        let n = self.issued.get() + 1;
        self.issued.set(n);
        let mut created = draft.clone();
        created.id = Some(format!("T-{}", 100 + n));
        Ok(created)
    }

    fn delete_task(&self, id: &str) -> Result<(), RemoteError> {
        self.calls.borrow_mut().push(StoreCall::Delete {
            id: id.to_string(),
        });
        Ok(())
    }

    fn column_map(&self) -> Result<Option<BTreeMap<BackendStatus, String>>, RemoteError> {
        Ok(self.column_map.borrow().clone())
    }
}

/// A fully-populated task with the given id, UI status and position.
pub fn task_fixture(id: &str, status: &str, position: u32) -> Task {
    let raw = RawTask {
        id: Some(id.to_string()),
        title: Some(format!("Task {id}")),
        position: Some(position),
        priority: Some("medium".to_string()),
        story_points: Some(3),
        ..RawTask::default()
    };
    let mut task = project_task(&raw, &StatusVocabulary::default_board(), Utc::now(), 0);
    task.status = UiStatus::from(status);
    task
}
