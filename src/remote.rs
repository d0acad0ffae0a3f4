//! Remote task store contract and the file-backed implementation.
//!
//! The engine only ever talks to the store through the `RemoteStore` trait,
//! which mirrors the REST surface of the task service: fetch, partial field
//! update, move/reorder, create and delete, plus the optional
//! status-to-column mapping endpoint. Transport records arrive with every
//! field optional; the projection builder is responsible for filling
//! defaults, so nothing here validates shape.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::vocab::BackendStatus;

/// Errors surfaced by remote store operations.
///
/// Nothing here is fatal: a failed mutation is rolled back by the caller and
/// retried by the user, never by the engine.
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("store I/O failed: {0}")]
    Io(#[from] std::io::Error),
    #[error("store payload malformed: {0}")]
    Payload(#[from] serde_json::Error),
    #[error("task {id} not found in remote store")]
    NotFound { id: String },
    #[error("remote store rejected the mutation: {reason}")]
    Rejected { reason: String },
}

/// A team member reference in transport shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawMember {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub avatar_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawSubtask {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub done: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawComment {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub author_id: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub posted_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawAttachment {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub file_name: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub size_bytes: Option<u64>,
}

/// A task record exactly as the remote store returns it.
///
/// Every field is optional; upstream omits whatever it likes and the board
/// must still render the task.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawTask {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Backend vocabulary value.
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub position: Option<u32>,
    #[serde(default)]
    pub priority: Option<String>,
    #[serde(default)]
    pub assignee: Option<RawMember>,
    #[serde(default)]
    pub label_ids: Vec<String>,
    #[serde(default)]
    pub sprint_id: Option<String>,
    #[serde(default)]
    pub watcher_ids: Vec<String>,
    #[serde(default)]
    pub location: Option<String>,
    /// ISO `YYYY-MM-DD`.
    #[serde(default)]
    pub due_date: Option<String>,
    #[serde(default)]
    pub estimated_hours: Option<f32>,
    #[serde(default)]
    pub actual_hours: Option<f32>,
    #[serde(default)]
    pub progress: Option<i64>,
    #[serde(default)]
    pub story_points: Option<u32>,
    #[serde(default)]
    pub subtasks: Vec<RawSubtask>,
    #[serde(default)]
    pub comments: Vec<RawComment>,
    #[serde(default)]
    pub attachments: Vec<RawAttachment>,
    /// Backend column/bucket marker.
    #[serde(default)]
    pub column_id: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Partial field payload for `PUT /tasks/{id}`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskPatch {
    /// Backend vocabulary value, translated before it gets here.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub priority: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assignee_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sprint_id: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub label_ids: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub watcher_ids: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due_date: Option<String>,
}

impl TaskPatch {
    /// Apply this patch to a raw record, as the server would.
    pub fn apply_to(&self, raw: &mut RawTask) {
        if let Some(status) = &self.status {
            raw.status = Some(status.clone());
        }
        if let Some(position) = self.position {
            raw.position = Some(position);
        }
        if let Some(priority) = &self.priority {
            raw.priority = Some(priority.clone());
        }
        if let Some(assignee_id) = &self.assignee_id {
            raw.assignee = Some(RawMember {
                id: Some(assignee_id.clone()),
                ..raw.assignee.clone().unwrap_or_default()
            });
        }
        if let Some(sprint_id) = &self.sprint_id {
            raw.sprint_id = sprint_id.clone();
        }
        if let Some(label_ids) = &self.label_ids {
            raw.label_ids = label_ids.clone();
        }
        if let Some(watcher_ids) = &self.watcher_ids {
            raw.watcher_ids = watcher_ids.clone();
        }
        if let Some(progress) = self.progress {
            raw.progress = Some(progress);
        }
        if let Some(title) = &self.title {
            raw.title = Some(title.clone());
        }
        if let Some(description) = &self.description {
            raw.description = Some(description.clone());
        }
        if let Some(due_date) = &self.due_date {
            raw.due_date = Some(due_date.clone());
        }
    }
}

/// Minimal contract the board engine depends on.
pub trait RemoteStore {
    /// `GET /tasks`.
    fn fetch_tasks(&self) -> Result<Vec<RawTask>, RemoteError>;

    /// `PUT /tasks/{id}` with a partial payload; returns the updated record.
    fn update_task(&self, id: &str, patch: &TaskPatch) -> Result<RawTask, RemoteError>;

    /// `POST /tasks/{id}/move` with a target bucket and position.
    fn move_task(&self, id: &str, column_id: &str, position: usize) -> Result<(), RemoteError>;

    /// `POST /tasks`; returns the created record with a server-issued id.
    fn create_task(&self, draft: &RawTask) -> Result<RawTask, RemoteError>;

    /// `DELETE /tasks/{id}`.
    fn delete_task(&self, id: &str) -> Result<(), RemoteError>;

    /// Optional status-to-column mapping endpoint. `Ok(None)` means the
    /// store does not publish one and callers must infer it.
    fn column_map(&self) -> Result<Option<BTreeMap<BackendStatus, String>>, RemoteError>;
}

/// On-disk shape of a file-backed board.
#[derive(Debug, Default, Serialize, Deserialize)]
struct BoardFile {
    tasks: Vec<RawTask>,
    #[serde(default)]
    status_to_column: Option<BTreeMap<String, String>>,
}

/// JSON-file implementation of the store contract.
///
/// Stands in for the task service in local use and keeps the same failure
/// surface: every operation loads, mutates and atomically rewrites the file.
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileStore { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load_file(&self) -> Result<BoardFile, RemoteError> {
        if !self.path.exists() {
            return Ok(BoardFile::default());
        }
        let mut buf = String::new();
        File::open(&self.path)?.read_to_string(&mut buf)?;
        Ok(serde_json::from_str(&buf)?)
    }

    /// Atomic-ish write via temp + rename.
    fn save_file(&self, board: &BoardFile) -> Result<(), RemoteError> {
        let tmp = self.path.with_extension("json.tmp");
        let data = serde_json::to_string_pretty(board)?;
        let mut f = File::create(&tmp)?;
        f.write_all(data.as_bytes())?;
        f.flush()?;
        fs::rename(tmp, &self.path)?;
        Ok(())
    }

    fn next_id(board: &BoardFile) -> String {
        let max = board
            .tasks
            .iter()
            .filter_map(|t| t.id.as_deref())
            .filter_map(|id| id.strip_prefix("T-"))
            .filter_map(|n| n.parse::<u64>().ok())
            .max()
            .unwrap_or(0);
        format!("T-{}", max + 1)
    }
}

impl RemoteStore for FileStore {
    fn fetch_tasks(&self) -> Result<Vec<RawTask>, RemoteError> {
        Ok(self.load_file()?.tasks)
    }

    fn update_task(&self, id: &str, patch: &TaskPatch) -> Result<RawTask, RemoteError> {
        let mut board = self.load_file()?;
        let task = board
            .tasks
            .iter_mut()
            .find(|t| t.id.as_deref() == Some(id))
            .ok_or_else(|| RemoteError::NotFound { id: id.to_string() })?;
        patch.apply_to(task);
        task.updated_at = Some(Utc::now());
        let updated = task.clone();
        self.save_file(&board)?;
        Ok(updated)
    }

    fn move_task(&self, id: &str, column_id: &str, position: usize) -> Result<(), RemoteError> {
        let mut board = self.load_file()?;
        let moved_idx = board
            .tasks
            .iter()
            .position(|t| t.id.as_deref() == Some(id))
            .ok_or_else(|| RemoteError::NotFound { id: id.to_string() })?;

        board.tasks[moved_idx].column_id = Some(column_id.to_string());

        // Re-sequence the target bucket with the moved task spliced in at
        // the requested position.
        let mut bucket: Vec<usize> = board
            .tasks
            .iter()
            .enumerate()
            .filter(|(i, t)| *i != moved_idx && t.column_id.as_deref() == Some(column_id))
            .map(|(i, _)| i)
            .collect();
        bucket.sort_by_key(|&i| board.tasks[i].position.unwrap_or(u32::MAX));
        let at = position.min(bucket.len());
        bucket.insert(at, moved_idx);
        for (ord, idx) in bucket.into_iter().enumerate() {
            board.tasks[idx].position = Some(ord as u32);
        }

        board.tasks[moved_idx].updated_at = Some(Utc::now());
        self.save_file(&board)
    }

    fn create_task(&self, draft: &RawTask) -> Result<RawTask, RemoteError> {
        let mut board = self.load_file()?;
        let mut created = draft.clone();
        created.id = Some(Self::next_id(&board));
        let now = Utc::now();
        created.created_at = Some(now);
        created.updated_at = Some(now);
        board.tasks.push(created.clone());
        self.save_file(&board)?;
        Ok(created)
    }

    fn delete_task(&self, id: &str) -> Result<(), RemoteError> {
        let mut board = self.load_file()?;
        let before = board.tasks.len();
        board.tasks.retain(|t| t.id.as_deref() != Some(id));
        if board.tasks.len() == before {
            return Err(RemoteError::NotFound { id: id.to_string() });
        }
        self.save_file(&board)
    }

    fn column_map(&self) -> Result<Option<BTreeMap<BackendStatus, String>>, RemoteError> {
        let board = self.load_file()?;
        Ok(board.status_to_column.map(|m| {
            m.into_iter()
                .map(|(status, column)| (BackendStatus(status), column))
                .collect()
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_in(dir: &std::path::Path) -> FileStore {
        FileStore::new(dir.join("board.json"))
    }

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("taskboard-remote-{name}-{}", std::process::id()));
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn raw(id: &str, status: &str, column: &str, position: u32) -> RawTask {
        RawTask {
            id: Some(id.to_string()),
            title: Some(format!("task {id}")),
            status: Some(status.to_string()),
            column_id: Some(column.to_string()),
            position: Some(position),
            ..RawTask::default()
        }
    }

    #[test]
    fn missing_file_reads_as_empty_board() {
        let store = FileStore::new("/nonexistent/taskboard/board.json");
        assert!(store.fetch_tasks().unwrap().is_empty());
        assert!(store.column_map().unwrap().is_none());
    }

    #[test]
    fn create_update_delete_round_trip() {
        let dir = temp_dir("crud");
        let store = store_in(&dir);

        let created = store
            .create_task(&raw("TEMP-1", "backlog", "col-1", 0))
            .unwrap();
        let id = created.id.clone().unwrap();
        assert!(id.starts_with("T-"), "server must issue a real id");

        let patch = TaskPatch {
            priority: Some("high".to_string()),
            ..TaskPatch::default()
        };
        let updated = store.update_task(&id, &patch).unwrap();
        assert_eq!(updated.priority.as_deref(), Some("high"));

        store.delete_task(&id).unwrap();
        assert!(store.fetch_tasks().unwrap().is_empty());
        assert!(matches!(
            store.delete_task(&id),
            Err(RemoteError::NotFound { .. })
        ));
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn move_resequences_target_bucket() {
        let dir = temp_dir("move");
        let store = store_in(&dir);
        for t in [
            raw("T-1", "in_progress", "col-wip", 0),
            raw("T-2", "in_progress", "col-wip", 1),
            raw("T-3", "backlog", "col-backlog", 0),
        ] {
            let mut board = store.load_file().unwrap();
            board.tasks.push(t);
            store.save_file(&board).unwrap();
        }

        store.move_task("T-3", "col-wip", 1).unwrap();
        let tasks = store.fetch_tasks().unwrap();
        let pos = |id: &str| {
            tasks
                .iter()
                .find(|t| t.id.as_deref() == Some(id))
                .and_then(|t| t.position)
                .unwrap()
        };
        let col = |id: &str| {
            tasks
                .iter()
                .find(|t| t.id.as_deref() == Some(id))
                .and_then(|t| t.column_id.clone())
                .unwrap()
        };
        assert_eq!(col("T-3"), "col-wip");
        assert_eq!(pos("T-1"), 0);
        assert_eq!(pos("T-3"), 1);
        assert_eq!(pos("T-2"), 2);
        fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn move_clamps_out_of_range_position() {
        let dir = temp_dir("clamp");
        let store = store_in(&dir);
        let mut board = BoardFile::default();
        board.tasks.push(raw("T-1", "backlog", "col-a", 0));
        board.tasks.push(raw("T-2", "backlog", "col-b", 0));
        store.save_file(&board).unwrap();

        store.move_task("T-1", "col-b", 99).unwrap();
        let tasks = store.fetch_tasks().unwrap();
        let moved = tasks
            .iter()
            .find(|t| t.id.as_deref() == Some("T-1"))
            .unwrap();
        assert_eq!(moved.position, Some(1));
        fs::remove_dir_all(&dir).ok();
    }
}
