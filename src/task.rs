//! Normalised task model.
//!
//! This module defines the core `Task` struct that represents a single work item
//! after projection from the remote store, along with its owned sub-records
//! (subtasks, comments, attachments) and referenced team members.

use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::vocab::UiStatus;

/// Prefix marking a task created client-side but not yet persisted remotely.
///
/// Draft tasks must never reach a remote-mutating operation (reorder, bulk
/// action, field update) until the store has issued a real id.
pub const DRAFT_PREFIX: &str = "TEMP-";

/// Opaque task identifier as issued by the remote store.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub String);

impl TaskId {
    pub fn new(id: impl Into<String>) -> Self {
        TaskId(id.into())
    }

    /// Build a client-side draft id from a local counter.
    pub fn draft(n: u64) -> Self {
        TaskId(format!("{DRAFT_PREFIX}{n}"))
    }

    /// Whether this id denotes a client-only draft.
    pub fn is_draft(&self) -> bool {
        self.0.starts_with(DRAFT_PREFIX)
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TaskId {
    fn from(s: &str) -> Self {
        TaskId(s.to_string())
    }
}

/// A team member referenced by assignee and watcher fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TeamMember {
    pub id: String,
    pub name: String,
    pub avatar: String,
}

impl TeamMember {
    /// Sentinel record used when a task carries no assignee.
    pub fn unassigned() -> Self {
        TeamMember {
            id: "unassigned".to_string(),
            name: "Unassigned".to_string(),
            avatar: "/avatars/placeholder.png".to_string(),
        }
    }

    pub fn is_unassigned(&self) -> bool {
        self.id == "unassigned"
    }
}

/// An owned checklist item embedded in a task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Subtask {
    pub id: String,
    pub title: String,
    pub done: bool,
}

/// An owned comment embedded in a task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    pub author_id: String,
    pub body: String,
    pub posted_at: DateTime<Utc>,
}

/// An owned attachment reference embedded in a task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attachment {
    pub id: String,
    pub file_name: String,
    pub url: String,
    pub size_bytes: u64,
}

/// A fully-populated work item as the board renders it.
///
/// Every field is concrete: the projection builder fills defaults for
/// anything the remote record omits, so a task always renders in its column.
/// `status` is always a member of the configured UI vocabulary; the backend
/// status is derived from it through the vocabulary translator and never set
/// independently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub title: String,
    pub description: String,
    pub status: UiStatus,
    /// Column-local ordering key, ascending. Ties are broken by input order.
    pub position: u32,
    /// Level from the configured priority scale, treated as opaque.
    pub priority: String,
    pub assignee: TeamMember,
    pub labels: Vec<String>,
    pub sprint: Option<String>,
    pub watchers: Vec<String>,
    /// Free-text listing location, searched by the filter engine.
    pub location: String,
    pub due: NaiveDate,
    pub estimated_hours: f32,
    pub actual_hours: f32,
    /// Completion percentage, clamped to 0-100.
    pub progress: u8,
    pub story_points: u32,
    pub subtasks: Vec<Subtask>,
    pub comments: Vec<Comment>,
    pub attachments: Vec<Attachment>,
    /// Backend column marker from the last fetch, used to infer the
    /// status-to-column mapping when the store does not publish one.
    pub remote_column: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Task {
    pub fn is_draft(&self) -> bool {
        self.id.is_draft()
    }
}
