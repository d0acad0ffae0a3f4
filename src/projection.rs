//! Projection of raw remote records into normalised tasks.
//!
//! The remote store omits fields freely, so every optional field has a
//! specified default here: numerics to 0, collections to empty, the assignee
//! to the unassigned sentinel, dates to "now". Projection never fails; a
//! half-missing record still has to render in its column.

use chrono::{DateTime, NaiveDate, Utc};

use crate::remote::{RawAttachment, RawComment, RawSubtask, RawTask};
use crate::task::{Attachment, Comment, Subtask, Task, TaskId, TeamMember};
use crate::vocab::{BackendStatus, StatusVocabulary};

/// Project a whole fetch result. Records without an id are given a draft id
/// from their row number so they stay addressable locally.
pub fn project_all(
    raws: &[RawTask],
    vocab: &StatusVocabulary,
    now: DateTime<Utc>,
) -> Vec<Task> {
    raws.iter()
        .enumerate()
        .map(|(row, raw)| project_task(raw, vocab, now, row))
        .collect()
}

/// Project one raw record into a fully-populated task.
///
/// `row` disambiguates the fallback id for records the store returned
/// without one.
pub fn project_task(
    raw: &RawTask,
    vocab: &StatusVocabulary,
    now: DateTime<Utc>,
    row: usize,
) -> Task {
    let id = match &raw.id {
        Some(id) => TaskId::new(id.clone()),
        None => TaskId::new(format!("{}row{row}", crate::task::DRAFT_PREFIX)),
    };

    // An absent or unknown backend status degrades through the vocabulary
    // fallback rather than failing.
    let status = match &raw.status {
        Some(s) => vocab.to_ui(&BackendStatus::new(s.clone())),
        None => vocab.fallback_ui().clone(),
    };

    Task {
        id,
        title: raw.title.clone().unwrap_or_default(),
        description: raw.description.clone().unwrap_or_default(),
        status,
        position: raw.position.unwrap_or(0),
        priority: raw.priority.clone().unwrap_or_default(),
        assignee: project_member(raw.assignee.as_ref()),
        labels: raw.label_ids.clone(),
        sprint: raw.sprint_id.clone(),
        watchers: raw.watcher_ids.clone(),
        location: raw.location.clone().unwrap_or_default(),
        due: project_due(raw.due_date.as_deref(), now),
        estimated_hours: raw.estimated_hours.unwrap_or(0.0),
        actual_hours: raw.actual_hours.unwrap_or(0.0),
        progress: raw.progress.unwrap_or(0).clamp(0, 100) as u8,
        story_points: raw.story_points.unwrap_or(0),
        subtasks: raw.subtasks.iter().map(project_subtask).collect(),
        comments: raw
            .comments
            .iter()
            .map(|c| project_comment(c, now))
            .collect(),
        attachments: raw.attachments.iter().map(project_attachment).collect(),
        remote_column: raw.column_id.clone(),
        created_at: raw.created_at.unwrap_or(now),
        updated_at: raw.updated_at.unwrap_or(now),
    }
}

fn project_member(raw: Option<&crate::remote::RawMember>) -> TeamMember {
    match raw {
        Some(m) => {
            let fallback = TeamMember::unassigned();
            TeamMember {
                id: m.id.clone().unwrap_or(fallback.id),
                name: m.name.clone().unwrap_or(fallback.name),
                avatar: m.avatar_url.clone().unwrap_or(fallback.avatar),
            }
        }
        None => TeamMember::unassigned(),
    }
}

fn project_due(raw: Option<&str>, now: DateTime<Utc>) -> NaiveDate {
    raw.and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok())
        .unwrap_or_else(|| now.date_naive())
}

fn project_subtask(raw: &RawSubtask) -> Subtask {
    Subtask {
        id: raw.id.clone().unwrap_or_default(),
        title: raw.title.clone().unwrap_or_default(),
        done: raw.done.unwrap_or(false),
    }
}

fn project_comment(raw: &RawComment, now: DateTime<Utc>) -> Comment {
    Comment {
        id: raw.id.clone().unwrap_or_default(),
        author_id: raw.author_id.clone().unwrap_or_default(),
        body: raw.body.clone().unwrap_or_default(),
        posted_at: raw.posted_at.unwrap_or(now),
    }
}

fn project_attachment(raw: &RawAttachment) -> Attachment {
    Attachment {
        id: raw.id.clone().unwrap_or_default(),
        file_name: raw.file_name.clone().unwrap_or_default(),
        url: raw.url.clone().unwrap_or_default(),
        size_bytes: raw.size_bytes.unwrap_or(0),
    }
}
