//! Pure, composable task filtering.
//!
//! A task passes iff it satisfies every non-empty facet: the AND is
//! commutative, so evaluation order never matters, and an absent facet
//! always passes.

use std::sync::Arc;

use crate::task::Task;
use crate::vocab::UiStatus;

/// Facet constraints over the normalised task set. Empty means "all".
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskFilter {
    /// Case-insensitive substring over title, description, id and location.
    pub text: Option<String>,
    pub statuses: Vec<UiStatus>,
    pub priorities: Vec<String>,
    /// Assignee member ids.
    pub assignees: Vec<String>,
    pub labels: Vec<String>,
    pub sprints: Vec<String>,
    pub min_points: Option<u32>,
    pub max_points: Option<u32>,
}

impl TaskFilter {
    pub fn is_empty(&self) -> bool {
        self.text.as_deref().map_or(true, str::is_empty)
            && self.statuses.is_empty()
            && self.priorities.is_empty()
            && self.assignees.is_empty()
            && self.labels.is_empty()
            && self.sprints.is_empty()
            && self.min_points.is_none()
            && self.max_points.is_none()
    }

    /// The predicate itself.
    pub fn matches(&self, task: &Task) -> bool {
        if let Some(text) = self.text.as_deref().filter(|t| !t.is_empty()) {
            let needle = text.to_lowercase();
            let hit = task.title.to_lowercase().contains(&needle)
                || task.description.to_lowercase().contains(&needle)
                || task.id.0.to_lowercase().contains(&needle)
                || task.location.to_lowercase().contains(&needle);
            if !hit {
                return false;
            }
        }
        if !self.statuses.is_empty() && !self.statuses.contains(&task.status) {
            return false;
        }
        if !self.priorities.is_empty() && !self.priorities.contains(&task.priority) {
            return false;
        }
        if !self.assignees.is_empty() && !self.assignees.contains(&task.assignee.id) {
            return false;
        }
        if !self.labels.is_empty() && !self.labels.iter().any(|l| task.labels.contains(l)) {
            return false;
        }
        if !self.sprints.is_empty() {
            match &task.sprint {
                Some(sprint) if self.sprints.contains(sprint) => {}
                _ => return false,
            }
        }
        if let Some(min) = self.min_points {
            if task.story_points < min {
                return false;
            }
        }
        if let Some(max) = self.max_points {
            if task.story_points > max {
                return false;
            }
        }
        true
    }

    /// Filter a task set, preserving order.
    pub fn apply<'a>(&self, tasks: &'a [Arc<Task>]) -> Vec<&'a Arc<Task>> {
        tasks.iter().filter(|t| self.matches(t)).collect()
    }
}
