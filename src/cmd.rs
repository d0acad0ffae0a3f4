//! Command implementations for the CLI interface.
//!
//! Each handler is a thin skin over the board engine: fetch and project the
//! remote task set, run one engine operation, print the result. The engine
//! itself never prints; everything user-facing lives here.

use clap::{CommandFactory, Subcommand};
use clap_complete::{generate, Shell};

use chrono::{Duration, Local, NaiveDate, Utc};

use crate::board::{partition, BoardView};
use crate::bulk::{apply_bulk, SelectionSet};
use crate::cli::Cli;
use crate::config::BoardConfig;
use crate::engine::{FieldChange, MoveOutcome, MutationEngine, TaskStore};
use crate::filter::TaskFilter;
use crate::projection::project_all;
use crate::remote::{FileStore, RawTask, RemoteError, RemoteStore};
use crate::reorder::{plan_move, ColumnMap, DragEvent, MovePlan};
use crate::task::{Task, TaskId, TeamMember};
use crate::vocab::UiStatus;

#[derive(Subcommand)]
pub enum Commands {
    /// Show the board: per-column ordered tasks with WIP indicators.
    Board,

    /// Move a task to a column and index, as a drag end would.
    Move {
        /// Task id to move.
        id: String,
        /// Destination column (UI status value).
        #[arg(long)]
        to: String,
        /// Destination index within the column.
        #[arg(long, default_value_t = 0)]
        at: usize,
    },

    /// Apply one field change across several tasks.
    Bulk {
        /// Task ids in the selection. May be repeated.
        #[arg(long = "id", required = true)]
        ids: Vec<String>,
        /// New status (UI vocabulary).
        #[arg(long)]
        status: Option<String>,
        /// New priority level from the configured scale.
        #[arg(long)]
        priority: Option<String>,
        /// New assignee member id.
        #[arg(long)]
        assignee: Option<String>,
        /// New sprint id.
        #[arg(long)]
        sprint: Option<String>,
        /// Remove the sprint assignment.
        #[arg(long)]
        clear_sprint: bool,
        /// Replace labels. May be repeated.
        #[arg(long = "label")]
        labels: Vec<String>,
        /// Replace watchers. May be repeated.
        #[arg(long = "watcher")]
        watchers: Vec<String>,
    },

    /// List tasks matching filter facets.
    List {
        /// Free-text search over title, description, id and location.
        #[arg(long)]
        text: Option<String>,
        /// Filter by status. May be repeated.
        #[arg(long = "status")]
        statuses: Vec<String>,
        /// Filter by priority. May be repeated.
        #[arg(long = "priority")]
        priorities: Vec<String>,
        /// Filter by assignee member id. May be repeated.
        #[arg(long = "assignee")]
        assignees: Vec<String>,
        /// Filter by label. May be repeated.
        #[arg(long = "label")]
        labels: Vec<String>,
        /// Filter by sprint id. May be repeated.
        #[arg(long = "sprint")]
        sprints: Vec<String>,
        /// Minimum story points.
        #[arg(long)]
        min_points: Option<u32>,
        /// Maximum story points.
        #[arg(long)]
        max_points: Option<u32>,
    },

    /// Add a task and persist it through the store.
    Add {
        /// Short title for the task.
        title: String,
        /// Optional longer description.
        #[arg(long)]
        desc: Option<String>,
        /// Initial status (UI vocabulary); defaults to the board's fallback.
        #[arg(long)]
        status: Option<String>,
        /// Priority level from the configured scale.
        #[arg(long)]
        priority: Option<String>,
        /// Due date: YYYY-MM-DD, "today", "tomorrow", or "in Nd".
        #[arg(long)]
        due: Option<String>,
        /// Listing location.
        #[arg(long)]
        location: Option<String>,
    },

    /// Update fields on a single task.
    Set {
        /// Task id to update.
        id: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        priority: Option<String>,
        #[arg(long)]
        assignee: Option<String>,
        #[arg(long)]
        sprint: Option<String>,
        #[arg(long)]
        clear_sprint: bool,
        /// Progress percentage 0-100.
        #[arg(long)]
        progress: Option<u8>,
        /// Replace labels. May be repeated.
        #[arg(long = "label")]
        labels: Vec<String>,
        /// Replace watchers. May be repeated.
        #[arg(long = "watcher")]
        watchers: Vec<String>,
    },

    /// Delete a task remotely and locally.
    Delete {
        /// Task id to delete.
        id: String,
    },

    /// Generate shell completion scripts.
    Completions {
        /// Shell to generate completions for.
        #[arg(value_enum)]
        shell: Shell,
    },
}

/// Fetch the remote task set and project it into a fresh cache.
fn load_store(remote: &FileStore, config: &BoardConfig) -> Result<TaskStore, RemoteError> {
    let raws = remote.fetch_tasks()?;
    Ok(TaskStore::from_tasks(project_all(
        &raws,
        &config.vocabulary,
        Utc::now(),
    )))
}

pub fn cmd_board(remote: &FileStore, config: &BoardConfig) {
    let store = match load_store(remote, config) {
        Ok(store) => store,
        Err(e) => {
            eprintln!("Failed to load board: {e}");
            return;
        }
    };
    let board = partition(store.tasks(), &config.columns);
    print_board(&board);

    let hidden = store.tasks().len() - board.visible_count();
    if hidden > 0 {
        println!("({hidden} task(s) with undeclared statuses are not shown)");
    }
}

fn print_board(board: &BoardView) {
    for column in &board.columns {
        let limit = column
            .spec
            .wip_limit
            .map(|l| format!("/{l}"))
            .unwrap_or_default();
        let flag = if column.over_limit { "  [over WIP limit]" } else { "" };
        println!(
            "== {} ({}{limit}){flag}",
            column.spec.title,
            column.tasks.len()
        );
        for (i, task) in column.tasks.iter().enumerate() {
            println!(
                "  {:<3} {:<8} {:<8} {:<12} {}",
                i,
                task.id,
                task.priority,
                task.assignee.name,
                task.title
            );
        }
    }
}

pub fn cmd_move(remote: &FileStore, config: &BoardConfig, id: String, to: String, at: usize) {
    let mut store = match load_store(remote, config) {
        Ok(store) => store,
        Err(e) => {
            eprintln!("Failed to load board: {e}");
            return;
        }
    };

    let task_id = TaskId::new(id);
    let Some(task) = store.get(&task_id).cloned() else {
        eprintln!("Task {task_id} not found");
        return;
    };
    let destination: UiStatus = to.as_str().into();
    if !config.vocabulary.contains_ui(&destination) {
        eprintln!("Unknown column '{to}'");
        return;
    }

    let board = partition(store.tasks(), &config.columns);
    let from_index = board
        .column(&task.status)
        .and_then(|c| c.tasks.iter().position(|t| t.id == task_id))
        .unwrap_or(0);
    let event = DragEvent {
        task: task_id.clone(),
        from: task.status.clone(),
        from_index,
        to: destination,
        to_index: at,
    };

    let columns = match ColumnMap::load(remote, store.tasks(), &config.vocabulary) {
        Ok(map) => map,
        Err(e) => {
            eprintln!("Failed to resolve column mapping: {e}");
            return;
        }
    };
    let plan = plan_move(&event, &board, &config.vocabulary, &columns);
    if let MovePlan::Move(mv) = &plan {
        if mv.position != at {
            println!("Clamped destination index {at} to {}", mv.position);
        }
    }

    let mut engine = MutationEngine::new(&mut store, remote, &config.vocabulary);
    match engine.execute_move(&plan) {
        Ok(MoveOutcome::Noop) => println!("Nothing to do"),
        Ok(MoveOutcome::RejectedDraft) => {
            println!("{task_id} is an unpersisted draft; not moved")
        }
        Ok(MoveOutcome::Applied { ordering_synced }) => {
            println!("Moved {task_id} to {to}[{at}]");
            if !ordering_synced {
                println!("Warning: column ordering not confirmed; it will correct on reload");
            }
        }
        Err(e) => eprintln!("Move failed and was rolled back: {e}"),
    }
}

/// Build the single field change a bulk invocation describes.
#[allow(clippy::too_many_arguments)]
fn bulk_change(
    config: &BoardConfig,
    status: Option<String>,
    priority: Option<String>,
    assignee: Option<String>,
    sprint: Option<String>,
    clear_sprint: bool,
    labels: Vec<String>,
    watchers: Vec<String>,
) -> Result<FieldChange, String> {
    let mut changes = field_changes(
        config,
        None,
        status,
        priority,
        assignee,
        sprint,
        clear_sprint,
        None,
        labels,
        watchers,
    )?;
    match changes.len() {
        0 => Err("No field change given; pass one of --status/--priority/--assignee/--sprint/--clear-sprint/--label/--watcher".into()),
        1 => Ok(changes.remove(0)),
        _ => Err("Bulk actions apply exactly one field change at a time".into()),
    }
}

/// Translate CLI flags into field changes, validating against the board
/// configuration.
#[allow(clippy::too_many_arguments)]
fn field_changes(
    config: &BoardConfig,
    title: Option<String>,
    status: Option<String>,
    priority: Option<String>,
    assignee: Option<String>,
    sprint: Option<String>,
    clear_sprint: bool,
    progress: Option<u8>,
    labels: Vec<String>,
    watchers: Vec<String>,
) -> Result<Vec<FieldChange>, String> {
    let mut changes = Vec::new();
    if let Some(title) = title {
        changes.push(FieldChange::Title(title));
    }
    if let Some(status) = status {
        let status: UiStatus = status.as_str().into();
        if !config.vocabulary.contains_ui(&status) {
            return Err(format!("Unknown status '{status}'"));
        }
        changes.push(FieldChange::Status(status));
    }
    if let Some(priority) = priority {
        if !config.priorities.contains(&priority) {
            return Err(format!(
                "Unknown priority '{priority}' (expected one of {})",
                config.priorities.levels().join(", ")
            ));
        }
        changes.push(FieldChange::Priority(priority));
    }
    if let Some(assignee) = assignee {
        let member = if assignee == "unassigned" {
            TeamMember::unassigned()
        } else {
            TeamMember {
                name: assignee.clone(),
                avatar: TeamMember::unassigned().avatar,
                id: assignee,
            }
        };
        changes.push(FieldChange::Assignee(member));
    }
    if clear_sprint {
        changes.push(FieldChange::Sprint(None));
    } else if let Some(sprint) = sprint {
        changes.push(FieldChange::Sprint(Some(sprint)));
    }
    if let Some(progress) = progress {
        if progress > 100 {
            return Err("Progress must be 0-100".into());
        }
        changes.push(FieldChange::Progress(progress));
    }
    if !labels.is_empty() {
        changes.push(FieldChange::Labels(labels));
    }
    if !watchers.is_empty() {
        changes.push(FieldChange::Watchers(watchers));
    }
    Ok(changes)
}

#[allow(clippy::too_many_arguments)]
pub fn cmd_bulk(
    remote: &FileStore,
    config: &BoardConfig,
    ids: Vec<String>,
    status: Option<String>,
    priority: Option<String>,
    assignee: Option<String>,
    sprint: Option<String>,
    clear_sprint: bool,
    labels: Vec<String>,
    watchers: Vec<String>,
) {
    let change = match bulk_change(
        config, status, priority, assignee, sprint, clear_sprint, labels, watchers,
    ) {
        Ok(change) => change,
        Err(msg) => {
            eprintln!("{msg}");
            return;
        }
    };

    let mut store = match load_store(remote, config) {
        Ok(store) => store,
        Err(e) => {
            eprintln!("Failed to load board: {e}");
            return;
        }
    };
    let mut selection: SelectionSet = ids.iter().map(|id| TaskId::new(id.clone())).collect();
    let mut engine = MutationEngine::new(&mut store, remote, &config.vocabulary);
    let report = apply_bulk(&mut engine, &mut selection, &change);

    for id in &report.applied {
        println!("{id}: applied");
    }
    for id in &report.skipped_drafts {
        println!("{id}: skipped (unpersisted draft)");
    }
    for (id, err) in &report.failed {
        println!("{id}: failed, reverted ({err})");
    }
}

#[allow(clippy::too_many_arguments)]
pub fn cmd_list(
    remote: &FileStore,
    config: &BoardConfig,
    text: Option<String>,
    statuses: Vec<String>,
    priorities: Vec<String>,
    assignees: Vec<String>,
    labels: Vec<String>,
    sprints: Vec<String>,
    min_points: Option<u32>,
    max_points: Option<u32>,
) {
    let store = match load_store(remote, config) {
        Ok(store) => store,
        Err(e) => {
            eprintln!("Failed to load board: {e}");
            return;
        }
    };
    let filter = TaskFilter {
        text,
        statuses: statuses.into_iter().map(Into::into).collect(),
        priorities,
        assignees,
        labels,
        sprints,
        min_points,
        max_points,
    };
    let matches = filter.apply(store.tasks());
    print_table(&matches);
    println!("{} task(s)", matches.len());
}

fn print_table(tasks: &[&std::sync::Arc<Task>]) {
    println!(
        "{:<10} {:<12} {:<8} {:<12} {:<11} {}",
        "ID", "Status", "Pri", "Assignee", "Due", "Title"
    );
    for task in tasks {
        println!(
            "{:<10} {:<12} {:<8} {:<12} {:<11} {}",
            task.id,
            task.status,
            task.priority,
            truncate(&task.assignee.name, 12),
            task.due,
            task.title
        );
    }
}

/// Truncate a string to a maximum width, adding ellipsis if needed.
fn truncate(s: &str, width: usize) -> String {
    if s.chars().count() <= width {
        s.to_string()
    } else {
        let mut out = String::new();
        for (i, ch) in s.chars().enumerate() {
            if i + 1 >= width {
                out.push('…');
                break;
            }
            out.push(ch);
        }
        out
    }
}

pub fn cmd_add(
    remote: &FileStore,
    config: &BoardConfig,
    title: String,
    desc: Option<String>,
    status: Option<String>,
    priority: Option<String>,
    due: Option<String>,
    location: Option<String>,
) {
    let mut store = match load_store(remote, config) {
        Ok(store) => store,
        Err(e) => {
            eprintln!("Failed to load board: {e}");
            return;
        }
    };

    let ui_status: UiStatus = status
        .map(|s| s.as_str().into())
        .unwrap_or_else(|| config.vocabulary.fallback_ui().clone());
    if !config.vocabulary.contains_ui(&ui_status) {
        eprintln!("Unknown status '{ui_status}'");
        return;
    }
    let due = match due {
        Some(raw) => match parse_due_input(&raw) {
            Some(date) => Some(date),
            None => {
                eprintln!("Could not parse due date '{raw}'");
                return;
            }
        },
        None => None,
    };

    let draft = RawTask {
        id: Some(TaskId::draft(1).0),
        title: Some(title),
        description: desc,
        status: Some(config.vocabulary.to_backend(&ui_status).0),
        priority: Some(priority.unwrap_or_else(|| config.priorities.default_level().to_string())),
        due_date: due.map(|d| d.format("%Y-%m-%d").to_string()),
        location,
        ..RawTask::default()
    };

    let mut engine = MutationEngine::new(&mut store, remote, &config.vocabulary);
    match engine.create(draft) {
        Ok(id) => println!("Created {id}"),
        Err(e) => eprintln!("Create failed: {e}"),
    }
}

#[allow(clippy::too_many_arguments)]
pub fn cmd_set(
    remote: &FileStore,
    config: &BoardConfig,
    id: String,
    title: Option<String>,
    status: Option<String>,
    priority: Option<String>,
    assignee: Option<String>,
    sprint: Option<String>,
    clear_sprint: bool,
    progress: Option<u8>,
    labels: Vec<String>,
    watchers: Vec<String>,
) {
    let changes = match field_changes(
        config, title, status, priority, assignee, sprint, clear_sprint, progress, labels,
        watchers,
    ) {
        Ok(changes) if !changes.is_empty() => changes,
        Ok(_) => {
            eprintln!("No field change given");
            return;
        }
        Err(msg) => {
            eprintln!("{msg}");
            return;
        }
    };

    let mut store = match load_store(remote, config) {
        Ok(store) => store,
        Err(e) => {
            eprintln!("Failed to load board: {e}");
            return;
        }
    };
    let task_id = TaskId::new(id);
    let mut engine = MutationEngine::new(&mut store, remote, &config.vocabulary);
    for change in &changes {
        if let Err(e) = engine.apply(&task_id, change) {
            eprintln!("Update failed and was rolled back: {e}");
            return;
        }
    }
    println!("Updated {task_id}");
}

pub fn cmd_delete(remote: &FileStore, config: &BoardConfig, id: String) {
    let mut store = match load_store(remote, config) {
        Ok(store) => store,
        Err(e) => {
            eprintln!("Failed to load board: {e}");
            return;
        }
    };
    let task_id = TaskId::new(id);
    if store.get(&task_id).is_none() {
        eprintln!("Task {task_id} not found");
        return;
    }
    let mut engine = MutationEngine::new(&mut store, remote, &config.vocabulary);
    match engine.delete(&task_id) {
        Ok(()) => println!("Deleted {task_id}"),
        Err(e) => eprintln!("Delete failed: {e}"),
    }
}

pub fn cmd_completions(shell: Shell) {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    generate(shell, &mut cmd, name, &mut std::io::stdout());
}

/// Parse human-readable due date input.
///
/// Supports "today", "tomorrow", "in Nd", and `YYYY-MM-DD`.
pub fn parse_due_input(s: &str) -> Option<NaiveDate> {
    let s = s.trim().to_lowercase();
    let today = Local::now().date_naive();

    match s.as_str() {
        "today" => return Some(today),
        "tomorrow" => return Some(today + Duration::days(1)),
        _ => {}
    }

    if let Some(rest) = s.strip_prefix("in ") {
        if let Some(nd) = rest.strip_suffix('d') {
            if let Ok(days) = nd.trim().parse::<i64>() {
                return Some(today + Duration::days(days));
            }
        }
    }

    NaiveDate::parse_from_str(&s, "%Y-%m-%d").ok()
}
