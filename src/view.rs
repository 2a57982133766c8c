use chrono::{DateTime, Local, Utc};

use crate::models::{FetchState, Notification, Severity, TaskRecord, TaskStatus};

pub const NOT_AVAILABLE: &str = "N/A";
pub const ERROR_GLYPH: &str = "✗";

/// What the task pane should show for the current plugin. Exactly one of
/// these is derived from the fetch state, so the busy indicator, the error
/// notice and the table can never render together.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderState {
    Loading,
    Errored(String),
    Empty(String),
    Table(Vec<TaskRow>),
}

/// Display kind of the status cell. Running is rendered with an
/// indeterminate spinner by the caller; the derivation itself is pure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StatusCell {
    Idle,
    Running,
    Other(String),
    Absent,
}

impl StatusCell {
    pub fn label(&self) -> &str {
        match self {
            StatusCell::Idle => "Idle",
            StatusCell::Running => "Running",
            StatusCell::Other(raw) => raw,
            StatusCell::Absent => NOT_AVAILABLE,
        }
    }
}

/// One fully derived table row. All fields are display-ready strings except
/// `status`, which the renderer styles (calm glyph vs. spinner).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskRow {
    pub task_id: String,
    pub failed_last_run: bool,
    pub status: StatusCell,
    pub last_run: String,
    pub next_run: String,
}

impl TaskRow {
    /// Task id cell, flagged with the error glyph whenever the last run
    /// failed, independent of the current status.
    pub fn id_cell(&self) -> String {
        if self.failed_last_run {
            format!("{} {}", ERROR_GLYPH, self.task_id)
        } else {
            self.task_id.clone()
        }
    }
}

pub fn format_local(timestamp: DateTime<Utc>) -> String {
    timestamp
        .with_timezone(&Local)
        .format("%Y-%m-%d %H:%M:%S")
        .to_string()
}

fn format_optional(timestamp: Option<DateTime<Utc>>) -> String {
    match timestamp {
        Some(ts) => format_local(ts),
        None => NOT_AVAILABLE.to_string(),
    }
}

/// Derive the display row for one task record. Deterministic, no side
/// effects.
pub fn derive_row(record: &TaskRecord) -> TaskRow {
    let state = record.task_state.as_ref();

    let status = match state.and_then(|s| s.status.as_ref()) {
        Some(TaskStatus::Idle) => StatusCell::Idle,
        Some(TaskStatus::Running) => StatusCell::Running,
        Some(TaskStatus::Other(raw)) => StatusCell::Other(raw.clone()),
        None => StatusCell::Absent,
    };

    // A next-run time is only shown for idle tasks. A running task keeps
    // "N/A" even when the scheduler reports a startsAt.
    let next_run = match (&status, state.and_then(|s| s.starts_at)) {
        (StatusCell::Idle, Some(starts_at)) => format_local(starts_at),
        _ => NOT_AVAILABLE.to_string(),
    };

    TaskRow {
        task_id: record.task_id.clone(),
        failed_last_run: state.map_or(false, |s| s.last_run_error.is_some()),
        status,
        last_run: format_optional(state.and_then(|s| s.last_run_ended_at)),
        next_run,
    }
}

/// Collapse the fetch state for `plugin` into the single pane to render.
pub fn resolve(plugin: &str, fetch: &FetchState) -> RenderState {
    match fetch {
        FetchState::Loading => RenderState::Loading,
        FetchState::Errored(message) => RenderState::Errored(message.clone()),
        FetchState::Ready(tasks) if tasks.is_empty() => {
            RenderState::Empty(format!("No tasks found for plugin '{}'", plugin))
        }
        FetchState::Ready(tasks) => RenderState::Table(tasks.iter().map(derive_row).collect()),
    }
}

/// Map the resolved outcome of one trigger invocation to its single
/// notification. Bound strictly to the invocation's own result, never to
/// state captured when the trigger was fired.
pub fn trigger_notification(task_id: &str, outcome: &Result<(), String>) -> Notification {
    match outcome {
        Ok(()) => Notification::new(
            format!("Successfully triggered task {}", task_id),
            Severity::Success,
        ),
        Err(error) => Notification::new(
            format!("Error triggering task {}: {}", task_id, error),
            Severity::Error,
        ),
    }
}
