use chrono::{DateTime, Utc};
use serde::Deserialize;

/// Status reported by the scheduler for a task. Unknown strings are kept
/// verbatim rather than rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskStatus {
    Idle,
    Running,
    Other(String),
}

impl TaskStatus {
    pub fn from_wire(s: &str) -> Self {
        match s {
            "idle" => TaskStatus::Idle,
            "running" => TaskStatus::Running,
            other => TaskStatus::Other(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskState {
    /// Absent when the scheduler reported state without a status; rendered
    /// as "N/A".
    #[serde(default, deserialize_with = "deserialize_status")]
    pub status: Option<TaskStatus>,
    pub last_run_ended_at: Option<DateTime<Utc>>,
    pub last_run_error: Option<String>,
    /// Next scheduled run. Only meaningful while the task is idle.
    pub starts_at: Option<DateTime<Utc>>,
}

fn deserialize_status<'de, D>(deserializer: D) -> Result<Option<TaskStatus>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.map(|s| TaskStatus::from_wire(&s)))
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskRecord {
    pub task_id: String,
    pub task_state: Option<TaskState>,
}

/// Result of one task-list fetch. Exactly one variant is active at a time;
/// the UI renders the busy indicator, the error notice, or the table from it.
#[derive(Debug, Clone)]
pub enum FetchState {
    Loading,
    Errored(String),
    Ready(Vec<TaskRecord>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Success,
    Error,
    Info,
}

/// One user-facing message. The TUI shows the most recent one in the status
/// line; one-shot commands print it and exit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub message: String,
    pub severity: Severity,
}

impl Notification {
    pub fn new(message: impl Into<String>, severity: Severity) -> Self {
        Notification {
            message: message.into(),
            severity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_parses_known_and_unknown_values() {
        assert_eq!(TaskStatus::from_wire("idle"), TaskStatus::Idle);
        assert_eq!(TaskStatus::from_wire("running"), TaskStatus::Running);
        assert_eq!(
            TaskStatus::from_wire("draining"),
            TaskStatus::Other("draining".to_string())
        );
    }

    #[test]
    fn task_record_deserializes_with_optional_state() {
        let json = r#"{
            "taskId": "refresh_locations",
            "taskState": {
                "status": "idle",
                "lastRunEndedAt": "2024-05-01T12:00:00Z",
                "startsAt": "2024-05-01T13:00:00Z"
            }
        }"#;
        let record: TaskRecord = serde_json::from_str(json).unwrap();
        assert_eq!(record.task_id, "refresh_locations");
        let state = record.task_state.unwrap();
        assert_eq!(state.status, Some(TaskStatus::Idle));
        assert!(state.last_run_ended_at.is_some());
        assert!(state.last_run_error.is_none());
        assert!(state.starts_at.is_some());

        let bare: TaskRecord = serde_json::from_str(r#"{"taskId": "t1"}"#).unwrap();
        assert!(bare.task_state.is_none());
    }
}
