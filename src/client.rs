use anyhow::{bail, Context, Result};
use reqwest::Client;
use serde::Deserialize;

use crate::models::TaskRecord;

#[derive(Deserialize)]
struct TaskListResponse {
    tasks: Vec<TaskRecord>,
}

/// HTTP client for the scheduler service's admin API.
#[derive(Clone)]
pub struct SchedulerClient {
    client: Client,
    base_url: String,
}

impl SchedulerClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        SchedulerClient {
            client: Client::new(),
            base_url: base_url.into(),
        }
    }

    /// Fetch the scheduled tasks registered by one plugin.
    pub async fn list_tasks(&self, plugin: &str) -> Result<Vec<TaskRecord>> {
        let url = format!("{}/plugins/{}/tasks", self.base_url, plugin);
        log::debug!("GET {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .with_context(|| format!("Failed to fetch tasks for plugin '{}'", plugin))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("Scheduler returned {} for plugin '{}': {}", status, plugin, body.trim());
        }

        let parsed: TaskListResponse = response
            .json()
            .await
            .with_context(|| format!("Failed to parse task list for plugin '{}'", plugin))?;

        Ok(parsed.tasks)
    }

    /// Request an immediate out-of-band run of one task. Resolves once the
    /// scheduler has accepted (or rejected) the request, not when the run
    /// finishes.
    pub async fn trigger_task(&self, plugin: &str, task_id: &str) -> Result<()> {
        let url = format!("{}/plugins/{}/tasks/{}/trigger", self.base_url, plugin, task_id);
        log::debug!("POST {}", url);

        let response = self
            .client
            .post(&url)
            .send()
            .await
            .with_context(|| format!("Failed to trigger task '{}'", task_id))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("Scheduler returned {}: {}", status, body.trim());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::TaskStatus;

    #[test]
    fn task_list_response_parses_scheduler_payload() {
        let json = r#"{
            "tasks": [
                {
                    "taskId": "t1",
                    "taskState": {
                        "status": "running",
                        "lastRunError": "boom"
                    }
                },
                { "taskId": "t2" }
            ]
        }"#;
        let parsed: TaskListResponse = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.tasks.len(), 2);
        assert_eq!(parsed.tasks[0].task_id, "t1");
        let state = parsed.tasks[0].task_state.as_ref().unwrap();
        assert_eq!(state.status, Some(TaskStatus::Running));
        assert_eq!(state.last_run_error.as_deref(), Some("boom"));
        assert!(parsed.tasks[1].task_state.is_none());
    }
}
