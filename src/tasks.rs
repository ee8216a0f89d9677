//! Task payloads and the Tasks API seam.

use crate::error::ApiError;
use async_trait::async_trait;
use caltasks_core::Event;
use caltasks_core::time::to_rfc3339;
use serde::{Deserialize, Serialize};

pub const STATUS_NEEDS_ACTION: &str = "needsAction";

/// Body of a `tasks.insert` request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TaskPayload {
    pub title: String,
    pub notes: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub due: Option<String>,
}

impl From<Event> for TaskPayload {
    /// Due is the event's end, or its start when there is no end.
    fn from(event: Event) -> Self {
        let due = event.end.as_ref().or(event.start.as_ref()).map(to_rfc3339);

        TaskPayload {
            title: event.summary.unwrap_or_default(),
            notes: event.description.unwrap_or_default(),
            status: STATUS_NEEDS_ACTION.to_string(),
            due,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct TaskList {
    pub id: String,
    #[serde(default)]
    pub title: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Task {
    pub id: String,
    #[serde(default)]
    pub title: String,
}

/// The two Tasks API operations the writer needs.
#[async_trait]
pub trait TasksApi: Send + Sync {
    async fn create_task_list(&self, title: &str) -> Result<TaskList, ApiError>;

    async fn insert_task(&self, task_list_id: &str, task: &TaskPayload) -> Result<Task, ApiError>;
}
