//! Creates the task list and fills it with one task per event.

use crate::error::ApiError;
use crate::tasks::{TaskPayload, TasksApi};
use caltasks_core::Event;
use std::fmt;

/// How far the write got. API failures end the batch but are not errors of
/// the run: tasks inserted before the failure stay in place.
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOutcome {
    /// Every event became a task
    Completed { task_list_id: String, inserted: usize },
    /// The list exists, `inserted` of `total` events made it before `error`
    Aborted {
        task_list_id: String,
        inserted: usize,
        total: usize,
        error: ApiError,
    },
    /// Creating the list itself failed; nothing was written
    ListNotCreated { error: ApiError },
}

impl WriteOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, WriteOutcome::Completed { .. })
    }

    pub fn task_list_id(&self) -> Option<&str> {
        match self {
            WriteOutcome::Completed { task_list_id, .. }
            | WriteOutcome::Aborted { task_list_id, .. } => Some(task_list_id),
            WriteOutcome::ListNotCreated { .. } => None,
        }
    }

    pub fn inserted(&self) -> usize {
        match self {
            WriteOutcome::Completed { inserted, .. } | WriteOutcome::Aborted { inserted, .. } => {
                *inserted
            }
            WriteOutcome::ListNotCreated { .. } => 0,
        }
    }
}

impl fmt::Display for WriteOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WriteOutcome::Completed {
                task_list_id,
                inserted,
            } => write!(
                f,
                "Successfully created tasklist with ID: {} and added {} tasks.",
                task_list_id, inserted
            ),
            WriteOutcome::Aborted {
                task_list_id,
                inserted,
                total,
                error,
            } => write!(
                f,
                "{} (tasklist {} has {} of {} tasks)",
                error, task_list_id, inserted, total
            ),
            WriteOutcome::ListNotCreated { error } => write!(f, "{}", error),
        }
    }
}

/// Create a list titled `title` and insert `events` into it, in order.
///
/// Stops at the first API failure without rolling back.
pub async fn write_events<A>(api: &A, title: &str, events: Vec<Event>) -> WriteOutcome
where
    A: TasksApi + ?Sized,
{
    let total = events.len();

    let task_list = match api.create_task_list(title).await {
        Ok(list) => list,
        Err(error) => {
            tracing::error!(%error, "Failed to create task list");
            return WriteOutcome::ListNotCreated { error };
        }
    };
    tracing::info!(task_list_id = %task_list.id, title, "Created task list");

    let mut inserted = 0;
    for event in events {
        let payload = TaskPayload::from(event);

        match api.insert_task(&task_list.id, &payload).await {
            Ok(task) => {
                inserted += 1;
                tracing::debug!(task_id = %task.id, title = %payload.title, "Inserted task");
            }
            Err(error) => {
                tracing::error!(%error, inserted, total, "Failed to insert task, stopping");
                return WriteOutcome::Aborted {
                    task_list_id: task_list.id,
                    inserted,
                    total,
                    error,
                };
            }
        }
    }

    WriteOutcome::Completed {
        task_list_id: task_list.id,
        inserted,
    }
}
