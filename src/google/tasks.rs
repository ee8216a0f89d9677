//! Google Tasks v1 REST client.

use crate::error::{ApiError, Error, Result};
use crate::tasks::{Task, TaskList, TaskPayload, TasksApi};
use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use url::Url;

pub struct GoogleTasksClient {
    http: reqwest::Client,
    base_url: Url,
    access_token: String,
}

impl GoogleTasksClient {
    pub fn new(http: reqwest::Client, base_url: &str, access_token: String) -> Result<Self> {
        let base_url = Url::parse(base_url)
            .map_err(|e| Error::Config(format!("Invalid tasks_api_url {}: {}", base_url, e)))?;

        if base_url.cannot_be_a_base() {
            return Err(Error::Config(format!(
                "Invalid tasks_api_url {}: not a base URL",
                base_url
            )));
        }

        Ok(GoogleTasksClient {
            http,
            base_url,
            access_token,
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        // cannot_be_a_base was ruled out in new()
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn post<B, T>(&self, url: Url, body: &B) -> std::result::Result<T, ApiError>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let response = self
            .http
            .post(url)
            .bearer_auth(&self.access_token)
            .json(body)
            .send()
            .await
            .map_err(|e| ApiError::new(None, e.to_string()))?;

        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::new(Some(status.as_u16()), error_message(&body)));
        }

        response.json::<T>().await.map_err(|e| {
            ApiError::new(
                Some(status.as_u16()),
                format!("Unexpected response body: {}", e),
            )
        })
    }
}

/// Google wraps failures as `{"error": {"code": 403, "message": "..."}}`.
fn error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| body.trim().to_string())
}

#[derive(Serialize)]
struct NewTaskList<'a> {
    title: &'a str,
}

#[async_trait]
impl TasksApi for GoogleTasksClient {
    async fn create_task_list(&self, title: &str) -> std::result::Result<TaskList, ApiError> {
        let url = self.endpoint(&["users", "@me", "lists"]);
        self.post(url, &NewTaskList { title }).await
    }

    async fn insert_task(
        &self,
        task_list_id: &str,
        task: &TaskPayload,
    ) -> std::result::Result<Task, ApiError> {
        let url = self.endpoint(&["lists", task_list_id, "tasks"]);
        self.post(url, task).await
    }
}
