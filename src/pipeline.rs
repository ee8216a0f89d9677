//! Feed → events → token → task list.

use crate::config::AppConfig;
use crate::credentials::{AuthorizationFlow, CredentialManager, CredentialStore};
use crate::error::Result;
use crate::feed::fetch_feed;
use crate::google::GoogleTasksClient;
use crate::writer::{WriteOutcome, write_events};
use caltasks_core::ics::extract_events;

/// Run one copy of the configured feed into a new task list.
///
/// Fetch, parse and authorization failures are returned as errors before any
/// task is written. Tasks API failures are reported in the outcome instead.
pub async fn run<S, F>(
    config: &AppConfig,
    http: &reqwest::Client,
    credentials: &CredentialManager<S, F>,
) -> Result<WriteOutcome>
where
    S: CredentialStore,
    F: AuthorizationFlow,
{
    let raw = fetch_feed(http, &config.feed_url).await?;

    let events = extract_events(&raw)?;
    tracing::info!(count = events.len(), "Parsed calendar events");

    let token = credentials.obtain().await?;
    let client = GoogleTasksClient::new(http.clone(), &config.tasks_api_url, token.access_token)?;

    Ok(write_events(&client, &config.task_list_title, events).await)
}
