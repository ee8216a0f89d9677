//! Google-specific pieces: OAuth for installed apps and the Tasks v1 API.

mod callback;
mod oauth;
mod tasks;

pub use oauth::{ClientSecret, GoogleOAuth, TASKS_SCOPE};
pub use tasks::GoogleTasksClient;
