//! App configuration.
//!
//! Read from `--config <PATH>` or, by default:
//!   ~/.config/caltasks/config.toml
//!
//! The OAuth client secret and the cached token live next to the config file
//! unless it points elsewhere (relative paths resolve against the config
//! file's directory):
//!   ~/.config/caltasks/credentials.json
//!   ~/.config/caltasks/token.json

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const DEFAULT_TASK_LIST_TITLE: &str = "New Tasklist from ICS Events";
pub const DEFAULT_TASKS_API_URL: &str = "https://tasks.googleapis.com/tasks/v1";

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// The iCalendar feed to copy
    pub feed_url: String,

    /// Title of the task list created on every run
    #[serde(default = "default_task_list_title")]
    pub task_list_title: String,

    /// OAuth client secret downloaded from the Google Cloud console
    #[serde(default)]
    pub client_secret_path: Option<PathBuf>,

    /// Where the access/refresh token is cached between runs
    #[serde(default)]
    pub token_path: Option<PathBuf>,

    #[serde(default = "default_tasks_api_url")]
    pub tasks_api_url: String,

    /// Directory the config was loaded from
    #[serde(skip)]
    dir: PathBuf,
}

fn default_task_list_title() -> String {
    DEFAULT_TASK_LIST_TITLE.to_string()
}

fn default_tasks_api_url() -> String {
    DEFAULT_TASKS_API_URL.to_string()
}

/// Get the config directory path (~/.config/caltasks)
pub fn base_dir() -> Result<PathBuf> {
    Ok(dirs::config_dir()
        .ok_or_else(|| Error::Config("Could not determine config directory".to_string()))?
        .join("caltasks"))
}

impl AppConfig {
    /// Load from `path`, or from the default location when `None`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => base_dir()?.join("config.toml"),
        };

        if !path.exists() {
            return Err(Error::Config(format!(
                "Config file not found at {}\n\n\
                Create it with:\n\n\
                feed_url = \"https://example.com/calendar.ics\"\n\
                # task_list_title = \"{}\"\n\n\
                and place the OAuth client secret from\n\
                https://console.cloud.google.com/apis/credentials next to it\n\
                as credentials.json (or set client_secret_path).",
                path.display(),
                DEFAULT_TASK_LIST_TITLE,
            )));
        }

        let contents = std::fs::read_to_string(&path).map_err(|e| {
            Error::Config(format!("Failed to read config from {}: {}", path.display(), e))
        })?;

        let mut config = Self::parse(&contents).map_err(|e| match e {
            Error::Config(msg) => Error::Config(format!("{} ({})", msg, path.display())),
            other => Error::Config(format!(
                "Failed to parse config from {}: {}",
                path.display(),
                other
            )),
        })?;

        config.dir = path.parent().map(Path::to_path_buf).unwrap_or_default();

        Ok(config)
    }

    pub fn parse(contents: &str) -> Result<Self> {
        let config: AppConfig = toml::from_str(contents)?;

        if config.feed_url.trim().is_empty() {
            return Err(Error::Config("feed_url must not be empty".to_string()));
        }

        Ok(config)
    }

    pub fn client_secret_path(&self) -> PathBuf {
        self.resolve(self.client_secret_path.as_deref(), "credentials.json")
    }

    pub fn token_path(&self) -> PathBuf {
        self.resolve(self.token_path.as_deref(), "token.json")
    }

    fn resolve(&self, configured: Option<&Path>, default_name: &str) -> PathBuf {
        match configured {
            Some(p) => self.dir.join(p),
            None => self.dir.join(default_name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config = AppConfig::parse(r#"feed_url = "https://example.com/cal.ics""#).unwrap();

        assert_eq!(config.feed_url, "https://example.com/cal.ics");
        assert_eq!(config.task_list_title, DEFAULT_TASK_LIST_TITLE);
        assert_eq!(config.tasks_api_url, DEFAULT_TASKS_API_URL);
        assert!(config.client_secret_path.is_none());
        assert!(config.token_path.is_none());
    }

    #[test]
    fn test_explicit_paths_win() {
        let config = AppConfig::parse(
            r#"
feed_url = "https://example.com/cal.ics"
task_list_title = "Semester"
client_secret_path = "/tmp/secret.json"
token_path = "/tmp/token.json"
"#,
        )
        .unwrap();

        assert_eq!(config.task_list_title, "Semester");
        assert_eq!(
            config.client_secret_path(),
            PathBuf::from("/tmp/secret.json")
        );
        assert_eq!(config.token_path(), PathBuf::from("/tmp/token.json"));
    }

    #[test]
    fn test_empty_feed_url_is_rejected() {
        let err = AppConfig::parse(r#"feed_url = "  ""#).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_missing_feed_url_is_rejected() {
        let err = AppConfig::parse(r#"task_list_title = "x""#).unwrap_err();
        assert!(matches!(err, Error::Serialization(_)));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "feed_url = \"https://example.com/a.ics\"\n").unwrap();

        let config = AppConfig::load(Some(&path)).unwrap();
        assert_eq!(config.feed_url, "https://example.com/a.ics");
        assert_eq!(config.token_path(), dir.path().join("token.json"));
        assert_eq!(
            config.client_secret_path(),
            dir.path().join("credentials.json")
        );
    }

    #[test]
    fn test_load_missing_file_explains_setup() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nope.toml");

        let err = AppConfig::load(Some(&path)).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("Config file not found"));
        assert!(msg.contains("feed_url"));
    }
}
