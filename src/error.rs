//! Error types for caltasks.

use caltasks_core::ParseError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while running the feed → tasks pipeline.
#[derive(Error, Debug)]
pub enum Error {
    #[error("Failed to fetch the ics file. Status code: {status}")]
    Fetch { status: u16 },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error("Authorization failed: {0}")]
    Auth(String),

    #[error("Token endpoint rejected the request (HTTP {status}): {body}")]
    TokenRejected { status: u16, body: String },

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to {action} token file {}: {source}", .path.display())]
    TokenFile {
        action: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Serialization(err.to_string())
    }
}

/// A failed call to the Tasks API.
///
/// `status` is `None` when the request never got a response.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("{}", describe(.status, .message))]
pub struct ApiError {
    pub status: Option<u16>,
    pub message: String,
}

impl ApiError {
    pub fn new(status: Option<u16>, message: impl Into<String>) -> Self {
        ApiError {
            status,
            message: message.into(),
        }
    }
}

fn describe(status: &Option<u16>, message: &str) -> String {
    match status {
        Some(code) => format!("Tasks API error (HTTP {}): {}", code, message),
        None => format!("Tasks API request failed: {}", message),
    }
}

/// Result type alias for caltasks operations.
pub type Result<T> = std::result::Result<T, Error>;
