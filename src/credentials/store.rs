//! Where the cached token lives between runs.

use super::StoredToken;
use crate::error::{Error, Result};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

/// Load/save access to the cached token.
pub trait CredentialStore: Send + Sync {
    /// `Ok(None)` when nothing usable is cached.
    fn load(&self) -> Result<Option<StoredToken>>;

    /// Replace whatever is cached with `token`.
    fn save(&self, token: &StoredToken) -> Result<()>;
}

/// Token cached as a JSON file.
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileCredentialStore { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn file_error(&self, action: &'static str) -> impl FnOnce(std::io::Error) -> Error + '_ {
        move |source| Error::TokenFile {
            action,
            path: self.path.clone(),
            source,
        }
    }
}

impl CredentialStore for FileCredentialStore {
    fn load(&self) -> Result<Option<StoredToken>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let contents = std::fs::read_to_string(&self.path).map_err(self.file_error("read"))?;

        match serde_json::from_str(&contents) {
            Ok(token) => Ok(Some(token)),
            Err(e) => {
                // An unreadable token is replaced by a fresh authorization
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Ignoring unreadable token file"
                );
                Ok(None)
            }
        }
    }

    fn save(&self, token: &StoredToken) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .map_err(self.file_error("create the directory of"))?;
            }
        }

        let contents = serde_json::to_string_pretty(token)?;
        std::fs::write(&self.path, contents).map_err(self.file_error("write"))?;

        // Only the owner may read the token
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&self.path, std::fs::Permissions::from_mode(0o600))
                .map_err(self.file_error("restrict permissions on"))?;
        }

        tracing::debug!(path = %self.path.display(), "Saved token");
        Ok(())
    }
}

/// Token held in memory; nothing touches the disk.
#[derive(Default)]
pub struct MemoryCredentialStore {
    token: Mutex<Option<StoredToken>>,
}

impl MemoryCredentialStore {
    pub fn new(token: Option<StoredToken>) -> Self {
        MemoryCredentialStore {
            token: Mutex::new(token),
        }
    }

    /// What a later `load` would return.
    pub fn current(&self) -> Option<StoredToken> {
        self.token
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn load(&self) -> Result<Option<StoredToken>> {
        Ok(self.current())
    }

    fn save(&self, token: &StoredToken) -> Result<()> {
        *self.token.lock().unwrap_or_else(PoisonError::into_inner) = Some(token.clone());
        Ok(())
    }
}
