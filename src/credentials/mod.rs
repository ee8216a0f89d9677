//! Produces a valid access token for the Tasks API.
//!
//! The cached token is read once and written back once per run. Depending on
//! what the cache holds, the manager uses it as-is, refreshes it, or runs the
//! interactive authorization flow.

mod store;

pub use store::{CredentialStore, FileCredentialStore, MemoryCredentialStore};

use crate::error::{Error, Result};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Treat tokens this close to expiry as already expired.
const EXPIRY_SKEW_SECONDS: i64 = 60;

/// An OAuth access/refresh token pair as cached on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredToken {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// `None` means the token never expires
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub scopes: Vec<String>,
}

impl StoredToken {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        match self.expires_at {
            Some(expires_at) => now + Duration::seconds(EXPIRY_SKEW_SECONDS) >= expires_at,
            None => false,
        }
    }

    pub fn has_refresh_token(&self) -> bool {
        self.refresh_token.as_deref().is_some_and(|t| !t.is_empty())
    }
}

/// Obtains tokens from the authorization server.
#[async_trait]
pub trait AuthorizationFlow: Send + Sync {
    /// Run the interactive consent flow from scratch.
    async fn authorize(&self) -> Result<StoredToken>;

    /// Trade the refresh token for a new access token.
    ///
    /// Returns `Error::TokenRejected` when the server refuses the refresh token.
    async fn refresh(&self, token: &StoredToken) -> Result<StoredToken>;
}

/// What the cache held at the start of the run.
#[derive(Debug, Clone, PartialEq)]
pub enum CredentialState {
    NoToken,
    CachedValid(StoredToken),
    CachedExpiredWithRefresh(StoredToken),
    CachedExpiredNoRefresh,
}

impl CredentialState {
    pub fn classify(cached: Option<StoredToken>, now: DateTime<Utc>) -> Self {
        match cached {
            None => CredentialState::NoToken,
            Some(token) if !token.is_expired_at(now) => CredentialState::CachedValid(token),
            Some(token) if token.has_refresh_token() => {
                CredentialState::CachedExpiredWithRefresh(token)
            }
            Some(_) => CredentialState::CachedExpiredNoRefresh,
        }
    }

    /// Name for log lines; the Debug form would print the token.
    pub fn label(&self) -> &'static str {
        match self {
            CredentialState::NoToken => "no cached token",
            CredentialState::CachedValid(_) => "cached token valid",
            CredentialState::CachedExpiredWithRefresh(_) => "cached token expired, refreshable",
            CredentialState::CachedExpiredNoRefresh => "cached token expired, no refresh token",
        }
    }
}

pub struct CredentialManager<S, F> {
    store: S,
    flow: F,
}

impl<S: CredentialStore, F: AuthorizationFlow> CredentialManager<S, F> {
    pub fn new(store: S, flow: F) -> Self {
        CredentialManager { store, flow }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Return a non-expired token, saving it back to the store.
    pub async fn obtain(&self) -> Result<StoredToken> {
        let state = CredentialState::classify(self.store.load()?, Utc::now());
        tracing::info!(state = state.label(), "Checking cached credentials");

        let token = match state {
            CredentialState::CachedValid(token) => token,
            CredentialState::CachedExpiredWithRefresh(token) => {
                match self.flow.refresh(&token).await {
                    Ok(refreshed) => refreshed,
                    Err(Error::TokenRejected { status, body }) => {
                        tracing::warn!(
                            status,
                            body = %body,
                            "Refresh token rejected, falling back to interactive authorization"
                        );
                        self.flow.authorize().await?
                    }
                    Err(e) => return Err(e),
                }
            }
            CredentialState::NoToken | CredentialState::CachedExpiredNoRefresh => {
                self.flow.authorize().await?
            }
        };

        self.store.save(&token)?;
        Ok(token)
    }
}
