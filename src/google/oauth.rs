//! Google OAuth 2.0 for installed apps: consent in the browser, code exchange,
//! and refresh.

use super::callback::CallbackListener;
use crate::credentials::{AuthorizationFlow, StoredToken};
use crate::error::{Error, Result};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use url::Url;

pub const TASKS_SCOPE: &str = "https://www.googleapis.com/auth/tasks";

const DEFAULT_AUTH_URI: &str = "https://accounts.google.com/o/oauth2/auth";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// OAuth client credentials (user-provided).
#[derive(Debug, Clone, Deserialize)]
pub struct ClientSecret {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
}

fn default_auth_uri() -> String {
    DEFAULT_AUTH_URI.to_string()
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

/// The shapes a client secret file comes in: Google's download wraps the
/// fields in `installed` or `web`.
#[derive(Deserialize)]
#[serde(untagged)]
enum ClientSecretFile {
    Installed { installed: ClientSecret },
    Web { web: ClientSecret },
    Flat(ClientSecret),
}

impl ClientSecret {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::Config(format!(
                "Google OAuth client secret not found.\n\n\
                Download it from https://console.cloud.google.com/apis/credentials\n\
                (OAuth client ID, application type \"Desktop app\") and save it as\n\
                {}\n\n\
                A minimal file looks like:\n\n\
                {{\n  \
                  \"client_id\": \"your-client-id.apps.googleusercontent.com\",\n  \
                  \"client_secret\": \"your-client-secret\"\n\
                }}",
                path.display()
            )));
        }

        let contents = std::fs::read_to_string(path)?;
        Self::from_json(&contents).map_err(|e| {
            Error::Config(format!(
                "Failed to parse client secret from {}: {}",
                path.display(),
                e
            ))
        })
    }

    pub fn from_json(contents: &str) -> Result<Self> {
        let file: ClientSecretFile = serde_json::from_str(contents)?;

        Ok(match file {
            ClientSecretFile::Installed { installed } => installed,
            ClientSecretFile::Web { web } => web,
            ClientSecretFile::Flat(secret) => secret,
        })
    }

    /// The URL the user opens to grant access.
    pub fn consent_url(&self, redirect_uri: &str, state: &str, scopes: &[String]) -> Result<Url> {
        Url::parse_with_params(
            &self.auth_uri,
            &[
                ("client_id", self.client_id.as_str()),
                ("redirect_uri", redirect_uri),
                ("response_type", "code"),
                ("scope", scopes.join(" ").as_str()),
                ("access_type", "offline"),
                ("prompt", "consent"),
                ("state", state),
            ],
        )
        .map_err(|e| Error::Config(format!("Invalid auth_uri {}: {}", self.auth_uri, e)))
    }
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: Option<i64>,
    #[serde(default)]
    refresh_token: Option<String>,
    #[serde(default)]
    scope: Option<String>,
}

pub struct GoogleOAuth {
    http: reqwest::Client,
    client_secret_path: PathBuf,
    scopes: Vec<String>,
}

impl GoogleOAuth {
    pub fn new(http: reqwest::Client, client_secret_path: impl Into<PathBuf>) -> Self {
        GoogleOAuth {
            http,
            client_secret_path: client_secret_path.into(),
            scopes: vec![TASKS_SCOPE.to_string()],
        }
    }

    // Read lazily: a run with a valid cached token never needs the secret.
    fn client_secret(&self) -> Result<ClientSecret> {
        ClientSecret::load(&self.client_secret_path)
    }

    async fn exchange_code(
        &self,
        secret: &ClientSecret,
        code: &str,
        redirect_uri: &str,
    ) -> Result<StoredToken> {
        let response = self
            .post_token(
                &secret.token_uri,
                &[
                    ("code", code),
                    ("client_id", secret.client_id.as_str()),
                    ("client_secret", secret.client_secret.as_str()),
                    ("redirect_uri", redirect_uri),
                    ("grant_type", "authorization_code"),
                ],
            )
            .await?;

        Ok(self.to_stored(response, None))
    }

    async fn refresh_with(&self, secret: &ClientSecret, token: &StoredToken) -> Result<StoredToken> {
        let refresh_token = token
            .refresh_token
            .as_deref()
            .ok_or_else(|| Error::Auth("No refresh token cached".to_string()))?;

        let response = self
            .post_token(
                &secret.token_uri,
                &[
                    ("client_id", secret.client_id.as_str()),
                    ("client_secret", secret.client_secret.as_str()),
                    ("refresh_token", refresh_token),
                    ("grant_type", "refresh_token"),
                ],
            )
            .await?;

        // Google typically doesn't return a new refresh_token on refresh
        Ok(self.to_stored(response, token.refresh_token.clone()))
    }

    async fn post_token(&self, token_uri: &str, form: &[(&str, &str)]) -> Result<TokenResponse> {
        let response = self.http.post(token_uri).form(form).send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::TokenRejected {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await?;
        serde_json::from_str(&body)
            .map_err(|e| Error::Auth(format!("Failed to parse token response: {}", e)))
    }

    fn to_stored(&self, response: TokenResponse, previous_refresh: Option<String>) -> StoredToken {
        let scopes = match response.scope {
            Some(scope) => scope.split_whitespace().map(str::to_string).collect(),
            None => self.scopes.clone(),
        };

        StoredToken {
            access_token: response.access_token,
            refresh_token: response
                .refresh_token
                .filter(|t| !t.is_empty())
                .or(previous_refresh),
            expires_at: response
                .expires_in
                .map(|secs| Utc::now() + Duration::seconds(secs)),
            scopes,
        }
    }
}

#[async_trait]
impl AuthorizationFlow for GoogleOAuth {
    async fn authorize(&self) -> Result<StoredToken> {
        let secret = self.client_secret()?;
        let listener = CallbackListener::bind().await?;
        let redirect_uri = listener.redirect_uri();
        let state = uuid::Uuid::new_v4().to_string();

        let auth_url = secret.consent_url(&redirect_uri, &state, &self.scopes)?;

        println!("\nOpen this URL in your browser to authorize access to Google Tasks:\n");
        println!("{}\n", auth_url);

        // Try to open the browser automatically
        if open::that(auth_url.as_str()).is_err() {
            println!("(Could not open browser automatically, please copy the URL above)");
        }

        let code = listener.wait_for_code(&state).await?;
        tracing::info!("Received authorization code, exchanging for tokens");

        self.exchange_code(&secret, &code, &redirect_uri).await
    }

    async fn refresh(&self, token: &StoredToken) -> Result<StoredToken> {
        let secret = self.client_secret()?;
        tracing::info!("Access token expired, refreshing");
        self.refresh_with(&secret, token).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn secret_for(server_url: &str) -> ClientSecret {
        ClientSecret {
            client_id: "id.apps.googleusercontent.com".to_string(),
            client_secret: "shh".to_string(),
            auth_uri: DEFAULT_AUTH_URI.to_string(),
            token_uri: format!("{}/token", server_url),
        }
    }

    fn expired(refresh: Option<&str>) -> StoredToken {
        StoredToken {
            access_token: "old".to_string(),
            refresh_token: refresh.map(str::to_string),
            expires_at: Some(Utc::now() - Duration::seconds(60)),
            scopes: vec![TASKS_SCOPE.to_string()],
        }
    }

    #[test]
    fn test_client_secret_formats() {
        let installed = r#"{"installed": {"client_id": "a", "client_secret": "b",
            "auth_uri": "https://accounts.google.com/o/oauth2/auth",
            "token_uri": "https://oauth2.googleapis.com/token",
            "redirect_uris": ["http://localhost"]}}"#;
        let secret = ClientSecret::from_json(installed).unwrap();
        assert_eq!(secret.client_id, "a");
        assert_eq!(secret.token_uri, DEFAULT_TOKEN_URI);

        let web = r#"{"web": {"client_id": "c", "client_secret": "d"}}"#;
        assert_eq!(ClientSecret::from_json(web).unwrap().client_id, "c");

        let flat = r#"{"client_id": "e", "client_secret": "f"}"#;
        let secret = ClientSecret::from_json(flat).unwrap();
        assert_eq!(secret.client_secret, "f");
        assert_eq!(secret.auth_uri, DEFAULT_AUTH_URI);
    }

    #[test]
    fn test_missing_client_secret_explains_setup() {
        let dir = tempfile::tempdir().unwrap();
        let err = ClientSecret::load(&dir.path().join("credentials.json")).unwrap_err();

        match err {
            Error::Config(msg) => assert!(msg.contains("console.cloud.google.com")),
            other => panic!("Expected Config error, got {:?}", other),
        }
    }

    #[test]
    fn test_consent_url_carries_offline_access_and_state() {
        let secret = secret_for("http://unused");
        let url = secret
            .consent_url(
                "http://localhost:5555/",
                "state-1",
                &[TASKS_SCOPE.to_string()],
            )
            .unwrap();

        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let get = |key: &str| {
            pairs
                .iter()
                .find(|(k, _)| k == key)
                .map(|(_, v)| v.as_str())
        };

        assert!(url.as_str().starts_with(DEFAULT_AUTH_URI));
        assert_eq!(get("client_id"), Some("id.apps.googleusercontent.com"));
        assert_eq!(get("redirect_uri"), Some("http://localhost:5555/"));
        assert_eq!(get("scope"), Some(TASKS_SCOPE));
        assert_eq!(get("access_type"), Some("offline"));
        assert_eq!(get("response_type"), Some("code"));
        assert_eq!(get("state"), Some("state-1"));
    }

    #[tokio::test]
    async fn test_refresh_keeps_previous_refresh_token() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/token")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("grant_type".into(), "refresh_token".into()),
                Matcher::UrlEncoded("refresh_token".into(), "1//keep".into()),
                Matcher::UrlEncoded("client_id".into(), "id.apps.googleusercontent.com".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"access_token": "ya29.new", "expires_in": 3599, "token_type": "Bearer"}"#)
            .create_async()
            .await;

        let oauth = GoogleOAuth::new(reqwest::Client::new(), "unused.json");
        let token = oauth
            .refresh_with(&secret_for(&server.url()), &expired(Some("1//keep")))
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(token.access_token, "ya29.new");
        assert_eq!(token.refresh_token.as_deref(), Some("1//keep"));
        assert!(!token.is_expired_at(Utc::now()));
        assert_eq!(token.scopes, vec![TASKS_SCOPE.to_string()]);
    }

    #[tokio::test]
    async fn test_refresh_rejection_is_token_rejected() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/token")
            .with_status(400)
            .with_body(r#"{"error": "invalid_grant", "error_description": "Token has been expired or revoked."}"#)
            .create_async()
            .await;

        let oauth = GoogleOAuth::new(reqwest::Client::new(), "unused.json");
        let err = oauth
            .refresh_with(&secret_for(&server.url()), &expired(Some("1//revoked")))
            .await
            .unwrap_err();

        match err {
            Error::TokenRejected { status, body } => {
                assert_eq!(status, 400);
                assert!(body.contains("invalid_grant"));
            }
            other => panic!("Expected TokenRejected, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_exchange_code() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/token")
            .match_body(Matcher::AllOf(vec![
                Matcher::UrlEncoded("grant_type".into(), "authorization_code".into()),
                Matcher::UrlEncoded("code".into(), "4/0Abc".into()),
                Matcher::UrlEncoded("redirect_uri".into(), "http://localhost:5555/".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"access_token": "ya29.first", "refresh_token": "1//first",
                    "expires_in": 3599, "scope": "https://www.googleapis.com/auth/tasks"}"#,
            )
            .create_async()
            .await;

        let oauth = GoogleOAuth::new(reqwest::Client::new(), "unused.json");
        let token = oauth
            .exchange_code(&secret_for(&server.url()), "4/0Abc", "http://localhost:5555/")
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(token.access_token, "ya29.first");
        assert_eq!(token.refresh_token.as_deref(), Some("1//first"));
        assert_eq!(token.scopes, vec![TASKS_SCOPE.to_string()]);
    }

    #[tokio::test]
    async fn test_refresh_reads_client_secret_file() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/token")
            .with_status(200)
            .with_body(r#"{"access_token": "ya29.file", "expires_in": 3599}"#)
            .create_async()
            .await;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.json");
        std::fs::write(
            &path,
            format!(
                r#"{{"installed": {{"client_id": "a", "client_secret": "b", "token_uri": "{}/token"}}}}"#,
                server.url()
            ),
        )
        .unwrap();

        let oauth = GoogleOAuth::new(reqwest::Client::new(), path);
        let token = oauth.refresh(&expired(Some("1//r"))).await.unwrap();

        assert_eq!(token.access_token, "ya29.file");
    }
}
