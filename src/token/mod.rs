//! Bearer-token acquisition for the speech API.
//!
//! `RefreshTokenProvider` exchanges an authorized-user credentials file for
//! an access token on every call. Nothing is cached: each call re-reads the
//! file and re-authenticates, so credential rotation takes effect
//! immediately.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::info;

use crate::error::AuthError;

const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Source of bearer tokens for authorized API calls.
#[async_trait::async_trait]
pub trait TokenProvider: Send + Sync {
    /// Fetch a fresh access token.
    async fn access_token(&self) -> Result<String, AuthError>;
}

/// Authorized-user credentials file (client id/secret plus refresh token).
#[derive(Debug, Deserialize)]
struct AuthorizedUserCredentials {
    #[serde(rename = "type")]
    credential_type: Option<String>,
    client_id: String,
    client_secret: String,
    refresh_token: String,
    token_uri: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
}

#[derive(Debug, Deserialize)]
struct TokenErrorResponse {
    #[serde(default)]
    error: String,
    #[serde(default)]
    error_description: String,
}

/// Token provider backed by a local credentials file and a refresh-grant
/// exchange against the identity provider.
pub struct RefreshTokenProvider {
    credentials_path: PathBuf,
    client: reqwest::Client,
}

impl RefreshTokenProvider {
    pub fn new(credentials_path: impl AsRef<Path>) -> Self {
        Self {
            credentials_path: credentials_path.as_ref().to_path_buf(),
            client: reqwest::Client::new(),
        }
    }

    /// Read and validate the credentials file. Absent or malformed files are
    /// credential errors, not I/O errors, so the relay reports them the same
    /// way as a rejected grant.
    fn load_credentials(&self) -> Result<AuthorizedUserCredentials, AuthError> {
        let raw = std::fs::read_to_string(&self.credentials_path).map_err(|e| {
            AuthError::CredentialsInvalid(format!(
                "cannot read credentials file {}: {e}",
                self.credentials_path.display()
            ))
        })?;

        let credentials: AuthorizedUserCredentials = serde_json::from_str(&raw).map_err(|e| {
            AuthError::CredentialsInvalid(format!("malformed credentials file: {e}"))
        })?;

        if let Some(credential_type) = &credentials.credential_type {
            if credential_type != "authorized_user" {
                return Err(AuthError::CredentialsInvalid(format!(
                    "unsupported credential type: {credential_type}"
                )));
            }
        }

        Ok(credentials)
    }
}

#[async_trait::async_trait]
impl TokenProvider for RefreshTokenProvider {
    async fn access_token(&self) -> Result<String, AuthError> {
        let credentials = self.load_credentials()?;

        let token_uri = credentials
            .token_uri
            .as_deref()
            .unwrap_or(DEFAULT_TOKEN_URI);

        let response = self
            .client
            .post(token_uri)
            .form(&[
                ("grant_type", "refresh_token"),
                ("client_id", credentials.client_id.as_str()),
                ("client_secret", credentials.client_secret.as_str()),
                ("refresh_token", credentials.refresh_token.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();

        if status.is_client_error() {
            let body = response.text().await.unwrap_or_default();
            let detail = serde_json::from_str::<TokenErrorResponse>(&body)
                .map(|e| {
                    if e.error_description.is_empty() {
                        e.error
                    } else {
                        format!("{}: {}", e.error, e.error_description)
                    }
                })
                .unwrap_or(body);

            return Err(AuthError::CredentialsInvalid(format!(
                "token exchange rejected ({status}): {detail}"
            )));
        }

        if !status.is_success() {
            return Err(AuthError::NetworkError(format!(
                "token endpoint returned {status}"
            )));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| AuthError::NetworkError(format!("malformed token response: {e}")))?;

        if token.access_token.is_empty() {
            return Err(AuthError::CredentialsInvalid(
                "token exchange returned an empty access token".to_string(),
            ));
        }

        info!("Access token fetched");

        Ok(token.access_token)
    }
}

/// Fixed-token provider for tests and local development.
pub struct StaticTokenProvider {
    token: String,
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

#[async_trait::async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn access_token(&self) -> Result<String, AuthError> {
        Ok(self.token.clone())
    }
}
