//! On-disk Spotify app credentials and refresh-token exchange

use crate::error::{Result, SyncError};
use crate::protocol::TokenResponse;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::{info, warn};

/// Accounts service token endpoint
pub const TOKEN_URL: &str = "https://accounts.spotify.com/api/token";

/// Tokens this close to expiry are refreshed before use
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// Bearer token for the Web API
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccessToken {
    pub secret: String,

    /// `None` when the lifetime is unknown, e.g. a token passed on the command line
    pub expires_at: Option<Instant>,
}

impl AccessToken {
    /// Token with an unknown lifetime
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            expires_at: None,
        }
    }

    /// Token that expires `lifetime` from now
    pub fn expiring_in(secret: impl Into<String>, lifetime: Duration) -> Self {
        Self {
            secret: secret.into(),
            expires_at: Some(Instant::now() + lifetime),
        }
    }

    /// Whether the token is expired or about to be
    pub fn is_stale(&self) -> bool {
        self.expires_at
            .is_some_and(|at| Instant::now() + EXPIRY_MARGIN >= at)
    }
}

impl From<String> for AccessToken {
    fn from(secret: String) -> Self {
        Self::new(secret)
    }
}

impl From<&str> for AccessToken {
    fn from(secret: &str) -> Self {
        Self::new(secret)
    }
}

/// Saved app credentials
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: String,

    /// Long-lived refresh token from a previous authorization
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
}

impl Credentials {
    /// Load credentials from `path`
    ///
    /// A missing file is `Ok(None)`; an unreadable or malformed one is an error.
    pub fn load(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let text = std::fs::read_to_string(path)?;
        let credentials: Credentials = serde_json::from_str(&text)?;
        info!("Using saved Spotify credentials from {}", path.display());
        Ok(Some(credentials))
    }

    /// Write credentials to `path`
    pub fn save(&self, path: &Path) -> Result<()> {
        let text = serde_json::to_string_pretty(self)?;
        std::fs::write(path, text)?;
        info!("Spotify credentials saved to {}", path.display());
        Ok(())
    }

    /// Exchange the stored refresh token for an access token
    ///
    /// When the accounts service rotates the refresh token, the new one is
    /// stored in `self`; the caller decides whether to persist it.
    pub async fn refresh_access_token(&mut self, token_url: &str) -> Result<AccessToken> {
        let refresh_token = self
            .refresh_token
            .clone()
            .ok_or_else(|| SyncError::Credentials("no refresh token saved".to_string()))?;

        let response = reqwest::Client::new()
            .post(token_url)
            .basic_auth(&self.client_id, Some(&self.client_secret))
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("Token refresh failed ({}): {}", status, body);
            return Err(SyncError::Api {
                status: status.as_u16(),
                reason: None,
                message: body,
            });
        }

        let token: TokenResponse = response.json().await?;
        if let Some(rotated) = token.refresh_token {
            self.refresh_token = Some(rotated);
        }
        match token.expires_in {
            Some(expires_in) => {
                info!("Obtained access token (expires in {}s)", expires_in);
                Ok(AccessToken::expiring_in(
                    token.access_token,
                    Duration::from_secs(expires_in),
                ))
            }
            None => Ok(AccessToken::new(token.access_token)),
        }
    }
}

/// Mints fresh access tokens from saved credentials
///
/// Refreshes are serialized, and a rotated refresh token is written back to
/// the credentials file.
#[derive(Debug)]
pub struct TokenRefresher {
    credentials: Mutex<Credentials>,
    path: PathBuf,
    token_url: String,
}

impl TokenRefresher {
    pub fn new(
        credentials: Credentials,
        path: impl Into<PathBuf>,
        token_url: impl Into<String>,
    ) -> Self {
        Self {
            credentials: Mutex::new(credentials),
            path: path.into(),
            token_url: token_url.into(),
        }
    }

    /// Load the credentials file at `path`; a missing file is an error here
    pub fn load(path: &Path, token_url: &str) -> Result<Self> {
        let credentials = Credentials::load(path)?.ok_or_else(|| {
            SyncError::Credentials(format!(
                "no access token given and no saved credentials at {}",
                path.display()
            ))
        })?;
        Ok(Self::new(credentials, path, token_url))
    }

    /// Exchange the refresh token for a new access token
    pub async fn refresh(&self) -> Result<AccessToken> {
        let mut credentials = self.credentials.lock().await;
        let previous = credentials.refresh_token.clone();
        let token = credentials.refresh_access_token(&self.token_url).await?;
        if credentials.refresh_token != previous {
            credentials.save(&self.path)?;
        }
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_staleness() {
        assert!(!AccessToken::new("tok").is_stale());
        assert!(!AccessToken::expiring_in("tok", Duration::from_secs(3600)).is_stale());
        assert!(AccessToken::expiring_in("tok", Duration::from_secs(30)).is_stale());
        assert!(AccessToken::expiring_in("tok", Duration::ZERO).is_stale());
    }

    #[test]
    fn refresher_needs_a_credentials_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing.json");
        let err = TokenRefresher::load(&path, TOKEN_URL).unwrap_err();
        assert!(matches!(err, SyncError::Credentials(_)));
    }

    #[test]
    fn missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("spotify_credentials.json");
        assert_eq!(Credentials::load(&path).unwrap(), None);
    }

    #[test]
    fn save_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("spotify_credentials.json");
        let creds = Credentials {
            client_id: "id".to_string(),
            client_secret: "secret".to_string(),
            refresh_token: Some("refresh".to_string()),
        };
        creds.save(&path).unwrap();
        assert_eq!(Credentials::load(&path).unwrap(), Some(creds));
    }

    #[test]
    fn legacy_record_without_refresh_token() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("spotify_credentials.json");
        std::fs::write(&path, r#"{"client_id": "abc", "client_secret": "xyz"}"#).unwrap();
        let creds = Credentials::load(&path).unwrap().unwrap();
        assert_eq!(creds.client_id, "abc");
        assert!(creds.refresh_token.is_none());
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("spotify_credentials.json");
        std::fs::write(&path, "not json").unwrap();
        assert!(matches!(Credentials::load(&path), Err(SyncError::Json(_))));
    }

    #[tokio::test]
    async fn refresh_requires_token() {
        let mut creds = Credentials {
            client_id: "id".to_string(),
            client_secret: "secret".to_string(),
            refresh_token: None,
        };
        let err = creds.refresh_access_token(TOKEN_URL).await.unwrap_err();
        assert!(matches!(err, SyncError::Credentials(_)));
    }
}
