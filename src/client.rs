use crate::credentials::{AccessToken, TokenRefresher};
use crate::error::{Result, SyncError};
use crate::protocol::{DevicesResponse, ErrorEnvelope, PlayRequest, SearchResponse};
use crate::service::StreamingService;
use crate::types::{CatalogTrack, OutputDevice};
use async_trait::async_trait;
use reqwest::{header, Client, RequestBuilder, Response, StatusCode};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

/// Default Web API base URL
pub const DEFAULT_API_BASE: &str = "https://api.spotify.com/v1/";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Message fragments that mean "no usable player", used only when the API
/// gives no structured reason
const DEVICE_LOST_MARKERS: [&str; 3] = [
    "NO_ACTIVE_DEVICE",
    "Player command failed",
    "Device not found",
];

/// Client for the Spotify Web API
///
/// Holds an already-authorized access token. With a [`TokenRefresher`]
/// attached, a stale or rejected token is replaced and the request is sent
/// once more.
#[derive(Debug, Clone)]
pub struct SpotifyClient {
    base_url: Url,
    token: Arc<Mutex<AccessToken>>,
    refresher: Option<Arc<TokenRefresher>>,
    http: Client,
}

impl SpotifyClient {
    /// Create a client against the public Web API
    pub fn new(access_token: impl Into<AccessToken>) -> Result<Self> {
        Self::with_base_url(DEFAULT_API_BASE, access_token)
    }

    /// Create a client against a custom API base URL
    pub fn with_base_url(base_url: &str, access_token: impl Into<AccessToken>) -> Result<Self> {
        let mut base = base_url.to_string();
        if !base.ends_with('/') {
            base.push('/');
        }

        let token = access_token.into();
        if token.secret.trim().is_empty() {
            return Err(SyncError::Credentials("access token is empty".to_string()));
        }

        Ok(Self {
            base_url: Url::parse(&base)?,
            token: Arc::new(Mutex::new(token)),
            refresher: None,
            http: Client::builder().timeout(REQUEST_TIMEOUT).build()?,
        })
    }

    /// Refresh the access token through `refresher` when it expires or is rejected
    pub fn with_refresher(mut self, refresher: TokenRefresher) -> Self {
        self.refresher = Some(Arc::new(refresher));
        self
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        Ok(self.base_url.join(path)?)
    }

    fn current_token(&self) -> AccessToken {
        self.token
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    async fn refresh_token(&self, refresher: &TokenRefresher) -> Result<()> {
        let token = refresher.refresh().await?;
        *self.token.lock().unwrap_or_else(PoisonError::into_inner) = token;
        info!("Spotify access token refreshed");
        Ok(())
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        if let Some(refresher) = &self.refresher {
            if self.current_token().is_stale() {
                debug!("Access token is about to expire");
                self.refresh_token(refresher).await?;
            }
        }

        let retry = request.try_clone();
        let response = request
            .bearer_auth(&self.current_token().secret)
            .send()
            .await?;

        let response = match (&self.refresher, retry) {
            (Some(refresher), Some(retry)) if response.status() == StatusCode::UNAUTHORIZED => {
                warn!("Access token was rejected, refreshing");
                self.refresh_token(refresher).await?;
                retry
                    .bearer_auth(&self.current_token().secret)
                    .send()
                    .await?
            }
            _ => response,
        };
        Self::check(response).await
    }

    async fn check(response: Response) -> Result<Response> {
        let status = response.status();
        debug!("Response status: {}", status);

        if status.is_success() {
            return Ok(response);
        }

        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Could not read error body".to_string());
        Err(classify_error(status.as_u16(), &body))
    }
}

#[async_trait]
impl StreamingService for SpotifyClient {
    async fn search_tracks(&self, query: &str, limit: u32) -> Result<Vec<CatalogTrack>> {
        let url = self.endpoint("search")?;
        debug!("Search: {}", query);

        let limit = limit.to_string();
        let request = self
            .http
            .get(url)
            .query(&[("q", query), ("type", "track"), ("limit", limit.as_str())]);

        let response: SearchResponse = self.send(request).await?.json().await?;
        Ok(response
            .tracks
            .map(|page| page.items.into_iter().map(CatalogTrack::from).collect())
            .unwrap_or_default())
    }

    async fn devices(&self) -> Result<Vec<OutputDevice>> {
        let url = self.endpoint("me/player/devices")?;
        let response: DevicesResponse = self.send(self.http.get(url)).await?.json().await?;

        Ok(response
            .devices
            .into_iter()
            .filter_map(|d| d.into_output_device())
            .collect())
    }

    async fn start_playback(&self, device_id: &str, uri: &str) -> Result<()> {
        let url = self.endpoint("me/player/play")?;
        debug!("Start playback of {} on {}", uri, device_id);

        let request = self
            .http
            .put(url)
            .query(&[("device_id", device_id)])
            .json(&PlayRequest { uris: [uri] });

        self.send(request).await?;
        Ok(())
    }

    async fn seek(&self, device_id: &str, position: Duration) -> Result<()> {
        let url = self.endpoint("me/player/seek")?;
        let position_ms = position.as_millis().to_string();
        debug!("Seek {} to {}ms", device_id, position_ms);

        let request = self
            .http
            .put(url)
            .query(&[("position_ms", position_ms.as_str()), ("device_id", device_id)])
            .header(header::CONTENT_LENGTH, "0");

        self.send(request).await?;
        Ok(())
    }
}

/// Turn a failed API response into a [`SyncError`]
///
/// A structured `reason` decides the classification when present. The message
/// markers are only consulted when the reason is absent or `UNKNOWN`.
pub(crate) fn classify_error(status: u16, body: &str) -> SyncError {
    let (message, reason) = match serde_json::from_str::<ErrorEnvelope>(body) {
        Ok(envelope) => (envelope.error.message, envelope.error.reason),
        Err(_) => (body.trim().to_string(), None),
    };

    let device_lost = match reason.as_deref() {
        Some("NO_ACTIVE_DEVICE") => true,
        Some(r) if r != "UNKNOWN" => false,
        _ => DEVICE_LOST_MARKERS.iter().any(|m| message.contains(m)),
    };

    if device_lost {
        SyncError::DeviceLost { message }
    } else {
        SyncError::Api { status, reason, message }
    }
}
