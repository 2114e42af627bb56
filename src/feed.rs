//! Radio station "recently played" feed

use crate::error::Result;
use crate::source::TrackSource;
use crate::types::CurrentTrack;
use async_trait::async_trait;
use chrono::{Local, NaiveDateTime, TimeDelta};
use reqwest::Client;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

/// Playlist search endpoint of the station feed
pub const DEFAULT_FEED_URL: &str = "https://asw.api.iris.radiorepo.io/v2/playlist/search.json";

/// Default station id
pub const DEFAULT_STATION: u32 = 3;

/// Default delay between feed polls
pub const FEED_POLL_INTERVAL: Duration = Duration::from_secs(30);

const FEED_TIMEOUT: Duration = Duration::from_secs(10);
const WINDOW_MINUTES: i64 = 5;

/// The feed expects this literal offset regardless of the local timezone
const FEED_OFFSET: &str = "+01:00";

/// Track source backed by the station's playlist search feed
pub struct RadioFeed {
    http: Client,
    base_url: String,
    station: u32,
    interval: Duration,
    label: String,
}

impl RadioFeed {
    /// Create a feed reader for `station` at `base_url`
    pub fn new(base_url: impl Into<String>, station: u32) -> Result<Self> {
        Ok(Self {
            http: Client::builder().timeout(FEED_TIMEOUT).build()?,
            base_url: base_url.into(),
            station,
            interval: FEED_POLL_INTERVAL,
            label: format!("station {}", station),
        })
    }

    /// Override the poll interval
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Build the query URL for the window ending at `now`
    pub fn request_url(&self, now: NaiveDateTime) -> String {
        let (start, end) = window(now);
        format!(
            "{}?station={}&start={}&end={}",
            self.base_url, self.station, start, end
        )
    }

    async fn fetch(&self, url: &str) -> Result<Value> {
        debug!("Fetching feed: {}", url);
        let response = self.http.get(url).send().await?.error_for_status()?;
        Ok(response.json().await?)
    }
}

#[async_trait]
impl TrackSource for RadioFeed {
    fn name(&self) -> &str {
        &self.label
    }

    fn poll_interval(&self) -> Duration {
        self.interval
    }

    async fn poll(&mut self) -> Option<CurrentTrack> {
        let url = self.request_url(Local::now().naive_local());
        match self.fetch(&url).await {
            Ok(data) => parse_feed(&data),
            Err(e) => {
                warn!("Error fetching current song: {}", e);
                None
            }
        }
    }
}

/// URL-encoded `(start, end)` of the trailing window ending at `now`
pub fn window(now: NaiveDateTime) -> (String, String) {
    let start = now - TimeDelta::minutes(WINDOW_MINUTES);
    (encode_timestamp(start), encode_timestamp(now))
}

fn encode_timestamp(t: NaiveDateTime) -> String {
    let stamp = format!("{}{}", t.format("%Y-%m-%dT%H:%M:%S%.3f"), FEED_OFFSET);
    url::form_urlencoded::byte_serialize(stamp.as_bytes()).collect()
}

/// Extract the most recent entry of a feed response
///
/// Missing nodes count as blank, and a blank artist or title means no track.
pub fn parse_feed(data: &Value) -> Option<CurrentTrack> {
    let latest = data.get("result")?.get("entry")?.as_array()?.first()?;

    let song = latest
        .get("song")
        .and_then(|s| s.get("entry"))
        .and_then(|e| e.as_array())
        .and_then(|e| e.first());

    let title = song
        .and_then(|s| s.get("title"))
        .and_then(|v| v.as_str())
        .unwrap_or_default();

    let artist = song
        .and_then(|s| s.get("artist"))
        .and_then(|a| a.get("entry"))
        .and_then(|e| e.as_array())
        .and_then(|e| e.first())
        .and_then(|a| a.get("name"))
        .and_then(|v| v.as_str())
        .unwrap_or_default();

    CurrentTrack::new(artist, title)
}
