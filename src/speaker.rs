//! Now-playing state read straight from a network speaker

use crate::error::{Result, SyncError};
use crate::source::TrackSource;
use crate::types::{parse_position, CurrentTrack};
use async_trait::async_trait;
use regex::Regex;
use reqwest::{header, Client};
use std::collections::HashMap;
use std::sync::OnceLock;
use std::time::Duration;
use tracing::{debug, warn};

/// Default delay between speaker polls
pub const SPEAKER_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Default UPnP control port
pub const SPEAKER_PORT: u16 = 1400;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(5);
const AV_TRANSPORT_PATH: &str = "/MediaRenderer/AVTransport/Control";
const GET_POSITION_INFO_ACTION: &str =
    "\"urn:schemas-upnp-org:service:AVTransport:1#GetPositionInfo\"";
const GET_POSITION_INFO_BODY: &str = concat!(
    r#"<?xml version="1.0"?>"#,
    r#"<s:Envelope xmlns:s="http://schemas.xmlsoap.org/soap/envelope/" "#,
    r#"s:encodingStyle="http://schemas.xmlsoap.org/soap/encoding/">"#,
    r#"<s:Body><u:GetPositionInfo xmlns:u="urn:schemas-upnp-org:service:AVTransport:1">"#,
    r#"<InstanceID>0</InstanceID></u:GetPositionInfo></s:Body></s:Envelope>"#,
);

/// Raw track info as reported by a speaker; any field may be empty
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpeakerTrackInfo {
    pub title: String,
    pub artist: String,
    pub album: String,

    /// Elapsed position as `H:MM:SS` (or whatever the device sends)
    pub position: String,
}

/// An addressable speaker that can report what it is playing
#[async_trait]
pub trait SpeakerHandle: Send + Sync {
    /// Display name of the speaker
    fn player_name(&self) -> &str;

    /// Read the current track info
    async fn current_track_info(&self) -> Result<SpeakerTrackInfo>;
}

/// Sonos player reached over its local UPnP control endpoint
pub struct SonosSpeaker {
    http: Client,
    control_url: String,
    name: String,
}

impl SonosSpeaker {
    /// Address a speaker at `host:port`
    pub fn new(host: &str, port: u16, name: Option<String>) -> Result<Self> {
        Ok(Self {
            http: Client::builder().timeout(REQUEST_TIMEOUT).build()?,
            control_url: format!("http://{}:{}{}", host, port, AV_TRANSPORT_PATH),
            name: name.unwrap_or_else(|| host.to_string()),
        })
    }
}

#[async_trait]
impl SpeakerHandle for SonosSpeaker {
    fn player_name(&self) -> &str {
        &self.name
    }

    async fn current_track_info(&self) -> Result<SpeakerTrackInfo> {
        debug!("GetPositionInfo: {}", self.control_url);
        let response = self
            .http
            .post(&self.control_url)
            .header(header::CONTENT_TYPE, "text/xml; charset=\"utf-8\"")
            .header("SOAPACTION", GET_POSITION_INFO_ACTION)
            .body(GET_POSITION_INFO_BODY)
            .send()
            .await?
            .error_for_status()?;

        let body = response.text().await?;
        parse_position_info(&body)
    }
}

/// Parse a `GetPositionInfoResponse` envelope
pub fn parse_position_info(body: &str) -> Result<SpeakerTrackInfo> {
    if tag_text(body, "u:GetPositionInfoResponse").is_none() {
        return Err(SyncError::InvalidResponse(
            "No GetPositionInfoResponse in SOAP body".to_string(),
        ));
    }

    let position = tag_text(body, "RelTime").unwrap_or_default();
    let metadata = tag_text(body, "TrackMetaData")
        .map(|m| unescape_xml(&m))
        .unwrap_or_default();

    // Without DIDL-Lite metadata (e.g. "NOT_IMPLEMENTED") there is nothing to report
    if !metadata.contains("<DIDL-Lite") {
        return Ok(SpeakerTrackInfo {
            position,
            ..Default::default()
        });
    }

    let field = |tag: &str| {
        tag_text(&metadata, tag)
            .map(|t| unescape_xml(t.trim()))
            .unwrap_or_default()
    };

    let mut info = SpeakerTrackInfo {
        title: field("dc:title"),
        artist: field("dc:creator"),
        album: field("upnp:album"),
        position,
    };

    // Radio streams carry "Artist - Title" in the stream content instead
    if info.artist.is_empty() {
        let stream = field("r:streamContent");
        if let Some((artist, title)) = stream.split_once(" - ") {
            info.artist = artist.trim().to_string();
            info.title = title.trim().to_string();
        }
    }

    Ok(info)
}

const EXTRACTED_TAGS: [&str; 7] = [
    "u:GetPositionInfoResponse",
    "RelTime",
    "TrackMetaData",
    "dc:title",
    "dc:creator",
    "upnp:album",
    "r:streamContent",
];

fn tag_patterns() -> &'static HashMap<&'static str, Regex> {
    static PATTERNS: OnceLock<HashMap<&'static str, Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        EXTRACTED_TAGS
            .into_iter()
            .filter_map(|tag| {
                let pattern = format!(r"(?s)<{0}(?:\s[^>]*)?>(.*?)</{0}>", regex::escape(tag));
                Regex::new(&pattern).ok().map(|re| (tag, re))
            })
            .collect()
    })
}

fn tag_text(xml: &str, tag: &str) -> Option<String> {
    tag_patterns()
        .get(tag)?
        .captures(xml)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

fn unescape_xml(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

/// Track source polling a single speaker
pub struct SpeakerSource<H> {
    handle: H,
    interval: Duration,
}

impl<H: SpeakerHandle> SpeakerSource<H> {
    /// Poll `handle` every [`SPEAKER_POLL_INTERVAL`]
    pub fn new(handle: H) -> Self {
        Self {
            handle,
            interval: SPEAKER_POLL_INTERVAL,
        }
    }

    /// Override the poll interval
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }
}

#[async_trait]
impl<H: SpeakerHandle> TrackSource for SpeakerSource<H> {
    fn name(&self) -> &str {
        self.handle.player_name()
    }

    fn poll_interval(&self) -> Duration {
        self.interval
    }

    async fn poll(&mut self) -> Option<CurrentTrack> {
        let info = match self.handle.current_track_info().await {
            Ok(info) => info,
            Err(e) => {
                warn!("Error reading track info from {}: {}", self.handle.player_name(), e);
                return None;
            }
        };

        let track = CurrentTrack::new(info.artist, info.title)?
            .with_album(info.album)
            .with_elapsed(parse_position(&info.position));
        Some(track)
    }
}
