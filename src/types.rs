use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Output device identifier on the streaming service
pub type DeviceId = String;

/// Catalog URI of a playable item (e.g. `spotify:track:...`)
pub type CatalogUri = String;

/// Artist/title pair used to decide whether a polled track is new
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrackIdentity {
    pub artist: String,
    pub title: String,
}

impl fmt::Display for TrackIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.artist, self.title)
    }
}

/// A track observed on the external source
///
/// Identity is `(artist, title)` only; `elapsed` keeps moving while the same
/// track plays and is ignored by [`CurrentTrack::identity`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentTrack {
    pub artist: String,
    pub title: String,

    /// Album, when the source reports one (informational only)
    #[serde(default)]
    pub album: Option<String>,

    /// Playback position on the source
    #[serde(default)]
    pub elapsed: Option<Duration>,
}

impl CurrentTrack {
    /// Build a track, rejecting entries with a blank artist or title
    pub fn new(artist: impl Into<String>, title: impl Into<String>) -> Option<Self> {
        let artist = artist.into().trim().to_string();
        let title = title.into().trim().to_string();
        if artist.is_empty() || title.is_empty() {
            return None;
        }
        Some(Self {
            artist,
            title,
            album: None,
            elapsed: None,
        })
    }

    /// Set the album, dropping blank values
    pub fn with_album(mut self, album: impl Into<String>) -> Self {
        let album = album.into();
        self.album = if album.trim().is_empty() { None } else { Some(album) };
        self
    }

    /// Set the playback position on the source
    pub fn with_elapsed(mut self, elapsed: Option<Duration>) -> Self {
        self.elapsed = elapsed;
        self
    }

    /// Both artist and title are non-blank
    pub fn is_valid(&self) -> bool {
        !self.artist.trim().is_empty() && !self.title.trim().is_empty()
    }

    /// Deduplication key
    pub fn identity(&self) -> TrackIdentity {
        TrackIdentity {
            artist: self.artist.clone(),
            title: self.title.clone(),
        }
    }
}

impl fmt::Display for CurrentTrack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.artist, self.title)
    }
}

/// One search hit from the streaming service catalog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogTrack {
    pub uri: CatalogUri,
    pub name: String,
    #[serde(default)]
    pub artists: Vec<String>,
}

/// Best catalog match for a [`CurrentTrack`]
///
/// The matched artist/title come from the catalog and may differ from what
/// was queried.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedItem {
    pub catalog_uri: CatalogUri,
    pub matched_artist: String,
    pub matched_title: String,
}

impl From<CatalogTrack> for ResolvedItem {
    fn from(track: CatalogTrack) -> Self {
        Self {
            catalog_uri: track.uri,
            matched_artist: track.artists.into_iter().next().unwrap_or_default(),
            matched_title: track.name,
        }
    }
}

impl fmt::Display for ResolvedItem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} - {}", self.matched_artist, self.matched_title)
    }
}

/// A playback endpoint on the streaming service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutputDevice {
    pub id: DeviceId,
    pub name: String,

    /// Device type as reported by the service (e.g. "Computer", "Smartphone")
    #[serde(default)]
    pub kind: String,

    pub is_active: bool,
}

/// State carried from one reconciliation cycle to the next
///
/// Only the loop mutates this, and only after a successful dispatch.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconciliationState {
    pub last_dispatched: Option<TrackIdentity>,
    pub last_known_device: Option<DeviceId>,
}

impl ReconciliationState {
    /// Create an empty state, optionally seeded with a device hint
    pub fn new(device_hint: Option<DeviceId>) -> Self {
        Self {
            last_dispatched: None,
            last_known_device: device_hint,
        }
    }

    /// Whether `identity` is the one dispatched immediately before
    pub fn is_duplicate(&self, identity: &TrackIdentity) -> bool {
        self.last_dispatched.as_ref() == Some(identity)
    }

    /// Record a successful dispatch
    pub fn record_dispatch(&mut self, identity: TrackIdentity, device: DeviceId) {
        self.last_dispatched = Some(identity);
        self.last_known_device = Some(device);
    }
}

/// Parse a playback position reported as `H:MM:SS`, `HH:MM:SS` or `MM:SS`
///
/// Returns `None` for anything else, including placeholders such as
/// `NOT_IMPLEMENTED` and values too large to represent.
pub fn parse_position(position: &str) -> Option<Duration> {
    let parts: Vec<u64> = position
        .trim()
        .split(':')
        .map(|p| p.parse::<u64>())
        .collect::<std::result::Result<_, _>>()
        .ok()?;

    let (h, m, s) = match parts.as_slice() {
        [h, m, s] => (*h, *m, *s),
        [m, s] => (0, *m, *s),
        _ => return None,
    };
    let seconds = h
        .checked_mul(3600)?
        .checked_add(m.checked_mul(60)?)?
        .checked_add(s)?;
    Some(Duration::from_secs(seconds))
}
