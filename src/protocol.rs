use serde::{Deserialize, Serialize};

use crate::types::{CatalogTrack, OutputDevice};

/// Track search response (`GET search?type=track`)
#[derive(Debug, Clone, Deserialize)]
pub struct SearchResponse {
    #[serde(default)]
    pub tracks: Option<Paging<TrackObject>>,
}

/// Paged result list
#[derive(Debug, Clone, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
pub struct Paging<T> {
    #[serde(default)]
    pub items: Vec<T>,
}

/// Track object as returned by search
#[derive(Debug, Clone, Deserialize)]
pub struct TrackObject {
    pub uri: String,
    pub name: String,
    #[serde(default)]
    pub artists: Vec<ArtistObject>,
}

/// Simplified artist object
#[derive(Debug, Clone, Deserialize)]
pub struct ArtistObject {
    pub name: String,
}

impl From<TrackObject> for CatalogTrack {
    fn from(track: TrackObject) -> Self {
        Self {
            uri: track.uri,
            name: track.name,
            artists: track.artists.into_iter().map(|a| a.name).collect(),
        }
    }
}

/// Device listing response (`GET me/player/devices`)
#[derive(Debug, Clone, Deserialize)]
pub struct DevicesResponse {
    #[serde(default)]
    pub devices: Vec<DeviceObject>,
}

/// Device object; restricted devices come back without an id
#[derive(Debug, Clone, Deserialize)]
pub struct DeviceObject {
    pub id: Option<String>,
    pub name: String,
    #[serde(default, rename = "type")]
    pub device_type: String,
    #[serde(default)]
    pub is_active: bool,
}

impl DeviceObject {
    /// Convert to an [`OutputDevice`], dropping devices that cannot be addressed
    pub fn into_output_device(self) -> Option<OutputDevice> {
        Some(OutputDevice {
            id: self.id?,
            name: self.name,
            kind: self.device_type,
            is_active: self.is_active,
        })
    }
}

/// Body of `PUT me/player/play`
#[derive(Debug, Clone, Serialize)]
pub struct PlayRequest<'a> {
    pub uris: [&'a str; 1],
}

/// Error envelope returned by the Web API
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorEnvelope {
    pub error: ErrorObject,
}

/// Regular error object; player endpoints add a `reason`
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorObject {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub reason: Option<String>,
}

/// Accounts service token response
#[derive(Debug, Clone, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
}
