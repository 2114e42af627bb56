use async_trait::async_trait;
use std::time::Duration;

use crate::error::Result;
use crate::types::{CatalogTrack, OutputDevice};

/// Operations the sync loop needs from the target streaming service
///
/// Implementations must report a missing or inactive player as
/// [`SyncError::DeviceLost`](crate::SyncError::DeviceLost) so the dispatcher
/// can re-acquire a device.
#[async_trait]
pub trait StreamingService: Send + Sync {
    /// Search the catalog, best match first
    async fn search_tracks(&self, query: &str, limit: u32) -> Result<Vec<CatalogTrack>>;

    /// List the playback devices currently known to the account
    async fn devices(&self) -> Result<Vec<OutputDevice>>;

    /// Start playing `uri` on `device_id`
    async fn start_playback(&self, device_id: &str, uri: &str) -> Result<()>;

    /// Seek the current item on `device_id`
    async fn seek(&self, device_id: &str, position: Duration) -> Result<()>;
}
