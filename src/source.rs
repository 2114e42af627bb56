use async_trait::async_trait;
use std::time::Duration;

use crate::types::CurrentTrack;

/// Something that can be asked what is playing right now
///
/// `poll` never fails: transport and parse problems are logged by the
/// implementation and reported as `None`, same as "nothing playing".
#[async_trait]
pub trait TrackSource: Send {
    /// Human-readable label for status lines
    fn name(&self) -> &str;

    /// Delay between two polls
    fn poll_interval(&self) -> Duration;

    /// Read the current track, if any
    async fn poll(&mut self) -> Option<CurrentTrack>;
}
