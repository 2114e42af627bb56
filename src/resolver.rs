use crate::error::Result;
use crate::service::StreamingService;
use crate::types::{CatalogTrack, CurrentTrack, ResolvedItem};
use std::sync::Arc;
use tracing::{debug, info};

/// Maps observed tracks onto catalog items
///
/// Tries title+artist first, then title alone, and always trusts the
/// catalog's own ranking by taking the first hit.
#[derive(Clone)]
pub struct CatalogResolver {
    service: Arc<dyn StreamingService>,
}

impl CatalogResolver {
    pub fn new(service: Arc<dyn StreamingService>) -> Self {
        Self { service }
    }

    /// Resolve `track`; `Ok(None)` means neither query found anything
    pub async fn resolve(&self, track: &CurrentTrack) -> Result<Option<ResolvedItem>> {
        if let Some(hit) = self.first_match(&track_query(track)).await? {
            return Ok(Some(hit.into()));
        }

        info!("Could not find track on Spotify: {}", track);
        let fallback = self.first_match(&title_query(track)).await?;
        if fallback.is_none() {
            info!("Could not find track with title-only search either");
        }
        Ok(fallback.map(ResolvedItem::from))
    }

    async fn first_match(&self, query: &str) -> Result<Option<CatalogTrack>> {
        let hits = self.service.search_tracks(query, 1).await?;
        debug!("{} result(s) for {:?}", hits.len(), query);
        Ok(hits.into_iter().next())
    }
}

/// Query constraining both title and artist
pub fn track_query(track: &CurrentTrack) -> String {
    format!("track:{} artist:{}", track.title, track.artist)
}

/// Query constraining the title only
pub fn title_query(track: &CurrentTrack) -> String {
    format!("track:{}", track.title)
}
