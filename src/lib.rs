//! Mirror an externally observed "now playing" track onto a Spotify player
//!
//! Two sources are supported:
//!
//! - A radio station's recently-played feed ([`RadioFeed`])
//! - The playback state of a network speaker ([`SpeakerSource`] over [`SonosSpeaker`])
//!
//! Each poll that reports a new track drives one reconciliation cycle: the
//! track is looked up in the catalog, an active output device is selected (or
//! waited for), and playback is started there, seeking to the source's position
//! when it reports one.
//!
//! # Quick Start
//!
//! ```no_run
//! use nowplaying_sync::{
//!     DeviceWaitInterrupt, RadioFeed, Reconciler, SpotifyClient, TokioScheduler,
//!     DEFAULT_FEED_URL,
//! };
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let spotify = Arc::new(SpotifyClient::new("access-token")?);
//!     let scheduler = Arc::new(TokioScheduler::new(DeviceWaitInterrupt::SkipCycle));
//!     let feed = RadioFeed::new(DEFAULT_FEED_URL, 3)?;
//!
//!     let mut reconciler = Reconciler::new(feed, spotify, scheduler);
//!     reconciler.run().await;
//!     Ok(())
//! }
//! ```
//!
//! # Architecture
//!
//! - **Sources**: [`TrackSource`] implementations normalizing polled data into [`CurrentTrack`]
//! - **Resolver**: catalog search with a title-only fallback
//! - **Devices**: active device selection and cancellable waiting
//! - **Dispatch**: play/seek commands with a single retry on device loss
//! - **Reconcile**: the polling loop and its [`ReconciliationState`]
//! - **Client**: Spotify Web API over HTTP
//! - **Schedule**: cancellable waits at the loop's suspension points

pub mod client;
pub mod config;
pub mod credentials;
mod devices;
mod dispatch;
mod error;
pub mod feed;
mod protocol;
mod reconcile;
mod resolver;
pub mod schedule;
mod service;
mod source;
pub mod speaker;
mod types;

// Public exports
pub use client::SpotifyClient;
pub use config::{Config, SourceConfig};
pub use credentials::{AccessToken, Credentials, TokenRefresher};
pub use devices::{DeviceManager, DEVICE_POLL_INTERVAL};
pub use dispatch::Dispatcher;
pub use error::{DispatchError, Result, SyncError};
pub use feed::{RadioFeed, DEFAULT_FEED_URL};
pub use reconcile::{CycleOutcome, Reconciler};
pub use resolver::{title_query, track_query, CatalogResolver};
pub use schedule::{DeviceWaitInterrupt, Scheduler, SuspendPoint, TokioScheduler, Wake};
pub use service::StreamingService;
pub use source::TrackSource;
pub use speaker::{SonosSpeaker, SpeakerHandle, SpeakerSource, SpeakerTrackInfo};
pub use types::{
    parse_position, CatalogTrack, CatalogUri, CurrentTrack, DeviceId, OutputDevice,
    ReconciliationState, ResolvedItem, TrackIdentity,
};
