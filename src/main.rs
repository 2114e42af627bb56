use anyhow::{Context, Result};
use clap::Parser;
use nowplaying_sync::schedule::listen_for_interrupts;
use nowplaying_sync::{
    Config, DeviceId, DeviceManager, RadioFeed, ReconciliationState, Reconciler, SonosSpeaker,
    SourceConfig, SpeakerHandle, SpeakerSource, SpotifyClient, StreamingService, TokenRefresher,
    TokioScheduler, TrackSource,
};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::parse();
    info!("Starting nowplaying-sync v{}", env!("CARGO_PKG_VERSION"));

    let spotify: Arc<dyn StreamingService> = Arc::new(
        connect(&config)
            .await
            .context("Spotify integration could not be enabled")?,
    );

    let hint = initial_device(spotify.clone()).await;
    let scheduler = Arc::new(TokioScheduler::new(config.source.device_wait_interrupt()));
    let interval = config.source.interval();

    match config.source {
        SourceConfig::Radio { station, feed_url, .. } => {
            let feed = RadioFeed::new(feed_url, station)?.with_interval(interval);
            track(feed, spotify, scheduler, hint).await;
        }
        SourceConfig::Speaker { host, port, name, .. } => {
            let speaker = SonosSpeaker::new(&host, port, name)?;
            speaker
                .current_track_info()
                .await
                .with_context(|| format!("Speaker at {}:{} is not reachable", host, port))?;

            let source = SpeakerSource::new(speaker).with_interval(interval);
            track(source, spotify, scheduler, hint).await;
        }
    }

    Ok(())
}

/// Build the Web API client from an explicit token, or from saved credentials
async fn connect(config: &Config) -> nowplaying_sync::Result<SpotifyClient> {
    if let Some(token) = config.token.as_deref().map(str::trim).filter(|t| !t.is_empty()) {
        return SpotifyClient::with_base_url(&config.api_base, token);
    }

    let refresher = TokenRefresher::load(&config.credentials, &config.token_url)?;
    let token = refresher.refresh().await?;
    Ok(SpotifyClient::with_base_url(&config.api_base, token)?.with_refresher(refresher))
}

/// Remember an already-active device so the first dispatch can skip the lookup
async fn initial_device(spotify: Arc<dyn StreamingService>) -> Option<DeviceId> {
    match DeviceManager::new(spotify).active_device().await {
        Ok(Some(device)) => {
            info!("Using active device: {}", device.name);
            Some(device.id)
        }
        Ok(None) => {
            info!("No active device found. Will wait for one when needed.");
            None
        }
        Err(e) => {
            warn!("Error detecting Spotify devices: {}", e);
            None
        }
    }
}

async fn track<S: TrackSource>(
    source: S,
    spotify: Arc<dyn StreamingService>,
    scheduler: Arc<TokioScheduler>,
    hint: Option<DeviceId>,
) {
    let listener = listen_for_interrupts(scheduler.clone());
    info!("Press Ctrl+C to stop tracking");

    let mut reconciler = Reconciler::new(source, spotify, scheduler.clone())
        .with_state(ReconciliationState::new(hint));
    reconciler.run().await;

    scheduler.shutdown_token().cancel();
    let _ = listener.await;
}
