use crate::devices::DeviceManager;
use crate::dispatch::Dispatcher;
use crate::error::DispatchError;
use crate::resolver::CatalogResolver;
use crate::schedule::{Scheduler, SuspendPoint, Wake};
use crate::service::StreamingService;
use crate::source::TrackSource;
use crate::types::{ReconciliationState, ResolvedItem};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// How one reconciliation cycle ended
#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    /// The source had nothing valid to report
    NoTrack,
    /// Same track as the last successful dispatch
    Duplicate,
    /// No catalog match, even with the title-only query
    NotFound,
    /// No device available, or the device wait was cancelled
    NoDevice,
    /// Playback started
    Dispatched(ResolvedItem),
    /// Search, device listing or playback failed
    Failed(String),
}

/// Drives poll → dedup → resolve → device select → dispatch
///
/// Owns the [`ReconciliationState`] exclusively; it only advances after a
/// successful dispatch, so a failed track is tried again on the next poll.
pub struct Reconciler<S> {
    source: S,
    resolver: CatalogResolver,
    devices: DeviceManager,
    dispatcher: Dispatcher,
    scheduler: Arc<dyn Scheduler>,
    state: ReconciliationState,
}

impl<S: TrackSource> Reconciler<S> {
    /// Create a loop reading `source` and playing on `service`
    pub fn new(
        source: S,
        service: Arc<dyn StreamingService>,
        scheduler: Arc<dyn Scheduler>,
    ) -> Self {
        let devices = DeviceManager::new(service.clone());
        Self {
            source,
            resolver: CatalogResolver::new(service.clone()),
            dispatcher: Dispatcher::new(service, devices.clone()),
            devices,
            scheduler,
            state: ReconciliationState::default(),
        }
    }

    /// Start from `state` instead of an empty one
    pub fn with_state(mut self, state: ReconciliationState) -> Self {
        self.state = state;
        self
    }

    /// Current state
    pub fn state(&self) -> &ReconciliationState {
        &self.state
    }

    /// Run cycles until the scheduler is shut down
    ///
    /// No single cycle can end the run; only cancellation does.
    pub async fn run(&mut self) {
        info!(
            "Monitoring {} for new songs (every {}s)",
            self.source.name(),
            self.source.poll_interval().as_secs()
        );

        while !self.scheduler.is_shutdown() {
            let outcome = self.run_cycle().await;
            debug!("Cycle finished: {:?}", outcome);

            if self.scheduler.is_shutdown() {
                break;
            }
            let wake = self
                .scheduler
                .wait(self.source.poll_interval(), SuspendPoint::BetweenCycles)
                .await;
            if wake == Wake::Cancelled {
                break;
            }
        }

        info!("Stopped tracking");
    }

    /// Run a single reconciliation cycle
    pub async fn run_cycle(&mut self) -> CycleOutcome {
        let track = match self.source.poll().await {
            Some(track) if track.is_valid() => track,
            Some(track) => {
                debug!("Ignoring incomplete track {:?}", track);
                return CycleOutcome::NoTrack;
            }
            None => return CycleOutcome::NoTrack,
        };

        let identity = track.identity();
        if self.state.is_duplicate(&identity) {
            return CycleOutcome::Duplicate;
        }

        match &track.album {
            Some(album) => info!("New song detected: {} [{}]", track, album),
            None => info!("New song detected: {}", track),
        }

        let item = match self.resolver.resolve(&track).await {
            Ok(Some(item)) => item,
            Ok(None) => return CycleOutcome::NotFound,
            Err(e) => {
                warn!("Spotify search error: {}", e);
                return CycleOutcome::Failed(e.to_string());
            }
        };
        info!("Found on Spotify: {}", item);

        // A remembered device is tried directly; losing it is handled by the dispatcher
        let device = match self.state.last_known_device.clone() {
            Some(device) => device,
            None => match self.devices.select_device(None, self.scheduler.as_ref()).await {
                Ok(Some(device)) => device,
                Ok(None) => return CycleOutcome::NoDevice,
                Err(e) => {
                    warn!("Spotify device error: {}", e);
                    return CycleOutcome::Failed(e.to_string());
                }
            },
        };

        match self
            .dispatcher
            .dispatch(&item, &device, track.elapsed, self.scheduler.as_ref())
            .await
        {
            Ok(used) => {
                info!("Updated Spotify with: {}", item);
                self.state.record_dispatch(identity, used);
                CycleOutcome::Dispatched(item)
            }
            Err(DispatchError::NoReplacementDevice) => {
                warn!("Spotify playback abandoned: no active device");
                CycleOutcome::NoDevice
            }
            Err(e) => {
                warn!("Spotify playback error: {}", e);
                CycleOutcome::Failed(e.to_string())
            }
        }
    }
}
