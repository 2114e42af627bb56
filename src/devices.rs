use crate::error::Result;
use crate::schedule::{Scheduler, SuspendPoint, Wake};
use crate::service::StreamingService;
use crate::types::{DeviceId, OutputDevice};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Delay between device listings while waiting for an active device
pub const DEVICE_POLL_INTERVAL: Duration = Duration::from_secs(3);

const DEVICE_ERROR_RETRY: Duration = Duration::from_secs(5);

/// Finds an output device to play on
///
/// Devices are listed fresh on every call; nothing is cached here.
#[derive(Clone)]
pub struct DeviceManager {
    service: Arc<dyn StreamingService>,
}

impl DeviceManager {
    /// Create a device manager polling every [`DEVICE_POLL_INTERVAL`]
    pub fn new(service: Arc<dyn StreamingService>) -> Self {
        Self { service }
    }

    /// List devices once and return the first active one
    pub async fn active_device(&self) -> Result<Option<OutputDevice>> {
        let devices = self.service.devices().await?;
        Ok(devices.into_iter().find(|d| d.is_active))
    }

    /// Pick a device to play on, waiting for one if none is active
    ///
    /// An active device always wins over `hint`. Returns `Ok(None)` when the
    /// wait was cancelled; a failed initial listing is an error.
    pub async fn select_device(
        &self,
        hint: Option<&str>,
        scheduler: &dyn Scheduler,
    ) -> Result<Option<DeviceId>> {
        if let Some(device) = self.active_device().await? {
            info!("Using active Spotify device: {}", device.name);
            return Ok(Some(device.id));
        }

        if let Some(hint) = hint {
            debug!("Previously used device {} is not active", hint);
        }
        info!("No active Spotify devices found");
        Ok(self.await_active_device(scheduler).await)
    }

    /// Block until some device reports active, or until cancelled
    ///
    /// There is no timeout. Listing errors are logged and retried.
    pub async fn await_active_device(&self, scheduler: &dyn Scheduler) -> Option<DeviceId> {
        self.log_devices().await;
        info!("Waiting for an active device (open Spotify and start playing, or press Ctrl+C to cancel)");

        scheduler.begin_device_wait();
        let found = self.poll_until_active(scheduler).await;
        scheduler.end_device_wait();
        found
    }

    async fn poll_until_active(&self, scheduler: &dyn Scheduler) -> Option<DeviceId> {
        loop {
            let delay = match self.active_device().await {
                Ok(Some(device)) => {
                    info!("Connected to: {} ({})", device.name, device.kind);
                    return Some(device.id);
                }
                Ok(None) => DEVICE_POLL_INTERVAL,
                Err(e) => {
                    warn!("Error checking devices: {}", e);
                    DEVICE_ERROR_RETRY
                }
            };

            if scheduler.wait(delay, SuspendPoint::DeviceWait).await == Wake::Cancelled {
                info!("Device connection cancelled");
                return None;
            }
        }
    }

    async fn log_devices(&self) {
        match self.service.devices().await {
            Ok(devices) if devices.is_empty() => {
                info!("No Spotify devices found. Open Spotify and play something.");
            }
            Ok(devices) => {
                for (i, device) in devices.iter().enumerate() {
                    let status = if device.is_active { " (active)" } else { "" };
                    info!("{}. {} - {}{}", i + 1, device.name, device.kind, status);
                }
            }
            Err(e) => warn!("Error getting devices: {}", e),
        }
    }
}
