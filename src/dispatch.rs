use crate::devices::DeviceManager;
use crate::error::DispatchError;
use crate::schedule::Scheduler;
use crate::service::StreamingService;
use crate::types::{DeviceId, ResolvedItem};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

/// Issues play (and seek) commands
#[derive(Clone)]
pub struct Dispatcher {
    service: Arc<dyn StreamingService>,
    devices: DeviceManager,
}

impl Dispatcher {
    pub fn new(service: Arc<dyn StreamingService>, devices: DeviceManager) -> Self {
        Self { service, devices }
    }

    /// Play `item` on `device_id`, optionally seeking to `offset`
    ///
    /// A lost device gets exactly one re-acquisition and one retry. Returns
    /// the device playback actually started on.
    pub async fn dispatch(
        &self,
        item: &ResolvedItem,
        device_id: &str,
        offset: Option<Duration>,
        scheduler: &dyn Scheduler,
    ) -> Result<DeviceId, DispatchError> {
        let device = match self.service.start_playback(device_id, &item.catalog_uri).await {
            Ok(()) => device_id.to_string(),
            Err(e) if e.is_device_lost() => {
                warn!("Device became inactive ({}). Waiting for reconnection...", e);
                let replacement = self
                    .devices
                    .await_active_device(scheduler)
                    .await
                    .ok_or(DispatchError::NoReplacementDevice)?;

                self.service
                    .start_playback(&replacement, &item.catalog_uri)
                    .await
                    .map_err(DispatchError::RetryFailed)?;
                replacement
            }
            Err(e) => return Err(DispatchError::Command(e)),
        };

        if let Some(offset) = offset {
            // Playback already started; a failed seek just leaves it at the beginning
            match self.service.seek(&device, offset).await {
                Ok(()) => info!("Seeked to {}s", offset.as_secs()),
                Err(e) => warn!("Seek to {}s failed: {}", offset.as_secs(), e),
            }
        }

        Ok(device)
    }
}
