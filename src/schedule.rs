//! Cancellable waiting at the loop's two suspension points

use async_trait::async_trait;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Where the loop is suspended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SuspendPoint {
    /// Fixed sleep between two reconciliation cycles
    BetweenCycles,
    /// Polling for an active output device
    DeviceWait,
}

/// How a wait ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wake {
    Elapsed,
    Cancelled,
}

/// What an operator interrupt does while a device wait is in progress
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeviceWaitInterrupt {
    /// Abandon the wait and the current cycle; keep the loop running
    SkipCycle,
    /// Stop the whole run
    Terminate,
}

/// Wait primitive the loop and the device manager suspend on
///
/// Production code sleeps on the tokio timer; tests substitute a scheduler
/// that returns immediately or cancels on cue.
#[async_trait]
pub trait Scheduler: Send + Sync {
    /// Wait for `delay` unless cancelled first
    async fn wait(&self, delay: Duration, point: SuspendPoint) -> Wake;

    /// Whether the run has been asked to stop
    fn is_shutdown(&self) -> bool;

    /// Called when a device wait starts
    fn begin_device_wait(&self) {}

    /// Called when a device wait ends, however it ended
    fn end_device_wait(&self) {}
}

/// [`Scheduler`] backed by `tokio::time` and cancellation tokens
pub struct TokioScheduler {
    shutdown: CancellationToken,
    device_wait: Mutex<Option<CancellationToken>>,
    on_device_wait: DeviceWaitInterrupt,
}

impl TokioScheduler {
    /// Create a scheduler with the given interrupt policy
    pub fn new(on_device_wait: DeviceWaitInterrupt) -> Self {
        Self {
            shutdown: CancellationToken::new(),
            device_wait: Mutex::new(None),
            on_device_wait,
        }
    }

    /// Token cancelled when the run stops
    pub fn shutdown_token(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Handle one operator interrupt
    pub fn interrupt(&self) {
        let device_wait = self
            .device_wait
            .lock()
            .unwrap_or_else(PoisonError::into_inner);

        match (device_wait.as_ref(), self.on_device_wait) {
            (Some(token), DeviceWaitInterrupt::SkipCycle) => {
                info!("Device wait cancelled");
                token.cancel();
            }
            _ => {
                info!("Stop requested");
                self.shutdown.cancel();
            }
        }
    }

    fn current_device_wait(&self) -> Option<CancellationToken> {
        self.device_wait
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl Scheduler for TokioScheduler {
    async fn wait(&self, delay: Duration, point: SuspendPoint) -> Wake {
        let device_wait = match point {
            SuspendPoint::DeviceWait => self.current_device_wait(),
            SuspendPoint::BetweenCycles => None,
        };

        let device_cancelled = async {
            match device_wait {
                Some(token) => token.cancelled().await,
                None => std::future::pending().await,
            }
        };

        tokio::select! {
            _ = self.shutdown.cancelled() => Wake::Cancelled,
            _ = device_cancelled => Wake::Cancelled,
            _ = sleep(delay) => Wake::Elapsed,
        }
    }

    fn is_shutdown(&self) -> bool {
        self.shutdown.is_cancelled()
    }

    fn begin_device_wait(&self) {
        *self
            .device_wait
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(self.shutdown.child_token());
    }

    fn end_device_wait(&self) {
        *self
            .device_wait
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = None;
    }
}

/// Forward Ctrl+C presses to `scheduler` until the run stops
pub fn listen_for_interrupts(scheduler: Arc<TokioScheduler>) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        let shutdown = scheduler.shutdown_token();
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                signal = tokio::signal::ctrl_c() => {
                    if let Err(e) = signal {
                        tracing::error!("Failed to listen for Ctrl+C: {}", e);
                        break;
                    }
                    scheduler.interrupt();
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn elapses_without_interrupt() {
        let scheduler = TokioScheduler::new(DeviceWaitInterrupt::SkipCycle);
        let wake = scheduler
            .wait(Duration::from_secs(30), SuspendPoint::BetweenCycles)
            .await;
        assert_eq!(wake, Wake::Elapsed);
        assert!(!scheduler.is_shutdown());
    }

    #[tokio::test]
    async fn skip_cycle_only_cancels_device_wait() {
        let scheduler = TokioScheduler::new(DeviceWaitInterrupt::SkipCycle);
        scheduler.begin_device_wait();
        scheduler.interrupt();
        let wake = scheduler
            .wait(Duration::from_secs(3600), SuspendPoint::DeviceWait)
            .await;
        scheduler.end_device_wait();

        assert_eq!(wake, Wake::Cancelled);
        assert!(!scheduler.is_shutdown());
    }

    #[tokio::test]
    async fn terminate_policy_stops_the_run() {
        let scheduler = TokioScheduler::new(DeviceWaitInterrupt::Terminate);
        scheduler.begin_device_wait();
        scheduler.interrupt();
        let wake = scheduler
            .wait(Duration::from_secs(3600), SuspendPoint::DeviceWait)
            .await;

        assert_eq!(wake, Wake::Cancelled);
        assert!(scheduler.is_shutdown());
    }

    #[tokio::test]
    async fn interrupt_between_cycles_stops_the_run() {
        let scheduler = TokioScheduler::new(DeviceWaitInterrupt::SkipCycle);
        scheduler.interrupt();
        let wake = scheduler
            .wait(Duration::from_secs(3600), SuspendPoint::BetweenCycles)
            .await;
        assert_eq!(wake, Wake::Cancelled);
        assert!(scheduler.is_shutdown());
    }
}
