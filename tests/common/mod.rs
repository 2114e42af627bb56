#![allow(dead_code)]

use async_trait::async_trait;
use nowplaying_sync::{
    CatalogTrack, CurrentTrack, OutputDevice, Result, Scheduler, StreamingService, SuspendPoint,
    SyncError, TrackSource, Wake,
};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

/// Scripted result of a playback or seek command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reply {
    Ok,
    DeviceLost,
    Fail,
}

impl Reply {
    fn into_result(self) -> Result<()> {
        match self {
            Reply::Ok => Ok(()),
            Reply::DeviceLost => Err(SyncError::DeviceLost {
                message: "Player command failed: No active device found".to_string(),
            }),
            Reply::Fail => Err(SyncError::Api {
                status: 500,
                reason: None,
                message: "Server error".to_string(),
            }),
        }
    }
}

#[derive(Default)]
struct FakeState {
    catalog: HashMap<String, Vec<CatalogTrack>>,
    device_listings: VecDeque<Vec<OutputDevice>>,
    play_replies: VecDeque<Reply>,
    seek_replies: VecDeque<Reply>,
    searches: Vec<String>,
    plays: Vec<(String, String)>,
    seeks: Vec<(String, Duration)>,
    device_calls: usize,
    fail_searches: bool,
}

/// In-memory streaming service
///
/// Unscripted searches return nothing, unscripted playback commands succeed,
/// and the last scripted device listing repeats forever.
#[derive(Default)]
pub struct FakeService {
    state: Mutex<FakeState>,
}

impl FakeService {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_hit(self, query: &str, uri: &str, artist: &str, title: &str) -> Self {
        self.state.lock().unwrap().catalog.insert(
            query.to_string(),
            vec![CatalogTrack {
                uri: uri.to_string(),
                name: title.to_string(),
                artists: vec![artist.to_string()],
            }],
        );
        self
    }

    /// Make `track_query(artist, title)` find `uri`
    pub fn with_track(self, artist: &str, title: &str, uri: &str) -> Self {
        let query = format!("track:{} artist:{}", title, artist);
        self.with_hit(&query, uri, artist, title)
    }

    pub fn with_devices(self, devices: Vec<OutputDevice>) -> Self {
        self.state.lock().unwrap().device_listings.push_back(devices);
        self
    }

    pub fn with_play_replies(self, replies: &[Reply]) -> Self {
        self.state.lock().unwrap().play_replies.extend(replies.iter().copied());
        self
    }

    pub fn with_seek_replies(self, replies: &[Reply]) -> Self {
        self.state.lock().unwrap().seek_replies.extend(replies.iter().copied());
        self
    }

    /// Every search fails at the transport level
    pub fn with_failing_search(self) -> Self {
        self.state.lock().unwrap().fail_searches = true;
        self
    }

    pub fn searches(&self) -> Vec<String> {
        self.state.lock().unwrap().searches.clone()
    }

    pub fn plays(&self) -> Vec<(String, String)> {
        self.state.lock().unwrap().plays.clone()
    }

    pub fn played_uris(&self) -> Vec<String> {
        self.plays().into_iter().map(|(_, uri)| uri).collect()
    }

    pub fn seeks(&self) -> Vec<(String, Duration)> {
        self.state.lock().unwrap().seeks.clone()
    }

    pub fn device_calls(&self) -> usize {
        self.state.lock().unwrap().device_calls
    }
}

#[async_trait]
impl StreamingService for FakeService {
    async fn search_tracks(&self, query: &str, limit: u32) -> Result<Vec<CatalogTrack>> {
        let mut state = self.state.lock().unwrap();
        state.searches.push(query.to_string());
        if state.fail_searches {
            return Err(SyncError::InvalidResponse("connection reset".to_string()));
        }
        let mut hits = state.catalog.get(query).cloned().unwrap_or_default();
        hits.truncate(limit as usize);
        Ok(hits)
    }

    async fn devices(&self) -> Result<Vec<OutputDevice>> {
        let mut state = self.state.lock().unwrap();
        state.device_calls += 1;
        let listing = if state.device_listings.len() > 1 {
            state.device_listings.pop_front().unwrap_or_default()
        } else {
            state.device_listings.front().cloned().unwrap_or_default()
        };
        Ok(listing)
    }

    async fn start_playback(&self, device_id: &str, uri: &str) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.plays.push((device_id.to_string(), uri.to_string()));
        state.play_replies.pop_front().unwrap_or(Reply::Ok).into_result()
    }

    async fn seek(&self, device_id: &str, position: Duration) -> Result<()> {
        let mut state = self.state.lock().unwrap();
        state.seeks.push((device_id.to_string(), position));
        state.seek_replies.pop_front().unwrap_or(Reply::Ok).into_result()
    }
}

pub fn device(id: &str, active: bool) -> OutputDevice {
    OutputDevice {
        id: id.to_string(),
        name: format!("Device {}", id),
        kind: "Computer".to_string(),
        is_active: active,
    }
}

pub fn track(artist: &str, title: &str) -> CurrentTrack {
    CurrentTrack::new(artist, title).unwrap()
}

/// Source that replays a fixed script of polls, then reports nothing
pub struct ScriptedSource {
    polls: VecDeque<Option<CurrentTrack>>,
}

impl ScriptedSource {
    pub fn new(polls: Vec<Option<CurrentTrack>>) -> Self {
        Self {
            polls: polls.into(),
        }
    }

    pub fn tracks(tracks: &[CurrentTrack]) -> Self {
        Self::new(tracks.iter().cloned().map(Some).collect())
    }
}

#[async_trait]
impl TrackSource for ScriptedSource {
    fn name(&self) -> &str {
        "script"
    }

    fn poll_interval(&self) -> Duration {
        Duration::from_secs(30)
    }

    async fn poll(&mut self) -> Option<CurrentTrack> {
        self.polls.pop_front().flatten()
    }
}

/// Scheduler that never sleeps
///
/// Device waits are cancelled after `device_wait_limit` ticks (if set), and
/// the run stops after `cycle_limit` between-cycle waits (if set).
#[derive(Default)]
pub struct ManualScheduler {
    device_wait_limit: Option<usize>,
    cycle_limit: Option<usize>,
    stop_on_device_cancel: bool,
    device_waits: AtomicUsize,
    cycle_waits: AtomicUsize,
    device_waits_started: AtomicUsize,
    shutdown: AtomicBool,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel_device_wait_after(mut self, ticks: usize) -> Self {
        self.device_wait_limit = Some(ticks);
        self
    }

    /// Device-wait cancellation stops the whole run
    pub fn terminating(mut self) -> Self {
        self.stop_on_device_cancel = true;
        self
    }

    pub fn stop_after_cycles(mut self, cycles: usize) -> Self {
        self.cycle_limit = Some(cycles);
        self
    }

    pub fn device_waits(&self) -> usize {
        self.device_waits.load(Ordering::SeqCst)
    }

    pub fn device_waits_started(&self) -> usize {
        self.device_waits_started.load(Ordering::SeqCst)
    }

    pub fn cycle_waits(&self) -> usize {
        self.cycle_waits.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Scheduler for ManualScheduler {
    async fn wait(&self, _delay: Duration, point: SuspendPoint) -> Wake {
        if self.is_shutdown() {
            return Wake::Cancelled;
        }

        match point {
            SuspendPoint::DeviceWait => {
                let n = self.device_waits.fetch_add(1, Ordering::SeqCst) + 1;
                match self.device_wait_limit {
                    Some(limit) if n >= limit => {
                        if self.stop_on_device_cancel {
                            self.shutdown.store(true, Ordering::SeqCst);
                        }
                        Wake::Cancelled
                    }
                    _ => Wake::Elapsed,
                }
            }
            SuspendPoint::BetweenCycles => {
                let n = self.cycle_waits.fetch_add(1, Ordering::SeqCst) + 1;
                match self.cycle_limit {
                    Some(limit) if n >= limit => {
                        self.shutdown.store(true, Ordering::SeqCst);
                        Wake::Cancelled
                    }
                    _ => Wake::Elapsed,
                }
            }
        }
    }

    fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::SeqCst)
    }

    fn begin_device_wait(&self) {
        self.device_waits_started.fetch_add(1, Ordering::SeqCst);
    }
}
