// SPDX-License-Identifier: GPL-3.0-only

//! Scripted camera platform and decode engine for session tests

#![allow(dead_code)]

use async_trait::async_trait;
use camera_scanner::ScannerConfig;
use camera_scanner::backends::camera::types::{
    AcquireError, BackendResult, FillLightMode, MediaDeviceInfo, PermissionStatus,
    PhotoCapabilities, PlatformError, StreamConstraints, TrackCapabilities, TrackConstraint,
    ZoomRange,
};
use camera_scanner::backends::camera::types::VideoFrame;
use camera_scanner::backends::camera::{CameraPlatform, CaptureStream};
use camera_scanner::backends::virtual_camera::frame_from_rgba;
use camera_scanner::decoder::{DecodeEngine, DecodeHandle};
use camera_scanner::session::{CameraSession, DecodeGate, SessionEvent};
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{Notify, mpsc};

/// Pauses one acquisition until released
#[derive(Default)]
pub struct Hold {
    pub entered: Notify,
    pub release: Notify,
}

/// How a mock stream answers the first-frame wait
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FirstFrame {
    /// No first-frame signal on this platform
    #[default]
    Unsupported,
    Immediate,
    /// The signal exists but no frame ever arrives
    Never,
}

#[derive(Default)]
struct Script {
    devices: Vec<MediaDeviceInfo>,
    zooms: HashMap<String, ZoomRange>,
    permission: Option<PermissionStatus>,
    no_media_api: bool,
    track_torch: Option<bool>,
    reject_torch_constraint: bool,
    photo_fill_light: bool,
    acquire_results: VecDeque<Option<AcquireError>>,
    hold: Option<Arc<Hold>>,
    attach_hold: Option<Arc<Hold>>,
    block_playback: bool,
    first_frame: FirstFrame,
    requests: Vec<StreamConstraints>,
    streams: Vec<Arc<StreamState>>,
}

#[derive(Default)]
struct Counters {
    open: AtomicUsize,
    max_open: AtomicUsize,
    acquired: AtomicUsize,
    vibrations: AtomicUsize,
    attaches: AtomicUsize,
    detaches: AtomicUsize,
    preview_attached: AtomicBool,
}

/// Camera platform whose behavior is scripted per test
#[derive(Clone, Default)]
pub struct MockPlatform {
    script: Arc<Mutex<Script>>,
    counters: Arc<Counters>,
}

impl MockPlatform {
    pub fn with_labels(labels: &[(&str, &str)]) -> Self {
        let platform = Self::default();
        platform.set_devices(labels);
        platform
    }

    pub fn three_lens_phone() -> Self {
        Self::with_labels(&[
            ("back", "Back Camera"),
            ("wide", "Back Ultra Wide Camera"),
            ("front", "Front Camera"),
        ])
    }

    fn script(&self) -> std::sync::MutexGuard<'_, Script> {
        self.script.lock().unwrap()
    }

    pub fn set_devices(&self, labels: &[(&str, &str)]) {
        self.script().devices = labels
            .iter()
            .map(|(id, label)| MediaDeviceInfo::video(*id, *label))
            .collect();
    }

    pub fn set_zoom(&self, id: &str, min: f64, max: f64) {
        self.script()
            .zooms
            .insert(id.to_string(), ZoomRange { min, max });
    }

    pub fn set_permission(&self, status: PermissionStatus) {
        self.script().permission = Some(status);
    }

    pub fn remove_media_api(&self) {
        self.script().no_media_api = true;
    }

    pub fn set_track_torch(&self, torch: Option<bool>) {
        self.script().track_torch = torch;
    }

    pub fn reject_torch_constraint(&self) {
        self.script().reject_torch_constraint = true;
    }

    pub fn enable_photo_fill_light(&self) {
        self.script().photo_fill_light = true;
    }

    /// Queue outcomes for the next acquisitions (`None` succeeds)
    pub fn script_acquire(&self, results: impl IntoIterator<Item = Option<AcquireError>>) {
        self.script().acquire_results.extend(results);
    }

    /// Block the next acquisition until `Hold::release` is notified
    pub fn hold_next_acquire(&self) -> Arc<Hold> {
        let hold = Arc::new(Hold::default());
        self.script().hold = Some(Arc::clone(&hold));
        hold
    }

    /// Block the next preview attach until `Hold::release` is notified
    pub fn hold_next_attach(&self) -> Arc<Hold> {
        let hold = Arc::new(Hold::default());
        self.script().attach_hold = Some(Arc::clone(&hold));
        hold
    }

    /// Reject preview playback the way an autoplay policy does
    pub fn block_playback(&self) {
        self.script().block_playback = true;
    }

    /// First-frame behavior for streams acquired from now on
    pub fn set_first_frame(&self, first_frame: FirstFrame) {
        self.script().first_frame = first_frame;
    }

    pub fn preview_attached(&self) -> bool {
        self.counters.preview_attached.load(Ordering::SeqCst)
    }

    pub fn attaches(&self) -> usize {
        self.counters.attaches.load(Ordering::SeqCst)
    }

    pub fn detaches(&self) -> usize {
        self.counters.detaches.load(Ordering::SeqCst)
    }

    pub fn clear_requests(&self) {
        self.script().requests.clear();
    }

    pub fn requests(&self) -> Vec<StreamConstraints> {
        self.script().requests.clone()
    }

    pub fn open_streams(&self) -> usize {
        self.counters.open.load(Ordering::SeqCst)
    }

    pub fn max_open_streams(&self) -> usize {
        self.counters.max_open.load(Ordering::SeqCst)
    }

    pub fn acquisitions(&self) -> usize {
        self.counters.acquired.load(Ordering::SeqCst)
    }

    pub fn vibrations(&self) -> usize {
        self.counters.vibrations.load(Ordering::SeqCst)
    }

    /// State of the most recently acquired stream
    pub fn last_stream(&self) -> Arc<StreamState> {
        Arc::clone(self.script().streams.last().expect("no stream acquired"))
    }
}

#[async_trait]
impl CameraPlatform for MockPlatform {
    type Stream = MockStream;

    fn has_media_devices(&self) -> bool {
        !self.script().no_media_api
    }

    async fn enumerate_devices(&self) -> BackendResult<Vec<MediaDeviceInfo>> {
        Ok(self.script().devices.clone())
    }

    async fn query_permission(&self) -> Option<PermissionStatus> {
        self.script().permission
    }

    async fn acquire(&self, constraints: &StreamConstraints) -> Result<MockStream, AcquireError> {
        let hold = {
            let mut script = self.script();
            script.requests.push(constraints.clone());
            script.hold.take()
        };
        if let Some(hold) = hold {
            hold.entered.notify_one();
            hold.release.notified().await;
        }

        let state = {
            let mut script = self.script();
            if script.permission == Some(PermissionStatus::Denied) {
                return Err(AcquireError::NotAllowed("denied".into()));
            }
            if let Some(Some(error)) = script.acquire_results.pop_front() {
                return Err(error);
            }

            let device = match &constraints.device_id {
                Some(id) => script
                    .devices
                    .iter()
                    .find(|d| &d.id == id)
                    .ok_or_else(|| AcquireError::Overconstrained(format!("deviceId {}", id)))?,
                None => script
                    .devices
                    .first()
                    .ok_or_else(|| AcquireError::NotFound("no devices".into()))?,
            };

            let state = Arc::new(StreamState {
                device_id: device.id.clone(),
                zoom_range: script.zooms.get(&device.id).copied(),
                track_torch: script.track_torch,
                reject_torch_constraint: script.reject_torch_constraint,
                photo_fill_light: script.photo_fill_light,
                first_frame: script.first_frame,
                live: AtomicBool::new(true),
                torch_on: AtomicBool::new(false),
                zoom: Mutex::new(None),
            });
            script.streams.push(Arc::clone(&state));
            state
        };

        let open = self.counters.open.fetch_add(1, Ordering::SeqCst) + 1;
        self.counters.max_open.fetch_max(open, Ordering::SeqCst);
        self.counters.acquired.fetch_add(1, Ordering::SeqCst);

        Ok(MockStream {
            state,
            counters: Arc::clone(&self.counters),
        })
    }

    async fn attach_preview(&self, _stream: &MockStream) -> BackendResult<()> {
        let hold = self.script().attach_hold.take();
        if let Some(hold) = hold {
            hold.entered.notify_one();
            hold.release.notified().await;
        }
        self.counters.attaches.fetch_add(1, Ordering::SeqCst);
        self.counters.preview_attached.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn play_preview(&self) -> BackendResult<()> {
        if self.script().block_playback {
            return Err(PlatformError::PlaybackBlocked("autoplay not allowed".into()));
        }
        Ok(())
    }

    fn detach_preview(&self) {
        self.counters.detaches.fetch_add(1, Ordering::SeqCst);
        self.counters.preview_attached.store(false, Ordering::SeqCst);
    }

    fn vibrate(&self, _pulse: Duration) -> bool {
        self.counters.vibrations.fetch_add(1, Ordering::SeqCst);
        true
    }
}

/// Observable state of one mock stream
pub struct StreamState {
    pub device_id: String,
    zoom_range: Option<ZoomRange>,
    track_torch: Option<bool>,
    reject_torch_constraint: bool,
    photo_fill_light: bool,
    first_frame: FirstFrame,
    live: AtomicBool,
    torch_on: AtomicBool,
    zoom: Mutex<Option<f64>>,
}

impl StreamState {
    pub fn is_live(&self) -> bool {
        self.live.load(Ordering::SeqCst)
    }

    pub fn torch_on(&self) -> bool {
        self.torch_on.load(Ordering::SeqCst)
    }

    pub fn applied_zoom(&self) -> Option<f64> {
        *self.zoom.lock().unwrap()
    }
}

pub struct MockStream {
    state: Arc<StreamState>,
    counters: Arc<Counters>,
}

#[async_trait]
impl CaptureStream for MockStream {
    fn device_id(&self) -> Option<String> {
        Some(self.state.device_id.clone())
    }

    fn has_live_track(&self) -> bool {
        self.state.is_live()
    }

    async fn capabilities(&self) -> Option<TrackCapabilities> {
        Some(TrackCapabilities {
            torch: self.state.track_torch,
            zoom: self.state.zoom_range,
        })
    }

    async fn apply_constraints(&self, constraints: &[TrackConstraint]) -> BackendResult<()> {
        for constraint in constraints {
            match *constraint {
                TrackConstraint::Torch(on) => {
                    if self.state.reject_torch_constraint || self.state.track_torch != Some(true) {
                        return Err(PlatformError::Other("torch constraint rejected".into()));
                    }
                    self.state.torch_on.store(on, Ordering::SeqCst);
                }
                TrackConstraint::Zoom(level) => {
                    let zoom = self
                        .state
                        .zoom_range
                        .and_then(|range| range.clamp(level))
                        .ok_or_else(|| PlatformError::NotSupported("zoom".into()))?;
                    *self.state.zoom.lock().unwrap() = Some(zoom);
                }
            }
        }
        Ok(())
    }

    async fn photo_capabilities(&self) -> BackendResult<PhotoCapabilities> {
        if self.state.photo_fill_light {
            Ok(PhotoCapabilities {
                fill_light_modes: vec![FillLightMode::Off, FillLightMode::Flash],
            })
        } else {
            Err(PlatformError::NotSupported("photo capabilities".into()))
        }
    }

    async fn set_fill_light_mode(&self, mode: FillLightMode) -> BackendResult<()> {
        if !self.state.photo_fill_light {
            return Err(PlatformError::NotSupported("fill light".into()));
        }
        self.state
            .torch_on
            .store(mode == FillLightMode::Flash, Ordering::SeqCst);
        Ok(())
    }

    async fn wait_first_frame(&self) -> BackendResult<()> {
        match self.state.first_frame {
            FirstFrame::Unsupported => Err(PlatformError::NotSupported("first frame".into())),
            FirstFrame::Immediate => Ok(()),
            FirstFrame::Never => std::future::pending().await,
        }
    }

    fn stop_tracks(&self) {
        if self.state.live.swap(false, Ordering::SeqCst) {
            self.counters.open.fetch_sub(1, Ordering::SeqCst);
        }
    }
}

impl Drop for MockStream {
    fn drop(&mut self) {
        self.stop_tracks();
    }
}

/// Decode engine that hands its gates to the test
#[derive(Clone, Default)]
pub struct MockEngine {
    gates: Arc<Mutex<Vec<DecodeGate>>>,
    stopped: Arc<AtomicUsize>,
    native_torch: Option<Arc<AtomicBool>>,
    fail_start: Arc<AtomicBool>,
}

impl MockEngine {
    /// Engine with its own torch switch
    pub fn with_native_torch() -> Self {
        Self {
            native_torch: Some(Arc::new(AtomicBool::new(false))),
            ..Self::default()
        }
    }

    pub fn fail_next_start(&self) {
        self.fail_start.store(true, Ordering::SeqCst);
    }

    pub fn last_gate(&self) -> DecodeGate {
        self.gates.lock().unwrap().last().cloned().expect("decoder never started")
    }

    pub fn starts(&self) -> usize {
        self.gates.lock().unwrap().len()
    }

    pub fn stops(&self) -> usize {
        self.stopped.load(Ordering::SeqCst)
    }

    pub fn native_torch_on(&self) -> bool {
        self.native_torch
            .as_ref()
            .is_some_and(|t| t.load(Ordering::SeqCst))
    }
}

pub struct MockHandle {
    stopped: Arc<AtomicUsize>,
    done: AtomicBool,
    native_torch: Option<Arc<AtomicBool>>,
}

#[async_trait]
impl DecodeHandle for MockHandle {
    fn stop(&self) {
        if !self.done.swap(true, Ordering::SeqCst) {
            self.stopped.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn supports_torch(&self) -> bool {
        self.native_torch.is_some()
    }

    async fn set_torch(&self, on: bool) -> BackendResult<()> {
        match &self.native_torch {
            Some(torch) => {
                torch.store(on, Ordering::SeqCst);
                Ok(())
            }
            None => Err(PlatformError::NotSupported("decoder torch".into())),
        }
    }
}

#[async_trait]
impl DecodeEngine<MockStream> for MockEngine {
    type Handle = MockHandle;

    async fn start(&self, _stream: Arc<MockStream>, gate: DecodeGate) -> BackendResult<MockHandle> {
        if self.fail_start.swap(false, Ordering::SeqCst) {
            return Err(PlatformError::Other("decoder unavailable".into()));
        }
        self.gates.lock().unwrap().push(gate);
        Ok(MockHandle {
            stopped: Arc::clone(&self.stopped),
            done: AtomicBool::new(false),
            native_torch: self.native_torch.clone(),
        })
    }
}

pub type MockSession = CameraSession<MockPlatform, MockEngine>;

/// Config with auto start disabled so tests drive `start` explicitly
pub fn manual_config() -> ScannerConfig {
    ScannerConfig {
        auto_start: false,
        ..ScannerConfig::default()
    }
}

pub fn new_session(
    platform: &MockPlatform,
    engine: &MockEngine,
    config: ScannerConfig,
) -> (MockSession, mpsc::UnboundedReceiver<SessionEvent>) {
    CameraSession::new(platform.clone(), engine.clone(), config)
}

/// Drain every event currently queued
pub fn drain(events: &mut mpsc::UnboundedReceiver<SessionEvent>) -> Vec<SessionEvent> {
    let mut out = Vec::new();
    while let Ok(event) = events.try_recv() {
        out.push(event);
    }
    out
}

/// Let deferred probe tasks run (tests use paused time)
pub async fn settle() {
    tokio::time::sleep(Duration::from_secs(2)).await;
}

/// Render `text` as a QR code frame with `module` pixels per module
pub fn qr_frame(text: &str, module: u32) -> VideoFrame {
    let code = qrcode::QrCode::new(text.as_bytes()).expect("encodable payload");
    let modules = code.width() as u32;
    let colors = code.to_colors();
    let quiet = 4 * module;
    let side = modules * module + 2 * quiet;
    let symbol = quiet..quiet + modules * module;

    frame_from_rgba(image::RgbaImage::from_fn(side, side, |x, y| {
        let dark = symbol.contains(&x) && symbol.contains(&y) && {
            let (mx, my) = ((x - quiet) / module, (y - quiet) / module);
            colors[(my * modules + mx) as usize] == qrcode::Color::Dark
        };
        if dark {
            image::Rgba([0, 0, 0, 255])
        } else {
            image::Rgba([255, 255, 255, 255])
        }
    }))
}
