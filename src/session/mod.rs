// SPDX-License-Identifier: GPL-3.0-only

//! Camera session manager
//!
//! [`CameraSession`] owns the device catalog, the single active capture
//! stream and the decode gate. All state lives behind one mutex that is
//! never held across an `.await`; observers read it through
//! [`SessionSnapshot`]s published on a watch channel, and scan results and
//! structural errors arrive on an event channel returned by
//! [`CameraSession::new`].
//!
//! ```text
//!   initialize / retry_discovery
//!            |
//!            v
//!   catalog::discover ──► CatalogSnapshot
//!            |
//!   start(mode) ──► acquire_with_fallback ──► attach/play preview
//!            |                                      |
//!            |                       DecodeEngine::start(stream, gate)
//!            v                                      |
//!        Running ◄──────────────────────────────────┘
//!            |
//!            ├─► probe task: first frame ─► torch support ─► lens zoom
//!            └─► gate: tick ─► debounce ─► SessionEvent::Result + haptic
//! ```
//!
//! Every `stop` bumps a generation counter. `start` captures its generation
//! and re-checks it after each suspension point, so a stop or teardown that
//! lands mid-acquisition releases the late stream instead of going live.

pub mod capability;
pub mod catalog;
pub mod constraints;
pub mod gate;
pub(crate) mod signals;
pub mod state;
pub mod torch;

pub use catalog::{CatalogSnapshot, Discovery, DiscoveryError, classify_label};
pub use constraints::{AcquirePlan, AcquireStrategy, CaptureHints};
pub use gate::{DecodeGate, GateDecision};
pub use state::{
    CameraDevice, CameraMode, LensRole, ScanResult, SessionEvent, SessionSnapshot, SessionState,
    TorchState,
};
pub use torch::TorchMethod;

use crate::backends::camera::types::PermissionStatus;
use crate::backends::camera::{CameraPlatform, CaptureStream};
use crate::config::ScannerConfig;
use crate::decoder::{DecodeEngine, DecodeHandle};
use crate::errors::{SessionError, SessionResult};
use gate::{GateCore, HapticFn};
use signals::Signals;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use tokio::sync::{mpsc, watch};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// The live capture stream and the decode loop attached to it
struct ActiveStream<S, H> {
    stream: Arc<S>,
    decoder: Arc<H>,
    generation: u64,
    device_id: Option<String>,
}

impl<S: CaptureStream, H: DecodeHandle> ActiveStream<S, H> {
    /// Stop decoding, stop every track and detach the preview
    fn release<P: CameraPlatform>(self, platform: &P) {
        self.decoder.stop();
        self.stream.stop_tracks();
        platform.detach_preview();
        debug!(
            device = ?self.device_id,
            generation = self.generation,
            "Released capture stream"
        );
    }
}

struct Shared<S, H> {
    state: SessionState,
    catalog: CatalogSnapshot,
    selected_device_id: Option<String>,
    mode: CameraMode,
    torch: TorchState,
    permission: PermissionStatus,
    active: Option<ActiveStream<S, H>>,
}

struct Inner<P, D>
where
    P: CameraPlatform,
    D: DecodeEngine<P::Stream>,
{
    id: Uuid,
    platform: Arc<P>,
    engine: D,
    config: ScannerConfig,
    signals: Arc<Signals>,
    gate_core: Arc<GateCore>,
    shared: Mutex<Shared<P::Stream, D::Handle>>,
    snapshot_tx: watch::Sender<SessionSnapshot>,
    events: mpsc::UnboundedSender<SessionEvent>,
}

impl<P, D> Inner<P, D>
where
    P: CameraPlatform,
    D: DecodeEngine<P::Stream>,
{
    fn lock(&self) -> MutexGuard<'_, Shared<P::Stream, D::Handle>> {
        self.shared.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Publish the observable view of `shared`, notifying only on change
    fn publish(&self, shared: &Shared<P::Stream, D::Handle>) {
        let snapshot = SessionSnapshot {
            devices: shared.catalog.devices.clone(),
            selected_device_id: shared.selected_device_id.clone(),
            mode: shared.mode,
            is_starting: shared.state == SessionState::Starting,
            is_running: shared.state == SessionState::Running,
            torch_supported: shared.torch.supported,
            torch_on: shared.torch.on,
            permission_status: shared.permission,
            paused: self.signals.is_paused(),
        };
        self.snapshot_tx.send_if_modified(|current| {
            if *current == snapshot {
                false
            } else {
                *current = snapshot;
                true
            }
        });
    }

    /// Surface a structural failure, unless the session is gone
    fn emit_error(&self, error: &SessionError) {
        if !error.is_structural() || !self.signals.is_mounted() {
            return;
        }
        warn!(session = %self.id, error = %error, "Camera session error");
        if self.events.send(SessionEvent::Error(error.clone())).is_err() {
            debug!("Event receiver dropped");
        }
    }

    fn stop(&self) {
        let generation = self.signals.invalidate();
        let active = {
            let mut shared = self.lock();
            let active = shared.active.take();
            if shared.state == SessionState::Running {
                shared.state = SessionState::Idle;
            }
            shared.torch = TorchState::default();
            self.publish(&shared);
            active
        };
        if let Some(active) = active {
            active.release(&*self.platform);
            info!(session = %self.id, generation, "Camera session stopped");
        }
    }
}

impl<P, D> Drop for Inner<P, D>
where
    P: CameraPlatform,
    D: DecodeEngine<P::Stream>,
{
    fn drop(&mut self) {
        self.signals.unmount();
        let shared = self.shared.get_mut().unwrap_or_else(|e| e.into_inner());
        if let Some(active) = shared.active.take() {
            active.release(&*self.platform);
        }
    }
}

/// Moves the session out of `Starting` whichever way a start attempt ends
struct StartingGuard<'a, P, D>
where
    P: CameraPlatform,
    D: DecodeEngine<P::Stream>,
{
    inner: &'a Inner<P, D>,
    armed: bool,
}

impl<P, D> StartingGuard<'_, P, D>
where
    P: CameraPlatform,
    D: DecodeEngine<P::Stream>,
{
    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl<P, D> Drop for StartingGuard<'_, P, D>
where
    P: CameraPlatform,
    D: DecodeEngine<P::Stream>,
{
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut shared = self.inner.lock();
        if shared.state == SessionState::Starting {
            shared.state = SessionState::Idle;
            shared.torch = TorchState::default();
            self.inner.publish(&shared);
        }
    }
}

/// Camera session manager
///
/// Cheap to clone; clones share the same session. Dropping the last clone
/// releases any live stream.
pub struct CameraSession<P, D>
where
    P: CameraPlatform,
    D: DecodeEngine<P::Stream>,
{
    inner: Arc<Inner<P, D>>,
}

impl<P, D> Clone for CameraSession<P, D>
where
    P: CameraPlatform,
    D: DecodeEngine<P::Stream>,
{
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<P, D> CameraSession<P, D>
where
    P: CameraPlatform,
    D: DecodeEngine<P::Stream>,
{
    /// Create an idle session. Returns the session and its event receiver.
    pub fn new(
        platform: P,
        engine: D,
        config: ScannerConfig,
    ) -> (Self, mpsc::UnboundedReceiver<SessionEvent>) {
        let id = Uuid::new_v4();
        let platform = Arc::new(platform);
        let signals = Arc::new(Signals::new());
        let (events, events_rx) = mpsc::unbounded_channel();

        let vibrate_platform = Arc::clone(&platform);
        let vibrate: HapticFn = Arc::new(move |pulse| vibrate_platform.vibrate(pulse));
        let gate_core = Arc::new(GateCore::new(
            Arc::clone(&signals),
            config.debounce_window(),
            config.haptic_pulse(),
            vibrate,
            events.clone(),
        ));

        let initial = SessionSnapshot {
            mode: config.initial_mode,
            ..SessionSnapshot::default()
        };
        let (snapshot_tx, _) = watch::channel(initial);

        let shared = Shared {
            state: SessionState::Idle,
            catalog: CatalogSnapshot::default(),
            selected_device_id: None,
            mode: config.initial_mode,
            torch: TorchState::default(),
            permission: PermissionStatus::Unknown,
            active: None,
        };

        info!(session = %id, "Camera session created");

        let inner = Inner {
            id,
            platform,
            engine,
            config,
            signals,
            gate_core,
            shared: Mutex::new(shared),
            snapshot_tx,
            events,
        };
        (
            Self {
                inner: Arc::new(inner),
            },
            events_rx,
        )
    }

    /// Session id used in log records
    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    pub fn config(&self) -> &ScannerConfig {
        &self.inner.config
    }

    pub fn platform(&self) -> &P {
        &self.inner.platform
    }

    /// Current observable state
    pub fn snapshot(&self) -> SessionSnapshot {
        self.inner.snapshot_tx.borrow().clone()
    }

    /// Watch every observable state change
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.inner.snapshot_tx.subscribe()
    }

    pub fn state(&self) -> SessionState {
        self.inner.lock().state
    }

    pub fn catalog(&self) -> CatalogSnapshot {
        self.inner.lock().catalog.clone()
    }

    /// Discover cameras, then auto-start when configured to
    ///
    /// A running session is stopped first; discovery opens its own
    /// priming stream.
    pub async fn initialize(&self) -> SessionResult<()> {
        if !self.inner.signals.is_mounted() {
            return Ok(());
        }
        self.inner.stop();
        self.refresh_catalog().await?;
        if self.inner.config.auto_start {
            self.start(self.inner.config.initial_mode).await?;
        }
        Ok(())
    }

    /// Clear the current selection and run discovery from scratch
    pub async fn retry_discovery(&self) -> SessionResult<()> {
        if !self.inner.signals.is_mounted() {
            return Ok(());
        }
        info!(session = %self.inner.id, "Retrying camera discovery");
        self.inner.stop();
        let mode = {
            let mut shared = self.inner.lock();
            shared.catalog = CatalogSnapshot::default();
            shared.selected_device_id = None;
            self.inner.publish(&shared);
            shared.mode
        };
        self.refresh_catalog().await?;
        if self.inner.config.auto_start {
            self.start(mode).await?;
        }
        Ok(())
    }

    async fn refresh_catalog(&self) -> SessionResult<()> {
        let inner = &*self.inner;
        if !inner.signals.is_mounted() {
            return Ok(());
        }

        let outcome = catalog::discover(&*inner.platform).await;
        if !inner.signals.is_mounted() {
            return Ok(());
        }

        match outcome {
            Ok(discovery) => {
                let mut shared = inner.lock();
                shared.catalog = discovery.catalog;
                shared.permission = discovery.permission;
                if let Some(id) = shared.selected_device_id.as_deref()
                    && !shared.catalog.devices.iter().any(|d| d.id == id)
                {
                    debug!(device = id, "Selected camera no longer present");
                    shared.selected_device_id = None;
                }
                inner.publish(&shared);
                Ok(())
            }
            Err(failure) => {
                {
                    let mut shared = inner.lock();
                    shared.catalog = CatalogSnapshot::default();
                    shared.permission = failure.permission;
                    inner.publish(&shared);
                }
                inner.emit_error(&failure.error);
                Err(failure.error)
            }
        }
    }

    /// Start capture and decoding for `mode`
    pub async fn start(&self, mode: CameraMode) -> SessionResult<()> {
        self.start_with_device(mode, None).await
    }

    /// Start capture, preferring `device_hint` over the catalog's choice
    ///
    /// Returns immediately when a session is already starting or running.
    /// A stop or teardown that lands while this is in flight wins: the
    /// stream acquired late is released and `Ok(())` is returned.
    pub async fn start_with_device(
        &self,
        mode: CameraMode,
        device_hint: Option<&str>,
    ) -> SessionResult<()> {
        let inner = &*self.inner;
        if !inner.signals.is_mounted() {
            return Ok(());
        }

        let (generation, previous, target) = {
            let mut shared = inner.lock();
            if shared.state != SessionState::Idle {
                debug!(state = ?shared.state, "Start ignored, session busy");
                return Ok(());
            }
            if shared.permission == PermissionStatus::Denied {
                drop(shared);
                let error = SessionError::PermissionDenied;
                inner.emit_error(&error);
                return Err(error);
            }

            shared.state = SessionState::Starting;
            shared.torch = TorchState::default();
            shared.mode = mode;
            let target = device_hint
                .map(str::to_string)
                .or_else(|| shared.catalog.device_for_mode(mode).map(str::to_string));
            let previous = shared.active.take();
            inner.publish(&shared);
            (inner.signals.invalidate(), previous, target)
        };
        let mut guard = StartingGuard { inner, armed: true };

        if let Some(previous) = previous {
            previous.release(&*inner.platform);
        }

        info!(
            session = %inner.id,
            ?mode,
            device = ?target,
            generation,
            "Starting camera session"
        );

        let plan = AcquirePlan {
            device_id: target.clone(),
            facing: mode.facing(),
            hints: CaptureHints {
                width: inner.config.preferred_width,
                height: inner.config.preferred_height,
                frame_rate: inner.config.preferred_frame_rate,
            },
        };

        let (stream, strategy) =
            match constraints::acquire_with_fallback(&*inner.platform, &plan).await {
                Ok(acquired) => acquired,
                Err(error) => {
                    if !inner.signals.is_current(generation) {
                        debug!(error = %error, "Acquisition failed after cancellation");
                        return Ok(());
                    }
                    if error == SessionError::PermissionDenied {
                        let mut shared = inner.lock();
                        shared.permission = PermissionStatus::Denied;
                        inner.publish(&shared);
                    }
                    inner.emit_error(&error);
                    return Err(error);
                }
            };
        let stream = Arc::new(stream);

        if !inner.signals.is_current(generation) {
            info!(session = %inner.id, "Start cancelled, releasing late stream");
            stream.stop_tracks();
            return Ok(());
        }

        if let Err(e) = inner.platform.attach_preview(&*stream).await {
            warn!(error = %e, "Preview attach failed, continuing headless");
        }
        if !inner.signals.is_current(generation) {
            info!(session = %inner.id, "Start cancelled during preview attach");
            stream.stop_tracks();
            inner.platform.detach_preview();
            return Ok(());
        }

        if let Err(e) = inner.platform.play_preview().await {
            warn!(error = %e, "Preview playback did not start");
        }

        inner.gate_core.reset();
        let gate = DecodeGate::new(Arc::clone(&inner.gate_core), generation);
        let decoder = match inner.engine.start(Arc::clone(&stream), gate).await {
            Ok(handle) => Arc::new(handle),
            Err(e) => {
                stream.stop_tracks();
                inner.platform.detach_preview();
                if !inner.signals.is_current(generation) {
                    return Ok(());
                }
                let error =
                    SessionError::StreamAcquisitionFailed(format!("decoder failed to start: {}", e));
                inner.emit_error(&error);
                return Err(error);
            }
        };

        let (resolved, device_id) = {
            let mut shared = inner.lock();
            if !inner.signals.is_current(generation) {
                drop(shared);
                info!(session = %inner.id, "Start cancelled before going live");
                decoder.stop();
                stream.stop_tracks();
                inner.platform.detach_preview();
                return Ok(());
            }

            let device_id = stream.device_id().or(target);
            let resolved = match mode {
                CameraMode::Auto => device_id
                    .as_deref()
                    .and_then(|id| shared.catalog.role_of(id))
                    .map(CameraMode::from)
                    .unwrap_or(CameraMode::BackMain),
                concrete => concrete,
            };

            shared.state = SessionState::Running;
            shared.mode = resolved;
            shared.selected_device_id = device_id.clone();
            shared.active = Some(ActiveStream {
                stream: Arc::clone(&stream),
                decoder: Arc::clone(&decoder),
                generation,
                device_id: device_id.clone(),
            });
            guard.disarm();
            inner.publish(&shared);
            (resolved, device_id)
        };

        info!(
            session = %inner.id,
            device = ?device_id,
            mode = ?resolved,
            ?strategy,
            "Camera session running"
        );

        self.spawn_probe(generation, stream, decoder.supports_torch(), resolved);
        Ok(())
    }

    /// Deferred capability probe and lens zoom bias for a live stream
    fn spawn_probe(
        &self,
        generation: u64,
        stream: Arc<P::Stream>,
        decoder_torch: bool,
        mode: CameraMode,
    ) {
        let weak: Weak<Inner<P, D>> = Arc::downgrade(&self.inner);
        let signals = Arc::clone(&self.inner.signals);
        let timeout = self.inner.config.probe_timeout();
        let fallback_delay = self.inner.config.probe_fallback_delay();

        tokio::spawn(async move {
            capability::wait_until_stable(&*stream, timeout, fallback_delay).await;
            if !signals.is_current(generation) {
                return;
            }

            let supported = decoder_torch || capability::probe_torch(&*stream).await;
            {
                let Some(inner) = weak.upgrade() else {
                    return;
                };
                let mut shared = inner.lock();
                if !inner.signals.is_current(generation) {
                    return;
                }
                shared.torch.supported = supported;
                inner.publish(&shared);
                debug!(session = %inner.id, torch = supported, "Capability probe complete");
            }

            if signals.is_current(generation) {
                capability::apply_lens_zoom(&*stream, mode).await;
            }
        });
    }

    /// Release the active stream. Idempotent; safe when idle.
    ///
    /// A start in flight is cancelled and will release whatever it
    /// acquires.
    pub fn stop(&self) {
        self.inner.stop();
    }

    /// Stop, then start with `mode`
    ///
    /// Ignored while a start is already in flight.
    pub async fn switch_to(&self, mode: CameraMode) -> SessionResult<()> {
        if !self.inner.signals.is_mounted() {
            return Ok(());
        }
        if self.state() == SessionState::Starting {
            debug!(?mode, "Switch ignored, start in flight");
            return Ok(());
        }
        info!(session = %self.inner.id, ?mode, "Switching camera");
        self.inner.stop();
        self.start(mode).await
    }

    /// Flip the torch. No-op unless running with torch support.
    pub async fn toggle_torch(&self) -> SessionResult<()> {
        let inner = &*self.inner;
        if !inner.signals.is_mounted() {
            return Ok(());
        }

        let (stream, decoder, generation, target) = {
            let shared = inner.lock();
            if shared.state != SessionState::Running || !shared.torch.supported {
                return Ok(());
            }
            let Some(active) = shared.active.as_ref() else {
                return Ok(());
            };
            (
                Arc::clone(&active.stream),
                Arc::clone(&active.decoder),
                active.generation,
                !shared.torch.on,
            )
        };

        match torch::set_torch(&*stream, &*decoder, target).await {
            Ok(_) => {
                let mut shared = inner.lock();
                if inner.signals.is_current(generation) {
                    shared.torch.on = target;
                    inner.publish(&shared);
                }
                Ok(())
            }
            Err(error) => {
                if inner.signals.is_current(generation) {
                    inner.emit_error(&error);
                }
                Err(error)
            }
        }
    }

    /// Soft-pause result delivery while the host view is hidden
    ///
    /// Hardware stays open; only the gate stops forwarding.
    pub fn set_visibility(&self, hidden: bool) {
        if !self.inner.signals.is_mounted() {
            return;
        }
        self.inner.signals.set_paused(hidden);
        debug!(session = %self.inner.id, hidden, "Visibility changed");
        let shared = self.inner.lock();
        self.inner.publish(&shared);
    }

    /// Permission change notification from the platform
    ///
    /// A revocation stops the running session.
    pub fn set_permission_status(&self, status: PermissionStatus) {
        if !self.inner.signals.is_mounted() {
            return;
        }
        {
            let mut shared = self.inner.lock();
            if shared.permission == status {
                return;
            }
            shared.permission = status;
            self.inner.publish(&shared);
        }
        info!(session = %self.inner.id, ?status, "Camera permission changed");
        if status == PermissionStatus::Denied {
            self.inner.stop();
        }
    }

    /// Unmount the session and release all hardware
    ///
    /// Every later command is a no-op and no further events are emitted.
    pub fn teardown(&self) {
        if !self.inner.signals.is_mounted() {
            return;
        }
        info!(session = %self.inner.id, "Tearing down camera session");
        self.inner.signals.unmount();
        self.inner.stop();
    }
}
