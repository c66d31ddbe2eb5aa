// SPDX-License-Identifier: GPL-3.0-only

//! Decode gate
//!
//! Sits between the decoding service and the session owner. The decoder
//! calls [`DecodeGate::on_tick`] once per processed frame; the gate drops
//! ticks that arrive while paused, after teardown or from a released stream,
//! debounces matches and forwards accepted results as [`SessionEvent`]s.

use super::signals::Signals;
use super::state::{ScanResult, SessionEvent};
use crate::decoder::DecodeTick;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, trace};

/// Haptic pulse callback (returns false when the host cannot vibrate)
pub(crate) type HapticFn = Arc<dyn Fn(Duration) -> bool + Send + Sync>;

/// What the gate did with a tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    /// Paused, torn down, or the stream that produced it is gone
    Ignored,
    /// Routine "no symbol in this frame"
    NoMatch,
    /// Non-routine decoder failure, traced only
    EngineError,
    /// Match inside the debounce window
    Debounced,
    /// Match forwarded to the caller
    Accepted,
}

/// State shared by every gate a session hands out
pub(crate) struct GateCore {
    signals: Arc<Signals>,
    window: Duration,
    haptic: Option<Duration>,
    vibrate: HapticFn,
    last_accepted: Mutex<Option<Instant>>,
    events: UnboundedSender<SessionEvent>,
}

impl GateCore {
    pub fn new(
        signals: Arc<Signals>,
        window: Duration,
        haptic: Option<Duration>,
        vibrate: HapticFn,
        events: UnboundedSender<SessionEvent>,
    ) -> Self {
        Self {
            signals,
            window,
            haptic,
            vibrate,
            last_accepted: Mutex::new(None),
            events,
        }
    }

    /// Forget the previous accepted result (new stream, fresh window)
    pub fn reset(&self) {
        *self
            .last_accepted
            .lock()
            .unwrap_or_else(|e| e.into_inner()) = None;
    }
}

/// Tick sink handed to the decoding service for one stream
#[derive(Clone)]
pub struct DecodeGate {
    core: Arc<GateCore>,
    generation: u64,
}

impl DecodeGate {
    pub(crate) fn new(core: Arc<GateCore>, generation: u64) -> Self {
        Self { core, generation }
    }

    /// Whether ticks delivered now would be considered at all
    pub fn is_open(&self) -> bool {
        self.core.signals.is_current(self.generation) && !self.core.signals.is_paused()
    }

    /// Handle one decoder tick
    pub fn on_tick(&self, tick: DecodeTick) -> GateDecision {
        self.on_tick_at(tick, Instant::now())
    }

    /// Handle one decoder tick observed at `now`
    pub fn on_tick_at(&self, tick: DecodeTick, now: Instant) -> GateDecision {
        if !self.is_open() {
            return GateDecision::Ignored;
        }

        let symbol = match tick {
            DecodeTick::NoMatch => return GateDecision::NoMatch,
            DecodeTick::EngineError(message) => {
                debug!(error = %message, "Decoder reported an error");
                return GateDecision::EngineError;
            }
            DecodeTick::Match(symbol) => symbol,
        };

        {
            let mut last = self
                .core
                .last_accepted
                .lock()
                .unwrap_or_else(|e| e.into_inner());
            if let Some(previous) = *last
                && now.saturating_duration_since(previous) < self.core.window
            {
                trace!(text = %symbol.text, "Match inside debounce window");
                return GateDecision::Debounced;
            }
            *last = Some(now);
        }

        info!(text = %symbol.text, format = ?symbol.format, "Accepted scan result");

        if let Some(pulse) = self.core.haptic
            && !(self.core.vibrate)(pulse)
        {
            trace!("Haptic feedback unavailable");
        }

        let result = ScanResult {
            text: symbol.text.clone(),
            raw: symbol,
            scanned_at: chrono::Local::now(),
        };
        if self.core.events.send(SessionEvent::Result(result)).is_err() {
            debug!("Result receiver dropped");
        }

        GateDecision::Accepted
    }
}

impl std::fmt::Debug for DecodeGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecodeGate")
            .field("generation", &self.generation)
            .field("open", &self.is_open())
            .finish()
    }
}
