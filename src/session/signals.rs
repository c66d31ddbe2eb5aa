// SPDX-License-Identifier: GPL-3.0-only

//! Liveness flags shared between the session, its decode gate and
//! deferred tasks

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

/// Mounted flag, stream generation and visibility pause
///
/// Every `stop` bumps the generation. Work that started under an older
/// generation (a late acquisition, a deferred probe, decoder ticks from a
/// released stream) compares its captured generation against the current one
/// and discards itself on mismatch.
#[derive(Debug)]
pub(crate) struct Signals {
    mounted: AtomicBool,
    generation: AtomicU64,
    paused: AtomicBool,
}

impl Signals {
    pub fn new() -> Self {
        Self {
            mounted: AtomicBool::new(true),
            generation: AtomicU64::new(0),
            paused: AtomicBool::new(false),
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Invalidate all in-flight work. Returns the new generation.
    pub fn invalidate(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::AcqRel) + 1
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted.load(Ordering::Acquire)
    }

    pub fn unmount(&self) {
        self.mounted.store(false, Ordering::Release);
    }

    /// Still mounted and still the wanted generation
    pub fn is_current(&self, generation: u64) -> bool {
        self.is_mounted() && self.generation() == generation
    }

    pub fn is_paused(&self) -> bool {
        self.paused.load(Ordering::Acquire)
    }

    pub fn set_paused(&self, paused: bool) {
        self.paused.store(paused, Ordering::Release);
    }
}
