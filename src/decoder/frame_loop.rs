// SPDX-License-Identifier: GPL-3.0-only

//! Task lifecycle management for decode loops
//!
//! A decode loop pulls frames from a stream's frame feed and runs one
//! iteration per frame until it is told to stop or the feed closes.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Action returned by a loop iteration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopAction {
    Continue,
    Stop,
}

/// Controller for a decode loop running on a tokio task
///
/// ```ignore
/// let controller = DecodeLoopController::start("qr-decode", rx, |frame| async move {
///     process(frame).await;
///     LoopAction::Continue
/// });
/// controller.stop();
/// ```
pub struct DecodeLoopController {
    handle: Mutex<Option<JoinHandle<()>>>,
    stop_signal: Arc<AtomicBool>,
    name: String,
}

impl DecodeLoopController {
    /// Spawn a loop calling `step` for every item received on `rx`
    pub fn start<T, F, Fut>(name: &str, mut rx: tokio::sync::mpsc::Receiver<T>, mut step: F) -> Self
    where
        T: Send + 'static,
        F: FnMut(T) -> Fut + Send + 'static,
        Fut: Future<Output = LoopAction> + Send + 'static,
    {
        let stop_signal = Arc::new(AtomicBool::new(false));
        let stop_signal_clone = Arc::clone(&stop_signal);
        let name_clone = name.to_string();

        info!(name = %name, "Starting decode loop");

        let handle = tokio::spawn(async move {
            while let Some(item) = rx.recv().await {
                if stop_signal_clone.load(Ordering::Acquire) {
                    debug!(name = %name_clone, "Stop signal received");
                    break;
                }
                if step(item).await == LoopAction::Stop {
                    debug!(name = %name_clone, "Loop requested stop");
                    break;
                }
            }
            debug!(name = %name_clone, "Decode loop exiting");
        });

        Self {
            handle: Mutex::new(Some(handle)),
            stop_signal,
            name: name.to_string(),
        }
    }

    pub fn is_running(&self) -> bool {
        !self.stop_signal.load(Ordering::Acquire)
            && self
                .handle
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .as_ref()
                .is_some_and(|h| !h.is_finished())
    }

    /// Signal the loop to stop and abort its task. Idempotent.
    pub fn stop(&self) {
        if self.stop_signal.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Some(handle) = self
            .handle
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
        {
            handle.abort();
        }
        info!(name = %self.name, "Decode loop stopped");
    }
}

impl Drop for DecodeLoopController {
    fn drop(&mut self) {
        self.stop();
    }
}
