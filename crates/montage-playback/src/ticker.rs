//! Wall-clock ticker for advancing the cursor across gaps.
//!
//! When the cursor sits in empty timeline the media clock has nothing
//! to play, so a background thread posts ticks at a fixed rate and
//! the synchronizer advances the cursor itself. The thread stops
//! deterministically: cancellation is flagged first, then the thread
//! is joined, so no tick arrives after `cancel()` returns.

use crossbeam_channel::Sender;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::debug;

/// Gap advancement rate.
pub const GAP_TICK_HZ: u32 = 30;

/// One gap tick with the wall-clock time elapsed since the previous
/// tick (or since the ticker started).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GapTick {
    pub elapsed: Duration,
}

/// Handle for stopping the ticker thread.
#[derive(Debug, Clone)]
pub struct TickerCancel(Arc<AtomicBool>);

impl TickerCancel {
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

impl Default for TickerCancel {
    fn default() -> Self {
        Self::new()
    }
}

/// A running gap ticker thread.
pub struct GapTicker {
    cancel: TickerCancel,
    handle: Option<JoinHandle<()>>,
}

impl GapTicker {
    /// Spawn a ticker posting [`GapTick`]s into `sender` at
    /// [`GAP_TICK_HZ`].
    pub fn spawn(sender: Sender<GapTick>) -> Self {
        let cancel = TickerCancel::new();
        let flag = cancel.clone();
        let period = Duration::from_secs(1) / GAP_TICK_HZ;

        let handle = std::thread::Builder::new()
            .name("gap-ticker".into())
            .spawn(move || {
                let mut last = Instant::now();
                loop {
                    std::thread::sleep(period);
                    if flag.is_cancelled() {
                        break;
                    }
                    let now = Instant::now();
                    let tick = GapTick {
                        elapsed: now - last,
                    };
                    last = now;
                    if sender.send(tick).is_err() {
                        // Receiver gone, nothing left to drive.
                        break;
                    }
                }
                debug!("gap ticker stopped");
            })
            .ok();

        Self { cancel, handle }
    }

    /// Stop the ticker and wait for the thread to exit. Guarantees no
    /// further ticks are sent once this returns.
    pub fn cancel(mut self) {
        self.cancel.cancel();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

impl Drop for GapTicker {
    fn drop(&mut self) {
        self.cancel.cancel();
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
