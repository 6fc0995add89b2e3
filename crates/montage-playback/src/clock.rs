//! Playback clock abstraction.
//!
//! The synchronizer drives any backend implementing [`PlaybackClock`]
//! (a media player binding in the application, a manual clock in
//! tests). Backends report asynchronously through [`ClockEvent`]
//! values posted into a channel; the synchronizer drains that channel
//! on the owning thread, so backend callback threads never touch
//! timeline state directly.

use crossbeam_channel::{unbounded, Receiver, Sender};
use montage_core::Result;
use std::time::Duration;

/// Position reports closer together than this are treated as echoes
/// of our own playback progress rather than user seeks.
pub const SUPPRESS_THRESHOLD: Duration = Duration::from_millis(50);

/// After issuing a seek, position reports inside this window are
/// stale values from before the seek landed and are dropped.
pub const SEEK_GUARD: Duration = Duration::from_millis(100);

/// Minimum spacing between seeks sent to the backend. Rapid scrubs
/// coalesce: only the latest target is flushed once the window ends.
pub const SEEK_DEBOUNCE: Duration = Duration::from_millis(100);

/// Notifications a clock backend posts to the synchronizer.
#[derive(Debug, Clone, PartialEq)]
pub enum ClockEvent {
    /// Media position changed, in seconds from the start of the
    /// loaded source.
    TimeChanged(f64),
    /// Playing (true) or paused/stopped (false).
    PlayStateChanged(bool),
    /// A source finished loading and is ready to play.
    MediaLoaded,
    /// The loaded source played to its end.
    EndReached,
    /// Backend failure. Playback continues in gap mode.
    Error(String),
}

/// Channel pair a backend uses to report events.
pub fn clock_channel() -> (Sender<ClockEvent>, Receiver<ClockEvent>) {
    unbounded()
}

/// Transport control over a single loaded media source.
///
/// Commands are synchronous requests; position and state feedback
/// arrives later as [`ClockEvent`]s on the backend's event channel.
pub trait PlaybackClock: Send {
    /// Load a media file, replacing any current source.
    fn load(&mut self, path: &str) -> Result<()>;

    fn play(&mut self) -> Result<()>;

    fn pause(&mut self) -> Result<()>;

    fn stop(&mut self) -> Result<()>;

    /// Jump to a position in seconds within the loaded source.
    fn seek(&mut self, position: f64) -> Result<()>;

    /// Last known media position in seconds.
    fn current_time(&self) -> f64;

    /// Duration of the loaded source, if known.
    fn duration(&self) -> Option<f64>;

    /// Linear volume, 0.0 to 1.0.
    fn set_volume(&mut self, volume: f64);

    fn set_muted(&mut self, muted: bool);
}
