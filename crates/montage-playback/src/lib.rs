//! Montage Playback - cursor/playback synchronization
//!
//! Bridges the timeline cursor and a media clock backend:
//! - A [`PlaybackClock`] trait for transport backends
//! - A [`Synchronizer`] state machine resolving the two feedback loops
//! - A gap ticker that advances the cursor through empty timeline

pub mod clock;
pub mod sync;
pub mod ticker;

pub use clock::{
    clock_channel, ClockEvent, PlaybackClock, SEEK_DEBOUNCE, SEEK_GUARD, SUPPRESS_THRESHOLD,
};
pub use sync::{SharedCursor, SyncState, Synchronizer, SEGMENT_END_EPSILON};
pub use ticker::{GapTick, GapTicker, TickerCancel, GAP_TICK_HZ};
