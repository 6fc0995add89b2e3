//! Cursor/playback synchronizer.
//!
//! Keeps the timeline cursor and the media clock pointing at the same
//! moment. Two feedback loops meet here and must not fight each
//! other: playback progress moves the cursor, and user cursor moves
//! seek playback. Echo suppression and a post-seek guard window keep
//! the loops from oscillating.
//!
//! All mutation happens on the thread that owns the [`Synchronizer`].
//! Clock backends and the gap ticker run on their own threads but
//! only post messages into channels; [`Synchronizer::pump`] drains
//! them.

use montage_core::{RationalTime, Result};
use montage_timeline::{SegmentId, TrackManager};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use crate::clock::{ClockEvent, PlaybackClock, SEEK_DEBOUNCE, SEEK_GUARD, SUPPRESS_THRESHOLD};
use crate::ticker::{GapTick, GapTicker};

/// Media positions this close to the active segment's end count as
/// the end. Clock backends report on a coarse grain and rarely land
/// on the exact boundary.
pub const SEGMENT_END_EPSILON: f64 = 0.010;

// ── Shared cursor ───────────────────────────────────────────────

/// Lock-free cursor snapshot for readers on other threads (UI paint,
/// status displays). Written only by the synchronizer.
#[derive(Debug, Default)]
pub struct SharedCursor {
    position_bits: AtomicU64,
    playing: AtomicBool,
}

impl SharedCursor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cursor position in seconds.
    pub fn position(&self) -> f64 {
        f64::from_bits(self.position_bits.load(Ordering::Relaxed))
    }

    pub fn set_position(&self, seconds: f64) {
        self.position_bits.store(seconds.to_bits(), Ordering::Relaxed);
    }

    pub fn is_playing(&self) -> bool {
        self.playing.load(Ordering::Relaxed)
    }

    pub fn set_playing(&self, playing: bool) {
        self.playing.store(playing, Ordering::Relaxed);
    }
}

// ── State machine ───────────────────────────────────────────────

/// Where the synchronizer currently is.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SyncState {
    /// Not playing. Cursor moves only by user action.
    Idle,
    /// The media clock is playing `active` and drives the cursor.
    PlayingSegment { active: SegmentId },
    /// Cursor is in empty timeline; the gap ticker drives it.
    PlayingGap,
    /// A seek was issued; position reports are stale until the guard
    /// window passes.
    Seeking { since: Instant },
}

/// Geometry snapshot of a segment, taken under the manager lock so
/// the lock is never held across clock calls.
#[derive(Debug, Clone)]
struct ActiveSegment {
    id: SegmentId,
    path: String,
    timeline_start: f64,
    timeline_end: f64,
    source_start: f64,
    volume: f64,
    muted: bool,
}

// ── Synchronizer ────────────────────────────────────────────────

pub struct Synchronizer {
    manager: Arc<Mutex<TrackManager>>,
    clock: Box<dyn PlaybackClock>,
    state: SyncState,
    shared: Arc<SharedCursor>,
    clock_rx: crossbeam_channel::Receiver<ClockEvent>,
    tick_tx: crossbeam_channel::Sender<GapTick>,
    tick_rx: crossbeam_channel::Receiver<GapTick>,
    ticker: Option<GapTicker>,
    /// When the most recent seek was sent to the clock.
    last_seek: Option<Instant>,
    /// Latest coalesced seek target waiting for the debounce window.
    pending_seek: Option<f64>,
    /// Segment to resume into once a seek's guard window passes.
    seek_resume: Option<SegmentId>,
}

impl Synchronizer {
    /// `clock_rx` is the receiving half of the channel the clock
    /// backend posts [`ClockEvent`]s into.
    pub fn new(
        manager: Arc<Mutex<TrackManager>>,
        clock: Box<dyn PlaybackClock>,
        clock_rx: crossbeam_channel::Receiver<ClockEvent>,
    ) -> Self {
        let (tick_tx, tick_rx) = crossbeam_channel::unbounded();
        Self {
            manager,
            clock,
            state: SyncState::Idle,
            shared: Arc::new(SharedCursor::new()),
            clock_rx,
            tick_tx,
            tick_rx,
            ticker: None,
            last_seek: None,
            pending_seek: None,
            seek_resume: None,
        }
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    /// Handle other threads read the cursor through.
    pub fn shared(&self) -> Arc<SharedCursor> {
        Arc::clone(&self.shared)
    }

    // ── Transport ───────────────────────────────────────────────

    /// Start playback from the current cursor position.
    pub fn play(&mut self) -> Result<()> {
        let cursor = self.shared.position();
        self.shared.set_playing(true);
        match self.segment_at(cursor, None) {
            Some(info) => self.start_segment(&info, cursor),
            None => {
                self.enter_gap();
                Ok(())
            }
        }
    }

    /// Pause in place. The gap ticker is stopped and drained before
    /// the state changes, so no late tick moves the cursor afterward.
    pub fn pause(&mut self) -> Result<()> {
        self.stop_ticker();
        self.shared.set_playing(false);
        self.state = SyncState::Idle;
        self.clock.pause()
    }

    /// Stop playback, leaving the cursor where it is.
    pub fn stop(&mut self) -> Result<()> {
        self.stop_ticker();
        self.shared.set_playing(false);
        self.state = SyncState::Idle;
        self.clock.stop()
    }

    // ── Message pump ────────────────────────────────────────────

    /// Drain pending ticks and clock events, and flush any seek held
    /// by the debounce window. Call regularly from the owning thread.
    pub fn pump(&mut self) {
        while let Ok(tick) = self.tick_rx.try_recv() {
            self.handle_gap_tick(tick);
        }
        while let Ok(event) = self.clock_rx.try_recv() {
            self.handle_clock_event(event);
        }
        self.resolve_elapsed_seek();
        self.flush_pending_seek();
    }

    /// React to a cursor move made outside the synchronizer (user
    /// click or drag on the timeline).
    ///
    /// Moves that land within [`SUPPRESS_THRESHOLD`] of the playback
    /// position while playing are echoes of our own progress reports
    /// and are ignored; anything else is a seek request.
    pub fn on_cursor_moved(&mut self, new: RationalTime) {
        let target = new.to_seconds_f64();
        if self.shared.is_playing()
            && (target - self.shared.position()).abs() < SUPPRESS_THRESHOLD.as_secs_f64()
        {
            return;
        }
        self.request_seek(target);
    }

    // ── Clock events ────────────────────────────────────────────

    fn handle_clock_event(&mut self, event: ClockEvent) {
        match event {
            ClockEvent::TimeChanged(media_pos) => self.on_media_time(media_pos),
            ClockEvent::PlayStateChanged(playing) => {
                // In gap mode the clock is intentionally paused while
                // we are still "playing" from the user's view.
                if !matches!(self.state, SyncState::PlayingGap) {
                    self.shared.set_playing(playing);
                }
            }
            ClockEvent::MediaLoaded => debug!("media loaded"),
            ClockEvent::EndReached => self.finish_active_segment(),
            ClockEvent::Error(message) => {
                warn!(%message, "clock backend error");
                if self.shared.is_playing() {
                    self.enter_gap();
                } else {
                    self.state = SyncState::Idle;
                }
            }
        }
    }

    fn on_media_time(&mut self, media_pos: f64) {
        // Reports inside the guard window describe the pre-seek
        // position; dropping them prevents the cursor jumping back.
        if let Some(last) = self.last_seek {
            if last.elapsed() < SEEK_GUARD {
                return;
            }
        }

        self.resolve_elapsed_seek();

        let SyncState::PlayingSegment { active } = self.state else {
            return;
        };
        let Some(info) = self.segment_by_id(active) else {
            // Segment deleted mid-playback.
            self.enter_gap();
            return;
        };

        let timeline_pos = info.timeline_start + (media_pos - info.source_start);
        if timeline_pos >= info.timeline_end - SEGMENT_END_EPSILON {
            self.finish_active_segment();
            return;
        }
        // Sub-threshold disagreement with the displayed cursor is
        // jitter between two independently-ticking time sources, not
        // progress; propagating it makes the cursor shudder.
        if (timeline_pos - self.shared.position()).abs() >= SUPPRESS_THRESHOLD.as_secs_f64() {
            self.publish_cursor(timeline_pos);
        }
    }

    /// Resolve an elapsed [`SyncState::Seeking`] window from the
    /// playing flag. Runs from the pump as well as from incoming
    /// position reports: a paused clock sends no report after a seek,
    /// and without the pump path the machine would stay in `Seeking`
    /// forever.
    fn resolve_elapsed_seek(&mut self) {
        let SyncState::Seeking { since } = self.state else {
            return;
        };
        if since.elapsed() < SEEK_GUARD {
            return;
        }
        self.state = match self.seek_resume.take() {
            Some(id) if self.shared.is_playing() => SyncState::PlayingSegment { active: id },
            _ => {
                if self.shared.is_playing() {
                    self.enter_gap();
                    return;
                }
                SyncState::Idle
            }
        };
    }

    /// The active segment played out: snap the cursor to its end and
    /// hand off to whatever starts there.
    fn finish_active_segment(&mut self) {
        let SyncState::PlayingSegment { active } = self.state else {
            return;
        };
        let Some(info) = self.segment_by_id(active) else {
            self.enter_gap();
            return;
        };

        self.publish_cursor(info.timeline_end);
        match self.segment_at(info.timeline_end, Some(active)) {
            Some(next) => {
                debug!(from = %active, to = %next.id, "segment handoff");
                if let Err(e) = self.start_segment(&next, info.timeline_end) {
                    warn!(error = %e, "handoff failed, continuing through gap");
                    self.enter_gap();
                }
            }
            None => self.enter_gap(),
        }
    }

    // ── Gap playback ────────────────────────────────────────────

    fn handle_gap_tick(&mut self, tick: GapTick) {
        if !matches!(self.state, SyncState::PlayingGap) {
            return;
        }
        let new = self.shared.position() + tick.elapsed.as_secs_f64();
        let total = self.manager.lock().total_duration().to_seconds_f64();
        if total > 0.0 && new >= total {
            self.publish_cursor(total);
            info!("reached end of timeline");
            if let Err(e) = self.stop() {
                warn!(error = %e, "clock stop failed at end of timeline");
            }
            return;
        }

        self.publish_cursor(new);
        if let Some(info) = self.segment_at(new, None) {
            if let Err(e) = self.start_segment(&info, new) {
                warn!(error = %e, "failed to enter segment from gap");
            }
        }
    }

    fn enter_gap(&mut self) {
        if let Err(e) = self.clock.pause() {
            debug!(error = %e, "clock pause on gap entry failed");
        }
        self.state = SyncState::PlayingGap;
        self.shared.set_playing(true);
        if self.ticker.is_none() {
            self.ticker = Some(GapTicker::spawn(self.tick_tx.clone()));
        }
    }

    fn stop_ticker(&mut self) {
        if let Some(ticker) = self.ticker.take() {
            ticker.cancel();
        }
        // Ticks sent before cancellation must not land later.
        while self.tick_rx.try_recv().is_ok() {}
    }

    // ── Seeking ─────────────────────────────────────────────────

    fn request_seek(&mut self, target: f64) {
        if let Some(last) = self.last_seek {
            if last.elapsed() < SEEK_DEBOUNCE {
                self.pending_seek = Some(target);
                return;
            }
        }
        self.perform_seek(target);
    }

    fn flush_pending_seek(&mut self) {
        let debounce_open = self
            .last_seek
            .map_or(true, |last| last.elapsed() >= SEEK_DEBOUNCE);
        if debounce_open {
            if let Some(target) = self.pending_seek.take() {
                self.perform_seek(target);
            }
        }
    }

    fn perform_seek(&mut self, target: f64) {
        let target = target.max(0.0);
        let now = Instant::now();
        self.last_seek = Some(now);
        self.pending_seek = None;
        self.stop_ticker();
        self.publish_cursor(target);
        let was_playing = self.shared.is_playing();

        match self.segment_at(target, None) {
            Some(info) => {
                if let Err(e) = self.load_and_position(&info, target) {
                    warn!(error = %e, "seek target failed to load");
                    if was_playing {
                        self.enter_gap();
                    } else {
                        self.state = SyncState::Idle;
                    }
                    return;
                }
                self.seek_resume = Some(info.id);
                self.state = SyncState::Seeking { since: now };
                let result = if was_playing {
                    self.clock.play()
                } else {
                    self.clock.pause()
                };
                if let Err(e) = result {
                    warn!(error = %e, "clock transport failed after seek");
                }
            }
            None => {
                self.seek_resume = None;
                if was_playing {
                    self.enter_gap();
                } else {
                    self.state = SyncState::Idle;
                }
            }
        }
        debug!(target, "seek");
    }

    // ── Shared helpers ──────────────────────────────────────────

    fn start_segment(&mut self, info: &ActiveSegment, timeline_pos: f64) -> Result<()> {
        self.stop_ticker();
        self.load_and_position(info, timeline_pos)?;
        self.clock.play()?;
        self.state = SyncState::PlayingSegment { active: info.id };
        self.shared.set_playing(true);
        info!(segment = %info.id, path = %info.path, "playing segment");
        Ok(())
    }

    /// Load a source and park the clock at the media position that
    /// corresponds to `timeline_pos`.
    fn load_and_position(&mut self, info: &ActiveSegment, timeline_pos: f64) -> Result<()> {
        self.clock.load(&info.path)?;
        let media_pos = info.source_start + (timeline_pos - info.timeline_start).max(0.0);
        self.clock.seek(media_pos)?;
        self.last_seek = Some(Instant::now());
        self.clock.set_volume(info.volume);
        self.clock.set_muted(info.muted);
        Ok(())
    }

    /// Write the cursor to the shared snapshot and the timeline. The
    /// resulting `CursorMoved` event echoes back through
    /// [`Self::on_cursor_moved`] and is absorbed by the suppression
    /// threshold.
    fn publish_cursor(&mut self, seconds: f64) {
        self.shared.set_position(seconds);
        self.manager
            .lock()
            .set_cursor(RationalTime::from_seconds_f64(seconds));
    }

    /// First segment at `seconds` across tracks, in track order.
    fn segment_at(&self, seconds: f64, exclude: Option<SegmentId>) -> Option<ActiveSegment> {
        let time = RationalTime::from_seconds_f64(seconds);
        let manager = self.manager.lock();
        for track in manager.tracks() {
            for segment in track.segments_at_time(time) {
                if Some(segment.id()) == exclude {
                    continue;
                }
                return Some(snapshot(segment));
            }
        }
        None
    }

    fn segment_by_id(&self, id: SegmentId) -> Option<ActiveSegment> {
        self.manager.lock().segment(id).map(snapshot)
    }
}

fn snapshot(segment: &montage_timeline::Segment) -> ActiveSegment {
    ActiveSegment {
        id: segment.id(),
        path: segment.source().path.clone(),
        timeline_start: segment.timeline_start().to_seconds_f64(),
        timeline_end: segment.timeline_end().to_seconds_f64(),
        source_start: segment.source_start().to_seconds_f64(),
        volume: segment.volume(),
        muted: !segment.audio_enabled,
    }
}

impl std::fmt::Debug for Synchronizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Synchronizer")
            .field("state", &self.state)
            .field("position", &self.shared.position())
            .field("playing", &self.shared.is_playing())
            .finish()
    }
}
