//! Integration tests for cursor/playback synchronization.
//!
//! Drives a full pipeline: probed media placed on a timeline, then a
//! synchronizer following the cursor through segments and gaps.

use crossbeam_channel::Sender;
use montage_core::{RationalTime, Result};
use montage_playback::{clock_channel, ClockEvent, PlaybackClock, SyncState, Synchronizer};
use montage_timeline::{Segment, SourceRef, TimelineEvent, Track, TrackManager};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

/// Clock backend that accepts every command and remembers the loaded
/// path. Progress comes from the test pushing events.
#[derive(Default)]
struct RecordingClock {
    loaded: Arc<Mutex<Vec<String>>>,
    position: f64,
}

impl RecordingClock {
    fn new() -> (Self, Arc<Mutex<Vec<String>>>) {
        let loaded = Arc::new(Mutex::new(Vec::new()));
        (
            Self {
                loaded: Arc::clone(&loaded),
                position: 0.0,
            },
            loaded,
        )
    }
}

impl PlaybackClock for RecordingClock {
    fn load(&mut self, path: &str) -> Result<()> {
        self.loaded.lock().push(path.to_string());
        Ok(())
    }

    fn play(&mut self) -> Result<()> {
        Ok(())
    }

    fn pause(&mut self) -> Result<()> {
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        Ok(())
    }

    fn seek(&mut self, position: f64) -> Result<()> {
        self.position = position;
        Ok(())
    }

    fn current_time(&self) -> f64 {
        self.position
    }

    fn duration(&self) -> Option<f64> {
        None
    }

    fn set_volume(&mut self, _volume: f64) {}

    fn set_muted(&mut self, _muted: bool) {}
}

fn segment(path: &str, start: i64, secs: i64) -> Segment {
    Segment::from_source(
        SourceRef::new(path, RationalTime::new(secs, 1)),
        RationalTime::new(start, 1),
        RationalTime::new(secs, 1),
    )
    .unwrap()
}

/// `intro.mp4` on [0,5), a 3s gap, `body.mp4` on [8,18).
fn build() -> (
    Synchronizer,
    Arc<Mutex<Vec<String>>>,
    Sender<ClockEvent>,
    Arc<Mutex<TrackManager>>,
) {
    crate::init_tracing();
    let mut track = Track::new_video("V1");
    track.add_segment(segment("intro.mp4", 0, 5)).unwrap();
    track.add_segment(segment("body.mp4", 8, 10)).unwrap();
    let manager = Arc::new(Mutex::new(TrackManager::new(track)));

    let (clock, loaded) = RecordingClock::new();
    let (tx, rx) = clock_channel();
    let sync = Synchronizer::new(Arc::clone(&manager), Box::new(clock), rx);
    (sync, loaded, tx, manager)
}

fn wait_guard() {
    std::thread::sleep(Duration::from_millis(130));
}

#[test]
fn playback_crosses_segment_gap_segment() {
    let (mut sync, loaded, tx, _manager) = build();

    sync.play().unwrap();
    assert!(matches!(sync.state(), SyncState::PlayingSegment { .. }));
    assert_eq!(*loaded.lock(), vec!["intro.mp4".to_string()]);

    // intro.mp4 plays out; the synchronizer falls into the gap.
    wait_guard();
    tx.send(ClockEvent::EndReached).unwrap();
    sync.pump();
    assert_eq!(sync.state(), SyncState::PlayingGap);
    assert!((sync.shared().position() - 5.0).abs() < 1e-9);

    // Gap ticks carry the cursor to 8.0 where body.mp4 takes over.
    let deadline = std::time::Instant::now() + Duration::from_secs(6);
    loop {
        std::thread::sleep(Duration::from_millis(50));
        sync.pump();
        if matches!(sync.state(), SyncState::PlayingSegment { .. }) {
            break;
        }
        assert!(
            std::time::Instant::now() < deadline,
            "never reached body.mp4, cursor at {}",
            sync.shared().position()
        );
    }
    assert_eq!(loaded.lock().last().map(String::as_str), Some("body.mp4"));
}

#[test]
fn cursor_events_round_trip_without_feedback() {
    let (mut sync, loaded, tx, manager) = build();

    // A timeline listener forwards cursor moves into a queue, the way
    // an application shell wires the two together.
    let moves = Arc::new(Mutex::new(Vec::new()));
    {
        let moves = Arc::clone(&moves);
        manager.lock().subscribe(move |e| {
            if let TimelineEvent::CursorMoved { new, .. } = e {
                moves.lock().push(*new);
            }
        });
    }

    sync.play().unwrap();
    wait_guard();
    tx.send(ClockEvent::TimeChanged(2.0)).unwrap();
    sync.pump();

    // The progress report reached the timeline cursor.
    assert_eq!(manager.lock().cursor(), RationalTime::from_seconds_f64(2.0));
    let recorded: Vec<_> = moves.lock().clone();
    assert!(recorded.contains(&RationalTime::from_seconds_f64(2.0)));

    // Feeding it back as a cursor move is absorbed, not re-seeked.
    let loads_before = loaded.lock().len();
    for m in recorded {
        sync.on_cursor_moved(m);
    }
    assert_eq!(loaded.lock().len(), loads_before);
}

#[test]
fn editing_while_paused_then_resuming() {
    let (mut sync, loaded, _tx, manager) = build();

    sync.play().unwrap();
    sync.pause().unwrap();
    assert_eq!(sync.state(), SyncState::Idle);

    // Cut intro.mp4 while paused, then resume from inside the tail.
    {
        let mut m = manager.lock();
        assert!(m.cut_all_tracks_at(RationalTime::new(2, 1)).success);
    }
    sync.shared().set_position(3.0);
    sync.play().unwrap();

    let SyncState::PlayingSegment { active } = sync.state() else {
        panic!("expected segment playback, got {:?}", sync.state());
    };
    let m = manager.lock();
    let seg = m.segment(active).unwrap();
    assert_eq!(seg.timeline_start(), RationalTime::new(2, 1));
    // The tail's trim advanced: timeline 3.0 is 1s into it, 3s into
    // the source.
    assert_eq!(seg.source_start(), RationalTime::new(2, 1));
    assert_eq!(loaded.lock().last().map(String::as_str), Some("intro.mp4"));
}
