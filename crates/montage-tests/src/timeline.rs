//! Integration tests for the timeline subsystem.
//!
//! Exercises cross-crate interactions between montage-core,
//! montage-timeline, and montage-media.

use montage_core::RationalTime;
use montage_media::MediaProbe;
use montage_timeline::{
    OverlapPolicy, Segment, SourceRef, TimelineEvent, Track, TrackKind, TrackManager,
};

// ── Helpers ────────────────────────────────────────────────────

fn source(secs: i64) -> SourceRef {
    SourceRef::new("media/test.mp4", RationalTime::new(secs, 1))
}

fn segment(start: i64, secs: i64) -> Segment {
    Segment::from_source(source(secs), RationalTime::new(start, 1), RationalTime::new(secs, 1))
        .unwrap()
}

/// Video track with clips at [0,5), [5,35), [35,45) plus a 45s music
/// bed on an audio track.
fn build_manager() -> TrackManager {
    crate::init_tracing();
    let mut manager = TrackManager::new(Track::new_video("V1"));
    for (start, secs) in [(0, 5), (5, 30), (35, 10)] {
        let outcome = manager.add_segment_at_time(
            source(secs),
            TrackKind::Video,
            RationalTime::new(start, 1),
            RationalTime::new(secs, 1),
        );
        assert!(outcome.success, "{}", outcome.message);
    }

    let mut audio = Track::new_audio("A1");
    audio.add_segment(segment(0, 45)).unwrap();
    manager.add_track(audio);
    manager
}

// ── Assembly & timing ──────────────────────────────────────────

#[test]
fn timeline_duration_is_max_across_tracks() {
    let manager = build_manager();
    assert_eq!(manager.total_duration(), RationalTime::new(45, 1));
}

#[test]
fn probed_media_places_onto_timeline() {
    let path = std::env::temp_dir().join("montage_integration.mp4");
    std::fs::write(&path, b"").unwrap();

    let probe = MediaProbe::probe(&path).unwrap();
    let mut manager = TrackManager::new(Track::new_video("V1"));
    let outcome = manager.add_segment_at_time(
        probe.to_source_ref(),
        TrackKind::Video,
        RationalTime::ZERO,
        probe.duration,
    );
    assert!(outcome.success, "{}", outcome.message);
    assert_eq!(manager.total_duration(), probe.duration);

    std::fs::remove_file(path).ok();
}

// ── Cut across all tracks ──────────────────────────────────────

#[test]
fn cut_splits_every_unlocked_track() {
    let mut manager = build_manager();

    let outcome = manager.cut_all_tracks_at(RationalTime::new(20, 1));
    assert!(outcome.success, "{}", outcome.message);

    // Video: [5,35) split into [5,20) + [20,35); audio bed split too.
    assert_eq!(manager.tracks()[0].len(), 4);
    assert_eq!(manager.tracks()[1].len(), 2);
    for track in manager.tracks() {
        let at_cut: Vec<_> = track.segments_at_time(RationalTime::new(20, 1));
        assert_eq!(at_cut.len(), 1);
        assert_eq!(at_cut[0].timeline_start(), RationalTime::new(20, 1));
    }
    // Split exactness: total duration is unchanged.
    assert_eq!(manager.total_duration(), RationalTime::new(45, 1));
}

#[test]
fn cut_leaves_locked_tracks_untouched() {
    let mut manager = build_manager();
    {
        let mut locked = Track::new_video("V2");
        locked.add_segment(segment(10, 20)).unwrap();
        locked.lock();
        manager.add_track(locked);
    }

    let outcome = manager.cut_all_tracks_at(RationalTime::new(20, 1));
    assert!(outcome.success);
    let locked = manager
        .tracks()
        .iter()
        .find(|t| t.is_locked())
        .expect("locked track present");
    assert_eq!(locked.len(), 1);
}

// ── Selection, clipboard, delete ───────────────────────────────

#[test]
fn copy_then_delete_workflow() {
    let mut manager = build_manager();
    let ids: Vec<_> = manager.tracks()[0]
        .segments()
        .iter()
        .map(|s| s.id())
        .collect();
    manager.select_segments(ids.clone());

    assert!(manager.copy_selected().success);
    assert_eq!(manager.clipboard().len(), 3);

    let outcome = manager.delete_selected();
    assert!(outcome.success);
    assert_eq!(outcome.message, "Deleted 3 segments");
    assert!(manager.tracks()[0].is_empty());
    // Audio bed untouched, clipboard survives the delete.
    assert_eq!(manager.tracks()[1].len(), 1);
    assert_eq!(manager.clipboard().len(), 3);
}

// ── Overlap policies across track kinds ────────────────────────

#[test]
fn audio_tracks_layer_where_video_rejects() {
    let mut manager = build_manager();

    // Video insertion over [5,35) is rejected.
    let video = manager.add_segment_at_time(
        source(10),
        TrackKind::Video,
        RationalTime::new(10, 1),
        RationalTime::new(10, 1),
    );
    assert!(!video.success);

    // The same overlapping insertion layers on the audio track.
    let audio = manager.add_segment_at_time(
        source(10),
        TrackKind::Audio,
        RationalTime::new(10, 1),
        RationalTime::new(10, 1),
    );
    assert!(audio.success, "{}", audio.message);
    assert_eq!(manager.tracks()[1].len(), 2);
}

#[test]
fn push_policy_composes_with_manager_state() {
    let mut manager = build_manager();
    let track_id = manager.tracks()[0].id();
    let events = std::sync::Arc::new(std::sync::Mutex::new(0usize));
    {
        let events = events.clone();
        manager.subscribe(move |e| {
            if matches!(e, TimelineEvent::TrackUpdated) {
                *events.lock().unwrap() += 1;
            }
        });
    }

    // Direct track-level push keeps the start-ordering invariant.
    let mut track = Track::new_video("scratch");
    track.add_segment(segment(0, 10)).unwrap();
    track
        .insert_at_time(segment(0, 4), RationalTime::new(3, 1), OverlapPolicy::Push)
        .unwrap();
    let starts: Vec<_> = track.segments().iter().map(|s| s.timeline_start()).collect();
    assert_eq!(starts, vec![RationalTime::new(3, 1), RationalTime::new(7, 1)]);

    // Manager-level edits report through the event bus.
    manager.cut_all_tracks_at(RationalTime::new(20, 1));
    assert!(*events.lock().unwrap() >= 1);
    assert!(manager.track(track_id).is_some());
}

// ── Serialization ──────────────────────────────────────────────

#[test]
fn track_round_trips_through_json() {
    let mut track = Track::new_video("V1");
    track.add_segment(segment(2, 7)).unwrap();
    track.add_segment(segment(10, 5)).unwrap();

    let json = serde_json::to_string(&track).unwrap();
    let back: Track = serde_json::from_str(&json).unwrap();

    assert_eq!(back.id(), track.id());
    assert_eq!(back.len(), 2);
    assert_eq!(back.segments()[0].timeline_start(), RationalTime::new(2, 1));
    assert_eq!(back.total_duration(), track.total_duration());
}
