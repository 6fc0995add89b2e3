//! Track manager - the single mutation entry point for multi-track
//! operations.
//!
//! Owns the tracks, the selection set, the clipboard and the event bus.
//! Bulk operations (delete-selected, cut-all-tracks) are best-effort:
//! locked tracks are skipped and the outcome reports what happened
//! instead of raising, so one track's failure never aborts the rest.

use montage_core::RationalTime;
use std::collections::HashSet;
use tracing::{debug, info, warn};

use crate::event::{EventBus, TimelineEvent};
use crate::segment::{Segment, SegmentId, SourceRef};
use crate::track::{OverlapPolicy, Track, TrackId, TrackKind};

/// Result value of a bulk or UI-driven edit. Never raised; callers
/// branch on `success` without exception handling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditOutcome {
    pub success: bool,
    pub message: String,
}

impl EditOutcome {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn fail(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

/// Owns a set of tracks plus selection, clipboard and cursor state.
pub struct TrackManager {
    tracks: Vec<Track>,
    selected: HashSet<SegmentId>,
    clipboard: Vec<Segment>,
    cursor: RationalTime,
    pub snap_to_grid: bool,
    pub grid_size: RationalTime,
    events: EventBus,
}

impl TrackManager {
    pub fn new(initial_track: Track) -> Self {
        info!(track = %initial_track.name, "track manager initialized");
        Self {
            tracks: vec![initial_track],
            selected: HashSet::new(),
            clipboard: Vec::new(),
            cursor: RationalTime::ZERO,
            snap_to_grid: true,
            grid_size: RationalTime::new(1, 1),
            events: EventBus::new(),
        }
    }

    // ── Listeners ───────────────────────────────────────────────

    pub fn subscribe(&mut self, listener: impl FnMut(&TimelineEvent) + Send + 'static) {
        self.events.subscribe(listener);
    }

    // ── Read access ─────────────────────────────────────────────

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }

    pub fn track(&self, id: TrackId) -> Option<&Track> {
        self.tracks.iter().find(|t| t.id() == id)
    }

    /// Track currently holding `segment`, if any.
    pub fn find_track_containing(&self, segment: SegmentId) -> Option<TrackId> {
        self.tracks
            .iter()
            .find(|t| t.contains(segment))
            .map(|t| t.id())
    }

    /// Look a segment up across all tracks.
    pub fn segment(&self, id: SegmentId) -> Option<&Segment> {
        self.tracks.iter().find_map(|t| t.segment(id))
    }

    /// Max segment end time across every track, or zero.
    pub fn total_duration(&self) -> RationalTime {
        self.tracks
            .iter()
            .map(|t| t.total_duration())
            .max()
            .unwrap_or(RationalTime::ZERO)
    }

    pub fn cursor(&self) -> RationalTime {
        self.cursor
    }

    pub fn clipboard(&self) -> &[Segment] {
        &self.clipboard
    }

    pub fn selected(&self) -> Vec<SegmentId> {
        self.selected.iter().copied().collect()
    }

    pub fn is_selected(&self, id: SegmentId) -> bool {
        self.selected.contains(&id)
    }

    // ── Track lifecycle ─────────────────────────────────────────

    pub fn add_track(&mut self, track: Track) -> TrackId {
        let id = track.id();
        info!(track = %track.name, "track added");
        self.tracks.push(track);
        self.events.emit(&TimelineEvent::TrackAdded { track: id });
        id
    }

    pub fn remove_track(&mut self, id: TrackId) -> Option<Track> {
        let pos = self.tracks.iter().position(|t| t.id() == id)?;
        let removed = self.tracks.remove(pos);
        self.events.emit(&TimelineEvent::TrackRemoved { track: id });
        self.prune_selection();
        Some(removed)
    }

    // ── Segment operations ──────────────────────────────────────

    /// Import a source onto the first unlocked track of `kind`,
    /// spanning the full source window, rejecting on overlap.
    pub fn add_segment_at_time(
        &mut self,
        source: SourceRef,
        kind: TrackKind,
        start: RationalTime,
        duration: RationalTime,
    ) -> EditOutcome {
        if start.is_negative() || duration <= RationalTime::ZERO {
            return EditOutcome::fail("Invalid start time or duration");
        }

        let segment = match Segment::from_source(source, start, duration) {
            Ok(s) => s,
            Err(e) => return EditOutcome::fail(format!("Failed to create segment: {e}")),
        };

        let Some(track_index) = self
            .tracks
            .iter()
            .position(|t| !t.is_locked() && t.kind() == kind)
        else {
            return EditOutcome::fail("No available track to add segment");
        };

        let track_id = self.tracks[track_index].id();
        match self.tracks[track_index].insert_at_time(segment, start, OverlapPolicy::Reject) {
            Ok(segment_id) => {
                self.events.emit(&TimelineEvent::SegmentAdded {
                    track: track_id,
                    segment: segment_id,
                });
                self.events.emit(&TimelineEvent::TrackUpdated);
                EditOutcome::ok(format!("Added segment at {start}"))
            }
            Err(e) => EditOutcome::fail(format!("Failed to add segment: {e}")),
        }
    }

    /// Best-effort bulk delete of the current selection. Segments on
    /// locked tracks are silently skipped; partial success is the
    /// designed behavior.
    pub fn delete_selected(&mut self) -> EditOutcome {
        if self.selected.is_empty() {
            return EditOutcome::fail("No segments selected");
        }

        // Count before the selection set is cleared; counting after
        // would always report zero.
        let mut deleted = 0usize;
        let ids: Vec<SegmentId> = self.selected.iter().copied().collect();
        for id in ids {
            let Some(track_index) = self.tracks.iter().position(|t| t.contains(id)) else {
                continue;
            };
            if self.tracks[track_index].is_locked() {
                debug!(segment = %id, "skipping segment on locked track");
                continue;
            }
            let track_id = self.tracks[track_index].id();
            if self.tracks[track_index].remove_segment(id).is_ok() {
                deleted += 1;
                self.events.emit(&TimelineEvent::SegmentRemoved {
                    track: track_id,
                    segment: id,
                });
            }
        }

        self.selected.clear();
        self.emit_selection_changed();
        EditOutcome::ok(format!("Deleted {deleted} segments"))
    }

    /// Replace the clipboard with deep copies of the selection.
    pub fn copy_selected(&mut self) -> EditOutcome {
        if self.selected.is_empty() {
            return EditOutcome::fail("No segments selected to copy");
        }

        self.clipboard.clear();
        let ids: Vec<SegmentId> = self.selected.iter().copied().collect();
        for id in ids {
            if let Some(seg) = self.segment(id) {
                self.clipboard.push(seg.duplicate());
            }
        }
        EditOutcome::ok(format!("Copied {} segments to clipboard", self.clipboard.len()))
    }

    /// Split every segment spanning `time` on every unlocked track and
    /// re-insert the tails. Succeeds if at least one cut happened.
    pub fn cut_all_tracks_at(&mut self, time: RationalTime) -> EditOutcome {
        if time.is_negative() {
            return EditOutcome::fail("Invalid cut time");
        }

        let mut cut_performed = false;
        for track_index in 0..self.tracks.len() {
            if self.tracks[track_index].is_locked() {
                continue;
            }
            let track_id = self.tracks[track_index].id();
            let spanning: Vec<SegmentId> = self.tracks[track_index]
                .segments_at_time(time)
                .iter()
                .map(|s| s.id())
                .collect();

            for original in spanning {
                let tail = match self.tracks[track_index].split_segment(original, time) {
                    Ok(Some(tail)) => tail,
                    Ok(None) => continue, // locked segment or boundary hit
                    Err(e) => {
                        warn!(track = %track_id, error = %e, "cut failed on segment");
                        continue;
                    }
                };
                let tail_start = tail.timeline_start();
                match self.tracks[track_index].insert_at_time(
                    tail,
                    tail_start,
                    OverlapPolicy::Reject,
                ) {
                    Ok(tail_id) => {
                        self.events.emit(&TimelineEvent::SegmentSplit {
                            track: track_id,
                            original,
                            tail: tail_id,
                            split_time: time,
                        });
                        cut_performed = true;
                    }
                    Err(e) => {
                        warn!(track = %track_id, error = %e, "failed to insert split tail");
                    }
                }
            }
        }

        if cut_performed {
            self.events.emit(&TimelineEvent::TrackUpdated);
            EditOutcome::ok(format!("Cut tracks at {time}"))
        } else {
            EditOutcome::fail(format!("No segments to cut at {time}"))
        }
    }

    /// Move a segment on its owning track, applying grid snap.
    pub fn move_segment(&mut self, id: SegmentId, new_start: RationalTime) -> EditOutcome {
        let target = self.snap(new_start);
        let Some(track_index) = self.tracks.iter().position(|t| t.contains(id)) else {
            return EditOutcome::fail("Segment not found");
        };
        match self.tracks[track_index].move_segment(id, target) {
            Ok(()) => {
                self.events.emit(&TimelineEvent::TrackUpdated);
                EditOutcome::ok(format!("Moved segment to {target}"))
            }
            Err(e) => EditOutcome::fail(format!("Failed to move segment: {e}")),
        }
    }

    /// Resize a segment on its owning track.
    pub fn resize_segment(&mut self, id: SegmentId, new_duration: RationalTime) -> EditOutcome {
        let Some(track_index) = self.tracks.iter().position(|t| t.contains(id)) else {
            return EditOutcome::fail("Segment not found");
        };
        match self.tracks[track_index].resize_segment(id, new_duration) {
            Ok(()) => {
                self.events.emit(&TimelineEvent::TrackUpdated);
                EditOutcome::ok("Resized segment")
            }
            Err(e) => EditOutcome::fail(format!("Failed to resize segment: {e}")),
        }
    }

    /// Lock a placed segment so edits refuse to touch it.
    pub fn lock_segment(&mut self, id: SegmentId) -> EditOutcome {
        self.set_segment_locked(id, true)
    }

    pub fn unlock_segment(&mut self, id: SegmentId) -> EditOutcome {
        self.set_segment_locked(id, false)
    }

    fn set_segment_locked(&mut self, id: SegmentId, locked: bool) -> EditOutcome {
        let Some(track_index) = self.tracks.iter().position(|t| t.contains(id)) else {
            return EditOutcome::fail("Segment not found");
        };
        match self.tracks[track_index].set_segment_locked(id, locked) {
            Ok(()) => {
                self.events.emit(&TimelineEvent::TrackUpdated);
                EditOutcome::ok(if locked {
                    "Locked segment"
                } else {
                    "Unlocked segment"
                })
            }
            Err(e) => EditOutcome::fail(format!("Failed to change segment lock: {e}")),
        }
    }

    // ── Selection ───────────────────────────────────────────────

    /// Add one segment to the selection. Unknown ids are ignored so
    /// the selection never references a segment that does not exist.
    pub fn select_segment(&mut self, id: SegmentId) {
        if self.segment(id).is_none() {
            warn!(segment = %id, "ignoring selection of unknown segment");
            return;
        }
        self.selected.insert(id);
        self.emit_selection_changed();
    }

    /// Replace the selection.
    pub fn select_segments(&mut self, ids: impl IntoIterator<Item = SegmentId>) {
        self.selected.clear();
        for id in ids {
            if self.segment(id).is_some() {
                self.selected.insert(id);
            }
        }
        self.emit_selection_changed();
    }

    pub fn clear_selection(&mut self) {
        self.selected.clear();
        self.emit_selection_changed();
    }

    /// Drop selection entries whose segments no longer exist.
    fn prune_selection(&mut self) {
        let before = self.selected.len();
        let live: HashSet<SegmentId> = self
            .selected
            .iter()
            .copied()
            .filter(|id| self.tracks.iter().any(|t| t.contains(*id)))
            .collect();
        if live.len() != before {
            self.selected = live;
            self.emit_selection_changed();
        }
    }

    fn emit_selection_changed(&mut self) {
        let selected: Vec<SegmentId> = self.selected.iter().copied().collect();
        self.events
            .emit(&TimelineEvent::SelectionChanged { selected });
    }

    // ── Cursor ──────────────────────────────────────────────────

    /// Update the cursor. Negative positions are rejected (no-op).
    pub fn set_cursor(&mut self, position: RationalTime) {
        if position.is_negative() {
            return;
        }
        let old = self.cursor;
        self.cursor = position;
        self.events
            .emit(&TimelineEvent::CursorMoved { old, new: position });
    }

    /// Round to the nearest grid line when snapping is on.
    pub fn snap(&self, time: RationalTime) -> RationalTime {
        if !self.snap_to_grid || self.grid_size <= RationalTime::ZERO {
            return time;
        }
        let steps = (time.to_seconds_f64() / self.grid_size.to_seconds_f64()).round() as i64;
        self.grid_size * steps
    }
}

impl std::fmt::Debug for TrackManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackManager")
            .field("tracks", &self.tracks.len())
            .field("selected", &self.selected.len())
            .field("clipboard", &self.clipboard.len())
            .field("cursor", &self.cursor)
            .finish()
    }
}
