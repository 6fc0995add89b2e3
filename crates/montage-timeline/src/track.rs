//! Track types for the timeline.
//!
//! A track is an ordered lane of segments of one kind. Video and
//! subtitle lanes forbid overlap between segments; audio lanes permit
//! it (simultaneous mixing). Conflicts on insertion are resolved by an
//! explicit [`OverlapPolicy`].

use montage_core::{MontageError, RationalTime, Result};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use tracing::{debug, info};
use uuid::Uuid;

use crate::segment::{Segment, SegmentId};

/// Stable identity of a track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TrackId(Uuid);

impl TrackId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TrackId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TrackId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Kind of track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrackKind {
    Video,
    Audio,
    Subtitle,
}

impl TrackKind {
    /// Whether segments of this kind may coexist at the same time.
    /// Only audio lanes mix.
    pub fn allows_overlap(self) -> bool {
        matches!(self, TrackKind::Audio)
    }

    pub fn display_name(self) -> &'static str {
        match self {
            TrackKind::Video => "Video",
            TrackKind::Audio => "Audio",
            TrackKind::Subtitle => "Subtitle",
        }
    }
}

/// How an insertion resolves time conflicts with existing segments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OverlapPolicy {
    /// Abort the insertion if any overlap exists.
    Reject,
    /// Remove every overlapping segment, then insert.
    Overwrite,
    /// Reserved for future splice semantics; currently a no-op that
    /// reports rejection.
    Split,
    /// Shift every overlapping segment forward to make room.
    Push,
    /// Insert without touching anything (audio mixing).
    AllowMixing,
}

/// An ordered lane of segments of one kind.
///
/// Segments are stored sorted by ascending timeline start and addressed
/// by [`SegmentId`]; no object identity is involved anywhere.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Track {
    id: TrackId,
    pub name: String,
    kind: TrackKind,
    locked: bool,
    segments: Vec<Segment>,
}

impl Track {
    pub fn new(kind: TrackKind, name: impl Into<String>) -> Self {
        let name = name.into();
        info!(kind = kind.display_name(), name = %name, "created track");
        Self {
            id: TrackId::new(),
            name,
            kind,
            locked: false,
            segments: Vec::new(),
        }
    }

    pub fn new_video(name: impl Into<String>) -> Self {
        Self::new(TrackKind::Video, name)
    }

    pub fn new_audio(name: impl Into<String>) -> Self {
        Self::new(TrackKind::Audio, name)
    }

    pub fn new_subtitle(name: impl Into<String>) -> Self {
        Self::new(TrackKind::Subtitle, name)
    }

    // ── Accessors ───────────────────────────────────────────────

    pub fn id(&self) -> TrackId {
        self.id
    }

    pub fn kind(&self) -> TrackKind {
        self.kind
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn lock(&mut self) {
        self.locked = true;
    }

    pub fn unlock(&mut self) {
        self.locked = false;
    }

    /// Segments in ascending start order.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn segment(&self, id: SegmentId) -> Option<&Segment> {
        self.segments.iter().find(|s| s.id() == id)
    }

    pub fn contains(&self, id: SegmentId) -> bool {
        self.segment(id).is_some()
    }

    /// All segments whose `[start, end)` contains `time`, in start
    /// order. Zero or one member for exclusive-overlap kinds; possibly
    /// several for audio.
    pub fn segments_at_time(&self, time: RationalTime) -> Vec<&Segment> {
        self.segments
            .iter()
            .filter(|s| s.contains_time(time))
            .collect()
    }

    /// Ids of stored segments overlapping `segment`, excluding the
    /// segment itself, in start order.
    pub fn find_overlapping(&self, segment: &Segment) -> SmallVec<[SegmentId; 4]> {
        self.segments
            .iter()
            .filter(|s| s.id() != segment.id() && s.overlaps(segment))
            .map(|s| s.id())
            .collect()
    }

    /// End time of the last segment, or zero when empty.
    pub fn total_duration(&self) -> RationalTime {
        self.segments
            .iter()
            .map(|s| s.timeline_end())
            .max()
            .unwrap_or(RationalTime::ZERO)
    }

    // ── Validation ──────────────────────────────────────────────

    /// Check per-segment invariants and, for non-mixing kinds, overlap
    /// against every *other* stored segment.
    pub fn validate_segment(&self, segment: &Segment) -> Result<()> {
        if segment.timeline_start().is_negative() {
            return Err(MontageError::Validation(
                "segment start cannot be negative".into(),
            ));
        }
        if segment.timeline_duration() <= RationalTime::ZERO {
            return Err(MontageError::Validation(
                "segment duration must be positive".into(),
            ));
        }
        if !self.kind.allows_overlap() {
            let conflicts = self.find_overlapping(segment);
            if !conflicts.is_empty() {
                return Err(MontageError::Overlap(format!(
                    "segment {}..{} overlaps {} existing segment(s) on {} track \"{}\"",
                    segment.timeline_start(),
                    segment.timeline_end(),
                    conflicts.len(),
                    self.kind.display_name(),
                    self.name
                )));
            }
        }
        Ok(())
    }

    fn ensure_unlocked(&self) -> Result<()> {
        if self.locked {
            Err(MontageError::Locked(format!(
                "track \"{}\" is locked",
                self.name
            )))
        } else {
            Ok(())
        }
    }

    // ── Mutation ────────────────────────────────────────────────

    /// Add a segment at its current position. Rejects duplicates by id
    /// and re-validates invariants before acceptance.
    pub fn add_segment(&mut self, segment: Segment) -> Result<SegmentId> {
        self.ensure_unlocked()?;
        if self.contains(segment.id()) {
            return Err(MontageError::Validation(format!(
                "duplicate segment {}",
                segment.id()
            )));
        }
        self.validate_segment(&segment)?;

        let id = segment.id();
        let at = self
            .segments
            .partition_point(|s| s.timeline_start() <= segment.timeline_start());
        self.segments.insert(at, segment);
        debug!(track = %self.name, segment = %id, "added segment");
        Ok(id)
    }

    /// Remove a segment by id, returning it.
    pub fn remove_segment(&mut self, id: SegmentId) -> Result<Segment> {
        self.ensure_unlocked()?;
        let pos = self
            .segments
            .iter()
            .position(|s| s.id() == id)
            .ok_or_else(|| MontageError::NotFound(format!("segment {id}")))?;
        let removed = self.segments.remove(pos);
        debug!(track = %self.name, segment = %id, "removed segment");
        Ok(removed)
    }

    /// Insert a segment at `time`, resolving conflicts per `policy`.
    ///
    /// Audio lanes always support mixing: a `Reject` insertion that
    /// does conflict on an audio track is silently upgraded to
    /// `AllowMixing`.
    pub fn insert_at_time(
        &mut self,
        mut segment: Segment,
        time: RationalTime,
        policy: OverlapPolicy,
    ) -> Result<SegmentId> {
        self.ensure_unlocked()?;
        segment.set_start(time)?;

        let overlapping = self.find_overlapping(&segment);

        let policy = if self.kind.allows_overlap()
            && policy == OverlapPolicy::Reject
            && !overlapping.is_empty()
        {
            OverlapPolicy::AllowMixing
        } else {
            policy
        };

        if overlapping.is_empty() || policy == OverlapPolicy::AllowMixing {
            return self.add_segment(segment);
        }

        match policy {
            OverlapPolicy::Reject => Err(MontageError::Overlap(format!(
                "insertion at {} overlaps {} segment(s)",
                time,
                overlapping.len()
            ))),
            OverlapPolicy::Overwrite => {
                for id in overlapping {
                    self.remove_segment(id)?;
                }
                self.add_segment(segment)
            }
            OverlapPolicy::Push => {
                // All overlappers move by one uniform delta, referenced
                // to the earliest-starting one.
                let first_start = overlapping
                    .first()
                    .and_then(|id| self.segment(*id))
                    .map(|s| s.timeline_start())
                    .expect("overlap set is non-empty");
                let delta = segment.timeline_end() - first_start;
                // A locked overlapper would fail its shift after
                // earlier ones already moved; reject up front so a
                // failed push leaves the track untouched.
                if let Some(locked) = overlapping
                    .iter()
                    .find(|id| self.segment(**id).is_some_and(|s| s.is_locked()))
                {
                    return Err(MontageError::Locked(format!(
                        "segment {locked} is locked"
                    )));
                }
                for id in overlapping {
                    let seg = self
                        .segments
                        .iter_mut()
                        .find(|s| s.id() == id)
                        .expect("overlapper exists");
                    let shifted = seg.timeline_start() + delta;
                    seg.set_start(shifted)?;
                }
                self.resort();
                self.add_segment(segment)
            }
            OverlapPolicy::Split => {
                // Declared placeholder for future splice semantics.
                Err(MontageError::Overlap(
                    "split insertion policy is not implemented".into(),
                ))
            }
            OverlapPolicy::AllowMixing => unreachable!("handled above"),
        }
    }

    /// Move a segment, keeping start order. On exclusive-overlap
    /// kinds the destination is re-validated and a conflicting move
    /// is reverted, leaving the track unchanged.
    pub fn move_segment(&mut self, id: SegmentId, new_start: RationalTime) -> Result<()> {
        self.ensure_unlocked()?;
        let old_start = self
            .segment(id)
            .map(Segment::timeline_start)
            .ok_or_else(|| MontageError::NotFound(format!("segment {id}")))?;
        self.with_segment_mut(id, |s| s.set_start(new_start))?;

        if let Some(moved) = self.segment(id).cloned() {
            if let Err(e) = self.validate_segment(&moved) {
                self.with_segment_mut(id, |s| s.set_start(old_start))?;
                self.resort();
                return Err(e);
            }
        }
        self.resort();
        Ok(())
    }

    /// Lock or unlock a single placed segment in place.
    pub fn set_segment_locked(&mut self, id: SegmentId, locked: bool) -> Result<()> {
        self.ensure_unlocked()?;
        self.with_segment_mut(id, |s| {
            if locked {
                s.lock();
            } else {
                s.unlock();
            }
            Ok(())
        })
    }

    /// Resize a segment (capping semantics live in the segment).
    pub fn resize_segment(&mut self, id: SegmentId, new_duration: RationalTime) -> Result<()> {
        self.ensure_unlocked()?;
        self.with_segment_mut(id, |s| s.set_duration(new_duration))
    }

    /// Split a segment, returning the detached tail. The caller decides
    /// how (and whether) to insert the tail.
    pub fn split_segment(&mut self, id: SegmentId, time: RationalTime) -> Result<Option<Segment>> {
        self.ensure_unlocked()?;
        let seg = self
            .segments
            .iter_mut()
            .find(|s| s.id() == id)
            .ok_or_else(|| MontageError::NotFound(format!("segment {id}")))?;
        Ok(seg.split_at(time))
    }

    fn with_segment_mut(
        &mut self,
        id: SegmentId,
        op: impl FnOnce(&mut Segment) -> Result<()>,
    ) -> Result<()> {
        let seg = self
            .segments
            .iter_mut()
            .find(|s| s.id() == id)
            .ok_or_else(|| MontageError::NotFound(format!("segment {id}")))?;
        op(seg)
    }

    fn resort(&mut self) {
        self.segments
            .sort_by(|a, b| a.timeline_start().cmp(&b.timeline_start()));
    }
}
