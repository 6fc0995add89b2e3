//! Segment types for the timeline.
//!
//! A segment is an immutable-identity, mutable-geometry reference to a
//! trimmed window of a source media file, placed at a timeline position.

use montage_core::{MontageError, RationalTime, Result, TimeRange};
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

/// Stable opaque identity of a segment. Identity survives every
/// geometry mutation; a split yields one fresh id for the tail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SegmentId(Uuid);

impl SegmentId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SegmentId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SegmentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Reference to a source media file and its probed extent.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceRef {
    /// Path to the media file.
    pub path: String,
    /// Full duration of the source, as reported by the media probe.
    pub duration: RationalTime,
}

impl SourceRef {
    pub fn new(path: impl Into<String>, duration: RationalTime) -> Self {
        Self {
            path: path.into(),
            duration,
        }
    }

    /// File name component, used as the default display name.
    pub fn file_name(&self) -> &str {
        self.path
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or(self.path.as_str())
    }
}

/// Requested durations above the available source duration are capped
/// rather than rejected, as long as the excess stays under this
/// tolerance (100 ms).
pub const RESIZE_TOLERANCE: RationalTime = RationalTime::const_new(1, 10);

/// A segment of media placed on a timeline track.
///
/// Geometry fields are private; mutation goes through the setters so
/// the locked guard is applied in exactly one place per operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Segment {
    id: SegmentId,
    /// Display name, defaults to the source file name.
    pub name: String,
    source: SourceRef,
    timeline_start: RationalTime,
    timeline_duration: RationalTime,
    source_start: RationalTime,
    source_duration: RationalTime,
    locked: bool,
    pub video_enabled: bool,
    pub audio_enabled: bool,
    volume: f64,
    opacity: f64,
}

impl Segment {
    /// Create a segment with an explicit trimmed source window.
    ///
    /// Fails with a validation error if any time is out of range or the
    /// trimmed window does not lie within the source extent.
    pub fn new(
        source: SourceRef,
        timeline_start: RationalTime,
        timeline_duration: RationalTime,
        source_start: RationalTime,
        source_duration: RationalTime,
    ) -> Result<Self> {
        if timeline_start.is_negative() {
            return Err(MontageError::Validation(
                "timeline start cannot be negative".into(),
            ));
        }
        if timeline_duration <= RationalTime::ZERO {
            return Err(MontageError::Validation(
                "timeline duration must be positive".into(),
            ));
        }
        if source_start.is_negative() {
            return Err(MontageError::Validation(
                "source start cannot be negative".into(),
            ));
        }
        if source_duration <= RationalTime::ZERO {
            return Err(MontageError::Validation(
                "source duration must be positive".into(),
            ));
        }
        // The trimmed window must fit inside the probed source extent.
        // A zero source extent means the probe result is unknown; skip
        // the containment check in that case.
        if source.duration > RationalTime::ZERO && source_start + source_duration > source.duration
        {
            return Err(MontageError::Validation(format!(
                "trim window {}..{} exceeds source extent {}",
                source_start,
                source_start + source_duration,
                source.duration
            )));
        }

        let name = source.file_name().to_string();
        Ok(Self {
            id: SegmentId::new(),
            name,
            source,
            timeline_start,
            timeline_duration,
            source_start,
            source_duration,
            locked: false,
            video_enabled: true,
            audio_enabled: true,
            volume: 1.0,
            opacity: 1.0,
        })
    }

    /// Create a segment covering the full source window, as done at
    /// import/drop time.
    pub fn from_source(
        source: SourceRef,
        timeline_start: RationalTime,
        duration: RationalTime,
    ) -> Result<Self> {
        Self::new(source, timeline_start, duration, RationalTime::ZERO, duration)
    }

    // ── Accessors ───────────────────────────────────────────────

    pub fn id(&self) -> SegmentId {
        self.id
    }

    pub fn source(&self) -> &SourceRef {
        &self.source
    }

    pub fn timeline_start(&self) -> RationalTime {
        self.timeline_start
    }

    pub fn timeline_duration(&self) -> RationalTime {
        self.timeline_duration
    }

    pub fn timeline_end(&self) -> RationalTime {
        self.timeline_start + self.timeline_duration
    }

    pub fn timeline_range(&self) -> TimeRange {
        TimeRange::new(self.timeline_start, self.timeline_duration)
    }

    pub fn source_start(&self) -> RationalTime {
        self.source_start
    }

    pub fn source_duration(&self) -> RationalTime {
        self.source_duration
    }

    pub fn source_end(&self) -> RationalTime {
        self.source_start + self.source_duration
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    pub fn volume(&self) -> f64 {
        self.volume
    }

    pub fn opacity(&self) -> f64 {
        self.opacity
    }

    /// Half-open containment test in timeline coordinates.
    pub fn contains_time(&self, time: RationalTime) -> bool {
        self.timeline_range().contains(time)
    }

    /// Strict interval intersection with another segment.
    pub fn overlaps(&self, other: &Segment) -> bool {
        self.timeline_range().overlaps(other.timeline_range())
    }

    // ── Mutators ────────────────────────────────────────────────

    /// Single locked guard shared by every mutator.
    fn ensure_unlocked(&self) -> Result<()> {
        if self.locked {
            Err(MontageError::Locked(format!("segment {} is locked", self.id)))
        } else {
            Ok(())
        }
    }

    pub fn lock(&mut self) {
        self.locked = true;
    }

    pub fn unlock(&mut self) {
        self.locked = false;
    }

    /// Move the segment on the timeline. Overlap with neighbours is a
    /// track-level concern and is not checked here.
    pub fn set_start(&mut self, new_start: RationalTime) -> Result<()> {
        self.ensure_unlocked()?;
        if new_start.is_negative() {
            return Err(MontageError::Validation(
                "timeline start cannot be negative".into(),
            ));
        }
        self.timeline_start = new_start;
        Ok(())
    }

    /// Resize the segment.
    ///
    /// A request exceeding the available source duration by more than
    /// [`RESIZE_TOLERANCE`] is capped to the source duration instead of
    /// failing. The cap is reported with a warning.
    pub fn set_duration(&mut self, new_duration: RationalTime) -> Result<()> {
        self.ensure_unlocked()?;
        if new_duration <= RationalTime::ZERO {
            return Err(MontageError::Validation(
                "duration must be positive".into(),
            ));
        }
        if new_duration > self.source_duration + RESIZE_TOLERANCE {
            warn!(
                segment = %self.id,
                requested = %new_duration,
                capped_to = %self.source_duration,
                "duration capped to available source duration"
            );
            self.timeline_duration = self.source_duration;
        } else {
            self.timeline_duration = new_duration;
        }
        Ok(())
    }

    /// Shift the trimmed window within the source.
    pub fn set_source_start(&mut self, new_source_start: RationalTime) -> Result<()> {
        self.ensure_unlocked()?;
        if new_source_start.is_negative() {
            return Err(MontageError::Validation(
                "source start cannot be negative".into(),
            ));
        }
        self.source_start = new_source_start;
        Ok(())
    }

    /// Volume in `[0, 1]`; out-of-range values are clamped.
    pub fn set_volume(&mut self, volume: f64) {
        self.volume = volume.clamp(0.0, 1.0);
    }

    /// Opacity in `[0, 1]`; out-of-range values are clamped.
    pub fn set_opacity(&mut self, opacity: f64) {
        self.opacity = opacity.clamp(0.0, 1.0);
    }

    /// Split the segment at `split_time`.
    ///
    /// Returns `None` without mutating if the segment is locked or
    /// `split_time` is not strictly inside `(start, end)`. On success
    /// the receiver keeps `[start, split_time)` and the returned tail
    /// covers `[split_time, end)` with its source window advanced by
    /// the same delta, so `head.duration + tail.duration` equals the
    /// original duration exactly.
    pub fn split_at(&mut self, split_time: RationalTime) -> Option<Segment> {
        if self.locked {
            return None;
        }
        if split_time <= self.timeline_start || split_time >= self.timeline_end() {
            return None;
        }

        let head_duration = split_time - self.timeline_start;
        let tail_duration = self.timeline_end() - split_time;

        let tail = Segment {
            id: SegmentId::new(),
            name: self.name.clone(),
            source: self.source.clone(),
            timeline_start: split_time,
            timeline_duration: tail_duration,
            source_start: self.source_start + head_duration,
            source_duration: tail_duration,
            locked: false,
            video_enabled: self.video_enabled,
            audio_enabled: self.audio_enabled,
            volume: self.volume,
            opacity: self.opacity,
        };

        self.timeline_duration = head_duration;
        Some(tail)
    }

    /// Deep copy with a fresh identity. The copy shares no mutable
    /// state with the original.
    pub fn duplicate(&self) -> Segment {
        let mut copy = self.clone();
        copy.id = SegmentId::new();
        copy
    }
}
