//! Montage Timeline - Timeline data model
//!
//! Implements the multi-track editing structure:
//! - Segments mapping a source window onto a timeline window
//! - Tracks with overlap resolution policies
//! - A track manager for selection, clipboard and bulk edits
//! - A typed event bus for timeline change notifications

pub mod event;
pub mod manager;
pub mod segment;
pub mod track;

pub use event::{EventBus, TimelineEvent};
pub use manager::{EditOutcome, TrackManager};
pub use segment::{Segment, SegmentId, SourceRef, RESIZE_TOLERANCE};
pub use track::{OverlapPolicy, Track, TrackId, TrackKind};
