//! Montage Media - media probing and import
//!
//! Answers "what is in this file and how long is it" so the timeline
//! can place sources without decoding them.

pub mod probe;

pub use probe::{
    is_supported, AudioStreamInfo, MediaProbe, VideoStreamInfo, SUPPORTED_EXTENSIONS,
};
