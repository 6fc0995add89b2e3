//! Montage Core - Foundation types for the timeline engine
//!
//! This crate provides the fundamental types used throughout Montage:
//! - Time representation (RationalTime, FrameRate, TimeRange)
//! - Error types shared across the workspace

pub mod error;
pub mod time;

pub use error::{MontageError, Result};
pub use time::{FrameRate, RationalTime, TimeRange};
