//! Time representation for the timeline engine.
//!
//! Timeline geometry is kept in rational seconds so that split/merge
//! arithmetic is exact: a segment split at any interior point yields two
//! halves whose durations sum back to the original with no accumulated
//! floating-point error. `f64` seconds appear only at the playback-clock
//! boundary, where the external media engine reports time.

use num_rational::Rational64;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Div, Mul, Neg, Sub};

/// A point in time (or a duration) in rational seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RationalTime {
    value: Rational64,
}

impl RationalTime {
    /// `numerator / denominator` seconds.
    #[inline]
    pub fn new(numerator: i64, denominator: i64) -> Self {
        Self {
            value: Rational64::new(numerator, denominator),
        }
    }

    /// Exact millisecond construction (used for tuning thresholds).
    #[inline]
    pub fn from_millis(millis: i64) -> Self {
        Self::new(millis, 1_000)
    }

    /// Convert from floating seconds. Rounded to microsecond precision,
    /// so values arriving from the playback clock stay stable.
    pub fn from_seconds_f64(seconds: f64) -> Self {
        const PRECISION: i64 = 1_000_000;
        Self {
            value: Rational64::new((seconds * PRECISION as f64).round() as i64, PRECISION),
        }
    }

    /// Convert to seconds as f64.
    #[inline]
    pub fn to_seconds_f64(self) -> f64 {
        *self.value.numer() as f64 / *self.value.denom() as f64
    }

    /// Const constructor for tuning constants. The fraction is stored
    /// as given, so pass it already reduced.
    #[inline]
    pub const fn const_new(numerator: i64, denominator: i64) -> Self {
        Self {
            value: Rational64::new_raw(numerator, denominator),
        }
    }

    pub const ZERO: Self = Self {
        value: Rational64::new_raw(0, 1),
    };

    #[inline]
    pub fn is_zero(self) -> bool {
        *self.value.numer() == 0
    }

    #[inline]
    pub fn is_negative(self) -> bool {
        *self.value.numer() < 0
    }

    /// Absolute value, used when comparing clock/cursor disagreement.
    #[inline]
    pub fn abs(self) -> Self {
        if self.is_negative() {
            Self { value: -self.value }
        } else {
            self
        }
    }

    #[inline]
    pub fn min(self, other: Self) -> Self {
        if self <= other {
            self
        } else {
            other
        }
    }

    #[inline]
    pub fn max(self, other: Self) -> Self {
        if self >= other {
            self
        } else {
            other
        }
    }
}

impl Default for RationalTime {
    fn default() -> Self {
        Self::ZERO
    }
}

impl Add for RationalTime {
    type Output = Self;
    fn add(self, rhs: Self) -> Self {
        Self {
            value: self.value + rhs.value,
        }
    }
}

impl Sub for RationalTime {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self {
        Self {
            value: self.value - rhs.value,
        }
    }
}

impl Neg for RationalTime {
    type Output = Self;
    fn neg(self) -> Self {
        Self { value: -self.value }
    }
}

impl Mul<i64> for RationalTime {
    type Output = Self;
    fn mul(self, rhs: i64) -> Self {
        Self {
            value: self.value * rhs,
        }
    }
}

impl Div<i64> for RationalTime {
    type Output = Self;
    fn div(self, rhs: i64) -> Self {
        Self {
            value: self.value / rhs,
        }
    }
}

impl fmt::Display for RationalTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3}s", self.to_seconds_f64())
    }
}

/// Tick/refresh rate as a rational number of events per second.
///
/// The gap ticker advances the cursor at a fixed rate when no media is
/// loaded; this is the same shape as a video frame rate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FrameRate {
    pub numerator: u32,
    pub denominator: u32,
}

impl FrameRate {
    #[inline]
    pub const fn new(numerator: u32, denominator: u32) -> Self {
        Self {
            numerator,
            denominator,
        }
    }

    #[inline]
    pub fn to_fps_f64(self) -> f64 {
        self.numerator as f64 / self.denominator as f64
    }

    /// Duration of a single tick at this rate.
    #[inline]
    pub fn tick_duration(self) -> RationalTime {
        RationalTime::new(self.denominator as i64, self.numerator as i64)
    }

    pub const FPS_24: Self = Self::new(24, 1);
    pub const FPS_30: Self = Self::new(30, 1);
    pub const FPS_60: Self = Self::new(60, 1);
}

impl Default for FrameRate {
    fn default() -> Self {
        Self::FPS_30
    }
}

impl fmt::Display for FrameRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.3} fps", self.to_fps_f64())
    }
}

/// A half-open time interval `[start, start + duration)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: RationalTime,
    pub duration: RationalTime,
}

impl TimeRange {
    #[inline]
    pub fn new(start: RationalTime, duration: RationalTime) -> Self {
        Self { start, duration }
    }

    #[inline]
    pub fn from_start_end(start: RationalTime, end: RationalTime) -> Self {
        Self {
            start,
            duration: end - start,
        }
    }

    /// End time (exclusive).
    #[inline]
    pub fn end(self) -> RationalTime {
        self.start + self.duration
    }

    /// Half-open containment: `start <= time < end`.
    #[inline]
    pub fn contains(self, time: RationalTime) -> bool {
        time >= self.start && time < self.end()
    }

    /// Strict interval intersection. Ranges that merely touch at a
    /// boundary do not overlap.
    pub fn overlaps(self, other: Self) -> bool {
        self.start < other.end() && other.start < self.end()
    }

    pub fn intersection(self, other: Self) -> Option<Self> {
        if !self.overlaps(other) {
            return None;
        }
        let start = self.start.max(other.start);
        let end = self.end().min(other.end());
        Some(Self::from_start_end(start, end))
    }

    pub const EMPTY: Self = Self {
        start: RationalTime::ZERO,
        duration: RationalTime::ZERO,
    };
}

impl Default for TimeRange {
    fn default() -> Self {
        Self::EMPTY
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn arithmetic_is_exact() {
        let a = RationalTime::new(1, 3);
        let b = RationalTime::new(2, 3);
        assert_eq!(a + b, RationalTime::new(1, 1));
        assert_eq!((a + b) - b, a);
    }

    #[test]
    fn from_millis_round_trips() {
        let t = RationalTime::from_millis(50);
        assert_eq!(t.to_seconds_f64(), 0.05);
    }

    #[test]
    fn tick_duration_at_30fps() {
        assert_eq!(FrameRate::FPS_30.tick_duration(), RationalTime::new(1, 30));
    }

    #[test]
    fn range_containment_is_half_open() {
        let r = TimeRange::new(RationalTime::new(5, 1), RationalTime::new(10, 1));
        assert!(r.contains(RationalTime::new(5, 1)));
        assert!(r.contains(RationalTime::new(14, 1)));
        assert!(!r.contains(RationalTime::new(15, 1)));
        assert!(!r.contains(RationalTime::new(4, 1)));
    }

    #[test]
    fn touching_ranges_do_not_overlap() {
        let a = TimeRange::new(RationalTime::ZERO, RationalTime::new(10, 1));
        let b = TimeRange::new(RationalTime::new(10, 1), RationalTime::new(5, 1));
        assert!(!a.overlaps(b));
        assert!(a.intersection(b).is_none());
    }

    #[test]
    fn intersection_of_overlapping_ranges() {
        let a = TimeRange::new(RationalTime::ZERO, RationalTime::new(10, 1));
        let b = TimeRange::new(RationalTime::new(5, 1), RationalTime::new(10, 1));
        let i = a.intersection(b).unwrap();
        assert_eq!(i.start, RationalTime::new(5, 1));
        assert_eq!(i.end(), RationalTime::new(10, 1));
    }

    proptest! {
        #[test]
        fn overlap_is_symmetric(
            s1 in 0i64..1000, d1 in 1i64..1000,
            s2 in 0i64..1000, d2 in 1i64..1000,
        ) {
            let a = TimeRange::new(RationalTime::new(s1, 10), RationalTime::new(d1, 10));
            let b = TimeRange::new(RationalTime::new(s2, 10), RationalTime::new(d2, 10));
            prop_assert_eq!(a.overlaps(b), b.overlaps(a));
        }
    }
}
