use std::fmt;

use crate::error::{EditorError, Result};
use crate::time::Rational;

/// A span of media time: `[start, start + duration)`.
///
/// The duration is never negative; constructors reject anything else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimeRange {
    start: Rational,
    duration: Rational,
}

impl TimeRange {
    pub const ZERO: TimeRange = TimeRange {
        start: Rational::ZERO,
        duration: Rational::ZERO,
    };

    pub fn new(start: Rational, duration: Rational) -> Result<Self> {
        if duration.is_negative() {
            return Err(EditorError::invalid_range(format!(
                "negative duration {} starting at {}",
                duration, start
            )));
        }
        Ok(Self { start, duration })
    }

    pub fn from_start_end(start: Rational, end: Rational) -> Result<Self> {
        if end < start {
            return Err(EditorError::invalid_range(format!(
                "end {} is before start {}",
                end, start
            )));
        }
        Ok(Self { start, duration: end - start })
    }

    /// Range starting at zero, as an asset's full range
    pub fn from_duration(duration: Rational) -> Result<Self> {
        Self::new(Rational::ZERO, duration)
    }

    pub fn start(&self) -> Rational {
        self.start
    }

    pub fn duration(&self) -> Rational {
        self.duration
    }

    pub fn end(&self) -> Rational {
        self.start + self.duration
    }

    pub fn is_empty(&self) -> bool {
        self.duration.is_zero()
    }

    /// Half-open containment: `start <= time < end`
    pub fn contains(&self, time: Rational) -> bool {
        time >= self.start && time < self.end()
    }

    pub fn contains_range(&self, other: &TimeRange) -> bool {
        other.start >= self.start && other.end() <= self.end()
    }

    pub fn intersection(&self, other: &TimeRange) -> Option<TimeRange> {
        let start = self.start.max(other.start);
        let end = self.end().min(other.end());
        (start < end).then(|| TimeRange { start, duration: end - start })
    }

    /// Same range moved by `offset`
    pub fn shifted(&self, offset: Rational) -> TimeRange {
        TimeRange { start: self.start + offset, duration: self.duration }
    }

    /// Same start, re-timed for playback at `factor` speed.
    ///
    /// `factor > 1` shortens the duration; the factor must be strictly positive.
    pub fn scaled(&self, factor: Rational) -> Result<TimeRange> {
        Ok(TimeRange { start: self.start, duration: scale_duration(self.duration, factor)? })
    }
}

/// `duration / factor`, the new length of a span played at `factor` speed
pub fn scale_duration(duration: Rational, factor: Rational) -> Result<Rational> {
    if !factor.is_positive() {
        return Err(EditorError::invalid_range(format!(
            "speed factor must be greater than zero, got {}",
            factor
        )));
    }
    Ok(duration / factor)
}

impl fmt::Display for TimeRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {})", self.start, self.end())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(n: i64) -> Rational {
        Rational::from_integer(n)
    }

    #[test]
    fn test_negative_duration_rejected() {
        assert!(TimeRange::new(secs(1), secs(-1)).is_err());
        assert!(TimeRange::from_start_end(secs(5), secs(2)).is_err());
        assert!(TimeRange::from_start_end(secs(2), secs(2)).unwrap().is_empty());
    }

    #[test]
    fn test_end_and_contains() {
        let range = TimeRange::from_start_end(secs(2), secs(5)).unwrap();
        assert_eq!(range.end(), secs(5));
        assert_eq!(range.duration(), secs(3));
        assert!(range.contains(secs(2)));
        assert!(range.contains(Rational::new(4999, 1000)));
        assert!(!range.contains(secs(5)));
        assert!(!range.contains(Rational::new(-1, 600)));
    }

    #[test]
    fn test_contains_range() {
        let outer = TimeRange::from_duration(secs(10)).unwrap();
        let inner = TimeRange::from_start_end(secs(2), secs(10)).unwrap();
        let spill = TimeRange::from_start_end(secs(9), secs(11)).unwrap();
        assert!(outer.contains_range(&inner));
        assert!(!outer.contains_range(&spill));
    }

    #[test]
    fn test_scale_shortens_when_faster() {
        let range = TimeRange::new(secs(2), secs(2)).unwrap();
        let faster = range.scaled(secs(2)).unwrap();
        assert_eq!(faster.duration(), secs(1));
        assert_eq!(faster.start(), secs(2));

        let slower = range.scaled(Rational::new(1, 2)).unwrap();
        assert_eq!(slower.duration(), secs(4));
    }

    #[test]
    fn test_scale_rejects_non_positive_factor() {
        let range = TimeRange::new(secs(0), secs(2)).unwrap();
        assert!(range.scaled(Rational::ZERO).is_err());
        assert!(range.scaled(secs(-2)).is_err());
    }

    #[test]
    fn test_intersection() {
        let a = TimeRange::from_start_end(secs(0), secs(4)).unwrap();
        let b = TimeRange::from_start_end(secs(3), secs(6)).unwrap();
        let c = TimeRange::from_start_end(secs(4), secs(6)).unwrap();
        assert_eq!(a.intersection(&b), Some(TimeRange::from_start_end(secs(3), secs(4)).unwrap()));
        assert_eq!(a.intersection(&c), None);
    }

    #[test]
    fn test_equality_is_exact() {
        let a = TimeRange::new(Rational::new(1, 3), Rational::new(2, 3)).unwrap();
        let b = TimeRange::new(Rational::new(200, 600), Rational::new(400, 600)).unwrap();
        let c = TimeRange::new(Rational::new(333, 1000), Rational::new(2, 3)).unwrap();
        assert_eq!(a, b);
        assert_ne!(a, c);
    }
}
