//! Half-open time ranges used for slot conflict detection.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::BookingError;

/// Half-open interval `[start, end)`.
///
/// Two ranges that only touch at an endpoint do not overlap, so a booking
/// ending at 11:00 never blocks one starting at 11:00.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeRange {
    /// Creates a range, rejecting empty or inverted ones.
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Result<Self, BookingError> {
        if start >= end {
            return Err(BookingError::Validation(
                "start_time must be before end_time".to_string(),
            ));
        }
        Ok(Self { start, end })
    }

    pub fn overlaps(&self, other: &TimeRange) -> bool {
        self.start < other.end && other.start < self.end
    }

    pub fn contains_instant(&self, t: DateTime<Utc>) -> bool {
        self.start <= t && t < self.end
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, hour, minute, 0).unwrap()
    }

    fn range(h1: u32, m1: u32, h2: u32, m2: u32) -> TimeRange {
        TimeRange::new(at(h1, m1), at(h2, m2)).unwrap()
    }

    #[test]
    fn test_new_rejects_inverted_and_empty() {
        assert!(TimeRange::new(at(11, 0), at(10, 0)).is_err());
        assert!(TimeRange::new(at(10, 0), at(10, 0)).is_err());
    }

    #[test]
    fn test_touching_ranges_do_not_overlap() {
        let morning = range(10, 0, 11, 0);
        let late_morning = range(11, 0, 12, 0);
        assert!(!morning.overlaps(&late_morning));
        assert!(!late_morning.overlaps(&morning));
    }

    #[test]
    fn test_partial_overlap() {
        let a = range(10, 0, 11, 0);
        let b = range(10, 30, 11, 30);
        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));
    }

    #[test]
    fn test_containment_overlaps() {
        let outer = range(9, 0, 17, 0);
        let inner = range(12, 0, 13, 0);
        assert!(outer.overlaps(&inner));
        assert!(inner.overlaps(&outer));
    }

    #[test]
    fn test_contains_instant_is_half_open() {
        let r = range(10, 0, 11, 0);
        assert!(r.contains_instant(at(10, 0)));
        assert!(r.contains_instant(at(10, 59)));
        assert!(!r.contains_instant(at(11, 0)));
    }

    #[test]
    fn test_duration() {
        assert_eq!(range(10, 0, 11, 30).duration(), Duration::minutes(90));
    }
}
